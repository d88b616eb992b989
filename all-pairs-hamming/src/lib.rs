//! This library provides fixed-width binary fingerprints wider than a machine word,
//! and an exhaustive all-pairs Hamming join over them that reports, for every
//! fingerprint, its distances to all the others.
#![deny(missing_docs)]

pub mod errors;
pub mod fingerprint;
pub mod simple_join;
pub mod sketch;

pub use fingerprint::Fingerprint;
pub use simple_join::SimpleJoiner;
