//! Weighted SimHash over string features with a versioned hash contract.
pub mod hash;
pub mod simhash;

pub use hash::{FeatureHash, HASH_CONTRACT};
pub use simhash::SimHasher;
