//! Corpus-wide similarity scoring of documents made of natural-language text and code.
//!
//! Texts are compared by TF-IDF cosine similarity combined with SimHash fingerprints,
//! and codes by Jaccard similarity of their comment-free token sets.
pub mod check;
pub mod code;
pub mod config;
pub mod cosine;
pub mod errors;
pub mod feature;
pub mod fingerprint;
pub mod jaccard;
pub mod pool;
pub mod segment;
pub mod tfidf;

pub(crate) mod shingling;

pub use check::{Checker, Document, PipelineScores, Report, SimilarityScore};
pub use config::CheckConfig;
pub use errors::{DocumentFailure, FailureKind, Result, SimcheckError, Stage};
pub use pool::{CancelToken, WorkerPool};
