//! Word segmentation of natural-language texts and its concurrent stage.
//!
//! Segmentation itself is a pluggable capability: a [`Segmenter`] splits one text
//! into tokens. [`WhitespaceSegmenter`] only covers languages with explicit
//! word boundaries; segmenters for other scripts are supplied by the caller.
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::errors::{DocumentFailure, Result, Stage};
use crate::pool::{TaskContext, WorkerPool};

/// Error returned by a [`Segmenter`] that cannot handle a text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SegmentError {
    msg: String,
}

impl SegmentError {
    /// Creates an error with a message.
    pub fn new<S: Into<String>>(msg: S) -> Self {
        Self { msg: msg.into() }
    }
}

impl fmt::Display for SegmentError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "SegmentError: {}", self.msg)
    }
}

impl Error for SegmentError {}

/// Splits raw text into tokens.
///
/// Long-running implementations should poll [`TaskContext::should_stop`] and
/// return early when it turns true. Closures taking the text and the context
/// are segmenters too.
pub trait Segmenter: Send + Sync {
    /// Segments `text` into tokens.
    fn segment(&self, text: &str, ctx: &TaskContext) -> Result<Vec<String>, SegmentError>;
}

impl<F> Segmenter for F
where
    F: Fn(&str, &TaskContext) -> Result<Vec<String>, SegmentError> + Send + Sync,
{
    fn segment(&self, text: &str, ctx: &TaskContext) -> Result<Vec<String>, SegmentError> {
        self(text, ctx)
    }
}

/// Splits at whitespace and at any character that is neither alphanumeric nor `_`.
#[derive(Clone, Copy, Debug, Default)]
pub struct WhitespaceSegmenter;

impl WhitespaceSegmenter {
    const POLL_INTERVAL: usize = 4096;
}

impl Segmenter for WhitespaceSegmenter {
    fn segment(&self, text: &str, ctx: &TaskContext) -> Result<Vec<String>, SegmentError> {
        let mut tokens = vec![];
        for token in text
            .split(|c: char| !(c.is_alphanumeric() || c == '_'))
            .filter(|t| !t.is_empty())
        {
            if tokens.len() % Self::POLL_INTERVAL == 0 && ctx.should_stop() {
                return Err(SegmentError::new("interrupted"));
            }
            tokens.push(token.to_string());
        }
        Ok(tokens)
    }
}

/// Segmented document: tokens joined by single spaces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tokenized {
    /// Space-joined tokens, empty if segmentation failed.
    pub text: String,
    /// Set if segmentation failed.
    pub failure: Option<DocumentFailure>,
}

/// Segments every text in the pool, preserving the input order.
///
/// A document whose segmentation fails degrades to an empty text and is flagged;
/// the remaining documents are unaffected.
pub fn tokenize_corpus<S>(
    pool: &WorkerPool,
    segmenter: Arc<dyn Segmenter>,
    texts: &[S],
) -> Result<Vec<Tokenized>>
where
    S: AsRef<str>,
{
    let start = Instant::now();
    let texts: Vec<String> = texts.iter().map(|t| t.as_ref().to_string()).collect();
    let outcomes = pool.map_isolated(Stage::Segmentation, texts, move |text, ctx| {
        segmenter
            .segment(text, ctx)
            .map(|tokens| tokens.join(" "))
            .map_err(|e| e.to_string())
    })?;
    let tokenized: Vec<_> = outcomes
        .into_iter()
        .map(|outcome| match outcome {
            Ok(text) => Tokenized {
                text,
                failure: None,
            },
            Err(failure) => {
                tracing::warn!(
                    document = failure.index,
                    kind = %failure.kind,
                    "segmentation failed: {}",
                    failure.message
                );
                Tokenized {
                    text: String::new(),
                    failure: Some(failure),
                }
            }
        })
        .collect();
    tracing::debug!(
        documents = tokenized.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "tokenization done"
    );
    Ok(tokenized)
}
