//! Code pipeline: comment stripping and lexing into token sets.
pub mod comments;
pub mod lexer;

use std::sync::Arc;
use std::time::Instant;

use hashbrown::HashSet;

use crate::errors::{DocumentFailure, Result, Stage};
use crate::pool::WorkerPool;

pub use comments::strip_comments;
pub use lexer::{CodeLexer, ScriptLexer};

/// Distinct tokens of one code document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodeTokens {
    /// Token set, empty if tokenization failed.
    pub tokens: HashSet<String>,
    /// Set if tokenization failed.
    pub failure: Option<DocumentFailure>,
}

/// Strips comments from and lexes every code text in the pool, preserving the input order.
pub fn tokenize_codes<S>(
    pool: &WorkerPool,
    lexer: Arc<dyn CodeLexer>,
    codes: &[S],
) -> Result<Vec<CodeTokens>>
where
    S: AsRef<str>,
{
    let start = Instant::now();
    let codes: Vec<String> = codes.iter().map(|c| c.as_ref().to_string()).collect();
    let outcomes = pool.map_isolated(Stage::CodeTokenization, codes, move |code, _| {
        let stripped = strip_comments(code);
        Ok(lexer.lex(&stripped).into_iter().collect::<HashSet<_>>())
    })?;
    let tokenized: Vec<_> = outcomes
        .into_iter()
        .map(|outcome| match outcome {
            Ok(tokens) => CodeTokens {
                tokens,
                failure: None,
            },
            Err(failure) => {
                tracing::warn!(
                    document = failure.index,
                    kind = %failure.kind,
                    "code tokenization failed: {}",
                    failure.message
                );
                CodeTokens {
                    tokens: HashSet::new(),
                    failure: Some(failure),
                }
            }
        })
        .collect();
    tracing::debug!(
        documents = tokenized.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "code tokenization done"
    );
    Ok(tokenized)
}
