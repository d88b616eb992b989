//! One-call similarity check of a corpus.
use std::sync::Arc;
use std::time::Instant;

use crate::code::{tokenize_codes, CodeLexer, ScriptLexer};
use crate::config::CheckConfig;
use crate::cosine::TextScorer;
use crate::errors::{DocumentFailure, FailureKind, Result, SimcheckError, Stage};
use crate::fingerprint::Fingerprinter;
use crate::jaccard::jaccard_scores;
use crate::pool::{CancelToken, WorkerPool};
use crate::segment::{tokenize_corpus, Segmenter, WhitespaceSegmenter};
use crate::tfidf::Vectorizer;

/// Input document: its natural-language part and its code part.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Document {
    /// Caller-supplied identity, e.g., a file name.
    pub name: String,
    /// Natural-language text.
    pub text: String,
    /// Embedded code.
    pub code: String,
}

impl Document {
    /// Creates a document.
    pub fn new<N, T, C>(name: N, text: T, code: C) -> Self
    where
        N: Into<String>,
        T: Into<String>,
        C: Into<String>,
    {
        Self {
            name: name.into(),
            text: text.into(),
            code: code.into(),
        }
    }
}

/// Scores of one pipeline with the failures it isolated.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineScores {
    /// One score per document, in input order.
    pub scores: Vec<f64>,
    /// Per-document failures, ordered by document index.
    pub failures: Vec<DocumentFailure>,
}

/// Result of a check for one document.
#[derive(Clone, Debug, PartialEq)]
pub struct SimilarityScore {
    /// Name of the document.
    pub name: String,
    /// Mean text resemblance to the other documents.
    pub text_score: f64,
    /// Mean code resemblance to the other documents, in `[0, 100]`.
    pub code_score: f64,
    /// Failures isolated to this document. When non-empty, the scores were
    /// computed from degraded content.
    pub failures: Vec<DocumentFailure>,
}

impl SimilarityScore {
    /// Checks if any part of this document failed.
    pub fn is_flagged(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Scores of a whole corpus, in input order.
#[derive(Clone, Debug, PartialEq)]
pub struct Report {
    scores: Vec<SimilarityScore>,
}

impl Report {
    pub fn scores(&self) -> &[SimilarityScore] {
        &self.scores
    }

    pub fn into_scores(self) -> Vec<SimilarityScore> {
        self.scores
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Iterates over all the per-document failures.
    pub fn failures(&self) -> impl Iterator<Item = &DocumentFailure> {
        self.scores.iter().flat_map(|s| s.failures.iter())
    }
}

/// Computes text and code similarity scores for a corpus.
///
/// Every call builds its own vocabulary and fingerprints from scratch;
/// nothing is cached between calls.
///
/// # Examples
///
/// ```
/// use simcheck::{CheckConfig, Checker, Document};
///
/// let checker = Checker::new(CheckConfig::default().workers(2)).unwrap();
/// let report = checker
///     .check(&[
///         Document::new("a", "the cat sat", "def add(a,b): return a+b"),
///         Document::new("b", "the cat sat", "def add(a,b):\n# comment\nreturn a+b"),
///         Document::new("c", "a dog ran far", "def sub(a,b): return a-b"),
///     ])
///     .unwrap();
/// let scores = report.scores();
/// assert!(scores[0].text_score > scores[2].text_score);
/// assert!(scores[0].code_score > scores[2].code_score);
/// ```
pub struct Checker {
    config: CheckConfig,
    pool: WorkerPool,
    segmenter: Arc<dyn Segmenter>,
    lexer: Arc<dyn CodeLexer>,
}

impl Checker {
    /// Creates an instance after validating the configuration.
    pub fn new(config: CheckConfig) -> Result<Self> {
        config.validate()?;
        let pool = WorkerPool::new(config.workers, config.task_timeout)?;
        Ok(Self {
            config,
            pool,
            segmenter: Arc::new(WhitespaceSegmenter),
            lexer: Arc::new(ScriptLexer),
        })
    }

    /// Sets the word segmenter for natural-language texts.
    pub fn segmenter<S>(mut self, segmenter: S) -> Self
    where
        S: Segmenter + 'static,
    {
        self.segmenter = Arc::new(segmenter);
        self
    }

    /// Sets the lexer for code texts.
    pub fn lexer<L>(mut self, lexer: L) -> Self
    where
        L: CodeLexer + 'static,
    {
        self.lexer = Arc::new(lexer);
        self
    }

    /// Sets the token through which a running check can be cancelled.
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.pool = self.pool.with_cancel_token(token);
        self
    }

    pub const fn config(&self) -> &CheckConfig {
        &self.config
    }

    /// Scores every document against all the others, blocking until both pipelines finish.
    ///
    /// # Errors
    ///
    /// Corpus-wide problems abort the whole check: fewer than two documents
    /// ([`SimcheckError::Input`]), a vocabulary pruned to nothing ([`SimcheckError::Config`]),
    /// undefined cosine similarities ([`SimcheckError::Computation`]) or cancellation.
    /// Problems of a single document are reported in its [`SimilarityScore::failures`].
    pub fn check(&self, documents: &[Document]) -> Result<Report> {
        validate_corpus_size(documents.len())?;
        let start = Instant::now();

        let texts: Vec<&str> = documents.iter().map(|d| d.text.as_str()).collect();
        let codes: Vec<&str> = documents.iter().map(|d| d.code.as_str()).collect();
        let text = self.check_texts(&texts)?;
        let code = self.check_codes(&codes)?;

        let mut scores: Vec<SimilarityScore> = documents
            .iter()
            .zip(text.scores)
            .zip(code.scores)
            .map(|((doc, text_score), code_score)| SimilarityScore {
                name: doc.name.clone(),
                text_score,
                code_score,
                failures: vec![],
            })
            .collect();
        for failure in text.failures.into_iter().chain(code.failures) {
            scores[failure.index].failures.push(failure);
        }

        let report = Report { scores };
        tracing::info!(
            documents = report.len(),
            flagged = report.scores().iter().filter(|s| s.is_flagged()).count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "check done"
        );
        Ok(report)
    }

    /// Runs the text pipeline only: segmentation, vectorization, fingerprinting and scoring.
    pub fn check_texts<S>(&self, texts: &[S]) -> Result<PipelineScores>
    where
        S: AsRef<str>,
    {
        validate_corpus_size(texts.len())?;

        let tokenized = tokenize_corpus(&self.pool, Arc::clone(&self.segmenter), texts)?;
        let joined: Vec<&str> = tokenized.iter().map(|t| t.text.as_str()).collect();

        let vectorizer = Vectorizer::new(self.config.min_df, self.config.max_df)?;
        let (vocabulary, maps) = vectorizer.fit_transform(&joined)?;

        let mut failures = vec![];
        for (index, (t, map)) in tokenized.into_iter().zip(maps.iter()).enumerate() {
            if let Some(failure) = t.failure {
                failures.push(failure);
            } else if map.is_empty() {
                tracing::warn!(document = index, "no feature survived pruning");
                failures.push(DocumentFailure {
                    index,
                    stage: Stage::Vectorization,
                    kind: FailureKind::NoFeatures,
                    message: "no feature survived pruning".to_string(),
                });
            }
        }

        if self.pool.cancel_token().is_cancelled() {
            return Err(SimcheckError::Cancelled);
        }
        let fingerprints = Fingerprinter::new(self.config.hashbits).fingerprint_corpus(
            &self.pool,
            &vocabulary,
            &maps,
        );
        let scores = TextScorer::from_config(&self.config).scores(&self.pool, &maps, &fingerprints)?;
        Ok(PipelineScores { scores, failures })
    }

    /// Runs the code pipeline only: comment stripping, lexing and Jaccard scoring.
    pub fn check_codes<S>(&self, codes: &[S]) -> Result<PipelineScores>
    where
        S: AsRef<str>,
    {
        validate_corpus_size(codes.len())?;

        let tokenized = tokenize_codes(&self.pool, Arc::clone(&self.lexer), codes)?;
        let mut failures = vec![];
        let mut sets = Vec::with_capacity(tokenized.len());
        for t in tokenized {
            failures.extend(t.failure);
            sets.push(t.tokens);
        }
        let scores = jaccard_scores(&self.pool, &sets)?;
        Ok(PipelineScores { scores, failures })
    }
}

fn validate_corpus_size(n: usize) -> Result<()> {
    match n {
        0 => Err(SimcheckError::input("The corpus must not be empty.")),
        1 => Err(SimcheckError::input(
            "At least 2 documents are needed since a document is never compared to itself.",
        )),
        _ => Ok(()),
    }
}
