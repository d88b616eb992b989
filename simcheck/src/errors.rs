//! Error definitions.
//!
//! Corpus-wide structural problems abort a check with a [`SimcheckError`].
//! Problems confined to one document are data, reported as a [`DocumentFailure`]
//! on that document's result while the rest of the batch is still scored.
use std::error::Error;
use std::{fmt, io, result};

use all_pairs_hamming::errors::AllPairsHammingError;

/// A specialized Result type for this library.
pub type Result<T, E = SimcheckError> = result::Result<T, E>;

/// Errors in this library.
#[derive(Debug)]
pub enum SimcheckError {
    /// Contains [`InputError`].
    Input(InputError),
    /// Contains [`ConfigError`].
    Config(ConfigError),
    /// Contains [`ComputationError`].
    Computation(ComputationError),
    /// The batch was cancelled through its [`CancelToken`](crate::pool::CancelToken).
    Cancelled,
    /// The worker pool could not be created.
    Pool(rayon::ThreadPoolBuildError),
    /// A task thread could not be spawned.
    Spawn(io::Error),
}

impl fmt::Display for SimcheckError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Input(e) => e.fmt(f),
            Self::Config(e) => e.fmt(f),
            Self::Computation(e) => e.fmt(f),
            Self::Cancelled => write!(f, "Cancelled: the check was cancelled"),
            Self::Pool(e) => write!(f, "PoolError: {e}"),
            Self::Spawn(e) => write!(f, "SpawnError: {e}"),
        }
    }
}

impl Error for SimcheckError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Pool(e) => Some(e),
            Self::Spawn(e) => Some(e),
            _ => None,
        }
    }
}

impl From<AllPairsHammingError> for SimcheckError {
    fn from(e: AllPairsHammingError) -> Self {
        match e {
            AllPairsHammingError::Input(e) => Self::input(e.msg()),
        }
    }
}

impl From<rayon::ThreadPoolBuildError> for SimcheckError {
    fn from(e: rayon::ThreadPoolBuildError) -> Self {
        Self::Pool(e)
    }
}

impl From<io::Error> for SimcheckError {
    fn from(e: io::Error) -> Self {
        Self::Spawn(e)
    }
}

impl SimcheckError {
    pub(crate) fn input<S: Into<String>>(msg: S) -> Self {
        Self::Input(InputError { msg: msg.into() })
    }

    pub(crate) fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(ConfigError { msg: msg.into() })
    }

    pub(crate) fn computation<S: Into<String>>(msg: S) -> Self {
        Self::Computation(ComputationError { msg: msg.into() })
    }

    /// Checks if the error stems from the corpus being too small or malformed.
    pub const fn is_input(&self) -> bool {
        matches!(self, Self::Input(_))
    }

    /// Checks if the error stems from the configuration.
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Checks if the error stems from degenerate intermediate values.
    pub const fn is_computation(&self) -> bool {
        matches!(self, Self::Computation(_))
    }
}

/// Error used when the input corpus is invalid, e.g., empty or of a single document.
#[derive(Debug)]
pub struct InputError {
    msg: String,
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "InputError: {}", self.msg)
    }
}

/// Error used when the configuration is invalid or prunes away every feature.
#[derive(Debug)]
pub struct ConfigError {
    msg: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ConfigError: {}", self.msg)
    }
}

/// Error used when a similarity is undefined, e.g., the cosine of zero vectors.
#[derive(Debug)]
pub struct ComputationError {
    msg: String,
}

impl fmt::Display for ComputationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "ComputationError: {}", self.msg)
    }
}

/// Pipeline stage where a document failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Word segmentation of natural-language text.
    Segmentation,
    /// Feature vectorization of segmented text.
    Vectorization,
    /// Comment stripping and lexing of code.
    CodeTokenization,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Segmentation => write!(f, "segmentation"),
            Self::Vectorization => write!(f, "vectorization"),
            Self::CodeTokenization => write!(f, "code-tokenization"),
        }
    }
}

/// Why a document failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// The task returned an error.
    Rejected,
    /// The task panicked.
    Panicked,
    /// The task exceeded the per-task timeout.
    TimedOut,
    /// The task was skipped because the batch was cancelled.
    Cancelled,
    /// No feature of the document survived vocabulary pruning.
    NoFeatures,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Rejected => write!(f, "rejected"),
            Self::Panicked => write!(f, "panicked"),
            Self::TimedOut => write!(f, "timed-out"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::NoFeatures => write!(f, "no-features"),
        }
    }
}

/// Failure isolated to a single document.
///
/// The document still takes part in scoring with degraded (empty) content.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DocumentFailure {
    /// Position of the document in the corpus.
    pub index: usize,
    /// Stage that failed.
    pub stage: Stage,
    /// Kind of the failure.
    pub kind: FailureKind,
    /// Human-readable detail.
    pub message: String,
}

impl fmt::Display for DocumentFailure {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "document {} {} {}: {}",
            self.index, self.stage, self.kind, self.message
        )
    }
}
