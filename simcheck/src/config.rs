//! Configuration of a similarity check.
use std::time::Duration;

use crate::errors::{Result, SimcheckError};

/// Default fingerprint width in bits.
pub const DEFAULT_HASHBITS: usize = 128;
/// Default multiplier of the average cosine similarity.
pub const DEFAULT_COSINE_WEIGHT: f64 = 0.6;
/// Default multiplier of the normalized Hamming similarity.
pub const DEFAULT_HAMMING_WEIGHT: f64 = 0.4;
/// Default number of worker threads.
pub const DEFAULT_WORKERS: usize = 10;
/// Default lower bound of document frequency, as a fraction of the corpus size.
pub const DEFAULT_MIN_DF: f64 = 0.02;
/// Default upper bound of document frequency, as a fraction of the corpus size.
pub const DEFAULT_MAX_DF: f64 = 0.8;

/// Every option of a check, with its default.
///
/// The two weights are independent multipliers: they are not required to sum to 1,
/// and the text score of a document lies in `[0, 100 * (cosine_weight + hamming_weight)]`.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckConfig {
    /// Fingerprint width in bits.
    pub hashbits: usize,
    /// Multiplier of the average cosine similarity.
    pub cosine_weight: f64,
    /// Multiplier of the normalized Hamming similarity.
    pub hamming_weight: f64,
    /// Worker threads shared by tokenization and fingerprinting.
    pub workers: usize,
    /// Features in fewer than `min_df * N` documents are pruned.
    pub min_df: f64,
    /// Features in more than `max_df * N` documents are pruned.
    pub max_df: f64,
    /// Per-document time budget of a concurrent task. `None` disables it.
    pub task_timeout: Option<Duration>,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            hashbits: DEFAULT_HASHBITS,
            cosine_weight: DEFAULT_COSINE_WEIGHT,
            hamming_weight: DEFAULT_HAMMING_WEIGHT,
            workers: DEFAULT_WORKERS,
            min_df: DEFAULT_MIN_DF,
            max_df: DEFAULT_MAX_DF,
            task_timeout: None,
        }
    }
}

impl CheckConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the fingerprint width.
    pub const fn hashbits(mut self, hashbits: usize) -> Self {
        self.hashbits = hashbits;
        self
    }

    /// Sets the multipliers of the cosine and Hamming similarities.
    pub fn weights(mut self, cosine_weight: f64, hamming_weight: f64) -> Self {
        self.cosine_weight = cosine_weight;
        self.hamming_weight = hamming_weight;
        self
    }

    /// Sets the number of worker threads.
    pub const fn workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Sets the document-frequency pruning bounds.
    pub fn document_frequency(mut self, min_df: f64, max_df: f64) -> Self {
        self.min_df = min_df;
        self.max_df = max_df;
        self
    }

    /// Sets the per-task timeout.
    pub const fn task_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.task_timeout = timeout;
        self
    }

    /// Checks every option, rejecting values that cannot produce meaningful scores.
    pub fn validate(&self) -> Result<()> {
        if self.hashbits == 0 {
            return Err(SimcheckError::config("hashbits must not be 0."));
        }
        if self.workers == 0 {
            return Err(SimcheckError::config("workers must not be 0."));
        }
        for (name, w) in [
            ("cosine_weight", self.cosine_weight),
            ("hamming_weight", self.hamming_weight),
        ] {
            if !w.is_finite() || w < 0. {
                return Err(SimcheckError::config(format!(
                    "{name} must be a finite non-negative number, but {w} given."
                )));
            }
        }
        validate_document_frequency(self.min_df, self.max_df)?;
        if self.task_timeout == Some(Duration::ZERO) {
            return Err(SimcheckError::config("task_timeout must not be zero."));
        }
        Ok(())
    }
}

pub(crate) fn validate_document_frequency(min_df: f64, max_df: f64) -> Result<()> {
    for (name, df) in [("min_df", min_df), ("max_df", max_df)] {
        if !(0. ..=1.).contains(&df) {
            return Err(SimcheckError::config(format!(
                "{name} must be in [0, 1], but {df} given."
            )));
        }
    }
    if min_df > max_df {
        return Err(SimcheckError::config(format!(
            "min_df ({min_df}) must not exceed max_df ({max_df})."
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CheckConfig::default();
        assert_eq!(config.hashbits, 128);
        assert_eq!(config.cosine_weight, 0.6);
        assert_eq!(config.hamming_weight, 0.4);
        assert_eq!(config.workers, 10);
        assert_eq!(config.min_df, 0.02);
        assert_eq!(config.max_df, 0.8);
        assert_eq!(config.task_timeout, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder() {
        let config = CheckConfig::new()
            .hashbits(256)
            .weights(0.5, 0.5)
            .workers(2)
            .document_frequency(0., 1.)
            .task_timeout(Some(Duration::from_secs(3)));
        assert_eq!(config.hashbits, 256);
        assert_eq!(config.workers, 2);
        assert_eq!(config.max_df, 1.);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid() {
        assert!(CheckConfig::new().hashbits(0).validate().is_err());
        assert!(CheckConfig::new().workers(0).validate().is_err());
        assert!(CheckConfig::new().weights(-0.1, 0.4).validate().is_err());
        assert!(CheckConfig::new().weights(f64::NAN, 0.4).validate().is_err());
        assert!(CheckConfig::new()
            .document_frequency(0.9, 0.1)
            .validate()
            .unwrap_err()
            .is_config());
        assert!(CheckConfig::new()
            .document_frequency(0., 1.5)
            .validate()
            .is_err());
        assert!(CheckConfig::new()
            .task_timeout(Some(Duration::ZERO))
            .validate()
            .is_err());
    }

    #[test]
    fn test_weights_need_not_sum_to_one() {
        assert!(CheckConfig::new().weights(1., 1.).validate().is_ok());
        assert!(CheckConfig::new().weights(0.2, 0.2).validate().is_ok());
    }
}
