//! Text scoring combining cosine similarities of feature vectors
//! with Hamming similarities of their fingerprints.
use all_pairs_hamming::{Fingerprint, SimpleJoiner};
use rayon::prelude::*;

use crate::config::CheckConfig;
use crate::errors::{Result, SimcheckError};
use crate::pool::WorkerPool;
use crate::tfidf::FeatureMap;

/// Computes the N×N cosine-similarity matrix of normalized feature vectors.
///
/// The matrix is exactly symmetric. Its diagonal is 1 up to rounding, except for
/// documents without features, whose row is all zeros.
pub fn cosine_matrix(pool: &WorkerPool, maps: &[FeatureMap]) -> Vec<Vec<f64>> {
    pool.install(|| {
        maps.par_iter()
            .map(|x| maps.iter().map(|y| x.dot(y)).collect())
            .collect()
    })
}

/// Scores each document by its mean resemblance to all the others:
///
/// ```text
/// score_i = 100 * (cosine_weight * avg_cos_i + hamming_weight * (1 - avg_ham_i / hashbits))
/// ```
///
/// where the averages run over `j != i`.
#[derive(Clone, Copy, Debug)]
pub struct TextScorer {
    hashbits: usize,
    cosine_weight: f64,
    hamming_weight: f64,
}

impl TextScorer {
    /// Creates an instance. The weights are applied as given, without renormalization.
    pub const fn new(hashbits: usize, cosine_weight: f64, hamming_weight: f64) -> Self {
        Self {
            hashbits,
            cosine_weight,
            hamming_weight,
        }
    }

    pub const fn from_config(config: &CheckConfig) -> Self {
        Self::new(config.hashbits, config.cosine_weight, config.hamming_weight)
    }

    /// Scores every document.
    ///
    /// # Errors
    ///
    /// * [`SimcheckError::Input`] if fewer than two documents are given, or the inputs
    ///   are misaligned, or a fingerprint is not `hashbits` wide.
    /// * [`SimcheckError::Computation`] if fewer than two documents have a non-zero
    ///   feature vector, so that no cosine similarity is defined.
    pub fn scores(
        &self,
        pool: &WorkerPool,
        maps: &[FeatureMap],
        fingerprints: &[Fingerprint],
    ) -> Result<Vec<f64>> {
        let n = maps.len();
        if n != fingerprints.len() {
            return Err(SimcheckError::input(format!(
                "{n} feature maps but {} fingerprints given.",
                fingerprints.len()
            )));
        }
        if n < 2 {
            return Err(SimcheckError::input(format!(
                "At least 2 documents are needed to compare, but {n} given."
            )));
        }
        let num_nonzero = maps.iter().filter(|m| !m.is_empty()).count();
        if num_nonzero < 2 {
            return Err(SimcheckError::computation(format!(
                "Only {num_nonzero} of {n} documents have a non-zero feature vector; \
                 cosine similarity is undefined."
            )));
        }

        let mut joiner = SimpleJoiner::new(self.hashbits);
        for fp in fingerprints {
            joiner.add(fp.clone())?;
        }
        let hamming = joiner.normalized_similarities()?;
        let cosine = cosine_matrix(pool, maps);

        let denom = (n - 1) as f64;
        let mut scores = Vec::with_capacity(n);
        for (i, row) in cosine.iter().enumerate() {
            let avg_cosine = (row.iter().sum::<f64>() - row[i]) / denom;
            let score =
                100. * (self.cosine_weight * avg_cosine + self.hamming_weight * hamming[i]);
            if !score.is_finite() {
                return Err(SimcheckError::computation(format!(
                    "The text score of document {i} is not finite."
                )));
            }
            scores.push(score);
        }
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::{Rng, SeedableRng};

    use crate::fingerprint::Fingerprinter;
    use crate::tfidf::Vectorizer;

    fn score(docs: &[&str], max_df: f64) -> Result<Vec<f64>> {
        let pool = WorkerPool::new(4, None).unwrap();
        let (vocab, maps) = Vectorizer::new(0., max_df)?.fit_transform(docs)?;
        let fps = Fingerprinter::new(128).fingerprint_corpus(&pool, &vocab, &maps);
        TextScorer::new(128, 0.6, 0.4).scores(&pool, &maps, &fps)
    }

    #[test]
    fn test_cosine_matrix() {
        let docs = ["red green blue", "green blue yellow", "cyan magenta", "red red green"];
        let (_, maps) = Vectorizer::new(0., 1.)
            .unwrap()
            .fit_transform(&docs)
            .unwrap();
        let pool = WorkerPool::new(2, None).unwrap();
        let m = cosine_matrix(&pool, &maps);
        for i in 0..docs.len() {
            assert!((m[i][i] - 1.).abs() < 1e-9);
            for j in 0..docs.len() {
                assert_eq!(m[i][j], m[j][i]);
                assert!((0. ..=1. + 1e-9).contains(&m[i][j]));
            }
        }
        assert_eq!(m[0][2], 0.);
        assert!(m[0][1] > 0.);
    }

    #[test]
    fn test_identical_corpus() {
        let scores = score(&["the cat sat on the mat"; 4], 1.).unwrap();
        for s in scores {
            assert!((s - 100.).abs() < 1e-6, "{s}");
        }
    }

    #[test]
    fn test_pair_and_outlier() {
        let scores = score(&["the cat sat", "the cat sat", "a dog ran far"], 0.8).unwrap();
        assert!((scores[0] - scores[1]).abs() < 1e-9);
        assert!(scores[0] > scores[2]);
        assert!(scores.iter().all(|s| (0. ..=100.).contains(s)));
    }

    #[test]
    fn test_single_document() {
        let pool = WorkerPool::new(1, None).unwrap();
        let maps = vec![FeatureMap::default()];
        let fps = vec![Fingerprint::zeros(128)];
        let err = TextScorer::new(128, 0.6, 0.4)
            .scores(&pool, &maps, &fps)
            .unwrap_err();
        assert!(err.is_input());
    }

    #[test]
    fn test_zero_vectors() {
        let pool = WorkerPool::new(1, None).unwrap();
        let maps = vec![FeatureMap::default(), FeatureMap::default()];
        let fps = vec![Fingerprint::zeros(128), Fingerprint::zeros(128)];
        let err = TextScorer::new(128, 0.6, 0.4)
            .scores(&pool, &maps, &fps)
            .unwrap_err();
        assert!(err.is_computation());
    }

    #[test]
    fn test_width_mismatch() {
        let docs = ["alpha beta", "beta gamma"];
        let (_, maps) = Vectorizer::new(0., 1.)
            .unwrap()
            .fit_transform(&docs)
            .unwrap();
        let pool = WorkerPool::new(1, None).unwrap();
        let fps = vec![Fingerprint::zeros(64), Fingerprint::zeros(64)];
        assert!(TextScorer::new(128, 0.6, 0.4)
            .scores(&pool, &maps, &fps)
            .unwrap_err()
            .is_input());
    }

    #[test]
    fn test_weights_are_independent() {
        let docs = ["alpha beta", "alpha beta", "gamma delta"];
        let pool = WorkerPool::new(2, None).unwrap();
        let (vocab, maps) = Vectorizer::new(0., 1.)
            .unwrap()
            .fit_transform(&docs)
            .unwrap();
        let fps = Fingerprinter::new(128).fingerprint_corpus(&pool, &vocab, &maps);
        let cos_only = TextScorer::new(128, 1., 0.).scores(&pool, &maps, &fps).unwrap();
        let ham_only = TextScorer::new(128, 0., 1.).scores(&pool, &maps, &fps).unwrap();
        let both = TextScorer::new(128, 1., 1.).scores(&pool, &maps, &fps).unwrap();
        for i in 0..3 {
            assert!((both[i] - (cos_only[i] + ham_only[i])).abs() < 1e-9);
        }
        assert!((cos_only[0] - 50.).abs() < 1e-9);
        assert_eq!(cos_only[2], 0.);
    }

    #[test]
    fn test_row_without_features() {
        let docs = ["alpha beta", "alpha beta gamma"];
        let pool = WorkerPool::new(2, None).unwrap();
        let (vocab, mut maps) = Vectorizer::new(0., 1.)
            .unwrap()
            .fit_transform(&docs)
            .unwrap();
        maps.push(FeatureMap::default());
        let m = cosine_matrix(&pool, &maps);
        assert_eq!(m[2][2], 0.);
        assert!(m[2].iter().all(|&c| c == 0.));
        assert!((m[0][0] - 1.).abs() < 1e-9);

        let fps = Fingerprinter::new(128).fingerprint_corpus(&pool, &vocab, &maps);
        let cos_only = TextScorer::new(128, 1., 0.).scores(&pool, &maps, &fps).unwrap();
        assert_eq!(cos_only[2], 0.);
        assert!((cos_only[0] - 100. * m[0][1] / 2.).abs() < 1e-9);
    }

    #[test]
    fn test_cosine_matrix_random() {
        let mut rng = rand_xoshiro::SplitMix64::seed_from_u64(7);
        let words = ["red", "green", "blue", "cyan", "black", "white", "grey", "pink"];
        let docs: Vec<String> = (0..12)
            .map(|_| {
                let len = rng.gen_range(1..8);
                (0..len)
                    .map(|_| words[rng.gen_range(0..words.len())])
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect();
        let (_, maps) = Vectorizer::new(0., 1.)
            .unwrap()
            .fit_transform(&docs)
            .unwrap();
        let pool = WorkerPool::new(3, None).unwrap();
        let m = cosine_matrix(&pool, &maps);
        for i in 0..docs.len() {
            assert!((m[i][i] - 1.).abs() < 1e-9);
            for j in 0..docs.len() {
                assert_eq!(m[i][j], m[j][i]);
                assert!((0. ..=1. + 1e-9).contains(&m[i][j]));
            }
        }
    }
}
