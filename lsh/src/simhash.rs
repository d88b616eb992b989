//! Weighted SimHash for the Cosine similarity.
use all_pairs_hamming::sketch::Sketch;
use all_pairs_hamming::Fingerprint;

use crate::hash::FeatureHash;

/// SimHash by weighted bit voting over hashed string features.
///
/// For each feature, every bit position gains the feature's weight if the
/// corresponding bit of its [`FeatureHash`] is set and loses it otherwise.
/// A bit of the fingerprint is 1 iff its accumulator ends up non-negative,
/// so a document without features produces the all-ones fingerprint.
///
/// # Reference
///
/// * https://dl.acm.org/doi/10.1145/509907.509965
#[derive(Clone, Copy, Debug)]
pub struct SimHasher {
    num_bits: usize,
}

impl SimHasher {
    /// Creates an instance producing fingerprints of `num_bits` dimensions.
    pub const fn new(num_bits: usize) -> Self {
        Self { num_bits }
    }

    /// Gets the number of dimensions.
    pub const fn num_bits(&self) -> usize {
        self.num_bits
    }

    /// Produces the fingerprint of weighted features.
    pub fn sketch<S, I, F>(&self, features: I) -> Fingerprint<S>
    where
        S: Sketch,
        I: IntoIterator<Item = (F, f64)>,
        F: AsRef<str>,
    {
        let mut weights = vec![0f64; self.num_bits];
        for (feature, x) in features {
            let h = FeatureHash::new(feature.as_ref(), self.num_bits);
            for (j, w) in weights.iter_mut().enumerate() {
                if h.bit(j) {
                    *w += x;
                } else {
                    *w -= x;
                }
            }
        }
        Fingerprint::from_bits(weights.iter().map(|&w| w >= 0.), self.num_bits)
    }
}
