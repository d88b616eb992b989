//! Concurrent SimHash fingerprinting of weighted feature maps.
use std::time::Instant;

use all_pairs_hamming::Fingerprint;
use lsh::SimHasher;
use rayon::prelude::*;

use crate::pool::WorkerPool;
use crate::tfidf::{FeatureMap, FeatureVocabulary};

/// Reduces feature maps to fixed-width fingerprints.
#[derive(Clone, Copy, Debug)]
pub struct Fingerprinter {
    hasher: SimHasher,
}

impl Fingerprinter {
    /// Creates an instance producing `hashbits`-wide fingerprints.
    pub const fn new(hashbits: usize) -> Self {
        Self {
            hasher: SimHasher::new(hashbits),
        }
    }

    pub const fn hashbits(&self) -> usize {
        self.hasher.num_bits()
    }

    /// Fingerprints one document, hashing each feature by its vocabulary term.
    pub fn fingerprint(&self, vocabulary: &FeatureVocabulary, map: &FeatureMap) -> Fingerprint {
        self.hasher
            .sketch(map.iter().map(|(i, w)| (vocabulary.term(i), w)))
    }

    /// Fingerprints every document in the pool, preserving the input order.
    ///
    /// The vocabulary is only read, so tasks share it without locking.
    pub fn fingerprint_corpus(
        &self,
        pool: &WorkerPool,
        vocabulary: &FeatureVocabulary,
        maps: &[FeatureMap],
    ) -> Vec<Fingerprint> {
        let start = Instant::now();
        let fingerprints: Vec<Fingerprint> = pool.install(|| {
            maps.par_iter()
                .map(|map| self.fingerprint(vocabulary, map))
                .collect()
        });
        tracing::debug!(
            documents = fingerprints.len(),
            hashbits = self.hashbits(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "fingerprinting done"
        );
        fingerprints
    }
}
