//! An exhaustive approach of all-pairs Hamming statistics on binary fingerprints.
use crate::errors::{AllPairsHammingError, Result};
use crate::fingerprint::Fingerprint;
use crate::sketch::Sketch;

/// An exhaustive all-pairs join on fingerprints of a fixed width.
///
/// Every pair `(i, j)` with `i != j` is visited exactly once, so the cost is
/// quadratic in the number of fingerprints.
pub struct SimpleJoiner<S = u64> {
    sketches: Vec<Fingerprint<S>>,
    num_bits: usize,
}

impl<S> SimpleJoiner<S>
where
    S: Sketch,
{
    /// Creates an instance, handling fingerprints in `num_bits` dimensions.
    pub const fn new(num_bits: usize) -> Self {
        Self {
            sketches: vec![],
            num_bits,
        }
    }

    /// Appends a fingerprint.
    /// If its width differs from [`Self::num_bits()`], an error is returned.
    pub fn add(&mut self, sketch: Fingerprint<S>) -> Result<()> {
        if sketch.num_bits() != self.num_bits {
            return Err(AllPairsHammingError::input(format!(
                "The input fingerprint must have {} bits, but has {}.",
                self.num_bits,
                sketch.num_bits()
            )));
        }
        self.sketches.push(sketch);
        Ok(())
    }

    /// Gets the number of dimensions.
    pub const fn num_bits(&self) -> usize {
        self.num_bits
    }

    /// Gets the number of stored fingerprints.
    pub fn num_sketches(&self) -> usize {
        self.sketches.len()
    }

    /// Gets the Hamming distance between the `i`-th and `j`-th fingerprints.
    pub fn hamming_distance(&self, i: usize, j: usize) -> usize {
        self.sketches[i].hamdist(&self.sketches[j])
    }

    /// Sums, for every fingerprint, its Hamming distances to all the other ones.
    pub fn distance_sums(&self) -> Vec<usize> {
        let n = self.sketches.len();
        let mut sums = vec![0; n];
        for i in 0..n {
            for j in i + 1..n {
                let dist = self.hamming_distance(i, j);
                sums[i] += dist;
                sums[j] += dist;
            }
        }
        sums
    }

    /// Averages, for every fingerprint, its Hamming distances to all the other ones.
    /// At least two fingerprints are needed since self-pairs are excluded.
    pub fn average_distances(&self) -> Result<Vec<f64>> {
        let n = self.sketches.len();
        if n < 2 {
            return Err(AllPairsHammingError::input(format!(
                "At least 2 fingerprints are needed to average distances to the others, but {n} given."
            )));
        }
        let denom = (n - 1) as f64;
        Ok(self
            .distance_sums()
            .into_iter()
            .map(|s| s as f64 / denom)
            .collect())
    }

    /// Computes `1 - avg_dist / num_bits` for every fingerprint,
    /// which is 1 when all the fingerprints are identical.
    pub fn normalized_similarities(&self) -> Result<Vec<f64>> {
        let dim = self.num_bits as f64;
        Ok(self
            .average_distances()?
            .into_iter()
            .map(|d| 1. - d / dim)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn example_sketches() -> Vec<u16> {
        vec![
            0b_1110_0011_1111_1011, // 0
            0b_0001_0111_0111_1101, // 1
            0b_1100_1101_1000_1100, // 2
            0b_1100_1101_0001_0100, // 3
            0b_1010_1110_0010_1010, // 4
        ]
    }

    fn to_fingerprint(s: u16) -> Fingerprint<u8> {
        Fingerprint::from_bits((0..16).map(|i| (s >> i) & 1 == 1), 16)
    }

    fn naive_sums(sketches: &[u16]) -> Vec<usize> {
        let mut sums = vec![];
        for (i, &x) in sketches.iter().enumerate() {
            let mut s = 0;
            for (j, &y) in sketches.iter().enumerate() {
                if i != j {
                    s += (x ^ y).count_ones() as usize;
                }
            }
            sums.push(s);
        }
        sums
    }

    #[test]
    fn test_distance_sums() {
        let sketches = example_sketches();
        let mut joiner = SimpleJoiner::new(16);
        for &s in &sketches {
            joiner.add(to_fingerprint(s)).unwrap();
        }
        assert_eq!(joiner.num_sketches(), 5);
        assert_eq!(joiner.distance_sums(), naive_sums(&sketches));
    }

    #[test]
    fn test_symmetric() {
        let mut joiner = SimpleJoiner::new(16);
        for s in example_sketches() {
            joiner.add(to_fingerprint(s)).unwrap();
        }
        for i in 0..joiner.num_sketches() {
            assert_eq!(joiner.hamming_distance(i, i), 0);
            for j in 0..joiner.num_sketches() {
                assert_eq!(joiner.hamming_distance(i, j), joiner.hamming_distance(j, i));
            }
        }
    }

    #[test]
    fn test_identical_are_fully_similar() {
        let mut joiner = SimpleJoiner::new(16);
        for _ in 0..3 {
            joiner.add(to_fingerprint(0b_1010_0101_1111_0000)).unwrap();
        }
        assert_eq!(joiner.normalized_similarities().unwrap(), vec![1.; 3]);
    }

    #[test]
    fn test_average_needs_two() {
        let mut joiner = SimpleJoiner::<u8>::new(16);
        assert!(joiner.average_distances().is_err());
        joiner.add(to_fingerprint(1)).unwrap();
        assert!(joiner.average_distances().is_err());
        joiner.add(to_fingerprint(3)).unwrap();
        assert_eq!(joiner.average_distances().unwrap(), vec![1., 1.]);
    }

    #[test]
    fn test_width_mismatch() {
        let mut joiner = SimpleJoiner::<u8>::new(16);
        assert!(joiner.add(Fingerprint::zeros(8)).is_err());
    }
}
