//! Fixed-width binary fingerprints spanning multiple words.
use crate::sketch::Sketch;

/// A binary fingerprint of `num_bits` dimensions, stored little-endian in words of `S`
/// (bit `i` lives in word `i / S::dim()` at position `i % S::dim()`).
///
/// Bits at or beyond `num_bits` in the last word are never set, and every
/// bit-counting operation masks them out anyway.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Fingerprint<S = u64> {
    words: Vec<S>,
    num_bits: usize,
}

impl<S> Fingerprint<S>
where
    S: Sketch,
{
    /// Creates a fingerprint of `num_bits` dimensions with all bits cleared.
    pub fn zeros(num_bits: usize) -> Self {
        let num_words = (num_bits + S::dim() - 1) / S::dim();
        Self {
            words: vec![S::zero(); num_words],
            num_bits,
        }
    }

    /// Creates a fingerprint from the first `num_bits` items of an iterator,
    /// the first item being bit 0. Missing items are read as cleared bits.
    pub fn from_bits<I>(bits: I, num_bits: usize) -> Self
    where
        I: IntoIterator<Item = bool>,
    {
        let mut fp = Self::zeros(num_bits);
        for (i, b) in bits.into_iter().take(num_bits).enumerate() {
            if b {
                fp.set(i);
            }
        }
        fp
    }

    /// Gets the number of dimensions.
    pub const fn num_bits(&self) -> usize {
        self.num_bits
    }

    /// Gets the underlying words.
    pub fn words(&self) -> &[S] {
        &self.words
    }

    /// Tests bit `i`.
    pub fn get(&self, i: usize) -> bool {
        assert!(i < self.num_bits, "bit {i} out of range {}", self.num_bits);
        (self.words[i / S::dim()] >> (i % S::dim())) & S::one() == S::one()
    }

    /// Sets bit `i`.
    pub fn set(&mut self, i: usize) {
        assert!(i < self.num_bits, "bit {i} out of range {}", self.num_bits);
        let w = &mut self.words[i / S::dim()];
        *w = *w | (S::one() << (i % S::dim()));
    }

    /// Counts the set bits.
    pub fn count_ones(&self) -> usize {
        self.words
            .iter()
            .enumerate()
            .map(|(w, &x)| (x & self.word_mask(w)).count_ones() as usize)
            .sum()
    }

    /// Computes the bitwise XOR with a fingerprint of the same width.
    pub fn xor(&self, rhs: &Self) -> Self {
        assert_eq!(self.num_bits, rhs.num_bits);
        let words = self
            .words
            .iter()
            .zip(rhs.words.iter())
            .enumerate()
            .map(|(w, (&x, &y))| (x ^ y) & self.word_mask(w))
            .collect();
        Self {
            words,
            num_bits: self.num_bits,
        }
    }

    /// Gets the Hamming distance to a fingerprint of the same width,
    /// i.e., `popcount((self ^ rhs) & mask(num_bits))`.
    pub fn hamdist(&self, rhs: &Self) -> usize {
        assert_eq!(self.num_bits, rhs.num_bits);
        let mut dist = 0;
        for (w, (&x, &y)) in self.words.iter().zip(rhs.words.iter()).enumerate() {
            let m = self.word_mask(w);
            dist += (x & m).hamdist(y & m);
        }
        dist
    }

    #[inline(always)]
    fn word_mask(&self, w: usize) -> S {
        let rem = self.num_bits % S::dim();
        if w + 1 == self.words.len() && rem != 0 {
            S::mask(0..rem)
        } else {
            S::mask(0..S::dim())
        }
    }
}
