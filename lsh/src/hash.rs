//! Hash primitive mapping a feature string to a wide deterministic integer.
use all_pairs_hamming::sketch::Sketch;
use all_pairs_hamming::Fingerprint;
use sha2::{Digest, Sha256};

/// Identifier of the hash contract implemented by [`FeatureHash`].
///
/// Block 0 is SHA-256 of the UTF-8 bytes of the feature, read as a big-endian
/// 256-bit unsigned integer whose bit 0 is the least significant one.
/// Block `k >= 1` is SHA-256 of the same bytes followed by `k` as a big-endian `u32`,
/// and supplies bits `256k..256(k+1)`. Any implementation following this yields the
/// same bits, so fingerprints are comparable across runs and programs.
pub const HASH_CONTRACT: &str = "sha256-be-v1";

const BLOCK_BITS: usize = 256;
const BLOCK_BYTES: usize = BLOCK_BITS / 8;

/// Hash value of a feature, wide enough for a requested number of bits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeatureHash {
    blocks: Vec<[u8; BLOCK_BYTES]>,
}

impl FeatureHash {
    /// Hashes `feature`, producing at least `num_bits` bits.
    pub fn new(feature: &str, num_bits: usize) -> Self {
        let bytes = feature.as_bytes();
        let num_blocks = ((num_bits + BLOCK_BITS - 1) / BLOCK_BITS).max(1);
        let mut blocks = Vec::with_capacity(num_blocks);
        blocks.push(to_block(&Sha256::digest(bytes)));
        for k in 1..num_blocks {
            let mut hasher = Sha256::new();
            hasher.update(bytes);
            hasher.update((k as u32).to_be_bytes());
            blocks.push(to_block(&hasher.finalize()));
        }
        Self { blocks }
    }

    /// Gets the number of available bits, a multiple of 256.
    pub fn num_bits(&self) -> usize {
        self.blocks.len() * BLOCK_BITS
    }

    /// Tests bit `i`.
    #[inline(always)]
    pub fn bit(&self, i: usize) -> bool {
        let block = &self.blocks[i / BLOCK_BITS];
        let j = i % BLOCK_BITS;
        (block[BLOCK_BYTES - 1 - j / 8] >> (j % 8)) & 1 == 1
    }

    /// Truncates the hash value into a fingerprint of `num_bits` dimensions.
    pub fn to_fingerprint<S>(&self, num_bits: usize) -> Fingerprint<S>
    where
        S: Sketch,
    {
        assert!(num_bits <= self.num_bits());
        Fingerprint::from_bits((0..num_bits).map(|i| self.bit(i)), num_bits)
    }
}

fn to_block(digest: &[u8]) -> [u8; BLOCK_BYTES] {
    let mut block = [0; BLOCK_BYTES];
    block.copy_from_slice(digest);
    block
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest_bits() {
        // SHA-256("abc") = ba7816bf...f20015ad
        let h = FeatureHash::new("abc", 128);
        assert_eq!(h.num_bits(), 256);
        // 0xad = 0b1010_1101
        let low: Vec<bool> = (0..8).map(|i| h.bit(i)).collect();
        assert_eq!(
            low,
            vec![true, false, true, true, false, true, false, true]
        );
        // 0x15 = 0b0001_0101
        assert!(h.bit(8));
        assert!(!h.bit(9));
        assert!(h.bit(10));
        // 0xba = 0b1011_1010
        assert!(h.bit(255));
        assert!(!h.bit(254));
        assert!(h.bit(253));
        assert!(h.bit(252));
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(FeatureHash::new("cat sat", 128), FeatureHash::new("cat sat", 128));
        assert_ne!(FeatureHash::new("cat sat", 128), FeatureHash::new("cat", 128));
    }

    #[test]
    fn test_wide_blocks() {
        let h = FeatureHash::new("abc", 300);
        assert_eq!(h.num_bits(), 512);
        // The first block is unaffected by widening.
        let narrow = FeatureHash::new("abc", 64);
        for i in 0..256 {
            assert_eq!(h.bit(i), narrow.bit(i));
        }
    }

    #[test]
    fn test_to_fingerprint() {
        let h = FeatureHash::new("abc", 128);
        let fp = h.to_fingerprint::<u64>(128);
        assert_eq!(fp.num_bits(), 128);
        // Lowest word holds the last eight digest bytes.
        assert_eq!(fp.words()[0], 0xb410ff61f20015ad);
    }
}
