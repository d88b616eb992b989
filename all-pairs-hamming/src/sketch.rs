//! Traits of the primitive integer words that fingerprints are stored in.
use std::ops::Range;

use num_traits::int::PrimInt;
use num_traits::{FromPrimitive, ToPrimitive};

/// Trait of a word of a binary fingerprint from a primitive integer type.
pub trait Sketch: Default + PrimInt + FromPrimitive + ToPrimitive {
    /// Gets the number of dimensions.
    fn dim() -> usize;
    /// Gets the Hamming distance to the other word.
    fn hamdist(self, rhs: Self) -> usize;
    /// Produces a word for masking a given bit-position range.
    fn mask(rng: Range<usize>) -> Self;
}

macro_rules! impl_sketch {
    ($t:ty, $dim:expr) => {
        impl Sketch for $t {
            #[inline(always)]
            fn dim() -> usize {
                $dim
            }
            #[inline(always)]
            fn hamdist(self, rhs: Self) -> usize {
                (self ^ rhs).count_ones() as usize
            }
            #[inline(always)]
            fn mask(rng: Range<usize>) -> Self {
                debug_assert!(rng.end <= Self::dim());
                if rng.len() == Self::dim() {
                    Self::MAX
                } else {
                    ((1 << rng.len()) - 1) << rng.start
                }
            }
        }
    };
}

impl_sketch!(u8, 8);
impl_sketch!(u16, 16);
impl_sketch!(u32, 32);
impl_sketch!(u64, 64);
impl_sketch!(u128, 128);
