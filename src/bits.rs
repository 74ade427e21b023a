//! Bitmap primitives shared by the bitmap doc set and segment liveness.
//!
//! # Module Structure
//!
//! - `fixed`: word-packed bitmap with a fixed length
//! - `copy`: run-based range copy between bitmaps

pub mod copy;
pub mod fixed;

pub use copy::copy_range;
pub use fixed::{FixedBitSet, SetBits};

use bit_vec::BitVec;

/// A read-only view over a sequence of bits.
///
/// Positions at or beyond [`Bits::len`] read as unset.
pub trait Bits {
    /// Returns the bit at `index`.
    fn get(&self, index: usize) -> bool;

    /// Number of addressable bits.
    fn len(&self) -> usize;

    /// Returns true if no bits are addressable.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Bits for FixedBitSet {
    fn get(&self, index: usize) -> bool {
        FixedBitSet::get(self, index)
    }

    fn len(&self) -> usize {
        FixedBitSet::len(self)
    }
}

impl Bits for BitVec {
    fn get(&self, index: usize) -> bool {
        BitVec::get(self, index).unwrap_or(false)
    }

    fn len(&self) -> usize {
        BitVec::len(self)
    }
}
