//! Bitmap-backed doc set, used for dense sets.

use crate::DocId;
use crate::bits::{FixedBitSet, SetBits};
use crate::docset::sorted::SortedDocSet;

/// A bitmap over `[0, max_doc)` with a cached cardinality.
#[derive(Debug, Clone)]
pub struct BitDocSet {
    bits: FixedBitSet,
    size: usize,
}

impl BitDocSet {
    /// Wrap `bits` whose number of set bits is `size`.
    ///
    /// The size is trusted, not recounted.
    pub fn new(bits: FixedBitSet, size: usize) -> Self {
        debug_assert_eq!(bits.cardinality(), size, "cardinality does not match bitmap");
        BitDocSet { bits, size }
    }

    /// Wrap `bits`, counting its set bits.
    pub fn from_bits(bits: FixedBitSet) -> Self {
        let size = bits.cardinality();
        BitDocSet { bits, size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    pub fn contains(&self, doc: DocId) -> bool {
        self.bits.get(doc as usize)
    }

    /// The underlying bitmap.
    pub fn bits(&self) -> &FixedBitSet {
        &self.bits
    }

    /// Universe size of the bitmap.
    pub fn max_doc(&self) -> usize {
        self.bits.len()
    }

    pub fn iter(&self) -> SetBits<'_> {
        self.bits.iter()
    }

    /// Convert into the sorted array form with the same members.
    pub fn to_small_set(&self) -> SortedDocSet {
        let mut docs = Vec::with_capacity(self.size);
        docs.extend(self.bits.iter().map(|doc| doc as DocId));
        debug_assert_eq!(docs.len(), self.size);
        SortedDocSet::from_sorted(docs)
    }

    /// Approximate heap usage in bytes.
    pub fn memory_usage(&self) -> usize {
        self.bits.memory_usage()
    }
}
