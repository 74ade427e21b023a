//! Sorted doc id array, used for sparse sets.

use std::iter::Copied;
use std::slice::Iter;

use crate::DocId;

/// A sorted, deduplicated array of doc ids.
///
/// Callers hand in ids that are already ascending; this type never sorts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortedDocSet {
    docs: Box<[DocId]>,
}

impl SortedDocSet {
    /// Keep the first `len` entries of `docs`.
    ///
    /// The backing storage is shrunk to exactly `len` entries.
    ///
    /// # Panics
    ///
    /// Panics if `docs` holds fewer than `len` entries.
    pub fn new(mut docs: Vec<DocId>, len: usize) -> Self {
        assert!(
            len <= docs.len(),
            "buffer of {} doc ids cannot supply {len} entries",
            docs.len()
        );
        docs.truncate(len);
        Self::from_sorted(docs)
    }

    /// Take ownership of an already ascending vector.
    pub fn from_sorted(docs: Vec<DocId>) -> Self {
        debug_assert!(
            docs.windows(2).all(|w| w[0] < w[1]),
            "doc ids must be strictly ascending"
        );
        SortedDocSet {
            docs: docs.into_boxed_slice(),
        }
    }

    /// Number of doc ids.
    pub fn size(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    /// Binary search membership test.
    pub fn contains(&self, doc: DocId) -> bool {
        self.docs.binary_search(&doc).is_ok()
    }

    /// The doc ids in ascending order.
    pub fn docs(&self) -> &[DocId] {
        &self.docs
    }

    /// Largest doc id, if any.
    pub fn last(&self) -> Option<DocId> {
        self.docs.last().copied()
    }

    pub fn iter(&self) -> Copied<Iter<'_, DocId>> {
        self.docs.iter().copied()
    }

    /// Approximate heap usage in bytes.
    pub fn memory_usage(&self) -> usize {
        self.docs.len() * std::mem::size_of::<DocId>()
    }
}
