//! Document sets produced by query execution.
//!
//! A [`DocSet`] is an immutable, ascending set of global doc ids bounded by the
//! index's `max_doc`. It takes one of two shapes depending on density:
//!
//! - [`SortedDocSet`]: a sorted id array, cheap for sparse results
//! - [`BitDocSet`]: a bitmap over the whole index, cheap for dense results
//!
//! plus the allocation-free [`DocSet::Empty`]. Sets are shared behind `Arc`
//! once built and are never mutated afterwards.

pub mod bitmap;
pub mod sorted;

use std::iter::Copied;
use std::slice::Iter;
use std::sync::{Arc, LazyLock};

use crate::DocId;
use crate::bits::{FixedBitSet, SetBits};
use crate::search::query::DocSetQuery;

pub use bitmap::BitDocSet;
pub use sorted::SortedDocSet;

static EMPTY: LazyLock<Arc<DocSet>> = LazyLock::new(|| Arc::new(DocSet::Empty));

/// An immutable set of doc ids.
#[derive(Debug, Clone)]
pub enum DocSet {
    /// The set with no members.
    Empty,
    /// Sparse representation.
    Sorted(SortedDocSet),
    /// Dense representation.
    Bits(BitDocSet),
}

impl DocSet {
    /// The shared empty set.
    pub fn empty() -> Arc<DocSet> {
        Arc::clone(&*EMPTY)
    }

    /// Build a sorted set from ascending ids, or `Empty` if there are none.
    pub fn from_sorted(docs: Vec<DocId>) -> DocSet {
        if docs.is_empty() {
            DocSet::Empty
        } else {
            DocSet::Sorted(SortedDocSet::from_sorted(docs))
        }
    }

    /// Number of members. O(1) for every shape.
    pub fn size(&self) -> usize {
        match self {
            DocSet::Empty => 0,
            DocSet::Sorted(set) => set.size(),
            DocSet::Bits(set) => set.size(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn contains(&self, doc: DocId) -> bool {
        match self {
            DocSet::Empty => false,
            DocSet::Sorted(set) => set.contains(doc),
            DocSet::Bits(set) => set.contains(doc),
        }
    }

    /// A fresh ascending iterator over the members.
    pub fn iter(&self) -> DocIter<'_> {
        match self {
            DocSet::Empty => DocIter::Empty,
            DocSet::Sorted(set) => DocIter::Sorted(set.iter()),
            DocSet::Bits(set) => DocIter::Bits(set.iter()),
        }
    }

    pub fn is_sorted(&self) -> bool {
        matches!(self, DocSet::Sorted(_))
    }

    pub fn is_bits(&self) -> bool {
        matches!(self, DocSet::Bits(_))
    }

    /// Expose this set as a filter query.
    pub fn to_query(self: Arc<Self>) -> DocSetQuery {
        DocSetQuery::new(self)
    }

    /// Number of members shared with `other`.
    pub fn intersection_size(&self, other: &DocSet) -> usize {
        match (self, other) {
            (DocSet::Empty, _) | (_, DocSet::Empty) => 0,
            (DocSet::Bits(a), DocSet::Bits(b)) => a.bits().intersection_count(b.bits()),
            (DocSet::Sorted(a), _) => a.iter().filter(|&doc| other.contains(doc)).count(),
            (_, DocSet::Sorted(b)) => b.iter().filter(|&doc| self.contains(doc)).count(),
        }
    }

    /// Members present in both sets.
    pub fn intersection(&self, other: &DocSet) -> DocSet {
        match (self, other) {
            (DocSet::Empty, _) | (_, DocSet::Empty) => DocSet::Empty,
            (DocSet::Bits(a), DocSet::Bits(b)) => {
                let mut bits = a.bits().clone();
                bits.and(b.bits());
                from_bits(bits)
            }
            (DocSet::Sorted(a), _) => {
                DocSet::from_sorted(a.iter().filter(|&doc| other.contains(doc)).collect())
            }
            (_, DocSet::Sorted(b)) => {
                DocSet::from_sorted(b.iter().filter(|&doc| self.contains(doc)).collect())
            }
        }
    }

    /// Members present in either set.
    ///
    /// Two sorted sets merge into a sorted set; anything involving a bitmap
    /// yields a bitmap wide enough for both operands.
    pub fn union(&self, other: &DocSet) -> DocSet {
        match (self, other) {
            (DocSet::Empty, _) => other.clone(),
            (_, DocSet::Empty) => self.clone(),
            (DocSet::Sorted(a), DocSet::Sorted(b)) => {
                DocSet::from_sorted(merge_sorted(a.docs(), b.docs()))
            }
            _ => {
                let num_bits = self.bound().max(other.bound());
                let mut bits = FixedBitSet::new(num_bits);
                for set in [self, other] {
                    match set {
                        DocSet::Bits(b) => bits.or(b.bits()),
                        _ => set.iter().for_each(|doc| bits.set(doc as usize)),
                    }
                }
                from_bits(bits)
            }
        }
    }

    /// Members of this set that are not in `other`.
    pub fn and_not(&self, other: &DocSet) -> DocSet {
        match (self, other) {
            (DocSet::Empty, _) => DocSet::Empty,
            (_, DocSet::Empty) => self.clone(),
            (DocSet::Sorted(a), _) => {
                DocSet::from_sorted(a.iter().filter(|&doc| !other.contains(doc)).collect())
            }
            (DocSet::Bits(a), _) => {
                let mut bits = a.bits().clone();
                match other {
                    DocSet::Bits(b) => bits.and_not(b.bits()),
                    _ => other.iter().for_each(|doc| bits.clear(doc as usize)),
                }
                from_bits(bits)
            }
        }
    }

    /// Approximate heap usage in bytes.
    pub fn memory_usage(&self) -> usize {
        match self {
            DocSet::Empty => 0,
            DocSet::Sorted(set) => set.memory_usage(),
            DocSet::Bits(set) => set.memory_usage(),
        }
    }

    // Smallest bitmap length that can address every member.
    fn bound(&self) -> usize {
        match self {
            DocSet::Empty => 0,
            DocSet::Sorted(set) => set.last().map_or(0, |doc| doc as usize + 1),
            DocSet::Bits(set) => set.max_doc(),
        }
    }
}

fn from_bits(bits: FixedBitSet) -> DocSet {
    let set = BitDocSet::from_bits(bits);
    if set.is_empty() {
        DocSet::Empty
    } else {
        DocSet::Bits(set)
    }
}

fn merge_sorted(a: &[DocId], b: &[DocId]) -> Vec<DocId> {
    let mut merged = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => {
                merged.push(a[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                merged.push(b[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                merged.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    merged.extend_from_slice(&a[i..]);
    merged.extend_from_slice(&b[j..]);
    merged
}

/// Compare two sets member by member, regardless of representation.
pub fn docs_equal(a: &DocSet, b: &DocSet) -> bool {
    a.iter().eq(b.iter())
}

impl PartialEq for DocSet {
    fn eq(&self, other: &Self) -> bool {
        docs_equal(self, other)
    }
}

impl Eq for DocSet {}

/// Ascending iterator over the members of a [`DocSet`].
#[derive(Debug, Clone)]
pub enum DocIter<'a> {
    Empty,
    Sorted(Copied<Iter<'a, DocId>>),
    Bits(SetBits<'a>),
}

impl Iterator for DocIter<'_> {
    type Item = DocId;

    fn next(&mut self) -> Option<DocId> {
        match self {
            DocIter::Empty => None,
            DocIter::Sorted(iter) => iter.next(),
            DocIter::Bits(iter) => iter.next().map(|doc| doc as DocId),
        }
    }
}

impl<'a> IntoIterator for &'a DocSet {
    type Item = DocId;
    type IntoIter = DocIter<'a>;

    fn into_iter(self) -> DocIter<'a> {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits_of(max_doc: usize, docs: &[DocId]) -> DocSet {
        let mut bits = FixedBitSet::new(max_doc);
        for &doc in docs {
            bits.set(doc as usize);
        }
        DocSet::Bits(BitDocSet::new(bits, docs.len()))
    }

    #[test]
    fn test_representation_equivalence() {
        let docs = vec![0, 1, 63, 64, 65, 500, 999];
        let sorted = DocSet::from_sorted(docs.clone());
        let bits = bits_of(1000, &docs);

        assert_eq!(sorted, bits);
        assert_eq!(sorted.iter().collect::<Vec<_>>(), docs);
        assert_eq!(bits.iter().collect::<Vec<_>>(), docs);
        assert_eq!(sorted.size(), bits.size());
        for doc in 0..1000 {
            assert_eq!(sorted.contains(doc), bits.contains(doc));
        }
    }

    #[test]
    fn test_equality_detects_differences() {
        let a = DocSet::from_sorted(vec![1, 2, 3]);
        let b = bits_of(10, &[1, 2]);
        let c = bits_of(10, &[1, 2, 4]);
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(DocSet::Empty, DocSet::from_sorted(Vec::new()));
        assert_eq!(DocSet::Empty, bits_of(10, &[]));
    }

    #[test]
    fn test_empty_and_singleton() {
        let empty = DocSet::empty();
        assert_eq!(empty.size(), 0);
        assert_eq!(empty.iter().count(), 0);
        assert!(Arc::ptr_eq(&empty, &DocSet::empty()));

        let sorted = DocSet::from_sorted(vec![42]);
        let bits = bits_of(100, &[42]);
        assert_eq!(sorted.size(), 1);
        assert_eq!(bits.size(), 1);
        assert_eq!(sorted, bits);
    }

    #[test]
    fn test_iterator_is_restartable() {
        let set = bits_of(200, &[5, 150]);
        let first: Vec<DocId> = set.iter().collect();
        let second: Vec<DocId> = (&set).into_iter().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_intersection() {
        let sorted = DocSet::from_sorted(vec![1, 5, 64, 70]);
        let bits = bits_of(128, &[5, 64, 100]);
        let other_bits = bits_of(128, &[64, 100, 127]);

        assert_eq!(sorted.intersection_size(&bits), 2);
        assert_eq!(bits.intersection_size(&sorted), 2);
        assert_eq!(bits.intersection_size(&other_bits), 2);
        assert_eq!(sorted.intersection_size(&DocSet::Empty), 0);

        let both = sorted.intersection(&bits);
        assert!(both.is_sorted());
        assert_eq!(both.iter().collect::<Vec<_>>(), vec![5, 64]);

        let dense = bits.intersection(&other_bits);
        assert!(dense.is_bits());
        assert_eq!(dense.iter().collect::<Vec<_>>(), vec![64, 100]);

        let none = bits.intersection(&bits_of(128, &[0]));
        assert!(matches!(none, DocSet::Empty));
    }

    #[test]
    fn test_union() {
        let a = DocSet::from_sorted(vec![1, 3, 5]);
        let b = DocSet::from_sorted(vec![2, 3, 6]);
        let merged = a.union(&b);
        assert!(merged.is_sorted());
        assert_eq!(merged.iter().collect::<Vec<_>>(), vec![1, 2, 3, 5, 6]);

        let bits = bits_of(4, &[0]);
        let wide = bits.union(&b);
        assert!(wide.is_bits());
        assert_eq!(wide.iter().collect::<Vec<_>>(), vec![0, 2, 3, 6]);

        assert_eq!(DocSet::Empty.union(&a), a);
        assert_eq!(a.union(&DocSet::Empty), a);
    }

    #[test]
    fn test_and_not() {
        let bits = bits_of(100, &[1, 2, 3, 50]);
        let sorted = DocSet::from_sorted(vec![2, 50, 99]);

        let diff = bits.and_not(&sorted);
        assert_eq!(diff.iter().collect::<Vec<_>>(), vec![1, 3]);
        assert_eq!(diff.size(), 2);

        let diff = sorted.and_not(&bits);
        assert_eq!(diff.iter().collect::<Vec<_>>(), vec![99]);

        let diff = bits.and_not(&bits_of(100, &[1, 2, 3, 50]));
        assert!(matches!(diff, DocSet::Empty));
    }
}
