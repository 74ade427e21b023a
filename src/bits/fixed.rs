//! Fixed-length bitmap backed by 64-bit words.
//!
//! Bit `i` lives in word `i >> 6` at position `i & 63`. Bits beyond the
//! logical length in the final word are always zero, so word-level scans
//! never report positions outside the bitmap.

use std::fmt;

use crate::error::{DocSetError, Result};

const WORD_BITS: usize = 64;

/// Number of 64-bit words needed to hold `num_bits` bits.
pub fn bits_to_words(num_bits: usize) -> usize {
    num_bits.div_ceil(WORD_BITS)
}

/// A word-packed bitmap over `[0, len)`.
#[derive(Clone, PartialEq, Eq)]
pub struct FixedBitSet {
    words: Vec<u64>,
    num_bits: usize,
}

impl FixedBitSet {
    /// Create a bitmap of `num_bits` bits, all unset.
    pub fn new(num_bits: usize) -> Self {
        FixedBitSet {
            words: vec![0; bits_to_words(num_bits)],
            num_bits,
        }
    }

    /// Wrap existing words. Bits beyond `num_bits` are cleared.
    pub fn from_words(mut words: Vec<u64>, num_bits: usize) -> Result<Self> {
        let needed = bits_to_words(num_bits);
        if words.len() < needed {
            return Err(DocSetError::invalid_argument(format!(
                "{} words cannot hold {num_bits} bits",
                words.len()
            )));
        }
        words.truncate(needed);
        let mut bits = FixedBitSet { words, num_bits };
        bits.mask_tail();
        Ok(bits)
    }

    fn mask_tail(&mut self) {
        let rem = self.num_bits % WORD_BITS;
        if rem != 0
            && let Some(last) = self.words.last_mut()
        {
            *last &= u64::MAX >> (WORD_BITS - rem);
        }
    }

    /// Number of addressable bits.
    pub fn len(&self) -> usize {
        self.num_bits
    }

    /// Returns true if the bitmap addresses no bits.
    pub fn is_empty(&self) -> bool {
        self.num_bits == 0
    }

    /// The backing words.
    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Returns the bit at `index`; positions at or beyond the length are unset.
    #[inline]
    pub fn get(&self, index: usize) -> bool {
        index < self.num_bits && (self.words[index >> 6] >> (index & 63)) & 1 == 1
    }

    /// Set the bit at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= len()`.
    #[inline]
    pub fn set(&mut self, index: usize) {
        assert!(
            index < self.num_bits,
            "bit {index} out of bounds for length {}",
            self.num_bits
        );
        self.words[index >> 6] |= 1u64 << (index & 63);
    }

    /// Clear the bit at `index`. Out of range positions are ignored.
    #[inline]
    pub fn clear(&mut self, index: usize) {
        if index < self.num_bits {
            self.words[index >> 6] &= !(1u64 << (index & 63));
        }
    }

    /// Set every bit in `[start, end)`.
    ///
    /// # Panics
    ///
    /// Panics if `start > end` or `end > len()`.
    pub fn set_range(&mut self, start: usize, end: usize) {
        assert!(
            start <= end && end <= self.num_bits,
            "range [{start}, {end}) out of bounds for length {}",
            self.num_bits
        );
        if start == end {
            return;
        }

        let start_word = start >> 6;
        let end_word = (end - 1) >> 6;
        let start_mask = u64::MAX << (start & 63);
        let end_mask = u64::MAX >> ((WORD_BITS - (end & 63)) & 63);

        if start_word == end_word {
            self.words[start_word] |= start_mask & end_mask;
            return;
        }

        self.words[start_word] |= start_mask;
        self.words[start_word + 1..end_word].fill(u64::MAX);
        self.words[end_word] |= end_mask;
    }

    /// Number of set bits.
    pub fn cardinality(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// First set bit at or after `index`, or `None`.
    pub fn next_set_bit(&self, index: usize) -> Option<usize> {
        if index >= self.num_bits {
            return None;
        }

        let mut i = index >> 6;
        let word = self.words[i] >> (index & 63);
        if word != 0 {
            return Some(index + word.trailing_zeros() as usize);
        }

        i += 1;
        while i < self.words.len() {
            let word = self.words[i];
            if word != 0 {
                return Some((i << 6) + word.trailing_zeros() as usize);
            }
            i += 1;
        }
        None
    }

    /// Last set bit at or before `index`, or `None`.
    pub fn prev_set_bit(&self, index: usize) -> Option<usize> {
        if self.num_bits == 0 {
            return None;
        }
        let index = index.min(self.num_bits - 1);

        let mut i = index >> 6;
        let word = self.words[i] << (63 - (index & 63));
        if word != 0 {
            return Some(index - word.leading_zeros() as usize);
        }

        while i > 0 {
            i -= 1;
            let word = self.words[i];
            if word != 0 {
                return Some((i << 6) + 63 - word.leading_zeros() as usize);
            }
        }
        None
    }

    /// Iterate set bits in ascending order.
    pub fn iter(&self) -> SetBits<'_> {
        SetBits {
            bits: self,
            next: 0,
        }
    }

    /// Keep only bits also set in `other`.
    pub fn and(&mut self, other: &FixedBitSet) {
        let shared = self.words.len().min(other.words.len());
        for (w, o) in self.words[..shared].iter_mut().zip(&other.words[..shared]) {
            *w &= *o;
        }
        self.words[shared..].fill(0);
    }

    /// Set bits that are set in `other`. `other` must not be longer.
    pub fn or(&mut self, other: &FixedBitSet) {
        debug_assert!(other.num_bits <= self.num_bits);
        for (w, o) in self.words.iter_mut().zip(&other.words) {
            *w |= *o;
        }
    }

    /// Clear bits that are set in `other`.
    pub fn and_not(&mut self, other: &FixedBitSet) {
        for (w, o) in self.words.iter_mut().zip(&other.words) {
            *w &= !*o;
        }
    }

    /// Number of bits set in both bitmaps.
    pub fn intersection_count(&self, other: &FixedBitSet) -> usize {
        self.words
            .iter()
            .zip(&other.words)
            .map(|(a, b)| (a & b).count_ones() as usize)
            .sum()
    }

    /// Approximate heap usage in bytes.
    pub fn memory_usage(&self) -> usize {
        self.words.capacity() * std::mem::size_of::<u64>()
    }
}

impl fmt::Debug for FixedBitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FixedBitSet")
            .field("len", &self.num_bits)
            .field("cardinality", &self.cardinality())
            .finish()
    }
}

/// Ascending iterator over the set bits of a [`FixedBitSet`].
#[derive(Debug, Clone)]
pub struct SetBits<'a> {
    bits: &'a FixedBitSet,
    next: usize,
}

impl Iterator for SetBits<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let found = self.bits.next_set_bit(self.next)?;
        self.next = found + 1;
        Some(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_to_words() {
        assert_eq!(bits_to_words(0), 0);
        assert_eq!(bits_to_words(1), 1);
        assert_eq!(bits_to_words(64), 1);
        assert_eq!(bits_to_words(65), 2);
    }

    #[test]
    fn test_set_get_clear() {
        let mut bits = FixedBitSet::new(130);
        bits.set(0);
        bits.set(63);
        bits.set(64);
        bits.set(129);

        assert!(bits.get(0));
        assert!(bits.get(63));
        assert!(bits.get(64));
        assert!(bits.get(129));
        assert!(!bits.get(1));
        assert!(!bits.get(130));
        assert_eq!(bits.cardinality(), 4);

        bits.clear(63);
        assert!(!bits.get(63));
        assert_eq!(bits.cardinality(), 3);
    }

    #[test]
    fn test_set_range_word_boundaries() {
        for &(start, end) in &[
            (0, 0),
            (0, 1),
            (0, 64),
            (1, 63),
            (63, 65),
            (64, 128),
            (5, 200),
            (127, 129),
            (0, 200),
        ] {
            let mut bits = FixedBitSet::new(200);
            bits.set_range(start, end);
            for i in 0..200 {
                assert_eq!(bits.get(i), i >= start && i < end, "[{start}, {end}) bit {i}");
            }
            assert_eq!(bits.cardinality(), end - start);
        }
    }

    #[test]
    fn test_next_set_bit_stops_at_bound() {
        let mut bits = FixedBitSet::new(100);
        assert_eq!(bits.next_set_bit(0), None);

        bits.set(3);
        bits.set(70);
        bits.set(99);
        assert_eq!(bits.next_set_bit(0), Some(3));
        assert_eq!(bits.next_set_bit(4), Some(70));
        assert_eq!(bits.next_set_bit(71), Some(99));
        assert_eq!(bits.next_set_bit(99), Some(99));
        assert_eq!(bits.next_set_bit(100), None);
        assert_eq!(bits.next_set_bit(1000), None);
    }

    #[test]
    fn test_prev_set_bit() {
        let mut bits = FixedBitSet::new(150);
        assert_eq!(bits.prev_set_bit(149), None);

        bits.set(0);
        bits.set(64);
        bits.set(140);
        assert_eq!(bits.prev_set_bit(149), Some(140));
        assert_eq!(bits.prev_set_bit(139), Some(64));
        assert_eq!(bits.prev_set_bit(64), Some(64));
        assert_eq!(bits.prev_set_bit(63), Some(0));
        assert_eq!(bits.prev_set_bit(500), Some(140));
    }

    #[test]
    fn test_from_words_masks_tail() {
        let bits = FixedBitSet::from_words(vec![u64::MAX, u64::MAX], 70).unwrap();
        assert_eq!(bits.cardinality(), 70);
        assert_eq!(bits.next_set_bit(69), Some(69));
        assert_eq!(bits.next_set_bit(70), None);

        assert!(FixedBitSet::from_words(vec![0], 65).is_err());
    }

    #[test]
    fn test_iter_ascending() {
        let mut bits = FixedBitSet::new(300);
        for i in [299, 0, 128, 5, 64] {
            bits.set(i);
        }
        let got: Vec<usize> = bits.iter().collect();
        assert_eq!(got, vec![0, 5, 64, 128, 299]);
    }

    #[test]
    fn test_boolean_ops() {
        let mut a = FixedBitSet::new(128);
        let mut b = FixedBitSet::new(128);
        a.set_range(0, 80);
        b.set_range(60, 128);

        assert_eq!(a.intersection_count(&b), 20);

        let mut and = a.clone();
        and.and(&b);
        assert_eq!(and.iter().collect::<Vec<_>>(), (60..80).collect::<Vec<_>>());

        let mut or = a.clone();
        or.or(&b);
        assert_eq!(or.cardinality(), 128);

        let mut diff = a.clone();
        diff.and_not(&b);
        assert_eq!(diff.iter().collect::<Vec<_>>(), (0..60).collect::<Vec<_>>());
    }

    #[test]
    #[should_panic]
    fn test_set_out_of_bounds_panics() {
        let mut bits = FixedBitSet::new(10);
        bits.set(10);
    }
}
