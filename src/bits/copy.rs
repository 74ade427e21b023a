//! Run-based copy of a bit range into a composite bitmap.
//!
//! Used to translate per-segment liveness into the global live doc set:
//! each segment's bits land at the segment's doc base.

use log::trace;

use crate::bits::{Bits, FixedBitSet};
use crate::error::{DocSetError, Result};

/// Copy the bits of `src` in `[src_offset, src_limit)` into `dest` starting
/// at `dest_offset`.
///
/// Only set bits are written; destination bits outside the copied runs are
/// left untouched. The source is scanned backwards, skipping unset runs and
/// emitting every maximal run of set bits as a single
/// [`FixedBitSet::set_range`] call. Returns the number of runs emitted.
pub fn copy_range<B: Bits + ?Sized>(
    src: &B,
    src_offset: usize,
    src_limit: usize,
    dest: &mut FixedBitSet,
    dest_offset: usize,
) -> Result<usize> {
    if src_offset > src_limit {
        return Err(DocSetError::invalid_argument(format!(
            "src_offset {src_offset} is greater than src_limit {src_limit}"
        )));
    }
    if src_limit > src.len() {
        return Err(DocSetError::invalid_argument(format!(
            "src_limit {src_limit} exceeds source length {}",
            src.len()
        )));
    }
    let span = src_limit - src_offset;
    match dest_offset.checked_add(span) {
        Some(dest_end) if dest_end <= dest.len() => {}
        _ => {
            return Err(DocSetError::invalid_argument(format!(
                "destination range starting at {dest_offset} with length {span} exceeds destination length {}",
                dest.len()
            )));
        }
    }

    // dest = src + dest_offset - src_offset, kept non-negative by adding first.
    let translate = |ord: usize| ord + dest_offset - src_offset;

    let mut runs = 0;
    let mut pos = src_limit;
    while pos > src_offset {
        while pos > src_offset && !src.get(pos - 1) {
            pos -= 1;
        }
        if pos == src_offset {
            break;
        }

        let run_end = pos;
        while pos > src_offset && src.get(pos - 1) {
            pos -= 1;
        }
        dest.set_range(translate(pos), translate(run_end));
        runs += 1;
    }

    trace!("copied [{src_offset}, {src_limit}) to offset {dest_offset} in {runs} runs");
    Ok(runs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bit_vec::BitVec;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn pattern_bits(len: usize, pattern: u64) -> FixedBitSet {
        let mut bits = FixedBitSet::new(len);
        for i in 0..len {
            if (pattern >> i) & 1 == 1 {
                bits.set(i);
            }
        }
        bits
    }

    fn assert_shifted(src: &FixedBitSet, dest: &FixedBitSet, offset: usize) {
        for i in 0..dest.len() {
            let expected = i >= offset && i < offset + src.len() && src.get(i - offset);
            assert_eq!(dest.get(i), expected, "bit {i} (offset {offset})");
        }
    }

    #[test]
    fn test_exhaustive_small_patterns() {
        for len in 0..=10usize {
            for pattern in 0..(1u64 << len) {
                let src = pattern_bits(len, pattern);
                for offset in [0, 1, 7, 63, 64, 65, 100] {
                    let mut dest = FixedBitSet::new(offset + len + 3);
                    copy_range(&src, 0, len, &mut dest, offset).unwrap();
                    assert_shifted(&src, &dest, offset);
                }
            }
        }
    }

    #[test]
    fn test_randomized_large_patterns() {
        let mut rng = StdRng::seed_from_u64(0x1815);
        for _ in 0..50 {
            let len = rng.random_range(1..2000);
            let density = rng.random_range(0.0..1.0);
            let mut src = FixedBitSet::new(len);
            for i in 0..len {
                if rng.random_bool(density) {
                    src.set(i);
                }
            }
            let offset = rng.random_range(0..300);
            let mut dest = FixedBitSet::new(offset + len + rng.random_range(0..100));
            let fill = rng.random_range(0.0..1.0);
            for i in 0..dest.len() {
                if rng.random_bool(fill) {
                    dest.set(i);
                }
            }
            let prior = dest.clone();

            copy_range(&src, 0, len, &mut dest, offset).unwrap();
            for i in 0..dest.len() {
                let copied = i >= offset && i < offset + len && src.get(i - offset);
                assert_eq!(dest.get(i), prior.get(i) || copied, "bit {i} (offset {offset})");
            }
        }
    }

    #[test]
    fn test_all_zero_emits_nothing() {
        let src = FixedBitSet::new(200);
        let mut dest = FixedBitSet::new(200);
        assert_eq!(copy_range(&src, 0, 200, &mut dest, 0).unwrap(), 0);
        assert_eq!(dest.cardinality(), 0);
    }

    #[test]
    fn test_all_one_emits_single_run() {
        let mut src = FixedBitSet::new(200);
        src.set_range(0, 200);
        let mut dest = FixedBitSet::new(300);
        assert_eq!(copy_range(&src, 0, 200, &mut dest, 100).unwrap(), 1);
        assert_eq!(dest.iter().collect::<Vec<_>>(), (100..300).collect::<Vec<_>>());
    }

    #[test]
    fn test_alternating_emits_one_run_per_bit() {
        let mut src = FixedBitSet::new(128);
        for i in (0..128).step_by(2) {
            src.set(i);
        }
        let mut dest = FixedBitSet::new(128);
        assert_eq!(copy_range(&src, 0, 128, &mut dest, 0).unwrap(), 64);
        assert_eq!(dest, src);
    }

    #[test]
    fn test_single_bit() {
        let mut src = FixedBitSet::new(64);
        src.set(37);
        let mut dest = FixedBitSet::new(1000);
        assert_eq!(copy_range(&src, 0, 64, &mut dest, 900).unwrap(), 1);
        assert_eq!(dest.iter().collect::<Vec<_>>(), vec![937]);
    }

    #[test]
    fn test_runs_touching_both_boundaries() {
        let mut src = FixedBitSet::new(20);
        src.set_range(0, 3);
        src.set_range(17, 20);
        let mut dest = FixedBitSet::new(20);
        assert_eq!(copy_range(&src, 0, 20, &mut dest, 0).unwrap(), 2);
        assert_eq!(dest, src);
    }

    #[test]
    fn test_partial_source_range() {
        let mut src = FixedBitSet::new(100);
        src.set_range(0, 100);
        let mut dest = FixedBitSet::new(100);
        copy_range(&src, 10, 20, &mut dest, 50).unwrap();
        assert_eq!(dest.iter().collect::<Vec<_>>(), (50..60).collect::<Vec<_>>());
    }

    #[test]
    fn test_untouched_outside_and_unset_inside() {
        let mut src = FixedBitSet::new(10);
        src.set(2);
        src.set(3);

        let mut dest = FixedBitSet::new(30);
        dest.set(5);
        dest.set(25);
        copy_range(&src, 0, 10, &mut dest, 10).unwrap();
        assert_eq!(dest.iter().collect::<Vec<_>>(), vec![5, 12, 13, 25]);
    }

    #[test]
    fn test_bitvec_source() {
        let mut live = BitVec::from_elem(8, true);
        live.set(0, false);
        live.set(7, false);
        let mut dest = FixedBitSet::new(16);
        assert_eq!(copy_range(&live, 0, 8, &mut dest, 8).unwrap(), 1);
        assert_eq!(dest.iter().collect::<Vec<_>>(), (9..15).collect::<Vec<_>>());
    }

    #[test]
    fn test_invalid_arguments() {
        let src = FixedBitSet::new(10);
        let mut dest = FixedBitSet::new(10);

        let err = copy_range(&src, 5, 3, &mut dest, 0).unwrap_err();
        assert!(err.is_invalid_argument());

        let err = copy_range(&src, 0, 11, &mut dest, 0).unwrap_err();
        assert!(err.is_invalid_argument());

        let err = copy_range(&src, 0, 10, &mut dest, 1).unwrap_err();
        assert!(err.is_invalid_argument());

        let err = copy_range(&src, 0, 10, &mut dest, usize::MAX).unwrap_err();
        assert!(err.is_invalid_argument());

        // empty range is fine even at the very end
        assert_eq!(copy_range(&src, 10, 10, &mut dest, 10).unwrap(), 0);
    }
}
