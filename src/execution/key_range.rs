//! # Key Ranges, Partitions and Blocks
//!
//! All ranges are half-open `[min, max)` over the integer key domain. The coordinator
//! cuts the sorted key set into one contiguous [`KeyRange`] per worker
//! ([`partition_keys`]); each worker then walks its partition left to right in blocks of
//! at most `block_size` keys ([`KeyRange::blocks`]).
//!
//! ```text
//! keys:        1 ........................................ 1000
//! partitions:  [1, 251)   [251, 501)   [501, 751)   [751, 1001)
//! blocks:      [1,101) [101,201) [201,251)  ...
//! ```

use crate::error::{RangeflowError, Result};
use serde::{Deserialize, Serialize};

/// A half-open interval `[min, max)` of keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyRange {
    min: i64,
    max: i64,
}

impl KeyRange {
    /// Create a range, rejecting `min > max`
    pub fn new(min: i64, max: i64) -> Result<Self> {
        if min > max {
            return Err(RangeflowError::InvalidKeyRange(format!(
                "lower bound {min} is greater than upper bound {max}"
            )));
        }
        Ok(Self { min, max })
    }

    /// Inclusive lower bound
    pub fn min(&self) -> i64 {
        self.min
    }

    /// Exclusive upper bound
    pub fn max(&self) -> i64 {
        self.max
    }

    /// Number of key values covered by the range
    pub fn span(&self) -> u64 {
        self.max.abs_diff(self.min)
    }

    pub fn is_empty(&self) -> bool {
        self.min == self.max
    }

    pub fn contains(&self, key: i64) -> bool {
        key >= self.min && key < self.max
    }

    /// Iterate commit blocks of at most `block_size` keys, left to right
    ///
    /// The final block absorbs the remainder, so the blocks cover the range exactly.
    pub fn blocks(&self, block_size: i64) -> Result<BlockIter> {
        if block_size < 1 {
            return Err(RangeflowError::ValidationError(format!(
                "block size must be at least 1, got {block_size}"
            )));
        }
        Ok(BlockIter {
            next: self.min,
            end: self.max,
            block_size,
        })
    }

    /// Number of blocks [`KeyRange::blocks`] yields for this range
    pub fn block_count(&self, block_size: i64) -> u64 {
        if block_size < 1 {
            return 0;
        }
        self.span().div_ceil(block_size as u64)
    }
}

impl std::fmt::Display for KeyRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {})", self.min, self.max)
    }
}

/// Iterator over the fixed-size blocks of a [`KeyRange`]
#[derive(Debug, Clone)]
pub struct BlockIter {
    next: i64,
    end: i64,
    block_size: i64,
}

impl Iterator for BlockIter {
    type Item = KeyRange;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.end {
            return None;
        }
        let left = self.next;
        let right = left
            .checked_add(self.block_size)
            .map_or(self.end, |r| r.min(self.end));
        self.next = right;
        Some(KeyRange {
            min: left,
            max: right,
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = if self.next >= self.end {
            0
        } else {
            self.end.abs_diff(self.next).div_ceil(self.block_size as u64) as usize
        };
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for BlockIter {}

/// Sort ascending and drop duplicate keys
pub fn prepare_keys(mut keys: Vec<i64>) -> Vec<i64> {
    keys.sort_unstable();
    keys.dedup();
    keys
}

/// Number of commit blocks the workers will run across all partitions
///
/// Blocks are cut over key spans, so gaps in the keys and extra partitions both add
/// blocks. For dense keys on one partition this is `ceil(key_count / block_size)`.
pub fn total_block_count(partitions: &[KeyRange], block_size: i64) -> u64 {
    partitions
        .iter()
        .map(|partition| partition.block_count(block_size))
        .sum()
}

/// Cut a sorted, de-duplicated key set into contiguous per-worker partitions
///
/// Cut points are taken every `key_count / parallelism` keys. The last partition ends
/// at `last_key + 1`, so together the partitions cover `[first_key, last_key + 1)`
/// with no gaps or overlaps. Fewer partitions than `parallelism` are produced when
/// there are fewer keys than workers.
pub fn partition_keys(sorted_keys: &[i64], parallelism: usize) -> Result<Vec<KeyRange>> {
    let (first, last) = match (sorted_keys.first(), sorted_keys.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Err(RangeflowError::EmptyKeySet),
    };

    if sorted_keys.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(RangeflowError::InvalidKeyRange(
            "keys must be sorted ascending without duplicates".to_string(),
        ));
    }

    let upper = last.checked_add(1).ok_or_else(|| {
        RangeflowError::InvalidKeyRange(format!(
            "last key {last} leaves no room for an upper bound"
        ))
    })?;

    let key_count = sorted_keys.len();
    let workers = parallelism.max(1).min(key_count);
    let stride = key_count / workers;

    let mut cut_points: Vec<i64> = (0..workers).map(|i| sorted_keys[i * stride]).collect();
    cut_points.push(upper);
    debug_assert_eq!(cut_points[0], first);

    cut_points
        .windows(2)
        .map(|pair| KeyRange::new(pair[0], pair[1]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_blocks(range: KeyRange, size: i64) -> Vec<(i64, i64)> {
        range
            .blocks(size)
            .unwrap()
            .map(|b| (b.min(), b.max()))
            .collect()
    }

    #[test]
    fn test_key_range_rejects_inverted_bounds() {
        assert!(matches!(
            KeyRange::new(10, 5),
            Err(RangeflowError::InvalidKeyRange(_))
        ));
        assert!(KeyRange::new(5, 5).unwrap().is_empty());
    }

    #[test]
    fn test_blocks_absorb_remainder() {
        let range = KeyRange::new(1, 251).unwrap();
        assert_eq!(
            collect_blocks(range, 100),
            vec![(1, 101), (101, 201), (201, 251)]
        );
        assert_eq!(range.block_count(100), 3);
        assert_eq!(range.blocks(100).unwrap().len(), 3);
    }

    #[test]
    fn test_span_smaller_than_block_is_single_block() {
        let range = KeyRange::new(40, 60).unwrap();
        assert_eq!(collect_blocks(range, 100), vec![(40, 60)]);
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_block() {
        let range = KeyRange::new(0, 300).unwrap();
        assert_eq!(
            collect_blocks(range, 100),
            vec![(0, 100), (100, 200), (200, 300)]
        );
    }

    #[test]
    fn test_empty_range_yields_no_blocks() {
        let range = KeyRange::new(7, 7).unwrap();
        assert!(collect_blocks(range, 100).is_empty());
    }

    #[test]
    fn test_block_iteration_near_i64_max() {
        let range = KeyRange::new(i64::MAX - 5, i64::MAX).unwrap();
        assert_eq!(
            collect_blocks(range, 4),
            vec![(i64::MAX - 5, i64::MAX - 1), (i64::MAX - 1, i64::MAX)]
        );
    }

    #[test]
    fn test_zero_block_size_rejected() {
        let range = KeyRange::new(0, 10).unwrap();
        assert!(range.blocks(0).is_err());
        assert_eq!(range.block_count(0), 0);
    }

    #[test]
    fn test_partition_four_workers_over_thousand_keys() {
        let keys: Vec<i64> = (1..=1000).collect();
        let partitions = partition_keys(&keys, 4).unwrap();
        let bounds: Vec<(i64, i64)> = partitions.iter().map(|p| (p.min(), p.max())).collect();
        assert_eq!(bounds, vec![(1, 251), (251, 501), (501, 751), (751, 1001)]);
    }

    #[test]
    fn test_partition_remainder_goes_to_last_worker() {
        let keys: Vec<i64> = (0..10).collect();
        let partitions = partition_keys(&keys, 4).unwrap();
        assert_eq!(partitions.len(), 4);
        assert_eq!(partitions.last().unwrap().min(), 6);
        assert_eq!(partitions.last().unwrap().max(), 10);
    }

    #[test]
    fn test_partition_with_gaps_covers_full_span() {
        let keys = vec![3, 4, 90, 91, 500, 1000];
        let partitions = partition_keys(&keys, 3).unwrap();
        assert_eq!(partitions.first().unwrap().min(), 3);
        assert_eq!(partitions.last().unwrap().max(), 1001);
        for pair in partitions.windows(2) {
            assert_eq!(pair[0].max(), pair[1].min());
        }
    }

    #[test]
    fn test_single_key_produces_single_partition() {
        let partitions = partition_keys(&[42], 8).unwrap();
        assert_eq!(partitions, vec![KeyRange::new(42, 43).unwrap()]);
    }

    #[test]
    fn test_more_workers_than_keys() {
        let partitions = partition_keys(&[1, 2, 3], 16).unwrap();
        assert_eq!(partitions.len(), 3);
    }

    #[test]
    fn test_empty_and_unsorted_inputs_rejected() {
        assert_eq!(partition_keys(&[], 4), Err(RangeflowError::EmptyKeySet));
        assert!(matches!(
            partition_keys(&[5, 3, 9], 2),
            Err(RangeflowError::InvalidKeyRange(_))
        ));
        assert!(matches!(
            partition_keys(&[i64::MAX], 1),
            Err(RangeflowError::InvalidKeyRange(_))
        ));
    }

    #[test]
    fn test_prepare_keys_sorts_and_dedups() {
        assert_eq!(prepare_keys(vec![5, 1, 5, 3, 1]), vec![1, 3, 5]);
    }

    #[test]
    fn test_total_block_count() {
        let dense: Vec<i64> = (1..=250).collect();
        assert_eq!(total_block_count(&partition_keys(&dense, 1).unwrap(), 100), 3);
        assert_eq!(total_block_count(&[], 100), 0);
    }

    #[test]
    fn test_total_block_count_counts_every_partition_block() {
        // Four partitions of 250 keys each run three blocks apiece
        let keys: Vec<i64> = (1..=1000).collect();
        let partitions = partition_keys(&keys, 4).unwrap();
        assert_eq!(total_block_count(&partitions, 100), 12);

        // Two keys far apart still need one block per 100 keys of span
        let partitions = partition_keys(&[1, 1_000_000], 1).unwrap();
        assert_eq!(total_block_count(&partitions, 100), 10_000);
    }

    #[test]
    fn test_display() {
        assert_eq!(KeyRange::new(1, 101).unwrap().to_string(), "[1, 101)");
    }
}
