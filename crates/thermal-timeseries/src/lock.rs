//! Thermal Time Series Locks
//!
//! Protected time intervals that eviction and clearing must not touch.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use serde::{Deserialize, Serialize};
use thermal_common::Timestamp;

// =============================================================================
// Locked Range
// =============================================================================

/// Half-open protected interval `[from, to)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockedRange {
    pub from: Timestamp,
    pub to: Timestamp,
}

impl LockedRange {
    pub fn new(from: Timestamp, to: Timestamp) -> Self {
        Self { from, to }
    }

    /// Lock covering a single timestamp.
    pub fn single(ts: Timestamp) -> Self {
        Self::new(ts, ts.saturating_add(1))
    }

    pub fn is_empty(&self) -> bool {
        self.from >= self.to
    }

    pub fn contains(&self, ts: Timestamp) -> bool {
        self.from <= ts && ts < self.to
    }

    /// True if `other` lies entirely within this range.
    pub fn includes(&self, other: &LockedRange) -> bool {
        self.from <= other.from && other.to <= self.to
    }

    /// Intersection with the closed range `[from, to]`, as a closed range.
    pub fn overlap_closed(&self, from: Timestamp, to: Timestamp) -> Option<(Timestamp, Timestamp)> {
        if self.is_empty() {
            return None;
        }
        let start = self.from.max(from);
        let end = (self.to - 1).min(to);
        (start <= end).then_some((start, end))
    }
}

// =============================================================================
// Lock Set
// =============================================================================

/// Set of non-overlapping protected intervals.
///
/// `lock` folds overlapping and adjacent ranges into one; `unlock` performs
/// the precise splitting and shrinking.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockSet {
    ranges: Vec<LockedRange>,
}

impl LockSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Protect `[from, to)`, merging it with every lock it overlaps or
    /// touches. Returns false if the range is empty or already covered by an
    /// existing lock.
    pub fn lock(&mut self, from: Timestamp, to: Timestamp) -> bool {
        let mut merged = LockedRange::new(from, to);
        if merged.is_empty() || self.ranges.iter().any(|r| r.includes(&merged)) {
            return false;
        }
        self.ranges.retain(|r| {
            if r.from <= merged.to && merged.from <= r.to {
                merged.from = merged.from.min(r.from);
                merged.to = merged.to.max(r.to);
                false
            } else {
                true
            }
        });
        let at = self.ranges.partition_point(|r| r.from < merged.from);
        self.ranges.insert(at, merged);
        true
    }

    /// Release `[from, to)`.
    ///
    /// Locks fully inside the range are dropped, locks containing it are
    /// split in two and partially overlapping locks are shrunk. Unlocking a
    /// range nothing protects is a no-op. Returns true if any lock changed.
    pub fn unlock(&mut self, from: Timestamp, to: Timestamp) -> bool {
        if from >= to {
            return false;
        }
        let mut changed = false;
        let mut result = Vec::with_capacity(self.ranges.len() + 1);

        for range in self.ranges.drain(..) {
            if to <= range.from || from >= range.to {
                result.push(range);
                continue;
            }
            changed = true;
            if from <= range.from && range.to <= to {
                continue;
            }
            if range.from < from && to < range.to {
                result.push(LockedRange::new(range.from, from));
                result.push(LockedRange::new(to, range.to));
            } else if from <= range.from {
                result.push(LockedRange::new(to, range.to));
            } else {
                result.push(LockedRange::new(range.from, from));
            }
        }

        result.retain(|r| !r.is_empty());
        self.ranges = result;
        changed
    }

    pub fn contains(&self, ts: Timestamp) -> bool {
        self.ranges.iter().any(|r| r.contains(ts))
    }

    /// True if one lock protects every timestamp of the closed range `[from, to]`.
    pub fn covers(&self, from: Timestamp, to: Timestamp) -> bool {
        self.ranges
            .iter()
            .any(|r| r.from <= from && to < r.to)
    }

    /// Closed intersections of every lock with the closed range `[from, to]`.
    pub fn overlaps(&self, from: Timestamp, to: Timestamp) -> Vec<(Timestamp, Timestamp)> {
        self.ranges
            .iter()
            .filter_map(|r| r.overlap_closed(from, to))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LockedRange> {
        self.ranges.iter()
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranges(set: &LockSet) -> Vec<(Timestamp, Timestamp)> {
        let mut r: Vec<_> = set.iter().map(|l| (l.from, l.to)).collect();
        r.sort();
        r
    }

    #[test]
    fn test_lock_skips_contained_ranges() {
        let mut locks = LockSet::new();
        assert!(locks.lock(0, 10));
        assert!(!locks.lock(2, 5));
        assert!(!locks.lock(0, 10));
        assert!(!locks.lock(5, 5));
        assert!(locks.lock(8, 12));
        assert_eq!(locks.len(), 1);
    }

    #[test]
    fn test_lock_merges_overlapping_ranges() {
        let mut locks = LockSet::new();
        locks.lock(0, 10);
        locks.lock(8, 12);
        assert_eq!(ranges(&locks), vec![(0, 12)]);
        assert!(locks.covers(0, 11));

        locks.lock(12, 15);
        assert_eq!(ranges(&locks), vec![(0, 15)]);

        locks.lock(30, 40);
        locks.lock(20, 25);
        assert_eq!(ranges(&locks), vec![(0, 15), (20, 25), (30, 40)]);

        assert!(locks.lock(14, 31));
        assert_eq!(ranges(&locks), vec![(0, 40)]);
    }

    #[test]
    fn test_unlock_splits_inner_range() {
        let mut locks = LockSet::new();
        locks.lock(0, 10);
        assert!(locks.unlock(3, 6));
        assert_eq!(ranges(&locks), vec![(0, 3), (6, 10)]);
        assert!(locks.contains(2));
        assert!(!locks.contains(4));
        assert!(locks.contains(6));
    }

    #[test]
    fn test_unlock_shrinks_and_drops() {
        let mut locks = LockSet::new();
        locks.lock(0, 10);
        locks.lock(20, 30);
        locks.lock(40, 50);

        locks.unlock(5, 25);
        assert_eq!(ranges(&locks), vec![(0, 5), (25, 30), (40, 50)]);

        locks.unlock(35, 60);
        assert_eq!(ranges(&locks), vec![(0, 5), (25, 30)]);

        locks.unlock(0, 5);
        assert_eq!(ranges(&locks), vec![(25, 30)]);
    }

    #[test]
    fn test_unlock_without_match_is_noop() {
        let mut locks = LockSet::new();
        locks.lock(0, 10);
        assert!(!locks.unlock(10, 20));
        assert!(!locks.unlock(10, 20));
        assert_eq!(ranges(&locks), vec![(0, 10)]);
    }

    #[test]
    fn test_overlaps_and_covers() {
        let mut locks = LockSet::new();
        locks.lock(8, 12);

        assert_eq!(locks.overlaps(0, 20), vec![(8, 11)]);
        assert!(locks.overlaps(12, 20).is_empty());
        assert!(locks.covers(9, 11));
        assert!(!locks.covers(9, 12));
    }
}
