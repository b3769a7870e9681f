//! Thermal Time Series Store
//!
//! Ordered, mutable sample container for a single attribute. Samples are kept
//! sorted by timestamp in parallel arrays; insertion scans from the newest
//! end since streaming data almost always lands there.
//!
//! Key Features:
//! - Insert or replace by timestamp with retention-based eviction
//! - O(log n) floor/ceiling lookups
//! - Range clearing that preserves locked intervals
//! - O(1) exact membership through a lazily built index
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::index::TimestampIndex;
use crate::lock::LockSet;
use crate::retention::RetentionPolicy;
use crate::types::{IndexedSample, Sample};
use std::ops::Range;
use thermal_common::config::StoreConfig;
use thermal_common::Timestamp;
use tracing::debug;

// =============================================================================
// Time Series
// =============================================================================

/// Time sorted samples with unique timestamps.
#[derive(Debug, Clone)]
pub struct TimeSeries<T> {
    pub(crate) timestamps: Vec<Timestamp>,
    pub(crate) values: Vec<T>,
    pub(crate) durations: Vec<i64>,
    locks: LockSet,
    retention: RetentionPolicy,
    index: TimestampIndex,
    read_only: bool,
}

impl<T> Default for TimeSeries<T> {
    fn default() -> Self {
        Self::new(RetentionPolicy::default())
    }
}

impl<T> TimeSeries<T> {
    pub fn new(retention: RetentionPolicy) -> Self {
        Self {
            timestamps: Vec::new(),
            values: Vec::new(),
            durations: Vec::new(),
            locks: LockSet::new(),
            retention,
            index: TimestampIndex::new(),
            read_only: false,
        }
    }

    pub fn with_config(config: &StoreConfig) -> Self {
        Self::new(RetentionPolicy::from(config))
    }

    /// A series that never evicts.
    pub fn unbounded() -> Self {
        Self::new(RetentionPolicy::unbounded())
    }

    // -------------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    pub fn min_timestamp(&self) -> Option<Timestamp> {
        self.timestamps.first().copied()
    }

    pub fn max_timestamp(&self) -> Option<Timestamp> {
        self.timestamps.last().copied()
    }

    pub fn get(&self, index: usize) -> Option<IndexedSample<'_, T>> {
        Some(IndexedSample {
            index,
            ts: *self.timestamps.get(index)?,
            value: self.values.get(index)?,
            duration: *self.durations.get(index)?,
        })
    }

    pub fn last(&self) -> Option<IndexedSample<'_, T>> {
        self.get(self.len().checked_sub(1)?)
    }

    pub fn timestamps(&self) -> &[Timestamp] {
        &self.timestamps
    }

    pub fn iter(&self) -> impl Iterator<Item = IndexedSample<'_, T>> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    pub fn locks(&self) -> &LockSet {
        &self.locks
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    // -------------------------------------------------------------------------
    // Mutation
    // -------------------------------------------------------------------------

    /// Insert a sample in timestamp order.
    ///
    /// An existing sample at `ts` is overwritten when `replace` is set and
    /// left untouched otherwise. Returns false if nothing changed, including
    /// every push into a read-only series.
    pub fn push(&mut self, ts: Timestamp, value: T, duration: i64, replace: bool) -> bool {
        if self.read_only {
            return false;
        }

        let mut at = 0;
        for i in (0..self.timestamps.len()).rev() {
            let current = self.timestamps[i];
            if current == ts {
                if !replace {
                    return false;
                }
                self.values[i] = value;
                self.durations[i] = duration;
                return true;
            }
            if current < ts {
                at = i + 1;
                break;
            }
        }

        self.timestamps.insert(at, ts);
        self.values.insert(at, value);
        self.durations.insert(at, duration);
        self.index.insert(ts);

        self.remove_old_entries();
        true
    }

    pub fn add(&mut self, sample: Sample<T>) -> bool {
        self.push(sample.ts, sample.value, sample.duration, true)
    }

    pub fn set_retention(&mut self, retention: RetentionPolicy) {
        self.retention = retention;
        self.remove_old_entries();
    }

    pub fn set_max_size(&mut self, max_size: Option<usize>) {
        self.retention.max_size = max_size;
        self.remove_old_entries();
    }

    pub fn set_minimum_time_range(&mut self, minimum_time_range: Option<i64>) {
        self.retention.minimum_time_range = minimum_time_range;
        self.remove_old_entries();
    }

    fn remove_old_entries(&mut self) {
        let (first, last) = match (self.min_timestamp(), self.max_timestamp()) {
            (Some(first), Some(last)) => (first, last),
            _ => return,
        };
        if let Some(cutoff) = self.retention.eviction_cutoff(self.len(), first, last) {
            let removed = self.clear(Timestamp::MIN, cutoff);
            if removed > 0 {
                debug!(cutoff, removed, remaining = self.len(), "evicted old samples");
            }
        }
    }

    /// Remove every sample in `[from, to]` that no lock protects. Returns the
    /// number of removed samples.
    pub fn clear(&mut self, from: Timestamp, to: Timestamp) -> usize {
        if self.read_only || from > to {
            return 0;
        }
        let (first, last) = match (self.min_timestamp(), self.max_timestamp()) {
            (Some(first), Some(last)) => (first, last),
            _ => return 0,
        };
        if last < from || to < first {
            return 0;
        }

        if from == Timestamp::MIN && to == Timestamp::MAX && self.locks.is_empty() {
            let removed = self.len();
            self.timestamps.clear();
            self.values.clear();
            self.durations.clear();
            self.index.invalidate();
            return removed;
        }

        let (from_i, to_i) = match (self.ceiling_index(from), self.floor_index(to)) {
            (Some(from_i), Some(to_i)) if from_i <= to_i => (from_i, to_i),
            _ => return 0,
        };

        let overlaps = self.locks.overlaps(from, to);
        let removed = match overlaps.as_slice() {
            [] => self.remove_range(from_i..to_i + 1),
            _ if self.locks.covers(from, to) => 0,
            [(lock_from, lock_to)] => {
                let lo = self
                    .timestamps
                    .partition_point(|t| t < lock_from)
                    .clamp(from_i, to_i + 1);
                let hi = self
                    .timestamps
                    .partition_point(|t| t <= lock_to)
                    .clamp(lo, to_i + 1);
                self.remove_range(hi..to_i + 1) + self.remove_range(from_i..lo)
            }
            _ => self.remove_unlocked(from_i, to_i),
        };

        if removed > 0 {
            self.index.invalidate();
        }
        removed
    }

    fn remove_range(&mut self, range: Range<usize>) -> usize {
        if range.is_empty() {
            return 0;
        }
        let removed = range.len();
        self.timestamps.drain(range.clone());
        self.values.drain(range.clone());
        self.durations.drain(range);
        removed
    }

    /// Compact `[from_i, to_i]` down to its locked samples.
    fn remove_unlocked(&mut self, from_i: usize, to_i: usize) -> usize {
        let mut write = from_i;
        for read in from_i..=to_i {
            if self.locks.contains(self.timestamps[read]) {
                self.timestamps.swap(write, read);
                self.values.swap(write, read);
                self.durations.swap(write, read);
                write += 1;
            }
        }
        self.remove_range(write..to_i + 1)
    }

    /// Protect `[from, to)` from eviction and clearing.
    pub fn lock(&mut self, from: Timestamp, to: Timestamp) -> bool {
        self.locks.lock(from, to)
    }

    /// Release `[from, to)`; releasing an unprotected range is a no-op.
    pub fn unlock(&mut self, from: Timestamp, to: Timestamp) -> bool {
        self.locks.unlock(from, to)
    }

    // -------------------------------------------------------------------------
    // Lookup
    // -------------------------------------------------------------------------

    pub(crate) fn floor_index(&self, ts: Timestamp) -> Option<usize> {
        self.timestamps
            .partition_point(|t| *t <= ts)
            .checked_sub(1)
    }

    pub(crate) fn ceiling_index(&self, ts: Timestamp) -> Option<usize> {
        let i = self.timestamps.partition_point(|t| *t < ts);
        (i < self.len()).then_some(i)
    }

    /// The sample with the greatest timestamp `<= ts`.
    pub fn floor(&self, ts: Timestamp) -> Option<IndexedSample<'_, T>> {
        self.get(self.floor_index(ts)?)
    }

    /// The sample with the smallest timestamp `>= ts`.
    pub fn ceiling(&self, ts: Timestamp) -> Option<IndexedSample<'_, T>> {
        self.get(self.ceiling_index(ts)?)
    }

    fn raw_range(&self, from: Timestamp, to: Timestamp) -> Range<usize> {
        if from > to {
            return 0..0;
        }
        match (self.ceiling_index(from), self.floor_index(to)) {
            (Some(start), Some(end)) if start <= end => start..end + 1,
            _ => 0..0,
        }
    }

    /// Samples within `[from, to]`.
    pub fn raw_values(&self, from: Timestamp, to: Timestamp) -> Vec<IndexedSample<'_, T>> {
        self.raw_range(from, to).filter_map(|i| self.get(i)).collect()
    }

    pub fn num_raw_values(&self, from: Timestamp, to: Timestamp) -> usize {
        self.raw_range(from, to).len()
    }

    /// Exact membership test.
    pub fn has(&self, ts: Timestamp) -> bool {
        self.index.contains(&self.timestamps, ts)
    }

    /// Explicitly drop the membership index; the next [`TimeSeries::has`]
    /// rebuilds it.
    pub fn invalidate_index(&mut self) {
        self.index.invalidate();
    }
}

impl<T: Clone> TimeSeries<T> {
    /// Read-only copy of the samples at positions `[start, end)`.
    pub fn slice(&self, start: usize, end: usize) -> TimeSeries<T> {
        let end = end.min(self.len());
        let start = start.min(end);
        TimeSeries {
            timestamps: self.timestamps[start..end].to_vec(),
            values: self.values[start..end].to_vec(),
            durations: self.durations[start..end].to_vec(),
            locks: LockSet::new(),
            retention: RetentionPolicy::unbounded(),
            index: TimestampIndex::new(),
            read_only: true,
        }
    }
}

impl<T> FromIterator<Sample<T>> for TimeSeries<T> {
    /// Collect into an unbounded series.
    fn from_iter<I: IntoIterator<Item = Sample<T>>>(iter: I) -> Self {
        let mut series = Self::unbounded();
        for sample in iter {
            series.add(sample);
        }
        series
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(points: &[(Timestamp, &'static str)]) -> TimeSeries<&'static str> {
        points.iter().map(|(ts, v)| Sample::new(*ts, *v)).collect()
    }

    fn stamps<T>(series: &TimeSeries<T>) -> Vec<Timestamp> {
        series.timestamps().to_vec()
    }

    #[test]
    fn test_push_keeps_order() {
        let s = series(&[(20, "c"), (0, "a"), (10, "b"), (15, "x"), (-5, "z")]);
        assert_eq!(stamps(&s), vec![-5, 0, 10, 15, 20]);
        assert_eq!(s.min_timestamp(), Some(-5));
        assert_eq!(s.max_timestamp(), Some(20));
    }

    #[test]
    fn test_push_replace() {
        let mut s = series(&[(0, "a"), (10, "b")]);
        assert!(s.push(10, "B", 2, true));
        assert_eq!(s.len(), 2);
        assert_eq!(*s.get(1).unwrap().value, "B");
        assert_eq!(s.get(1).unwrap().duration, 2);

        assert!(!s.push(10, "other", 0, false));
        assert_eq!(*s.get(1).unwrap().value, "B");
    }

    #[test]
    fn test_floor_ceiling() {
        let s = series(&[(0, "a"), (10, "b"), (20, "c")]);

        assert_eq!(s.floor(-1), None);
        assert_eq!(s.floor(0).unwrap().ts, 0);
        assert_eq!(s.floor(15).unwrap().ts, 10);
        assert_eq!(s.floor(100).unwrap().ts, 20);

        assert_eq!(s.ceiling(-1).unwrap().ts, 0);
        assert_eq!(s.ceiling(15).unwrap().ts, 20);
        assert_eq!(s.ceiling(20).unwrap().index, 2);
        assert_eq!(s.ceiling(21), None);
    }

    #[test]
    fn test_raw_values() {
        let s = series(&[(0, "a"), (10, "b"), (20, "c")]);

        let raw: Vec<_> = s.raw_values(5, 20).iter().map(|v| *v.value).collect();
        assert_eq!(raw, vec!["b", "c"]);
        assert_eq!(s.num_raw_values(Timestamp::MIN, Timestamp::MAX), 3);
        assert_eq!(s.num_raw_values(11, 19), 0);
        assert_eq!(s.num_raw_values(20, 0), 0);
        assert!(s.raw_values(30, 40).is_empty());
    }

    #[test]
    fn test_clear_without_locks() {
        let mut s = series(&[(0, "a"), (10, "b"), (20, "c"), (30, "d")]);
        assert_eq!(s.clear(5, 20), 2);
        assert_eq!(stamps(&s), vec![0, 30]);

        assert_eq!(s.clear(Timestamp::MIN, Timestamp::MAX), 2);
        assert!(s.is_empty());
    }

    #[test]
    fn test_clear_keeps_locked_samples() {
        let mut s = series(&[(0, "a"), (10, "b"), (20, "c")]);
        s.lock(8, 12);
        assert_eq!(s.clear(0, 20), 2);
        assert_eq!(stamps(&s), vec![10]);
    }

    #[test]
    fn test_clear_inside_lock_is_noop() {
        let mut s = series(&[(0, "a"), (10, "b"), (20, "c")]);
        s.lock(0, 100);
        assert_eq!(s.clear(0, 20), 0);
        assert_eq!(s.len(), 3);

        s.unlock(0, 100);
        assert_eq!(s.clear(0, 20), 3);
    }

    #[test]
    fn test_clear_with_multiple_locks() {
        let mut s: TimeSeries<i64> = (0..10).map(|i| Sample::new(i * 10, i)).collect();
        s.lock(10, 11);
        s.lock(40, 60);
        s.lock(85, 95);

        assert_eq!(s.clear(0, 90), 6);
        assert_eq!(stamps(&s), vec![10, 40, 50, 90]);
        let values: Vec<i64> = s.iter().map(|v| *v.value).collect();
        assert_eq!(values, vec![1, 4, 5, 9]);
    }

    #[test]
    fn test_clear_full_range_with_lock() {
        let mut s = series(&[(0, "a"), (10, "b"), (20, "c")]);
        s.lock(20, 21);
        assert_eq!(s.clear(Timestamp::MIN, Timestamp::MAX), 2);
        assert_eq!(stamps(&s), vec![20]);
    }

    #[test]
    fn test_eviction_respects_window_and_locks() {
        let mut s = TimeSeries::new(RetentionPolicy::new(3, 15));
        s.lock(10, 11);
        for ts in (0..=50).step_by(10) {
            s.push(ts, ts, 0, true);
        }
        // 10 is locked; everything older than 50 - 15 is evictable
        assert_eq!(stamps(&s), vec![10, 40, 50]);
    }

    #[test]
    fn test_eviction_disabled() {
        let mut s = TimeSeries::unbounded();
        for ts in 0..10_000 {
            s.push(ts, (), 0, true);
        }
        assert_eq!(s.len(), 10_000);
    }

    #[test]
    fn test_shrinking_max_size_evicts() {
        let mut s = TimeSeries::unbounded();
        for ts in 0..10 {
            s.push(ts * 100, ts, 0, true);
        }
        s.set_minimum_time_range(Some(250));
        assert_eq!(s.len(), 10);
        s.set_max_size(Some(5));
        assert_eq!(stamps(&s), vec![700, 800, 900]);
    }

    #[test]
    fn test_has_tracks_mutation() {
        let mut s = series(&[(0, "a"), (10, "b")]);
        assert!(s.has(10));
        assert!(!s.has(5));

        s.push(5, "x", 0, true);
        assert!(s.has(5));

        s.clear(0, 5);
        assert!(!s.has(5));
        assert!(!s.has(0));
        assert!(s.has(10));
    }

    #[test]
    fn test_slice_is_read_only() {
        let s = series(&[(0, "a"), (10, "b"), (20, "c")]);
        let mut sliced = s.slice(1, 10);

        assert!(sliced.is_read_only());
        assert_eq!(stamps(&sliced), vec![10, 20]);
        assert!(!sliced.push(30, "d", 0, true));
        assert_eq!(sliced.clear(Timestamp::MIN, Timestamp::MAX), 0);
        assert_eq!(sliced.len(), 2);
    }
}
