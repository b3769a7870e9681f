//! Thermal Time Series Query
//!
//! Grid resampling over a [`TimeSeries`]. Every query first assigns each grid
//! point its bucket of stored samples in one forward pass, then derives
//! values, counts or sample lists from the buckets.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::aggregation::Binner;
use crate::series::TimeSeries;
use crate::stepper::Stepper;
use crate::types::{Bucket, Sample};
use thermal_common::Timestamp;

impl<T> TimeSeries<T> {
    /// True if no stored sample can contribute to `[from, to]`.
    ///
    /// With carry-forward any sample before `to` counts; without it the
    /// series must also reach the bucket preceding `from`.
    pub fn are_no_values_there(
        &self,
        from: Timestamp,
        to: Timestamp,
        step: &Stepper,
        feed_forward: bool,
    ) -> bool {
        let (first, last) = match (self.min_timestamp(), self.max_timestamp()) {
            (Some(first), Some(last)) => (first, last),
            _ => return true,
        };
        if feed_forward {
            to < first
        } else {
            to < first || last < step.prev(from)
        }
    }

    /// Assign every grid point in `[from, to]` its bucket of samples.
    ///
    /// A bucket holds the samples with `prev(point) < ts <= point`. The first
    /// bucket after a leading gap also absorbs every older sample.
    pub fn select(
        &self,
        from: Timestamp,
        to: Timestamp,
        step: &Stepper,
        feed_forward: bool,
    ) -> Vec<Bucket> {
        let mut grid = step.grid(from, to).peekable();
        if self.are_no_values_there(from, to, step, feed_forward) {
            return grid.map(Bucket::invalid).collect();
        }

        let ts = &self.timestamps;
        let n = ts.len();
        let mut buckets = Vec::new();

        let mut i = match self.floor_index(step.prev(from)) {
            Some(start) => start + 1,
            None => {
                while let Some(act) = grid.next_if(|act| *act < ts[0]) {
                    buckets.push(Bucket::invalid(act));
                }
                0
            }
        };

        for act in grid {
            if i == n {
                buckets.push(Bucket::invalid(act));
                continue;
            }
            let mut end = i;
            while end < n && ts[end] <= act {
                end += 1;
            }
            buckets.push(Bucket::new(act, i..end));
            i = end;
        }
        buckets
    }

    /// Raw sample counts per grid point.
    ///
    /// With `artificial_start` unset, a valid first bucket reports every
    /// sample up to the first grid point.
    pub fn frequencies(
        &self,
        from: Timestamp,
        to: Timestamp,
        step: &Stepper,
        artificial_start: bool,
    ) -> Vec<usize> {
        self.select(from, to, step, false)
            .iter()
            .enumerate()
            .map(|(index, bucket)| bucket_count(index, bucket, artificial_start))
            .collect()
    }

    /// Non-zero bucket counts as samples spanning one nominal step.
    pub fn frequency_list(
        &self,
        from: Timestamp,
        to: Timestamp,
        step: &Stepper,
        artificial_start: bool,
    ) -> Vec<Sample<usize>> {
        if self.is_empty() {
            return Vec::new();
        }
        self.select(from, to, step, false)
            .iter()
            .enumerate()
            .map(|(index, bucket)| (bucket.ts, bucket_count(index, bucket, artificial_start)))
            .filter(|(_, count)| *count > 0)
            .map(|(ts, count)| Sample::new(ts, count).with_duration(step.ref_step_width()))
            .collect()
    }

    /// Fraction of `[from, to]` covered by loaded data, measured up to the
    /// last sample at or before `to`.
    pub fn percentages_loaded(&self, from: Timestamp, to: Timestamp) -> f64 {
        match self.floor(to) {
            Some(last) if last.ts >= from => {
                if to == from {
                    1.0
                } else {
                    (last.ts as f64 - from as f64) / (to as f64 - from as f64)
                }
            }
            _ => 0.0,
        }
    }
}

fn bucket_count(index: usize, bucket: &Bucket, artificial_start: bool) -> usize {
    match bucket.end() {
        Some(end) if bucket.is_valid() && index == 0 && !artificial_start => end,
        _ => bucket.len(),
    }
}

impl<T: Clone> TimeSeries<T> {
    fn bin(&self, bucket: &Bucket, binner: Option<&dyn Binner<T>>) -> Option<T> {
        let range = bucket.range.clone().filter(|r| !r.is_empty())?;
        match binner {
            Some(binner) if range.len() > 1 => Some(binner.bin(&self.values[range])),
            _ => self.values.get(range.end - 1).cloned(),
        }
    }

    /// Resolve each bucket to its value, carrying the previous value forward
    /// across empty buckets when requested.
    fn resolve_buckets(
        &self,
        from: Timestamp,
        buckets: &[Bucket],
        binner: Option<&dyn Binner<T>>,
        feed_forward: bool,
    ) -> Vec<Option<T>> {
        let mut prev: Option<T> = None;
        let mut out = Vec::with_capacity(buckets.len());

        for (index, bucket) in buckets.iter().enumerate() {
            if bucket.is_valid() {
                prev = self.bin(bucket, binner);
                out.push(prev.clone());
            } else if feed_forward {
                if index == 0 {
                    match bucket.start() {
                        Some(start) if start > 0 => prev = self.values.get(start - 1).cloned(),
                        _ if self.max_timestamp().is_some_and(|last| from > last) => {
                            prev = self.values.last().cloned();
                        }
                        _ => {}
                    }
                }
                out.push(prev.clone());
            } else {
                out.push(None);
            }
        }
        out
    }

    /// Resample onto the grid `from, step(from), ... <= to`.
    ///
    /// Buckets with several samples are combined through `binner`, or
    /// represented by their newest sample without one. Empty buckets carry
    /// the last known value forward when `feed_forward` is set and are
    /// `None` otherwise.
    pub fn values(
        &self,
        from: Timestamp,
        to: Timestamp,
        step: &Stepper,
        binner: Option<&dyn Binner<T>>,
        feed_forward: bool,
    ) -> Vec<Option<T>> {
        if self.are_no_values_there(from, to, step, feed_forward) {
            return step.grid(from, to).map(|_| None).collect();
        }
        let buckets = self.select(from, to, step, feed_forward);
        self.resolve_buckets(from, &buckets, binner, feed_forward)
    }

    /// [`TimeSeries::values`] with `invalid` substituted for missing points.
    pub fn values_or(
        &self,
        from: Timestamp,
        to: Timestamp,
        step: &Stepper,
        binner: Option<&dyn Binner<T>>,
        feed_forward: bool,
        invalid: T,
    ) -> Vec<T> {
        self.values(from, to, step, binner, feed_forward)
            .into_iter()
            .map(|v| v.unwrap_or_else(|| invalid.clone()))
            .collect()
    }

    /// Resampled values as samples spanning one nominal step, keeping only
    /// resolved values accepted by `filter`.
    pub fn value_list<F>(
        &self,
        from: Timestamp,
        to: Timestamp,
        step: &Stepper,
        binner: Option<&dyn Binner<T>>,
        feed_forward: bool,
        filter: F,
    ) -> Vec<Sample<T>>
    where
        F: Fn(&T) -> bool,
    {
        if self.is_empty() {
            return Vec::new();
        }
        let buckets = self.select(from, to, step, feed_forward);
        let width = step.ref_step_width();

        buckets
            .iter()
            .zip(self.resolve_buckets(from, &buckets, binner, feed_forward))
            .filter_map(|(bucket, value)| {
                value
                    .filter(|v| filter(v))
                    .map(|v| Sample::new(bucket.ts, v).with_duration(width))
            })
            .collect()
    }
}
