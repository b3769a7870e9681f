//! Thermal Time Series Types
//!
//! Sample and bucket types shared by the store and its queries.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use serde::{Deserialize, Serialize};
use std::ops::Range;
use thermal_common::Timestamp;

// =============================================================================
// Sample
// =============================================================================

/// A value stamped with its timestamp and validity span.
///
/// `duration` counts the grid steps the sample stays valid for; `0` marks an
/// instantaneous measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample<T> {
    pub ts: Timestamp,
    pub value: T,
    #[serde(default)]
    pub duration: i64,
}

impl<T> Sample<T> {
    pub fn new(ts: Timestamp, value: T) -> Self {
        Self {
            ts,
            value,
            duration: 0,
        }
    }

    pub fn with_duration(mut self, duration: i64) -> Self {
        self.duration = duration;
        self
    }
}

/// A borrowed view of a stored sample together with its position.
#[derive(Debug, PartialEq)]
pub struct IndexedSample<'a, T> {
    pub index: usize,
    pub ts: Timestamp,
    pub value: &'a T,
    pub duration: i64,
}

impl<T> Clone for IndexedSample<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for IndexedSample<'_, T> {}

impl<T: Clone> IndexedSample<'_, T> {
    pub fn to_sample(&self) -> Sample<T> {
        Sample {
            ts: self.ts,
            value: self.value.clone(),
            duration: self.duration,
        }
    }
}

// =============================================================================
// Bucket
// =============================================================================

/// The run of stored samples assigned to one grid point.
///
/// `range` is `None` for grid points outside the stored data; otherwise it
/// holds the half-open index range of the samples in the bucket, which may be
/// empty while still marking the position in the series.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub ts: Timestamp,
    pub range: Option<Range<usize>>,
}

impl Bucket {
    pub fn new(ts: Timestamp, range: Range<usize>) -> Self {
        Self {
            ts,
            range: Some(range),
        }
    }

    pub fn invalid(ts: Timestamp) -> Self {
        Self { ts, range: None }
    }

    /// True if at least one sample falls into the bucket.
    pub fn is_valid(&self) -> bool {
        self.len() > 0
    }

    pub fn len(&self) -> usize {
        self.range.as_ref().map_or(0, |r| r.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn start(&self) -> Option<usize> {
        self.range.as_ref().map(|r| r.start)
    }

    pub fn end(&self) -> Option<usize> {
        self.range.as_ref().map(|r| r.end)
    }
}
