//! Thermal Time Series Index
//!
//! Lazily built membership index over the stored timestamps.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use std::cell::OnceCell;
use std::collections::HashSet;
use thermal_common::Timestamp;

// =============================================================================
// Timestamp Index
// =============================================================================

/// Hash index answering "is there a sample at exactly `ts`" in O(1).
///
/// The set is built on first lookup. Appends keep a built set current;
/// removals call [`TimestampIndex::invalidate`] and the next lookup rebuilds.
#[derive(Debug, Clone, Default)]
pub struct TimestampIndex {
    set: OnceCell<HashSet<Timestamp>>,
}

impl TimestampIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, timestamps: &[Timestamp], ts: Timestamp) -> bool {
        self.set
            .get_or_init(|| timestamps.iter().copied().collect())
            .contains(&ts)
    }

    /// Record an inserted timestamp if the set has already been built.
    pub fn insert(&mut self, ts: Timestamp) {
        if let Some(set) = self.set.get_mut() {
            set.insert(ts);
        }
    }

    pub fn invalidate(&mut self) {
        self.set.take();
    }

    pub fn is_built(&self) -> bool {
        self.set.get().is_some()
    }
}
