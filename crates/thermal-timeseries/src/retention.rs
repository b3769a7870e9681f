//! Thermal Time Series Retention
//!
//! Size-bounded retention for in-memory series. Once a series exceeds its
//! maximum sample count, samples older than the protected trailing window are
//! evicted from the oldest end.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use serde::{Deserialize, Serialize};
use thermal_common::config::StoreConfig;
use thermal_common::Timestamp;

// =============================================================================
// Retention Policy
// =============================================================================

/// Retention limits of a single series. Either limit set to `None` disables
/// eviction entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub max_size: Option<usize>,
    pub minimum_time_range: Option<i64>,
}

impl RetentionPolicy {
    pub fn new(max_size: usize, minimum_time_range: i64) -> Self {
        Self {
            max_size: Some(max_size),
            minimum_time_range: Some(minimum_time_range),
        }
    }

    /// Never evict.
    pub fn unbounded() -> Self {
        Self {
            max_size: None,
            minimum_time_range: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.max_size.is_some() && self.minimum_time_range.is_some()
    }

    /// The newest timestamp that may be evicted, if eviction is due.
    ///
    /// Returns `None` while the series is within its size bound or when the
    /// oldest sample is already inside the protected trailing window.
    pub fn eviction_cutoff(
        &self,
        len: usize,
        first: Timestamp,
        last: Timestamp,
    ) -> Option<Timestamp> {
        let (max_size, range) = (self.max_size?, self.minimum_time_range?);
        if len <= max_size {
            return None;
        }
        let keep_from = last.saturating_sub(range);
        (first <= keep_from).then_some(keep_from)
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self::from(&StoreConfig::default())
    }
}

impl From<&StoreConfig> for RetentionPolicy {
    fn from(config: &StoreConfig) -> Self {
        Self {
            max_size: config.max_size,
            minimum_time_range: config.minimum_time_range,
        }
    }
}
