//! Thermal Config - Configuration Structures
//!
//! Configuration types for the sample store and attribute change channels.
//! Supports loading from TOML files and programmatic construction, with
//! defaults suitable for an interactive dashboard.
//!
//! Key Features:
//! - Retention configuration (maximum sample count, protected trailing window)
//! - Change notification channel sizing
//! - Generic TOML loading for any deserializable configuration
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::error::{Result, ThermalError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

// =============================================================================
// Store Configuration
// =============================================================================

/// Retention settings applied to newly created series.
///
/// Eviction is disabled when either limit is `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub max_size: Option<usize>,
    /// Trailing window in milliseconds that eviction never cuts into.
    pub minimum_time_range: Option<i64>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_size: Some(3000),
            minimum_time_range: Some(100_000),
        }
    }
}

impl StoreConfig {
    /// Keep everything.
    pub fn unbounded() -> Self {
        Self {
            max_size: None,
            minimum_time_range: None,
        }
    }
}

// =============================================================================
// Event Configuration
// =============================================================================

/// Sizing of the per-attribute change channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventConfig {
    pub channel_capacity: usize,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1024,
        }
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Load any configuration structure from a TOML file.
pub fn from_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let content = std::fs::read_to_string(path)?;
    from_str(&content)
}

/// Parse any configuration structure from TOML text.
pub fn from_str<T: DeserializeOwned>(content: &str) -> Result<T> {
    toml::from_str(content).map_err(|e| ThermalError::Configuration(e.to_string()))
}
