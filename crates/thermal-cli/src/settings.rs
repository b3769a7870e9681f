//! Thermal CLI Settings
//!
//! The TOML file consumed by the `thermal` binary: retention and event
//! channel settings for the loaded attributes plus the DOI formula.
//!
//! ```toml
//! [store]
//! max_size = 5000
//!
//! [formula]
//! nsteps = 10
//! step = "day"
//!
//! [[formula.components]]
//! attribute = "load"
//! weight = 1.0
//! input_range = [0, 100]
//! ```
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use serde::{Deserialize, Serialize};
use std::path::Path;
use thermal_common::config::{self, EventConfig, StoreConfig};
use thermal_common::{Result, ThermalError};
use thermal_doi::DoiFormula;

/// Without a `[store]` table loaded attributes keep every sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store: StoreConfig,
    pub events: EventConfig,
    pub formula: DoiFormula,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store: StoreConfig::unbounded(),
            events: EventConfig::default(),
            formula: DoiFormula::default(),
        }
    }
}

impl Settings {
    /// Load and validate settings.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let settings: Settings = config::from_file(path)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.formula.components.is_empty() {
            return Err(ThermalError::Configuration(
                "formula has no components".to_string(),
            ));
        }
        if self.events.channel_capacity == 0 {
            return Err(ThermalError::Configuration(
                "events.channel_capacity must be positive".to_string(),
            ));
        }
        self.formula.validate()
    }
}
