//! Thermal Common - Shared Types and Utilities
//!
//! Foundational types, error handling, and configuration used across the
//! thermal time series and degree-of-interest crates.
//!
//! Key Features:
//! - Unified error type with misuse vs user error classification
//! - Sample value shapes (scalar, histogram, aggregate, category)
//! - Value ranges with normalization helpers
//! - Configuration structures and TOML loading
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

pub mod config;
pub mod error;
pub mod types;

pub use error::{Result, ThermalError};
pub use types::*;
