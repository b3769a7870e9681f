//! Thermal Error - Unified Error Types
//!
//! Error handling for all thermal operations. Query-range problems and
//! "not enough data yet" conditions are never errors; they surface as empty
//! results or default scores. Only structurally invalid calls and bad
//! configuration end up here.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use thiserror::Error;

// =============================================================================
// Error Types
// =============================================================================

/// Unified error type for all thermal operations.
#[derive(Error, Debug)]
pub enum ThermalError {
    // Misuse errors
    #[error("series is read-only: {0}")]
    ReadOnlySeries(String),

    #[error("unknown attribute: {0}")]
    UnknownAttribute(String),

    // Validation errors
    #[error("invalid formula: {0}")]
    InvalidFormula(String),

    #[error("invalid stepper: {0}")]
    InvalidStepper(String),

    #[error("invalid range: [{min}, {max}]")]
    InvalidRange { min: f64, max: f64 },

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),

    // Serialization errors
    #[error("serialization error: {0}")]
    Serialization(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Type Aliases
// =============================================================================

/// Result type alias for thermal operations.
pub type Result<T> = std::result::Result<T, ThermalError>;

// =============================================================================
// Error Classification
// =============================================================================

impl ThermalError {
    /// Returns true if the error indicates a programming error in the caller,
    /// such as pushing into a derived series.
    pub fn is_misuse(&self) -> bool {
        matches!(
            self,
            ThermalError::ReadOnlySeries(_) | ThermalError::UnknownAttribute(_)
        )
    }

    /// Returns true if this is a user error (bad configuration or input).
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            ThermalError::InvalidFormula(_)
                | ThermalError::InvalidStepper(_)
                | ThermalError::InvalidRange { .. }
                | ThermalError::Configuration(_)
                | ThermalError::Serialization(_)
        )
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_misuse_classification() {
        let err = ThermalError::ReadOnlySeries("doi".to_string());
        assert!(err.is_misuse());
        assert!(!err.is_user_error());
        assert_eq!(err.to_string(), "series is read-only: doi");
    }

    #[test]
    fn test_user_error_classification() {
        assert!(ThermalError::InvalidFormula("alpha".into()).is_user_error());
        assert!(ThermalError::InvalidRange { min: 1.0, max: 0.0 }.is_user_error());
        assert!(!ThermalError::Io(std::io::Error::other("disk")).is_user_error());
    }
}
