//! Thermal DOI Component
//!
//! One weighted term of a DOI formula.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use serde::{Deserialize, Serialize};
use thermal_common::{Result, ThermalError, ValueRange};

/// Maps one attribute's value into its weighted share of the output range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoiComponent {
    #[serde(alias = "attr")]
    pub attribute: String,
    pub weight: f64,
    /// Expected range of the raw attribute value.
    #[serde(default = "default_input_range", alias = "range")]
    pub input_range: ValueRange,
    #[serde(default)]
    pub invert: bool,
}

fn default_input_range() -> ValueRange {
    ValueRange::SIGNED_UNIT
}

impl DoiComponent {
    pub fn new(attribute: impl Into<String>, weight: f64) -> Self {
        Self {
            attribute: attribute.into(),
            weight,
            input_range: default_input_range(),
            invert: false,
        }
    }

    pub fn with_input_range(mut self, min: f64, max: f64) -> Self {
        self.input_range = ValueRange::new(min, max);
        self
    }

    pub fn inverted(mut self) -> Self {
        self.invert = true;
        self
    }

    /// `unnorm(clamp(norm(v, input)), output) * weight`, negated when inverted.
    pub fn f(&self, v: f64, output: &ValueRange) -> f64 {
        let scaled = output.unnorm(self.input_range.norm(v, true)) * self.weight;
        if self.invert {
            -scaled
        } else {
            scaled
        }
    }

    /// Weight as a percentage.
    pub fn percentage(&self) -> f64 {
        self.weight * 100.0
    }

    pub fn set_percentage(&mut self, percentage: f64) {
        self.weight = percentage / 100.0;
    }

    pub fn validate(&self) -> Result<()> {
        if self.attribute.is_empty() {
            return Err(ThermalError::InvalidFormula(
                "component without attribute name".to_string(),
            ));
        }
        if !self.weight.is_finite() {
            return Err(ThermalError::InvalidFormula(format!(
                "weight of '{}' is not finite",
                self.attribute
            )));
        }
        self.input_range.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_f_normalizes_and_weights() {
        let c = DoiComponent::new("cpu", 0.5).with_input_range(0.0, 100.0);
        let unit = ValueRange::UNIT;

        assert_eq!(c.f(50.0, &unit), 0.25);
        assert_eq!(c.f(250.0, &unit), 0.5);
        assert_eq!(c.f(-10.0, &unit), 0.0);
        assert_eq!(c.clone().inverted().f(100.0, &unit), -0.5);
    }

    #[test]
    fn test_default_input_range_is_signed() {
        let c = DoiComponent::new("delta", 1.0);
        assert_eq!(c.f(0.0, &ValueRange::UNIT), 0.5);
        assert_eq!(c.f(1.0, &ValueRange::new(-1.0, 1.0)), 1.0);
    }

    #[test]
    fn test_percentage() {
        let mut c = DoiComponent::new("cpu", 0.25);
        assert_eq!(c.percentage(), 25.0);
        c.set_percentage(40.0);
        assert!((c.weight - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_validate() {
        assert!(DoiComponent::new("cpu", 1.0).validate().is_ok());
        assert!(DoiComponent::new("", 1.0).validate().is_err());
        assert!(DoiComponent::new("cpu", f64::NAN).validate().is_err());
        assert!(DoiComponent::new("cpu", 1.0)
            .with_input_range(1.0, 0.0)
            .validate()
            .is_err());
    }
}
