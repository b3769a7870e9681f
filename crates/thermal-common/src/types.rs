//! Thermal Types - Core Data Types
//!
//! Timestamps, sample value shapes and value ranges shared by the store and
//! the degree-of-interest engine.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{Result, ThermalError};

// =============================================================================
// Timestamp
// =============================================================================

/// Milliseconds since the Unix epoch (UTC). Totally ordered; callers are
/// responsible for rejecting NaN-like sentinels before they reach the store.
pub type Timestamp = i64;

// =============================================================================
// Value
// =============================================================================

/// The shape of a single attribute sample.
///
/// Streams deliver plain numbers, pre-aggregated summaries, categorical
/// labels or category histograms. Consumers that need a single number go
/// through [`Value::to_scalar`]; histogram-style encodings go through
/// [`Value::to_histogram`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// A plain number.
    Scalar(f64),
    /// A categorical label.
    Category(String),
    /// A pre-aggregated summary of several raw measurements.
    Aggregate { mean: f64, min: f64, max: f64 },
    /// Category counts.
    Histogram(BTreeMap<String, f64>),
}

impl Value {
    pub fn aggregate(mean: f64, min: f64, max: f64) -> Self {
        Self::Aggregate { mean, min, max }
    }

    /// Collapse the value to a single number.
    ///
    /// Aggregates use their mean, falling back to min and then max when the
    /// mean is not a number. Categories and histograms only yield a number
    /// when their (dominant) label parses as one.
    pub fn to_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(v) => Some(*v),
            Self::Aggregate { mean, min, max } => [*mean, *min, *max]
                .into_iter()
                .find(|v| !v.is_nan()),
            Self::Category(label) => label.trim().parse().ok(),
            Self::Histogram(_) => self.dominant_key().and_then(|k| k.trim().parse().ok()),
        }
    }

    /// Collapse the value to a single label.
    pub fn to_label(&self) -> Option<String> {
        match self {
            Self::Category(label) => Some(label.clone()),
            Self::Histogram(_) => self.dominant_key().map(str::to_string),
            _ => self.to_scalar().map(|v| v.to_string()),
        }
    }

    /// Histogram-shaped view of the value: numbers become a degenerate
    /// aggregate, labels a single-bin histogram.
    pub fn to_histogram(&self) -> Value {
        match self {
            Self::Scalar(v) => Self::aggregate(*v, *v, *v),
            Self::Category(label) => {
                let mut bins = BTreeMap::new();
                bins.insert(label.clone(), 1.0);
                Self::Histogram(bins)
            }
            other => other.clone(),
        }
    }

    /// The histogram key with the largest count; ties resolve to the last key.
    pub fn dominant_key(&self) -> Option<&str> {
        match self {
            Self::Histogram(bins) => bins
                .iter()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(k, _)| k.as_str()),
            Self::Category(label) => Some(label.as_str()),
            _ => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Self::Scalar(_))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Scalar(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Scalar(v as f64)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Category(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Category(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(v) => write!(f, "{}", v),
            Self::Category(label) => write!(f, "{}", label),
            Self::Aggregate { mean, min, max } => {
                write!(f, "{} [{}, {}]", mean, min, max)
            }
            Self::Histogram(bins) => {
                let parts: Vec<String> = bins.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                write!(f, "{{{}}}", parts.join(","))
            }
        }
    }
}

// =============================================================================
// Value Range
// =============================================================================

/// A closed numeric interval `[min, max]` used for normalization.
///
/// Serialized as a two element array, e.g. `range = [0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub const UNIT: ValueRange = ValueRange { min: 0.0, max: 1.0 };
    pub const SIGNED_UNIT: ValueRange = ValueRange { min: -1.0, max: 1.0 };

    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Reject empty, inverted or non-finite ranges.
    pub fn validate(&self) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() || self.min >= self.max {
            return Err(ThermalError::InvalidRange {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Map `v` into `[0, 1]` relative to this range, optionally clamping.
    pub fn norm(&self, v: f64, clamp: bool) -> f64 {
        let n = (v - self.min) / self.span();
        if clamp {
            Self::UNIT.clamp(n)
        } else {
            n
        }
    }

    /// Scale a normalized value back into this range.
    pub fn unnorm(&self, v: f64) -> f64 {
        v * self.span() + self.min
    }

    pub fn clamp(&self, v: f64) -> f64 {
        v.min(self.max).max(self.min)
    }

    pub fn contains(&self, v: f64) -> bool {
        self.min <= v && v <= self.max
    }

    /// True for ranges symmetric around zero such as `[-1, 1]`.
    pub fn is_mirrored(&self) -> bool {
        self.min == -self.max
    }
}

impl Default for ValueRange {
    fn default() -> Self {
        Self::UNIT
    }
}

impl From<[f64; 2]> for ValueRange {
    fn from(r: [f64; 2]) -> Self {
        Self::new(r[0], r[1])
    }
}

impl From<ValueRange> for [f64; 2] {
    fn from(r: ValueRange) -> Self {
        [r.min, r.max]
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_scalar() {
        assert_eq!(Value::Scalar(2.5).to_scalar(), Some(2.5));
        assert_eq!(Value::aggregate(3.0, 1.0, 5.0).to_scalar(), Some(3.0));
        assert_eq!(Value::aggregate(f64::NAN, 1.0, 5.0).to_scalar(), Some(1.0));
        assert_eq!(Value::from("4").to_scalar(), Some(4.0));
        assert_eq!(Value::from("high").to_scalar(), None);
    }

    #[test]
    fn test_histogram_dominant_key() {
        let mut bins = BTreeMap::new();
        bins.insert("low".to_string(), 2.0);
        bins.insert("high".to_string(), 5.0);
        let hist = Value::Histogram(bins);

        assert_eq!(hist.dominant_key(), Some("high"));
        assert_eq!(hist.to_label(), Some("high".to_string()));
        assert_eq!(hist.to_scalar(), None);
    }

    #[test]
    fn test_to_histogram() {
        assert_eq!(Value::Scalar(2.0).to_histogram(), Value::aggregate(2.0, 2.0, 2.0));

        match Value::from("up").to_histogram() {
            Value::Histogram(bins) => assert_eq!(bins.get("up"), Some(&1.0)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_untagged_deserialization() {
        let values: Vec<Value> =
            serde_json::from_str(r#"[1.5, "idle", {"mean": 2, "min": 1, "max": 3}, {"a": 1}]"#)
                .expect("values should parse");

        assert_eq!(values[0], Value::Scalar(1.5));
        assert_eq!(values[1], Value::from("idle"));
        assert_eq!(values[2], Value::aggregate(2.0, 1.0, 3.0));
        assert!(matches!(values[3], Value::Histogram(_)));
    }

    #[test]
    fn test_value_range() {
        let range = ValueRange::new(-1.0, 1.0);
        assert!(range.is_mirrored());
        assert_eq!(range.norm(0.0, true), 0.5);
        assert_eq!(range.norm(3.0, true), 1.0);
        assert_eq!(range.norm(3.0, false), 2.0);
        assert_eq!(range.unnorm(0.5), 0.0);
        assert_eq!(range.clamp(-4.0), -1.0);
        assert!(range.validate().is_ok());
        assert!(ValueRange::new(1.0, 1.0).validate().is_err());
    }
}
