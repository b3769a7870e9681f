//! Thermal DOI Formula
//!
//! Pure configuration and evaluation of a degree-of-interest formula: the
//! weighted components, double exponential smoothing, forecasting and the
//! window arithmetic used by the engine.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::component::DoiComponent;
use serde::{Deserialize, Serialize};
use thermal_common::{Result, ThermalError, Timestamp, ValueRange};
use thermal_timeseries::Stepper;

// =============================================================================
// DOI Value
// =============================================================================

/// Smoothed score `s` and trend `b` at `ts`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DoiValue {
    pub s: f64,
    pub b: f64,
    pub ts: Timestamp,
}

impl DoiValue {
    pub fn new(s: f64, b: f64, ts: Timestamp) -> Self {
        Self { s, b, ts }
    }
}

// =============================================================================
// Delta Method
// =============================================================================

/// How score changes are measured by window and trajectory consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeltaMethod {
    /// Against the previous grid step.
    Local,
    /// Against the start of the look-back window.
    Global,
    /// Against the value one selection window earlier.
    #[default]
    LocalWindow,
}

// =============================================================================
// DOI Formula
// =============================================================================

/// A degree-of-interest formula.
///
/// Deserializes from TOML with every field optional:
///
/// ```toml
/// alpha = 0.3
/// nsteps = 20
/// step = "day"
///
/// [[components]]
/// attribute = "cpu"
/// weight = 0.5
/// input_range = [0, 100]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoiFormula {
    pub components: Vec<DoiComponent>,
    /// Level smoothing factor in `(0, 1]`.
    pub alpha: f64,
    /// Trend smoothing factor in `(0, 1]`.
    pub beta: f64,
    /// Look-back window in grid steps.
    pub nsteps: i64,
    /// Score reported when the formula cannot be evaluated.
    #[serde(rename = "default")]
    pub default_value: f64,
    /// Output range every score is clamped to.
    pub range: ValueRange,
    pub step: Stepper,
    /// Grid steps a sample may lag behind and still count as present.
    pub fuzzy_days: i64,
    pub delta_method: DeltaMethod,
    /// Minimum fraction of expected samples before windows are computed.
    pub loading_percentage: f64,
}

impl Default for DoiFormula {
    fn default() -> Self {
        Self {
            components: Vec::new(),
            alpha: 0.3,
            beta: 0.3,
            nsteps: 20,
            default_value: 0.0,
            range: ValueRange::UNIT,
            step: Stepper::fixed(1),
            fuzzy_days: 5,
            delta_method: DeltaMethod::LocalWindow,
            loading_percentage: 0.3,
        }
    }
}

impl DoiFormula {
    pub fn new(components: Vec<DoiComponent>) -> Self {
        Self {
            components,
            ..Default::default()
        }
    }

    pub fn with_smoothing(mut self, alpha: f64, beta: f64) -> Self {
        self.alpha = alpha;
        self.beta = beta;
        self
    }

    pub fn with_window(mut self, nsteps: i64, step: Stepper) -> Self {
        self.nsteps = nsteps;
        self.step = step;
        self
    }

    pub fn with_fuzzy_days(mut self, fuzzy_days: i64) -> Self {
        self.fuzzy_days = fuzzy_days;
        self
    }

    pub fn with_range(mut self, range: ValueRange) -> Self {
        self.range = range;
        self
    }

    pub fn with_default(mut self, default_value: f64) -> Self {
        self.default_value = default_value;
        self
    }

    pub fn with_delta_method(mut self, delta_method: DeltaMethod) -> Self {
        self.delta_method = delta_method;
        self
    }

    pub fn with_loading_percentage(mut self, loading_percentage: f64) -> Self {
        self.loading_percentage = loading_percentage;
        self
    }

    /// Check parameter domains.
    pub fn validate(&self) -> Result<()> {
        for (name, v) in [("alpha", self.alpha), ("beta", self.beta)] {
            if !(v > 0.0 && v <= 1.0) {
                return Err(ThermalError::InvalidFormula(format!(
                    "{} must be in (0, 1], got {}",
                    name, v
                )));
            }
        }
        if self.nsteps < 0 {
            return Err(ThermalError::InvalidFormula(format!(
                "nsteps must not be negative, got {}",
                self.nsteps
            )));
        }
        if self.fuzzy_days < 0 {
            return Err(ThermalError::InvalidFormula(format!(
                "fuzzy_days must not be negative, got {}",
                self.fuzzy_days
            )));
        }
        if !(0.0..=1.0).contains(&self.loading_percentage) {
            return Err(ThermalError::InvalidFormula(format!(
                "loading_percentage must be in [0, 1], got {}",
                self.loading_percentage
            )));
        }
        self.range.validate()?;
        self.step.validate()?;
        self.components.iter().try_for_each(DoiComponent::validate)
    }

    /// Attribute names in component order.
    pub fn attributes(&self) -> Vec<&str> {
        self.components.iter().map(|c| c.attribute.as_str()).collect()
    }

    pub fn is_mirrored(&self) -> bool {
        self.range.is_mirrored()
    }

    /// Scale a normalized value back into the output range.
    pub fn unnorm(&self, v: f64) -> f64 {
        if self.range == ValueRange::UNIT {
            v
        } else {
            self.range.unnorm(v)
        }
    }

    /// Normalize a score into `[0, 1]`.
    pub fn normalize(&self, v: f64) -> f64 {
        self.range.norm(v, true)
    }

    // -------------------------------------------------------------------------
    // Evaluation
    // -------------------------------------------------------------------------

    /// Raw score of one grid point: the clamped sum of every component's
    /// contribution, matched to `values` by position. Missing values
    /// contribute nothing.
    pub fn eval_x(&self, values: &[Option<f64>]) -> f64 {
        let sum: f64 = self
            .components
            .iter()
            .zip(values)
            .filter_map(|(c, v)| v.map(|v| c.f(v, &self.range)))
            .sum();
        self.range.clamp(sum)
    }

    /// One step of double exponential smoothing.
    pub fn eval(&self, prev: &DoiValue, x: f64, ts: Timestamp) -> DoiValue {
        let s = self.alpha * x + (1.0 - self.alpha) * (prev.s + prev.b);
        let b = self.beta * (s - prev.s) + (1.0 - self.beta) * prev.b;
        DoiValue::new(self.range.clamp(s), b, ts)
    }

    /// Seed value with no trend.
    pub fn start(&self, x: f64, ts: Timestamp) -> DoiValue {
        DoiValue::new(x, 0.0, ts)
    }

    /// Project `prev` to `ts` along its trend, clamped to the output range.
    pub fn forecast(&self, prev: &DoiValue, ts: Timestamp) -> f64 {
        let steps = (ts - prev.ts) as f64 / self.step.ref_step_width() as f64;
        self.range.clamp(prev.s + prev.b * steps)
    }

    // -------------------------------------------------------------------------
    // Windows
    // -------------------------------------------------------------------------

    pub fn window_start(&self, ts: Timestamp) -> Timestamp {
        self.step.step(ts, -self.nsteps)
    }

    pub fn window_end(&self, ts: Timestamp) -> Timestamp {
        self.step.step(ts, self.nsteps)
    }

    pub fn fuzzy_step_window(&self, ts: Timestamp) -> Timestamp {
        self.step.step(ts, self.nsteps + self.fuzzy_days)
    }

    /// Oldest timestamp a sample may have and still count as present at `ts`.
    pub fn fuzzy_start(&self, ts: Timestamp) -> Timestamp {
        self.step.step(ts, -self.fuzzy_days)
    }

    /// Score change according to the configured delta method.
    pub fn compute_delta(&self, doi_t: f64, doi_tm1: f64, doi_start: f64, doi_tmw: f64) -> f64 {
        match self.delta_method {
            DeltaMethod::Global => doi_t - doi_start,
            DeltaMethod::LocalWindow => doi_t - doi_tmw,
            DeltaMethod::Local => doi_t - doi_tm1,
        }
    }

    /// Earliest timestamp that must be loaded to score a selection starting
    /// at `from`.
    pub fn loading_start(&self, from: Timestamp, selection_window: i64) -> Timestamp {
        let base = self.step.step(from, -(self.nsteps + self.fuzzy_days));
        match self.delta_method {
            DeltaMethod::LocalWindow => base.saturating_sub(selection_window),
            _ => base,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use thermal_timeseries::CalendarUnit;

    fn two_components() -> DoiFormula {
        DoiFormula::new(vec![
            DoiComponent::new("a", 0.5).with_input_range(0.0, 1.0),
            DoiComponent::new("b", 0.5).with_input_range(0.0, 1.0),
        ])
    }

    #[test]
    fn test_defaults() {
        let f = DoiFormula::default();
        assert_eq!(f.alpha, 0.3);
        assert_eq!(f.beta, 0.3);
        assert_eq!(f.nsteps, 20);
        assert_eq!(f.fuzzy_days, 5);
        assert_eq!(f.delta_method, DeltaMethod::LocalWindow);
        assert_eq!(f.loading_percentage, 0.3);
        assert!(f.validate().is_ok());
    }

    #[test]
    fn test_eval_x_clamps_sum() {
        let f = two_components();
        assert_eq!(f.eval_x(&[Some(1.0), Some(1.0)]), 1.0);
        assert_eq!(f.eval_x(&[Some(0.5), None]), 0.25);

        let boosted = DoiFormula::new(vec![
            DoiComponent::new("a", 1.0).with_input_range(0.0, 1.0),
            DoiComponent::new("b", 1.0).with_input_range(0.0, 1.0),
        ]);
        assert_eq!(boosted.eval_x(&[Some(1.0), Some(1.0)]), 1.0);
    }

    #[test]
    fn test_eval_recurrence() {
        let f = two_components();
        let s0 = f.start(0.0, 0);
        let s1 = f.eval(&s0, 1.0, 1);

        assert!((s1.s - 0.3).abs() < 1e-12);
        assert!((s1.b - 0.09).abs() < 1e-12);
        assert_eq!(s1.ts, 1);
    }

    #[test]
    fn test_eval_clamps_level_not_trend() {
        let f = two_components();
        let prev = DoiValue::new(0.9, 0.5, 0);
        let next = f.eval(&prev, 1.0, 1);

        assert_eq!(next.s, 1.0);
        // the trend uses the unclamped level 1.28
        assert!((next.b - (0.3 * (1.28 - 0.9) + 0.7 * 0.5)).abs() < 1e-12);
    }

    #[test]
    fn test_forecast_is_clamped() {
        let f = two_components().with_window(3, Stepper::fixed(10));
        let prev = DoiValue::new(0.5, 0.1, 100);

        assert!((f.forecast(&prev, 120) - 0.7).abs() < 1e-12);
        assert_eq!(f.forecast(&prev, 10_000), 1.0);
        assert_eq!(f.forecast(&DoiValue::new(0.5, -50.0, 0), 10), 0.0);
    }

    #[test]
    fn test_windows() {
        let f = DoiFormula::default().with_window(3, Stepper::fixed(10)).with_fuzzy_days(2);

        assert_eq!(f.window_start(100), 70);
        assert_eq!(f.window_end(100), 130);
        assert_eq!(f.fuzzy_step_window(100), 150);
        assert_eq!(f.fuzzy_start(100), 80);
        assert_eq!(f.loading_start(100, 40), 50 - 40);
        assert_eq!(
            f.clone().with_delta_method(DeltaMethod::Global).loading_start(100, 40),
            50
        );
    }

    #[test]
    fn test_loading_start_saturates() {
        let f = DoiFormula::default().with_window(3, Stepper::fixed(10));
        assert_eq!(f.loading_start(Timestamp::MIN + 5, 40), Timestamp::MIN);
        assert_eq!(f.loading_start(0, i64::MAX), Timestamp::MIN);
    }

    #[test]
    fn test_compute_delta() {
        let f = DoiFormula::default();
        assert_eq!(f.compute_delta(0.8, 0.7, 0.2, 0.5), 0.8 - 0.5);
        let global = f.clone().with_delta_method(DeltaMethod::Global);
        assert_eq!(global.compute_delta(0.8, 0.7, 0.2, 0.5), 0.8 - 0.2);
        let local = f.with_delta_method(DeltaMethod::Local);
        assert_eq!(local.compute_delta(0.8, 0.7, 0.2, 0.5), 0.8 - 0.7);
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        assert!(DoiFormula::default().with_smoothing(0.0, 0.3).validate().is_err());
        assert!(DoiFormula::default().with_smoothing(0.3, 1.5).validate().is_err());
        assert!(DoiFormula::default()
            .with_window(-1, Stepper::fixed(1))
            .validate()
            .is_err());
        assert!(DoiFormula::default()
            .with_window(5, Stepper::fixed(0))
            .validate()
            .is_err());
        assert!(DoiFormula::default()
            .with_range(ValueRange::new(1.0, -1.0))
            .validate()
            .is_err());
        assert!(DoiFormula::default().with_smoothing(1.0, 1.0).validate().is_ok());
    }

    #[test]
    fn test_normalization_helpers() {
        let mirrored = DoiFormula::default().with_range(ValueRange::new(-1.0, 1.0));
        assert!(mirrored.is_mirrored());
        assert_eq!(mirrored.unnorm(0.75), 0.5);
        assert_eq!(mirrored.normalize(0.0), 0.5);
        assert_eq!(DoiFormula::default().unnorm(0.75), 0.75);
    }

    #[test]
    fn test_deserialize_from_toml() {
        let f: DoiFormula = toml::from_str(
            r#"
            alpha = 0.5
            nsteps = 7
            step = "month"
            default = 0.1
            range = [-1, 1]
            delta_method = "global"

            [[components]]
            attr = "cpu"
            weight = 0.75
            range = [0, 100]

            [[components]]
            attribute = "errors"
            weight = 0.25
            invert = true
            "#,
        )
        .unwrap();

        assert_eq!(f.alpha, 0.5);
        assert_eq!(f.beta, 0.3);
        assert_eq!(f.nsteps, 7);
        assert_eq!(f.step, Stepper::calendar(CalendarUnit::Month));
        assert_eq!(f.default_value, 0.1);
        assert_eq!(f.range, ValueRange::new(-1.0, 1.0));
        assert_eq!(f.delta_method, DeltaMethod::Global);
        assert_eq!(f.attributes(), vec!["cpu", "errors"]);
        assert_eq!(f.components[0].input_range, ValueRange::new(0.0, 100.0));
        assert_eq!(f.components[1].input_range, ValueRange::SIGNED_UNIT);
        assert!(f.components[1].invert);
        assert!(f.validate().is_ok());
    }
}
