//! Thermal Time Series Aggregation
//!
//! Binners reduce the samples that fall into one grid bucket to a single
//! value.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thermal_common::Value;

// =============================================================================
// Binner
// =============================================================================

/// Combines the samples of one bucket into one value.
///
/// Only called for buckets holding more than one sample.
pub trait Binner<T> {
    fn bin(&self, samples: &[T]) -> T;
}

impl<T, F> Binner<T> for F
where
    F: Fn(&[T]) -> T,
{
    fn bin(&self, samples: &[T]) -> T {
        self(samples)
    }
}

// =============================================================================
// Aggregate Function
// =============================================================================

/// Aggregation function over scalar samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregateFunction {
    Sum,
    Count,
    Min,
    Max,
    Avg,
    First,
    Last,
    Median,
    StdDev,
    Variance,
}

impl AggregateFunction {
    /// Reduce `values`; `None` when there is nothing to reduce.
    pub fn apply(&self, values: &[f64]) -> Option<f64> {
        let (&first, &last) = (values.first()?, values.last()?);
        let n = values.len() as f64;
        let mean = || values.iter().sum::<f64>() / n;

        let result = match self {
            Self::Sum => values.iter().sum(),
            Self::Count => n,
            Self::Min => values.iter().fold(first, |acc, v| acc.min(*v)),
            Self::Max => values.iter().fold(first, |acc, v| acc.max(*v)),
            Self::Avg => mean(),
            Self::First => first,
            Self::Last => last,
            Self::Median => median(values),
            Self::Variance => variance(values, mean()),
            Self::StdDev => variance(values, mean()).sqrt(),
        };
        Some(result)
    }
}

fn median(values: &[f64]) -> f64 {
    let mut ordered = values.to_vec();
    ordered.sort_by(f64::total_cmp);
    let upper = ordered.len() / 2;
    match ordered.len() % 2 {
        0 => (ordered[upper - 1] + ordered[upper]) * 0.5,
        _ => ordered[upper],
    }
}

/// Population variance around `mean`.
fn variance(values: &[f64], mean: f64) -> f64 {
    let squares = values.iter().fold(0.0, |acc, v| acc + (v - mean) * (v - mean));
    squares / values.len() as f64
}

impl Binner<f64> for AggregateFunction {
    fn bin(&self, samples: &[f64]) -> f64 {
        self.apply(samples).unwrap_or(f64::NAN)
    }
}

// =============================================================================
// Value Binner
// =============================================================================

/// Binner over [`Value`] samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueBinner {
    /// Collapse every sample to a number and aggregate.
    Scalar(AggregateFunction),
    /// Summarize numbers as `{mean, min, max}`, merging nested aggregates.
    Summary,
    /// Merge category counts into one histogram.
    Histogram,
}

impl Binner<Value> for ValueBinner {
    fn bin(&self, samples: &[Value]) -> Value {
        match self {
            Self::Scalar(function) => {
                let scalars: Vec<f64> = samples.iter().filter_map(Value::to_scalar).collect();
                Value::Scalar(function.bin(&scalars))
            }
            Self::Summary => summarize(samples),
            Self::Histogram => merge_histograms(samples),
        }
    }
}

fn summarize(samples: &[Value]) -> Value {
    let mut sum = 0.0;
    let mut count = 0usize;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for sample in samples {
        let (mean, lo, hi) = match sample {
            Value::Aggregate { mean, min, max } => (*mean, *min, *max),
            other => match other.to_scalar() {
                Some(v) => (v, v, v),
                None => continue,
            },
        };
        sum += mean;
        count += 1;
        min = min.min(lo);
        max = max.max(hi);
    }

    if count == 0 {
        return Value::aggregate(f64::NAN, f64::NAN, f64::NAN);
    }
    Value::aggregate(sum / count as f64, min, max)
}

fn merge_histograms(samples: &[Value]) -> Value {
    let mut bins: BTreeMap<String, f64> = BTreeMap::new();
    for sample in samples {
        match sample.to_histogram() {
            Value::Histogram(counts) => {
                for (key, count) in counts {
                    *bins.entry(key).or_insert(0.0) += count;
                }
            }
            other => {
                if let Some(label) = other.to_label() {
                    *bins.entry(label).or_insert(0.0) += 1.0;
                }
            }
        }
    }
    Value::Histogram(bins)
}
