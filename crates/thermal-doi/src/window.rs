//! Thermal DOI Windows
//!
//! Score deltas over a selection window and score trajectories for
//! rendering. The delta flavour follows the formula's [`DeltaMethod`].
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::engine::{valid_fraction, DoiEngine};
use crate::formula::DeltaMethod;
use serde::{Deserialize, Serialize};
use thermal_common::Timestamp;
use thermal_timeseries::{AttributeLookup, Stepper};

// =============================================================================
// Selection
// =============================================================================

/// A point in time with a look-back and look-ahead span in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub point: Timestamp,
    pub past: i64,
    #[serde(default)]
    pub future: i64,
    /// Sub-windows the caller splits the past span into.
    #[serde(default = "default_steps")]
    pub steps: u32,
}

fn default_steps() -> u32 {
    1
}

impl Selection {
    pub fn new(point: Timestamp, past: i64, future: i64) -> Self {
        Self {
            point,
            past,
            future,
            steps: default_steps(),
        }
    }

    pub fn with_steps(mut self, steps: u32) -> Self {
        self.steps = steps;
        self
    }

    pub fn start(&self) -> Timestamp {
        self.point.saturating_sub(self.past)
    }

    pub fn end(&self) -> Timestamp {
        self.point.saturating_add(self.future)
    }
}

/// Score at the selection point and its change over the window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DoiWindow {
    pub doi_t: f64,
    pub delta_t: f64,
    pub doi_prev: f64,
}

/// One point of a score trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeltaDoi {
    pub doi: f64,
    pub delta: f64,
    pub ts: Timestamp,
}

impl DeltaDoi {
    pub fn new(doi: f64, delta: f64, ts: Timestamp) -> Self {
        Self { doi, delta, ts }
    }
}

// =============================================================================
// Window Computation
// =============================================================================

impl DoiEngine {
    /// Newest computed score at or before the selection point.
    pub fn score_at(&mut self, lookup: &impl AttributeLookup, selection: &Selection) -> f64 {
        self.floor(lookup, selection.point)
            .map(|v| v.s)
            .unwrap_or(self.formula().default_value)
    }

    /// Mean raw sample count of the dynamic components within the selection,
    /// relative to the count expected over its past span.
    pub fn valid_data_fraction(&self, lookup: &impl AttributeLookup, selection: &Selection) -> f64 {
        match self.slots(lookup) {
            Some(slots) => valid_fraction(
                &slots,
                selection.start(),
                selection.end(),
                selection.past,
                &self.formula().step,
            ),
            None => 0.0,
        }
    }

    /// Score at the selection point and its delta. Falls back to the formula
    /// default with zero delta when the selection is too sparsely loaded.
    pub fn window(&mut self, lookup: &impl AttributeLookup, selection: &Selection) -> DoiWindow {
        let default = self.formula().default_value;
        let fallback = DoiWindow {
            doi_t: default,
            delta_t: 0.0,
            doi_prev: default,
        };

        let threshold = self.formula().loading_percentage;
        if threshold > 0.0 && self.valid_data_fraction(lookup, selection) < threshold {
            return fallback;
        }

        let formula_step = self.formula().step;
        let (from, step) = match self.formula().delta_method {
            DeltaMethod::Global | DeltaMethod::LocalWindow if selection.past > 0 => {
                (selection.start(), Stepper::fixed(selection.past))
            }
            DeltaMethod::Global | DeltaMethod::LocalWindow => (selection.point, formula_step),
            DeltaMethod::Local => (formula_step.step(selection.point, -1), formula_step),
        };

        let data: Vec<f64> = self
            .values(lookup, from, selection.point, &step, true)
            .into_iter()
            .map(|v| v.unwrap_or(default))
            .collect();
        let (doi_prev, doi_t) = match data.as_slice() {
            [.., prev, last] => (*prev, *last),
            [only] => (*only, *only),
            [] => return fallback,
        };

        let delta_t = match self.formula().delta_method {
            DeltaMethod::Local => self.formula().compute_delta(doi_t, doi_prev, 0.0, 0.0),
            _ => self
                .formula()
                .compute_delta(doi_t, doi_prev, doi_prev, doi_prev),
        };
        DoiWindow {
            doi_t,
            delta_t,
            doi_prev,
        }
    }

    /// Score and delta on every formula grid point of `[start, point]`.
    pub fn trajectory(&mut self, lookup: &impl AttributeLookup, selection: &Selection) -> Vec<DeltaDoi> {
        let default = self.formula().default_value;
        let step = self.formula().step;
        let start = selection.start();

        match self.formula().delta_method {
            DeltaMethod::Global | DeltaMethod::Local => {
                let (stamps, data) = self.grid_values(lookup, start, selection.point, &step, default);
                let first = match data.first() {
                    Some(first) => *first,
                    None => return Vec::new(),
                };
                let mut trajectory = vec![DeltaDoi::new(first, 0.0, start)];
                for i in 1..data.len() {
                    let delta = self.formula().compute_delta(data[i], data[i - 1], first, 0.0);
                    trajectory.push(DeltaDoi::new(data[i], delta, stamps[i]));
                }
                trajectory
            }
            DeltaMethod::LocalWindow => {
                let offset = (selection.past as f64 / step.ref_step_width() as f64).round();
                let offset = offset.max(0.0) as usize;
                let from = start.saturating_sub(selection.past);
                let (stamps, data) =
                    self.grid_values(lookup, from, selection.point, &step, default);
                (offset..data.len())
                    .map(|i| {
                        let delta = self.formula().compute_delta(data[i], 0.0, 0.0, data[i - offset]);
                        DeltaDoi::new(data[i], delta, stamps[i])
                    })
                    .collect()
            }
        }
    }

    fn grid_values(
        &mut self,
        lookup: &impl AttributeLookup,
        from: Timestamp,
        to: Timestamp,
        step: &Stepper,
        default: f64,
    ) -> (Vec<Timestamp>, Vec<f64>) {
        let stamps: Vec<Timestamp> = step.grid(from, to).collect();
        let data = self
            .values(lookup, from, to, step, true)
            .into_iter()
            .map(|v| v.unwrap_or(default))
            .collect();
        (stamps, data)
    }
}
