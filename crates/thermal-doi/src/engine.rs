//! Thermal DOI Engine
//!
//! Binds a formula to one entity's attributes and maintains a cache of
//! computed scores. A query either hits the cache, extends the newest cached
//! score forward one grid step at a time, or bootstraps a score from a full
//! look-back window. Queries past the last computable point are forecast
//! along the trend.
//!
//! The engine never holds on to the entity; every call takes the attribute
//! lookup explicitly. Subscriptions to the component attributes are taken
//! at construction and drained before each read, so the cache is cleared
//! forward from the earliest changed timestamp.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::formula::{DoiFormula, DoiValue};
use crate::values::DoiValues;
use thermal_common::config::StoreConfig;
use thermal_common::{Result, ThermalError, Timestamp};
use thermal_timeseries::{
    AttributeLookup, AttributeSlot, Invalidation, Sample, Stepper, Subscription, TimeSeries,
};
use tracing::{debug, trace, warn};

// =============================================================================
// Resolve Options
// =============================================================================

/// Caller intent for a single score lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Report `None` instead of the formula default when no score exists.
    pub null_when_unavailable: bool,
    /// Project the newest computable score to the requested timestamp.
    pub forecast: bool,
}

impl ResolveOptions {
    /// Neither defaults nor forecasts; only computed scores.
    pub fn strict() -> Self {
        Self {
            null_when_unavailable: true,
            forecast: false,
        }
    }
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            null_when_unavailable: false,
            forecast: true,
        }
    }
}

// =============================================================================
// DOI Engine
// =============================================================================

/// Incremental DOI scoring for one entity.
#[derive(Debug)]
pub struct DoiEngine {
    formula: DoiFormula,
    cache: TimeSeries<DoiValue>,
    subscriptions: Vec<Subscription>,
}

impl DoiEngine {
    pub fn new(formula: DoiFormula, lookup: &impl AttributeLookup) -> Result<Self> {
        Self::with_config(formula, lookup, &StoreConfig::default())
    }

    pub fn with_config(
        formula: DoiFormula,
        lookup: &impl AttributeLookup,
        store: &StoreConfig,
    ) -> Result<Self> {
        formula.validate()?;
        let subscriptions = subscribe(&formula, lookup)?;
        Ok(Self {
            formula,
            cache: TimeSeries::with_config(store),
            subscriptions,
        })
    }

    pub fn formula(&self) -> &DoiFormula {
        &self.formula
    }

    /// Computed scores so far.
    pub fn cache(&self) -> &TimeSeries<DoiValue> {
        &self.cache
    }

    /// Swap the formula, resubscribe to its attributes and drop the cache.
    pub fn set_formula(&mut self, formula: DoiFormula, lookup: &impl AttributeLookup) -> Result<()> {
        formula.validate()?;
        let subscriptions = subscribe(&formula, lookup)?;
        self.subscriptions = subscriptions;
        self.formula = formula;
        self.invalidate();
        Ok(())
    }

    /// Drop every subscription. The cache is no longer kept in sync.
    pub fn detach(&mut self) {
        self.subscriptions.clear();
    }

    pub fn is_attached(&self) -> bool {
        !self.subscriptions.is_empty()
    }

    /// Drop every cached score.
    pub fn invalidate(&mut self) {
        self.cache.clear(Timestamp::MIN, Timestamp::MAX);
    }

    /// Apply pending attribute changes to the cache.
    pub fn sync(&mut self) {
        let pending = self
            .subscriptions
            .iter_mut()
            .fold(Invalidation::None, |acc, sub| acc.merge(sub.drain()));

        match pending {
            Invalidation::None => {}
            Invalidation::From(ts) => {
                let removed = self.cache.clear(ts, Timestamp::MAX);
                trace!(from = ts, removed, "invalidated cached scores");
            }
            Invalidation::All => {
                warn!("attribute change events were dropped; clearing score cache");
                self.invalidate();
            }
        }
    }

    // -------------------------------------------------------------------------
    // Resolution
    // -------------------------------------------------------------------------

    /// Score at `ts`.
    pub fn resolve(
        &mut self,
        lookup: &impl AttributeLookup,
        ts: Timestamp,
        options: ResolveOptions,
    ) -> Option<f64> {
        self.sync();
        if self.cache.has(ts) {
            return self.cache.floor(ts).map(|v| v.value.s);
        }
        self.compute(lookup, ts, options)
    }

    /// Score at `ts`, falling back to the formula default.
    pub fn score(&mut self, lookup: &impl AttributeLookup, ts: Timestamp) -> f64 {
        self.resolve(lookup, ts, ResolveOptions::default())
            .unwrap_or(self.formula.default_value)
    }

    fn unavailable(&self, options: ResolveOptions) -> Option<f64> {
        if options.null_when_unavailable {
            None
        } else {
            Some(self.formula.default_value)
        }
    }

    fn compute(
        &mut self,
        lookup: &impl AttributeLookup,
        ts: Timestamp,
        options: ResolveOptions,
    ) -> Option<f64> {
        let slots = match self.slots(lookup) {
            Some(slots) => slots,
            None => return self.unavailable(options),
        };
        let common = match common_floor_ts(&slots, ts) {
            Some(common) if common >= self.formula.fuzzy_start(ts) => common,
            _ => return self.unavailable(options),
        };

        let prev = self.cache.floor(ts).map(|v| *v.value);
        let resolved = match prev {
            Some(prev) => self.intermediate(&slots, prev, common),
            None => {
                if !self.have_window(&slots, common) || !self.dense_enough(&slots, common) {
                    return self.unavailable(options);
                }
                match self.first(&slots, common) {
                    Some(value) => value,
                    None => return self.unavailable(options),
                }
            }
        };

        if resolved.ts < ts && options.forecast {
            Some(self.formula.forecast(&resolved, ts))
        } else {
            Some(resolved.s)
        }
    }

    /// Component attributes in formula order, or `None` if one is missing.
    pub(crate) fn slots<'a>(&self, lookup: &'a impl AttributeLookup) -> Option<Vec<&'a AttributeSlot>> {
        self.formula
            .components
            .iter()
            .map(|c| lookup.attribute(&c.attribute))
            .collect()
    }

    /// True if every dynamic attribute has a sample within the fuzzy
    /// tolerance of the window start.
    fn have_window(&self, slots: &[&AttributeSlot], ts: Timestamp) -> bool {
        let start = self.formula.window_start(ts);
        let earliest = self.formula.fuzzy_start(start);
        slots
            .iter()
            .filter(|slot| !slot.is_constant())
            .all(|slot| slot.floor_ts(start).is_some_and(|t| t >= earliest))
    }

    fn dense_enough(&self, slots: &[&AttributeSlot], ts: Timestamp) -> bool {
        if self.formula.loading_percentage <= 0.0 {
            return true;
        }
        let start = self.formula.window_start(ts);
        valid_fraction(slots, start, ts, ts - start, &self.formula.step)
            >= self.formula.loading_percentage
    }

    /// Seed at the window start and run the recurrence up to `ts`, caching
    /// every step.
    fn first(&mut self, slots: &[&AttributeSlot], ts: Timestamp) -> Option<DoiValue> {
        let from = self.formula.window_start(ts);
        let values = DoiValues::new(slots, from, ts, &self.formula.step);
        let mut rows = values.rows();

        let (start_ts, row) = rows.next()?;
        let mut doi = self.formula.start(self.formula.eval_x(&row), start_ts);
        self.cache.push(doi.ts, doi, 0, true);

        for (step_ts, row) in rows {
            doi = self.formula.eval(&doi, self.formula.eval_x(&row), step_ts);
            self.cache.push(doi.ts, doi, 0, true);
        }
        debug!(from, to = doi.ts, steps = values.len(), s = doi.s, "bootstrapped score window");
        Some(doi)
    }

    /// Advance `prev` one grid step at a time up to `ts`, caching every step.
    fn intermediate(&mut self, slots: &[&AttributeSlot], prev: DoiValue, ts: Timestamp) -> DoiValue {
        if prev.ts >= ts {
            return prev;
        }
        let from = self.formula.step.next(prev.ts);
        if from > ts {
            return prev;
        }
        let values = DoiValues::new(slots, from, ts, &self.formula.step);

        let mut doi = prev;
        for (step_ts, row) in values.rows() {
            doi = self.formula.eval(&doi, self.formula.eval_x(&row), step_ts);
            self.cache.push(doi.ts, doi, 0, true);
        }
        trace!(from = prev.ts, to = doi.ts, steps = values.len(), "extended score");
        doi
    }

    // -------------------------------------------------------------------------
    // Series Read API
    // -------------------------------------------------------------------------

    /// Newest computed score at or before `ts`, resolving `ts` first.
    pub fn floor(&mut self, lookup: &impl AttributeLookup, ts: Timestamp) -> Option<DoiValue> {
        self.resolve(lookup, ts, ResolveOptions::strict());
        self.cache.floor(ts).map(|v| *v.value)
    }

    /// Oldest computed score at or after `ts`, resolving `ts` first.
    pub fn ceiling(&mut self, lookup: &impl AttributeLookup, ts: Timestamp) -> Option<DoiValue> {
        self.resolve(lookup, ts, ResolveOptions::strict());
        self.cache.ceiling(ts).map(|v| *v.value)
    }

    /// Scores on the formula grid within `[from, to]`, skipping points
    /// without a score.
    pub fn raw_values(
        &mut self,
        lookup: &impl AttributeLookup,
        from: Timestamp,
        to: Timestamp,
    ) -> Vec<Sample<f64>> {
        let options = ResolveOptions {
            null_when_unavailable: true,
            forecast: true,
        };
        let step = self.formula.step;
        step.grid(from, to)
            .filter_map(|ts| self.resolve(lookup, ts, options).map(|s| Sample::new(ts, s)))
            .collect()
    }

    pub fn num_raw_values(
        &mut self,
        lookup: &impl AttributeLookup,
        from: Timestamp,
        to: Timestamp,
    ) -> usize {
        self.raw_values(lookup, from, to).len()
    }

    /// True if a score is cached or computable at `ts`.
    pub fn has(&mut self, lookup: &impl AttributeLookup, ts: Timestamp) -> bool {
        self.sync();
        self.cache.has(ts)
            || self
                .resolve(
                    lookup,
                    ts,
                    ResolveOptions {
                        null_when_unavailable: true,
                        forecast: true,
                    },
                )
                .is_some()
    }

    /// Scores on an arbitrary grid. With `feed_forward` unset, points without
    /// a score are `None` instead of the formula default.
    pub fn values(
        &mut self,
        lookup: &impl AttributeLookup,
        from: Timestamp,
        to: Timestamp,
        step: &Stepper,
        feed_forward: bool,
    ) -> Vec<Option<f64>> {
        let options = ResolveOptions {
            null_when_unavailable: !feed_forward,
            forecast: true,
        };
        step.grid(from, to)
            .map(|ts| self.resolve(lookup, ts, options))
            .collect()
    }

    /// True if nothing is cached for the range and no score can be
    /// bootstrapped for it.
    pub fn are_no_values_there(
        &mut self,
        lookup: &impl AttributeLookup,
        from: Timestamp,
        to: Timestamp,
        step: &Stepper,
        feed_forward: bool,
    ) -> bool {
        self.sync();
        if !self.cache.are_no_values_there(from, to, step, feed_forward) {
            return false;
        }
        let slots = match self.slots(lookup) {
            Some(slots) => slots,
            None => return true,
        };
        match common_floor_ts(&slots, to) {
            None => true,
            Some(common) => {
                (!feed_forward && common < step.step(from, -self.formula.fuzzy_days))
                    || !self.have_window(&slots, common)
            }
        }
    }

    /// Scores are derived; direct writes are a programming error.
    pub fn push(&mut self, ts: Timestamp, _value: f64) -> Result<()> {
        Err(ThermalError::ReadOnlySeries(format!(
            "cannot push to derived DOI series at {}",
            ts
        )))
    }

    /// Derived scores cannot be locked; accepted and ignored.
    pub fn lock(&mut self, _from: Timestamp, _to: Timestamp) -> bool {
        false
    }

    /// Derived scores cannot be locked; accepted and ignored.
    pub fn unlock(&mut self, _from: Timestamp, _to: Timestamp) -> bool {
        false
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn subscribe(formula: &DoiFormula, lookup: &impl AttributeLookup) -> Result<Vec<Subscription>> {
    formula
        .components
        .iter()
        .map(|c| {
            lookup
                .attribute(&c.attribute)
                .map(AttributeSlot::subscribe)
                .ok_or_else(|| ThermalError::UnknownAttribute(c.attribute.clone()))
        })
        .collect()
}

/// Oldest of the dynamic attributes' newest samples at or before `ts`.
///
/// `None` if a constant is unset or a dynamic attribute has no sample yet;
/// `ts` itself for constant-only formulas.
pub(crate) fn common_floor_ts(slots: &[&AttributeSlot], ts: Timestamp) -> Option<Timestamp> {
    let mut common = ts;
    for slot in slots {
        common = common.min(slot.floor_ts(ts)?);
    }
    Some(common)
}

/// Mean sample count of the dynamic attributes within `[from, to]`,
/// relative to the samples expected over `span` milliseconds.
///
/// Zero if a constant is unset; one for constant-only formulas.
pub(crate) fn valid_fraction(
    slots: &[&AttributeSlot],
    from: Timestamp,
    to: Timestamp,
    span: i64,
    step: &Stepper,
) -> f64 {
    if slots
        .iter()
        .any(|slot| slot.as_constant().is_some_and(|c| !c.is_set()))
    {
        return 0.0;
    }
    let counts: Vec<usize> = slots
        .iter()
        .filter(|slot| !slot.is_constant())
        .map(|slot| slot.num_raw_values(from, to))
        .collect();
    if counts.is_empty() {
        return 1.0;
    }
    let have = counts.iter().sum::<usize>() as f64 / counts.len() as f64;
    let expected = span as f64 / step.ref_step_width() as f64;
    if expected <= 0.0 {
        return if have > 0.0 { 1.0 } else { 0.0 };
    }
    have / expected
}
