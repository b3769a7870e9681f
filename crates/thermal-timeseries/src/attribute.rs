//! Thermal Attributes
//!
//! Named attributes of an entity. Dynamic attributes own a sample series and
//! publish change events; constant attributes hold a single optional value.
//! Entities map attribute names to either kind.
//!
//! Key Features:
//! - Numeric preprocessing through an optional clamping range
//! - Per-attribute binning for grid resampling
//! - Added/reset notifications for derived caches
//! - Name based lookup through the `AttributeLookup` trait
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::aggregation::{Binner, ValueBinner};
use crate::event::{AttributeEvent, EventBus, Subscription};
use crate::series::TimeSeries;
use crate::stepper::Stepper;
use crate::types::{IndexedSample, Sample};
use std::collections::BTreeMap;
use thermal_common::config::{EventConfig, StoreConfig};
use thermal_common::{Timestamp, Value, ValueRange};

// =============================================================================
// Dynamic Attribute
// =============================================================================

/// A named, time varying attribute.
#[derive(Debug)]
pub struct Attribute {
    name: String,
    series: TimeSeries<Value>,
    binner: Option<ValueBinner>,
    clamp: Option<ValueRange>,
    events: EventBus,
}

impl Attribute {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, &StoreConfig::default(), &EventConfig::default())
    }

    pub fn with_config(
        name: impl Into<String>,
        store: &StoreConfig,
        events: &EventConfig,
    ) -> Self {
        Self {
            name: name.into(),
            series: TimeSeries::with_config(store),
            binner: None,
            clamp: None,
            events: EventBus::with_config(events),
        }
    }

    pub fn with_binner(mut self, binner: ValueBinner) -> Self {
        self.binner = Some(binner);
        self
    }

    /// Clamp numeric samples into `range` on push.
    pub fn with_clamp(mut self, range: ValueRange) -> Self {
        self.clamp = Some(range);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn series(&self) -> &TimeSeries<Value> {
        &self.series
    }

    pub fn binner(&self) -> Option<ValueBinner> {
        self.binner
    }

    pub fn subscribe(&self) -> Subscription {
        self.events.subscribe()
    }

    fn preprocess(&self, value: Value) -> Value {
        match (self.clamp, value) {
            (Some(range), Value::Scalar(v)) => Value::Scalar(range.clamp(v)),
            (Some(range), Value::Aggregate { mean, min, max }) => {
                Value::aggregate(range.clamp(mean), range.clamp(min), range.clamp(max))
            }
            (_, value) => value,
        }
    }

    /// Store a sample and notify subscribers.
    pub fn push(&mut self, ts: Timestamp, value: impl Into<Value>, duration: i64) -> bool {
        let value = self.preprocess(value.into());
        let changed = self.series.push(ts, value, duration, true);
        if changed {
            self.events.publish(AttributeEvent::Added { ts });
        }
        changed
    }

    pub fn add(&mut self, sample: Sample<Value>) -> bool {
        self.push(sample.ts, sample.value, sample.duration)
    }

    /// Clear `[from, to]` and notify subscribers.
    pub fn clear(&mut self, from: Timestamp, to: Timestamp) -> usize {
        let removed = self.series.clear(from, to);
        self.events.publish(AttributeEvent::Reset { from, to });
        removed
    }

    pub fn lock(&mut self, from: Timestamp, to: Timestamp) -> bool {
        self.series.lock(from, to)
    }

    pub fn unlock(&mut self, from: Timestamp, to: Timestamp) -> bool {
        self.series.unlock(from, to)
    }

    pub fn floor(&self, ts: Timestamp) -> Option<IndexedSample<'_, Value>> {
        self.series.floor(ts)
    }

    pub fn ceiling(&self, ts: Timestamp) -> Option<IndexedSample<'_, Value>> {
        self.series.ceiling(ts)
    }

    pub fn has(&self, ts: Timestamp) -> bool {
        self.series.has(ts)
    }

    pub fn num_raw_values(&self, from: Timestamp, to: Timestamp) -> usize {
        self.series.num_raw_values(from, to)
    }

    /// Resampled values using the attribute's binner.
    pub fn values(
        &self,
        from: Timestamp,
        to: Timestamp,
        step: &Stepper,
        feed_forward: bool,
    ) -> Vec<Option<Value>> {
        let binner = self.binner.as_ref().map(|b| b as &dyn Binner<Value>);
        self.series.values(from, to, step, binner, feed_forward)
    }

    /// Resampled values collapsed to numbers.
    pub fn scalar_values(
        &self,
        from: Timestamp,
        to: Timestamp,
        step: &Stepper,
        feed_forward: bool,
    ) -> Vec<Option<f64>> {
        self.values(from, to, step, feed_forward)
            .into_iter()
            .map(|v| v.and_then(|v| v.to_scalar()))
            .collect()
    }

    pub fn frequencies(&self, from: Timestamp, to: Timestamp, step: &Stepper) -> Vec<usize> {
        self.series.frequencies(from, to, step, true)
    }
}

// =============================================================================
// Constant Attribute
// =============================================================================

/// An attribute with at most one value, valid at every timestamp.
#[derive(Debug)]
pub struct ConstantAttribute {
    name: String,
    value: Option<Value>,
    events: EventBus,
}

impl ConstantAttribute {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, &EventConfig::default())
    }

    pub fn with_config(name: impl Into<String>, events: &EventConfig) -> Self {
        Self {
            name: name.into(),
            value: None,
            events: EventBus::with_config(events),
        }
    }

    pub fn with_value(name: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut attr = Self::new(name);
        attr.value = Some(value.into());
        attr
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_set(&self) -> bool {
        self.value.is_some()
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn scalar(&self) -> Option<f64> {
        self.value.as_ref().and_then(Value::to_scalar)
    }

    /// Replace the value; every derived value becomes stale.
    pub fn set_value(&mut self, value: impl Into<Value>) {
        self.value = Some(value.into());
        self.events.publish(AttributeEvent::Reset {
            from: Timestamp::MIN,
            to: Timestamp::MAX,
        });
    }

    pub fn unset(&mut self) {
        if self.value.take().is_some() {
            self.events.publish(AttributeEvent::Reset {
                from: Timestamp::MIN,
                to: Timestamp::MAX,
            });
        }
    }

    /// The value stamped at `ts`, if set.
    pub fn floor(&self, ts: Timestamp) -> Option<Sample<Value>> {
        self.value.clone().map(|v| Sample::new(ts, v))
    }

    pub fn subscribe(&self) -> Subscription {
        self.events.subscribe()
    }
}

// =============================================================================
// Attribute Slot
// =============================================================================

/// Either kind of attribute, as stored in an entity.
#[derive(Debug)]
pub enum AttributeSlot {
    Dynamic(Attribute),
    Constant(ConstantAttribute),
}

impl AttributeSlot {
    pub fn name(&self) -> &str {
        match self {
            Self::Dynamic(a) => a.name(),
            Self::Constant(c) => c.name(),
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Self::Constant(_))
    }

    pub fn as_dynamic(&self) -> Option<&Attribute> {
        match self {
            Self::Dynamic(a) => Some(a),
            Self::Constant(_) => None,
        }
    }

    pub fn as_constant(&self) -> Option<&ConstantAttribute> {
        match self {
            Self::Constant(c) => Some(c),
            Self::Dynamic(_) => None,
        }
    }

    pub fn subscribe(&self) -> Subscription {
        match self {
            Self::Dynamic(a) => a.subscribe(),
            Self::Constant(c) => c.subscribe(),
        }
    }

    /// Timestamp of the newest sample at or before `ts`; constants answer
    /// with `ts` itself while set.
    pub fn floor_ts(&self, ts: Timestamp) -> Option<Timestamp> {
        match self {
            Self::Dynamic(a) => a.floor(ts).map(|s| s.ts),
            Self::Constant(c) => c.is_set().then_some(ts),
        }
    }

    /// Numeric values on the grid `[from, to]`, carrying samples forward.
    pub fn scalar_values(&self, from: Timestamp, to: Timestamp, step: &Stepper) -> Vec<Option<f64>> {
        match self {
            Self::Dynamic(a) => a.scalar_values(from, to, step, true),
            Self::Constant(c) => {
                let v = c.scalar();
                step.grid(from, to).map(|_| v).collect()
            }
        }
    }

    pub fn num_raw_values(&self, from: Timestamp, to: Timestamp) -> usize {
        match self {
            Self::Dynamic(a) => a.num_raw_values(from, to),
            Self::Constant(c) => usize::from(c.is_set() && from <= to),
        }
    }
}

impl From<Attribute> for AttributeSlot {
    fn from(a: Attribute) -> Self {
        Self::Dynamic(a)
    }
}

impl From<ConstantAttribute> for AttributeSlot {
    fn from(c: ConstantAttribute) -> Self {
        Self::Constant(c)
    }
}

// =============================================================================
// Entity
// =============================================================================

/// Name based attribute lookup.
pub trait AttributeLookup {
    fn attribute(&self, name: &str) -> Option<&AttributeSlot>;
}

/// A named collection of attributes.
#[derive(Debug, Default)]
pub struct Entity {
    name: String,
    attributes: BTreeMap<String, AttributeSlot>,
}

impl Entity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add or replace an attribute under its own name.
    pub fn insert(&mut self, slot: impl Into<AttributeSlot>) -> &mut Self {
        let slot = slot.into();
        self.attributes.insert(slot.name().to_string(), slot);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<AttributeSlot> {
        self.attributes.remove(name)
    }

    pub fn dynamic_mut(&mut self, name: &str) -> Option<&mut Attribute> {
        match self.attributes.get_mut(name)? {
            AttributeSlot::Dynamic(a) => Some(a),
            AttributeSlot::Constant(_) => None,
        }
    }

    pub fn constant_mut(&mut self, name: &str) -> Option<&mut ConstantAttribute> {
        match self.attributes.get_mut(name)? {
            AttributeSlot::Constant(c) => Some(c),
            AttributeSlot::Dynamic(_) => None,
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.attributes.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }
}

impl AttributeLookup for Entity {
    fn attribute(&self, name: &str) -> Option<&AttributeSlot> {
        self.attributes.get(name)
    }
}
