//! Thermal Shared Entity
//!
//! An entity and its DOI engine behind one lock, for hosts that ingest
//! samples and query scores from different threads.
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use crate::engine::{DoiEngine, ResolveOptions};
use crate::formula::DoiFormula;
use crate::window::{DeltaDoi, DoiWindow, Selection};
use parking_lot::Mutex;
use std::sync::Arc;
use thermal_common::{Result, ThermalError, Timestamp, Value};
use thermal_timeseries::{Entity, Stepper};

// =============================================================================
// Scored Entity
// =============================================================================

/// An entity paired with the engine scoring it.
#[derive(Debug)]
pub struct ScoredEntity {
    entity: Entity,
    engine: DoiEngine,
}

impl ScoredEntity {
    pub fn new(entity: Entity, formula: DoiFormula) -> Result<Self> {
        let engine = DoiEngine::new(formula, &entity)?;
        Ok(Self { entity, engine })
    }

    pub fn entity(&self) -> &Entity {
        &self.entity
    }

    pub fn engine(&self) -> &DoiEngine {
        &self.engine
    }

    pub fn push(
        &mut self,
        attribute: &str,
        ts: Timestamp,
        value: impl Into<Value>,
        duration: i64,
    ) -> Result<bool> {
        let attr = self
            .entity
            .dynamic_mut(attribute)
            .ok_or_else(|| ThermalError::UnknownAttribute(attribute.to_string()))?;
        Ok(attr.push(ts, value, duration))
    }

    pub fn clear(&mut self, attribute: &str, from: Timestamp, to: Timestamp) -> Result<usize> {
        let attr = self
            .entity
            .dynamic_mut(attribute)
            .ok_or_else(|| ThermalError::UnknownAttribute(attribute.to_string()))?;
        Ok(attr.clear(from, to))
    }

    pub fn set_constant(&mut self, attribute: &str, value: impl Into<Value>) -> Result<()> {
        let attr = self
            .entity
            .constant_mut(attribute)
            .ok_or_else(|| ThermalError::UnknownAttribute(attribute.to_string()))?;
        attr.set_value(value);
        Ok(())
    }

    pub fn score(&mut self, ts: Timestamp) -> f64 {
        self.engine.score(&self.entity, ts)
    }

    pub fn resolve(&mut self, ts: Timestamp, options: ResolveOptions) -> Option<f64> {
        self.engine.resolve(&self.entity, ts, options)
    }

    pub fn values(
        &mut self,
        from: Timestamp,
        to: Timestamp,
        step: &Stepper,
        feed_forward: bool,
    ) -> Vec<Option<f64>> {
        self.engine.values(&self.entity, from, to, step, feed_forward)
    }

    pub fn window(&mut self, selection: &Selection) -> DoiWindow {
        self.engine.window(&self.entity, selection)
    }

    pub fn trajectory(&mut self, selection: &Selection) -> Vec<DeltaDoi> {
        self.engine.trajectory(&self.entity, selection)
    }

    pub fn set_formula(&mut self, formula: DoiFormula) -> Result<()> {
        self.engine.set_formula(formula, &self.entity)
    }
}

// =============================================================================
// Shared Entity
// =============================================================================

/// Cloneable handle to a [`ScoredEntity`]. Every operation takes the lock
/// for its whole duration.
#[derive(Debug, Clone)]
pub struct SharedEntity {
    inner: Arc<Mutex<ScoredEntity>>,
}

impl SharedEntity {
    pub fn new(entity: Entity, formula: DoiFormula) -> Result<Self> {
        Ok(Self {
            inner: Arc::new(Mutex::new(ScoredEntity::new(entity, formula)?)),
        })
    }

    pub fn push(
        &self,
        attribute: &str,
        ts: Timestamp,
        value: impl Into<Value>,
        duration: i64,
    ) -> Result<bool> {
        self.inner.lock().push(attribute, ts, value, duration)
    }

    pub fn clear(&self, attribute: &str, from: Timestamp, to: Timestamp) -> Result<usize> {
        self.inner.lock().clear(attribute, from, to)
    }

    pub fn set_constant(&self, attribute: &str, value: impl Into<Value>) -> Result<()> {
        self.inner.lock().set_constant(attribute, value)
    }

    pub fn score(&self, ts: Timestamp) -> f64 {
        self.inner.lock().score(ts)
    }

    pub fn resolve(&self, ts: Timestamp, options: ResolveOptions) -> Option<f64> {
        self.inner.lock().resolve(ts, options)
    }

    pub fn values(
        &self,
        from: Timestamp,
        to: Timestamp,
        step: &Stepper,
        feed_forward: bool,
    ) -> Vec<Option<f64>> {
        self.inner.lock().values(from, to, step, feed_forward)
    }

    pub fn window(&self, selection: &Selection) -> DoiWindow {
        self.inner.lock().window(selection)
    }

    pub fn trajectory(&self, selection: &Selection) -> Vec<DeltaDoi> {
        self.inner.lock().trajectory(selection)
    }

    pub fn set_formula(&self, formula: DoiFormula) -> Result<()> {
        self.inner.lock().set_formula(formula)
    }

    /// Run `f` with exclusive access to the entity and its engine.
    pub fn with<R>(&self, f: impl FnOnce(&mut Entity, &mut DoiEngine) -> R) -> R {
        let mut guard = self.inner.lock();
        let ScoredEntity { entity, engine } = &mut *guard;
        f(entity, engine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::DoiComponent;
    use std::thread;
    use thermal_timeseries::{Attribute, ConstantAttribute};

    fn shared() -> SharedEntity {
        let mut entity = Entity::new("valve");
        entity.insert(Attribute::new("flow"));
        entity.insert(ConstantAttribute::with_value("capacity", 1.0));
        let formula = DoiFormula::new(vec![
            DoiComponent::new("flow", 0.5).with_input_range(0.0, 1.0),
            DoiComponent::new("capacity", 0.5).with_input_range(0.0, 1.0),
        ])
        .with_window(2, Stepper::fixed(1));
        SharedEntity::new(entity, formula).unwrap()
    }

    #[test]
    fn test_unknown_attribute_rejected() {
        let shared = shared();
        assert!(shared.push("pressure", 0, 1.0, 0).unwrap_err().is_misuse());
        assert!(shared.push("capacity", 0, 1.0, 0).is_err());
        assert!(shared.set_constant("flow", 1.0).is_err());
        assert!(shared.clear("pressure", 0, 1).is_err());
    }

    #[test]
    fn test_push_from_threads_then_score() {
        let shared = shared();
        let writers: Vec<_> = (0..4i64)
            .map(|w| {
                let handle = shared.clone();
                thread::spawn(move || {
                    for i in 0..25i64 {
                        handle.push("flow", i * 4 + w, 1.0, 0).unwrap();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        let count = shared.with(|entity, _| {
            entity.dynamic_mut("flow").map(|a| a.series().len())
        });
        assert_eq!(count, Some(100));
        assert!((shared.score(99) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_constant_change_rescores() {
        let shared = shared();
        for ts in 0..5 {
            shared.push("flow", ts, 0.0, 0).unwrap();
        }
        assert!((shared.score(4) - 0.5).abs() < 1e-9);

        shared.set_constant("capacity", 0.0).unwrap();
        assert!(shared.score(4).abs() < 1e-9);
        assert!(shared.with(|_, engine| engine.cache().has(4)));
    }
}
