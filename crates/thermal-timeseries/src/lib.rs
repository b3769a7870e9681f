//! Thermal Time Series - Sample Store
//!
//! In-memory, eviction-aware storage for per-attribute samples with
//! nearest-neighbour lookup and regular-grid resampling. Serves both the
//! rendering layer (range queries) and derived scores (windowed lookups).
//!
//! Key Features:
//! - Sorted insert/replace with size-bounded retention
//! - Locked ranges that survive eviction and clearing
//! - Fixed-width and calendar-aligned grids
//! - Resampling with binning and carry-forward
//! - Dynamic and constant attributes with change notification
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

pub mod types;
pub mod stepper;
pub mod lock;
pub mod index;
pub mod retention;
pub mod series;
pub mod query;
pub mod aggregation;
pub mod event;
pub mod attribute;

pub use types::{Bucket, IndexedSample, Sample};
pub use stepper::{CalendarUnit, Grid, Stepper};
pub use lock::{LockSet, LockedRange};
pub use index::TimestampIndex;
pub use retention::RetentionPolicy;
pub use series::TimeSeries;
pub use aggregation::{AggregateFunction, Binner, ValueBinner};
pub use event::{AttributeEvent, EventBus, Invalidation, Subscription};
pub use attribute::{Attribute, AttributeLookup, AttributeSlot, ConstantAttribute, Entity};
