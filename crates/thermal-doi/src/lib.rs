//! Thermal DOI - Degree of Interest Engine
//!
//! Combines weighted entity attributes into a windowed, exponentially
//! smoothed and trend-aware interest score. Scores are computed lazily on
//! query, cached per entity and invalidated when an underlying attribute
//! changes.
//!
//! Key Features:
//! - Weighted, normalized multi-attribute formulas
//! - Double exponential smoothing with trend forecasting
//! - Bootstrap / incremental extension with fuzzy sample tolerance
//! - Selection windows, trajectories and delta computation
//! - Single-lock shared entities for multi-threaded hosts
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

pub mod component;
pub mod formula;
pub mod values;
pub mod engine;
pub mod window;
pub mod shared;

pub use component::DoiComponent;
pub use formula::{DeltaMethod, DoiFormula, DoiValue};
pub use values::DoiValues;
pub use engine::{DoiEngine, ResolveOptions};
pub use window::{DeltaDoi, DoiWindow, Selection};
pub use shared::{ScoredEntity, SharedEntity};
