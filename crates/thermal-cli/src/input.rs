//! Thermal CLI Input
//!
//! JSON sample files. Each entity lists its dynamic attributes as
//! `[timestamp, value]` pairs and its constants by value:
//!
//! ```json
//! {
//!   "entities": [
//!     {
//!       "name": "pump-1",
//!       "attributes": { "load": [[0, 42.0], [60000, 45.5]] },
//!       "constants": { "capacity": 80 }
//!     }
//!   ]
//! }
//! ```
//!
//! @version 0.1.0
//! @author AutomataNexus Development Team

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use thermal_common::config::{EventConfig, StoreConfig};
use thermal_common::{Result, ThermalError, Timestamp, Value};
use thermal_timeseries::{Attribute, ConstantAttribute, Entity};
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SampleFile {
    pub entities: Vec<EntityInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityInput {
    pub name: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, Vec<(Timestamp, Value)>>,
    #[serde(default)]
    pub constants: BTreeMap<String, Value>,
}

impl SampleFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| ThermalError::Serialization(e.to_string()))
    }
}

impl EntityInput {
    /// Materialize the entity, pushing every sample in file order.
    ///
    /// Samples evicted by the retention policy while loading are reported.
    pub fn build(&self, store: &StoreConfig, events: &EventConfig) -> Entity {
        let mut entity = Entity::new(&self.name);
        for (name, samples) in &self.attributes {
            let mut attribute = Attribute::with_config(name, store, events);
            for (ts, value) in samples {
                attribute.push(*ts, value.clone(), 0);
            }
            let kept = attribute.series().len();
            let distinct = samples.iter().map(|(ts, _)| *ts).collect::<BTreeSet<_>>().len();
            if kept < distinct {
                warn!(
                    entity = %self.name,
                    attribute = %name,
                    kept,
                    dropped = distinct - kept,
                    "store retention evicted samples while loading"
                );
            }
            debug!(
                entity = %self.name,
                attribute = %name,
                samples = kept,
                "loaded attribute"
            );
            entity.insert(attribute);
        }
        for (name, value) in &self.constants {
            let mut constant = ConstantAttribute::with_config(name, events);
            constant.set_value(value.clone());
            entity.insert(constant);
        }
        entity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use thermal_timeseries::AttributeLookup;

    const SAMPLES: &str = r#"{
        "entities": [
            {
                "name": "pump-1",
                "attributes": {
                    "load": [[0, 42.0], [60000, 45.5], [30000, 40]],
                    "state": [[0, "idle"]]
                },
                "constants": { "capacity": 80 }
            },
            { "name": "pump-2" }
        ]
    }"#;

    #[test]
    fn test_parse_and_build() {
        let file = SampleFile::parse(SAMPLES).unwrap();
        assert_eq!(file.entities.len(), 2);

        let entity = file.entities[0].build(&StoreConfig::default(), &EventConfig::default());
        assert_eq!(entity.name(), "pump-1");
        assert_eq!(entity.len(), 3);

        let load = entity.attribute("load").and_then(|s| s.as_dynamic()).unwrap();
        assert_eq!(load.series().timestamps(), &[0, 30000, 60000]);

        let capacity = entity.attribute("capacity").and_then(|s| s.as_constant()).unwrap();
        assert_eq!(capacity.scalar(), Some(80.0));

        let empty = file.entities[1].build(&StoreConfig::default(), &EventConfig::default());
        assert!(empty.is_empty());
    }

    fn long_history(count: i64) -> EntityInput {
        let samples = (0..count).map(|i| (i * 1000, Value::Scalar(i as f64))).collect();
        EntityInput {
            name: "pump-1".to_string(),
            attributes: BTreeMap::from([("load".to_string(), samples)]),
            constants: BTreeMap::new(),
        }
    }

    #[test]
    fn test_build_keeps_long_history_when_unbounded() {
        let input = long_history(4000);
        let entity = input.build(&StoreConfig::unbounded(), &EventConfig::default());

        let load = entity.attribute("load").and_then(|s| s.as_dynamic()).unwrap();
        assert_eq!(load.series().len(), 4000);
        assert_eq!(load.series().min_timestamp(), Some(0));
        assert_eq!(load.series().max_timestamp(), Some(3_999_000));
    }

    #[test]
    fn test_build_with_default_settings_keeps_long_history() {
        let settings: crate::settings::Settings = thermal_common::config::from_str(
            r#"
            [[formula.components]]
            attribute = "load"
            weight = 1.0
            "#,
        )
        .unwrap();

        let entity = long_history(4000).build(&settings.store, &settings.events);
        let load = entity.attribute("load").and_then(|s| s.as_dynamic()).unwrap();
        assert_eq!(load.series().len(), 4000);
    }

    #[test]
    fn test_build_with_retention_evicts_old_samples() {
        let entity = long_history(4000).build(&StoreConfig::default(), &EventConfig::default());
        let load = entity.attribute("load").and_then(|s| s.as_dynamic()).unwrap();
        assert!(load.series().len() < 4000);
        assert_eq!(load.series().max_timestamp(), Some(3_999_000));
    }

    #[test]
    fn test_load_from_file() {
        let mut tmp = NamedTempFile::new().unwrap();
        tmp.write_all(SAMPLES.as_bytes()).unwrap();

        let file = SampleFile::load(tmp.path()).unwrap();
        assert_eq!(file.entities[0].attributes["load"].len(), 3);
    }

    #[test]
    fn test_malformed_json() {
        let err = SampleFile::parse("{\"entities\": [{}]}").unwrap_err();
        assert!(matches!(err, ThermalError::Serialization(_)));
        assert!(err.is_user_error());
    }
}
