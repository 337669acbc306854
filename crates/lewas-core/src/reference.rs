//! Reference lookup tables for sensor observations.
//!
//! Instruments, units, metrics and meta cells are read once at startup
//! from a directory of JSON files and shared read-only by `Arc`:
//!
//! | File | Wrapper key | Required |
//! |------|-------------|----------|
//! | `instruments.json` | `instruments` | yes |
//! | `units.json` | `units` | yes |
//! | `metrics.json` | `metrics` | yes |
//! | `meta_cells.json` | `meta_cells` | no |

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Errors raised while loading reference tables.
#[derive(Debug, thiserror::Error)]
pub enum ReferenceError {
    /// A reference file could not be read.
    #[error("failed to read reference file {path}: {source}")]
    Io {
        /// The file that failed.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// A reference file is not valid JSON of the expected shape.
    #[error("failed to parse reference file {path}: {source}")]
    Parse {
        /// The file that failed.
        path: PathBuf,
        /// The underlying JSON error.
        source: serde_json::Error,
    },
}

/// A measuring instrument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    /// Numeric ID, also the sensor partition label.
    pub instrument_id: u32,
    /// Unique name used by clients.
    pub name: String,
    /// Free-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A unit of measure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Numeric ID.
    pub unit_id: u32,
    /// Abbreviation used by clients, e.g. `degC`.
    pub abbv: String,
    /// Long name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// A measured quantity in a given medium.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    /// Numeric ID.
    pub metric_id: u32,
    /// Metric name, unique together with `medium`.
    pub name: String,
    /// Medium measured, e.g. `water` or `air`.
    pub medium: String,
}

/// An auxiliary sample annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaCell {
    /// Numeric ID.
    pub meta_id: u32,
    /// Unique name used by clients.
    pub name: String,
}

#[derive(Deserialize)]
struct InstrumentsFile {
    #[serde(default)]
    instruments: Vec<Instrument>,
}

#[derive(Deserialize)]
struct UnitsFile {
    #[serde(default)]
    units: Vec<Unit>,
}

#[derive(Deserialize)]
struct MetricsFile {
    #[serde(default)]
    metrics: Vec<Metric>,
}

#[derive(Deserialize)]
struct MetaCellsFile {
    #[serde(default)]
    meta_cells: Vec<MetaCell>,
}

/// Immutable name/ID lookup tables.
#[derive(Debug, Clone, Default)]
pub struct ReferenceData {
    instruments: Vec<Instrument>,
    units: Vec<Unit>,
    metrics: Vec<Metric>,
    meta_cells: Vec<MetaCell>,
    instrument_by_name: HashMap<String, u32>,
    instrument_by_id: HashMap<u32, String>,
    unit_by_abbv: HashMap<String, u32>,
    unit_by_id: HashMap<u32, String>,
    metric_by_key: HashMap<(String, String), u32>,
    meta_by_name: HashMap<String, u32>,
    meta_by_id: HashMap<u32, String>,
}

impl ReferenceData {
    /// Build lookup tables from already-parsed rows.
    pub fn new(
        instruments: Vec<Instrument>,
        units: Vec<Unit>,
        metrics: Vec<Metric>,
        meta_cells: Vec<MetaCell>,
    ) -> Self {
        Self {
            instrument_by_name: instruments
                .iter()
                .map(|i| (i.name.clone(), i.instrument_id))
                .collect(),
            instrument_by_id: instruments
                .iter()
                .map(|i| (i.instrument_id, i.name.clone()))
                .collect(),
            unit_by_abbv: units.iter().map(|u| (u.abbv.clone(), u.unit_id)).collect(),
            unit_by_id: units.iter().map(|u| (u.unit_id, u.abbv.clone())).collect(),
            metric_by_key: metrics
                .iter()
                .map(|m| ((m.name.clone(), m.medium.clone()), m.metric_id))
                .collect(),
            meta_by_name: meta_cells
                .iter()
                .map(|m| (m.name.clone(), m.meta_id))
                .collect(),
            meta_by_id: meta_cells
                .iter()
                .map(|m| (m.meta_id, m.name.clone()))
                .collect(),
            instruments,
            units,
            metrics,
            meta_cells,
        }
    }

    /// Load every table from `dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError`] if a required file is missing or any
    /// file fails to parse.
    pub fn load(dir: &Path) -> Result<Self, ReferenceError> {
        let instruments: InstrumentsFile = read_table(&dir.join("instruments.json"))?;
        let units: UnitsFile = read_table(&dir.join("units.json"))?;
        let metrics: MetricsFile = read_table(&dir.join("metrics.json"))?;

        let meta_path = dir.join("meta_cells.json");
        let meta_cells = if meta_path.exists() {
            read_table::<MetaCellsFile>(&meta_path)?.meta_cells
        } else {
            tracing::warn!(path = %meta_path.display(), "No meta cell table, meta names will not resolve");
            Vec::new()
        };

        let data = Self::new(
            instruments.instruments,
            units.units,
            metrics.metrics,
            meta_cells,
        );
        tracing::info!(
            dir = %dir.display(),
            instruments = data.instruments.len(),
            units = data.units.len(),
            metrics = data.metrics.len(),
            meta_cells = data.meta_cells.len(),
            "Reference data loaded"
        );
        Ok(data)
    }

    /// Instrument ID for a name.
    pub fn instrument_id(&self, name: &str) -> Option<u32> {
        self.instrument_by_name.get(name).copied()
    }

    /// Instrument name for an ID.
    pub fn instrument_name(&self, id: u32) -> Option<&str> {
        self.instrument_by_id.get(&id).map(String::as_str)
    }

    /// Unit ID for an abbreviation.
    pub fn unit_id(&self, abbv: &str) -> Option<u32> {
        self.unit_by_abbv.get(abbv).copied()
    }

    /// Unit abbreviation for an ID.
    pub fn unit_abbv(&self, id: u32) -> Option<&str> {
        self.unit_by_id.get(&id).map(String::as_str)
    }

    /// Metric ID for a `(name, medium)` pair.
    pub fn metric_id(&self, name: &str, medium: &str) -> Option<u32> {
        self.metric_by_key
            .get(&(name.to_owned(), medium.to_owned()))
            .copied()
    }

    /// Meta cell ID for a name.
    pub fn meta_id(&self, name: &str) -> Option<u32> {
        self.meta_by_name.get(name).copied()
    }

    /// Meta cell name for an ID.
    pub fn meta_name(&self, id: u32) -> Option<&str> {
        self.meta_by_id.get(&id).map(String::as_str)
    }

    /// Partition labels of every known instrument, in file order.
    pub fn instrument_labels(&self) -> Vec<String> {
        self.instruments
            .iter()
            .map(|i| i.instrument_id.to_string())
            .collect()
    }

    /// All instruments.
    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    /// All units.
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// All metrics.
    pub fn metrics(&self) -> &[Metric] {
        &self.metrics
    }
}

fn read_table<T: DeserializeOwned>(path: &Path) -> Result<T, ReferenceError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ReferenceError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ReferenceError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ReferenceData {
        ReferenceData::new(
            vec![Instrument {
                instrument_id: 3,
                name: String::from("sonde"),
                description: None,
            }],
            vec![Unit {
                unit_id: 1,
                abbv: String::from("degC"),
                name: Some(String::from("degrees Celsius")),
            }],
            vec![
                Metric {
                    metric_id: 10,
                    name: String::from("temperature"),
                    medium: String::from("water"),
                },
                Metric {
                    metric_id: 11,
                    name: String::from("temperature"),
                    medium: String::from("air"),
                },
            ],
            vec![MetaCell {
                meta_id: 2,
                name: String::from("surface"),
            }],
        )
    }

    #[test]
    fn lookups_resolve_both_directions() {
        let data = sample();
        assert_eq!(data.instrument_id("sonde"), Some(3));
        assert_eq!(data.instrument_name(3), Some("sonde"));
        assert_eq!(data.unit_id("degC"), Some(1));
        assert_eq!(data.unit_abbv(1), Some("degC"));
        assert_eq!(data.meta_id("surface"), Some(2));
        assert_eq!(data.meta_name(2), Some("surface"));
        assert_eq!(data.instrument_id("unknown"), None);
    }

    #[test]
    fn metrics_are_keyed_by_medium() {
        let data = sample();
        assert_eq!(data.metric_id("temperature", "water"), Some(10));
        assert_eq!(data.metric_id("temperature", "air"), Some(11));
        assert_eq!(data.metric_id("temperature", "soil"), None);
    }

    #[test]
    fn instrument_labels_are_ids() {
        assert_eq!(sample().instrument_labels(), vec![String::from("3")]);
    }

    #[test]
    fn load_bundled_reference_directory() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("reference_data");
        if dir.exists() {
            let data = ReferenceData::load(&dir);
            assert!(data.is_ok(), "Failed to load reference data: {data:?}");
        }
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let dir = std::env::temp_dir().join("lewas-reference-missing");
        let result = ReferenceData::load(&dir);
        assert!(matches!(result, Err(ReferenceError::Io { .. })));
    }
}
