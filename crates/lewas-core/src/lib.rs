//! Core logic for the LEWAS observation service.
//!
//! The centerpiece is the paginated multi-partition query merger: the
//! store indexes records per partition, and a listing that spans all
//! partitions is answered by one concurrent range query per partition,
//! merged newest first and resumed with a per-partition continuation
//! token.
//!
//! # Modules
//!
//! - [`merger`] -- Fan-out, merge and continuation of partitioned listings
//! - [`pagination`] -- Page size, time range and continuation token codec
//! - [`time`] -- Parsing of caller-supplied instants
//! - [`animal`] -- Animal observation service (partitioned by source)
//! - [`sensor`] -- Sensor observation service (partitioned by instrument)
//! - [`reference`] -- Immutable instrument/unit/metric/meta lookup tables
//! - [`config`] -- YAML and environment service configuration
//! - [`error`] -- Shared error type

pub mod animal;
pub mod config;
pub mod error;
pub mod merger;
pub mod pagination;
pub mod reference;
pub mod sensor;
pub mod time;

pub use animal::{AnimalFilter, AnimalService, BatchSummary, NewAnimalObservation};
pub use config::{ConfigError, LogFormat, ServiceConfig};
pub use error::CoreError;
pub use merger::{ListPage, PageRequest, QueryMerger};
pub use pagination::{ContinuationToken, PageSize, TimeRange};
pub use reference::{ReferenceData, ReferenceError};
pub use sensor::{
    NewSensorObservation, Sample, SensorBatchSummary, SensorFilter, SensorMetadata,
    SensorObservationView, SensorService,
};
