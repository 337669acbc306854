//! Data layer for the LEWAS observation service.
//!
//! Observations are kept in a key-value store with one secondary access
//! path: a per-partition time index. This crate defines that abstraction
//! and ships two backends.
//!
//! # Architecture
//!
//! ```text
//! lewas-core services
//!     |
//!     +-- ObservationStore<AnimalObservation> --+-- MemoryStore (dev / tests)
//!     +-- ObservationStore<SensorObservation> --+-- PgStore     (PostgreSQL records table)
//! ```
//!
//! # Modules
//!
//! - [`store`] -- The store trait, queries, filters, cursors and pages
//! - [`memory`] -- In-process backend
//! - [`postgres`] -- `PostgreSQL` connection pool and backend
//! - [`records`] -- Table bindings for the observation records
//! - [`error`] -- Shared error types

pub mod error;
pub mod memory;
pub mod postgres;
pub mod records;
pub mod store;

// Re-export primary types for convenience.
pub use error::DbError;
pub use memory::MemoryStore;
pub use postgres::{PgStore, PostgresConfig, PostgresPool};
pub use store::{Cursor, Filter, ObservationStore, Page, RangeQuery, ScanRequest, TableRecord};
