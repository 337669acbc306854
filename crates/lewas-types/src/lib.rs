//! Shared type definitions for the LEWAS observation service.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for entry identifiers
//! - [`enums`] -- Source partition labels
//! - [`structs`] -- Stored observation records (animal and sensor)

pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::Source;
pub use ids::EntryId;
pub use structs::{AnimalObservation, SensorObservation};
