//! Shared application state for the API server.
//!
//! Handlers receive an `Arc<AppState>` through Axum's `State` extractor.
//! The state is immutable after construction; all mutation happens in
//! the stores behind the services.

use std::sync::Arc;

use lewas_core::{AnimalService, ReferenceData, SensorService};
use lewas_db::{MemoryStore, ObservationStore};
use lewas_types::{AnimalObservation, SensorObservation};

/// Services and credentials shared by every handler.
pub struct AppState {
    /// Animal observation service.
    pub animals: AnimalService,
    /// Sensor observation service.
    pub sensors: SensorService,
    /// Expected `X-API-Key` value.
    pub api_key: String,
}

impl AppState {
    /// Wire services over the given stores.
    pub fn new(
        animal_store: Arc<dyn ObservationStore<AnimalObservation>>,
        sensor_store: Arc<dyn ObservationStore<SensorObservation>>,
        reference: Arc<ReferenceData>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            animals: AnimalService::new(animal_store),
            sensors: SensorService::new(sensor_store, reference),
            api_key: api_key.into(),
        }
    }

    /// State backed by fresh in-memory stores.
    pub fn in_memory(reference: Arc<ReferenceData>, api_key: impl Into<String>) -> Self {
        Self::new(
            Arc::new(MemoryStore::<AnimalObservation>::new()),
            Arc::new(MemoryStore::<SensorObservation>::new()),
            reference,
            api_key,
        )
    }
}
