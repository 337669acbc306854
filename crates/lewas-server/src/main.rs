//! LEWAS observation service binary.
//!
//! Wires configuration, logging, storage and reference data together and
//! serves the HTTP API until `Ctrl-C`.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (`LEWAS_CONFIG` or `lewas-config.yaml`, then env)
//! 2. Initialize structured logging (tracing)
//! 3. Load reference tables
//! 4. Bind the listener
//! 5. Select the store: `PostgreSQL` when a database URL is configured,
//!    otherwise in-memory
//! 6. Serve, then close the database pool

mod error;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use lewas_api::{AppState, ServerConfig};
use lewas_core::{LogFormat, ReferenceData, ServiceConfig};
use lewas_db::{PostgresConfig, PostgresPool};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Config file read when `LEWAS_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "lewas-config.yaml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config().context("loading configuration")?;
    init_tracing(&config);

    info!(
        host = %config.server.host,
        port = config.server.port,
        postgres = config.storage.database_url.is_some(),
        reference_dir = %config.reference_data.dir.display(),
        "lewas-server starting"
    );
    if config.uses_default_api_key() {
        warn!("Using the built-in test API key; set API_KEY for any shared deployment");
    }

    let reference = Arc::new(
        ReferenceData::load(&config.reference_data.dir)
            .map_err(AppError::from)
            .context("loading reference data")?,
    );

    let server = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };
    let listener = lewas_api::bind(&server)
        .await
        .map_err(AppError::from)
        .context("binding HTTP listener")?;

    let (state, pool) = build_state(&config, reference)
        .await
        .context("initializing storage")?;

    let served =
        lewas_api::serve(listener, Arc::new(state), lewas_api::shutdown_signal()).await;
    if let Some(pool) = pool {
        pool.close().await;
    }
    served.map_err(AppError::from).context("serving HTTP API")?;

    info!("lewas-server stopped");
    Ok(())
}

/// Read the config file if present, then apply environment overrides.
fn load_config() -> Result<ServiceConfig, AppError> {
    let path = std::env::var("LEWAS_CONFIG")
        .map_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);

    if path.exists() {
        Ok(ServiceConfig::from_file(&path)?)
    } else {
        Ok(ServiceConfig::from_env()?)
    }
}

fn init_tracing(config: &ServiceConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}

/// Build the app state, returning the pool when `PostgreSQL` backs it.
async fn build_state(
    config: &ServiceConfig,
    reference: Arc<ReferenceData>,
) -> Result<(AppState, Option<PostgresPool>), AppError> {
    let api_key = config.auth.api_key.clone();

    let Some(url) = config.storage.database_url.as_deref() else {
        info!("No database URL configured, using in-memory store");
        return Ok((AppState::in_memory(reference, api_key), None));
    };

    let pool = PostgresPool::connect(
        &PostgresConfig::new(url).with_max_connections(config.storage.max_connections),
    )
    .await?;
    if config.storage.run_migrations {
        pool.run_migrations().await?;
        info!("Database migrations applied");
    }

    let store = Arc::new(pool.store());
    let state = AppState::new(store.clone(), store, reference, api_key);
    Ok((state, Some(pool)))
}
