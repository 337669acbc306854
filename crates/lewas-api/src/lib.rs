//! HTTP API for the LEWAS observation service.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **Animal endpoints** (`/animal/data...`) for ingesting and listing
//!   animal-behavior observations
//! - **Sensor endpoints** (`/v1/sensors/...`) for ingesting and listing
//!   environmental readings by reference name
//! - **Admin endpoints** (`/admin/...`) for one-off data maintenance
//! - **Public and health endpoints** (`/`, `/health`)
//!
//! # Architecture
//!
//! Handlers are thin: they validate request shapes, call the services in
//! `lewas-core`, and map [`CoreError`](lewas_core::CoreError) into HTTP
//! statuses through [`ApiError`]. Every route except `GET /` requires the
//! `X-API-Key` header.

pub mod auth;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, bind, serve, shutdown_signal};
pub use state::AppState;
