//! Axum router construction for the LEWAS API.
//!
//! Assembles all routes into a single [`Router`] with CORS and request
//! tracing enabled. Everything except `GET /` sits behind the API key
//! middleware.

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router.
///
/// The router includes:
/// - `GET /` -- public welcome message
/// - `GET /health` -- health check
/// - `POST /animal/data`, `POST /animal/data/batch` -- animal ingestion
/// - `GET /animal/data` -- merged animal listing
/// - `GET /animal/data/cow/{cow_id}` -- listing for one animal
/// - `GET /animal/data/response/{response_type}` -- listing for one category
/// - `GET /animal/data/{entry_id}` -- single animal observation
/// - `POST /v1/sensors/observations`, `POST /v1/sensors/observations/batch`
/// - `GET /v1/sensors/observations` -- merged sensor listing
/// - `GET /v1/sensors/latest` -- newest reading per instrument
/// - `GET /v1/sensors/metadata` -- reference tables
/// - `POST /admin/animal/backfill-source` -- assign missing sources
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let protected = Router::new()
        .route("/health", get(handlers::health))
        // Animal observations
        .route(
            "/animal/data",
            post(handlers::animal::create).get(handlers::animal::list),
        )
        .route("/animal/data/batch", post(handlers::animal::create_batch))
        .route("/animal/data/cow/{cow_id}", get(handlers::animal::list_by_cow))
        .route(
            "/animal/data/response/{response_type}",
            get(handlers::animal::list_by_response),
        )
        .route("/animal/data/{entry_id}", get(handlers::animal::get_entry))
        // Sensor observations
        .route(
            "/v1/sensors/observations",
            post(handlers::sensors::create).get(handlers::sensors::list),
        )
        .route(
            "/v1/sensors/observations/batch",
            post(handlers::sensors::create_batch),
        )
        .route("/v1/sensors/latest", get(handlers::sensors::latest))
        .route("/v1/sensors/metadata", get(handlers::sensors::metadata))
        // Administration
        .route(
            "/admin/animal/backfill-source",
            post(handlers::admin::backfill_source),
        )
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_api_key,
        ));

    Router::new()
        .route("/", get(handlers::index))
        .merge(protected)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
