//! Route table: wires [`crate::handlers`] onto the method/path pairs from
//! spec.md §6, with the correlation-id, tracing, and CORS middleware
//! layered the way the teacher layers them onto its Axum router.

use crate::handlers;
use crate::middleware::correlation_id;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the full router, ready to serve once bound to a listener.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/query", post(handlers::query))
        .route("/api/v1/execute_snippet", post(handlers::execute_snippet))
        .route("/api/v1/create_heavy_job", post(handlers::create_heavy_job))
        .route("/api/v1/health", get(handlers::health))
        .route("/api/v1/ready", get(handlers::ready))
        .route("/api/v1/job_history", get(handlers::job_history_list))
        .route("/api/v1/job_history/{requestId}", get(handlers::job_history_get))
        .route("/metrics", get(handlers::metrics))
        .layer(axum::middleware::from_fn(correlation_id))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
