//! Liveness and readiness probes.

use axum::{extract::State, http::StatusCode};

use crate::services::with_deadline;
use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
pub async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if storage is not reachable in time.
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    let timeout = state.config().storage_timeout;
    match with_deadline(timeout, "ping", state.store().ping()).await {
        Ok(()) => StatusCode::OK,
        Err(err) => {
            tracing::warn!(error = %err, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
