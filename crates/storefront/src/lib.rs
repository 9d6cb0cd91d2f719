//! Plate Shop storefront library.
//!
//! The JSON API for ordering custom license plates: catalog, availability,
//! order workflow and user accounts. The binary in `main.rs` wires this
//! library to `PostgreSQL`; tests drive [`app`] with in-memory stores.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;

use axum::{Router, extract::Request};
use tower_http::trace::TraceLayer;
use tower_sessions::SessionStore;

use crate::state::AppState;

/// Build the application router with sessions, request ids and tracing.
///
/// Sentry layers are added by the binary so tests run without a hub.
pub fn app<S>(state: AppState, sessions: S, rate_limit: bool) -> Router
where
    S: SessionStore + Clone,
{
    let session_layer = middleware::create_session_layer(sessions, state.config());

    routes::routes(rate_limit)
        .layer(session_layer)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state)
}
