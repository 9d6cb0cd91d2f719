//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                              - Liveness
//! GET    /health/ready                        - Readiness (storage ping)
//!
//! # Plates
//! GET    /api/plates?type=                    - Catalog listing
//! POST   /api/plates                          - Create catalog entry (operator)
//! GET    /api/plates/{id}                     - Catalog entry
//! DELETE /api/plates/{id}                     - Delete catalog entry (operator)
//! GET    /api/plates/price/{tier}             - Price quote
//! GET    /api/plates/check-availability/{text} - Availability
//!
//! # Orders
//! POST   /api/orders                          - Create order (user or guest)
//! GET    /api/orders                          - Caller's orders
//! GET    /api/orders/admin                    - All orders (operator)
//! GET    /api/orders/{id}                     - Order (owner or operator)
//! PUT    /api/orders/{id}/pay                 - Record payment (owner)
//! PUT    /api/orders/{id}/status              - Change status (operator)
//!
//! # Users
//! POST   /api/users                           - Register (rate limited)
//! GET    /api/users                           - List users (operator)
//! POST   /api/users/login                     - Login (rate limited)
//! POST   /api/users/logout                    - Logout
//! GET    /api/users/profile                   - Own profile
//! PUT    /api/users/profile                   - Update own profile
//! ```

pub mod health;
pub mod orders;
pub mod plates;
pub mod users;

use axum::{
    Router,
    middleware::map_response,
    routing::{MethodRouter, get, post, put},
};

use crate::middleware::{auth_rate_limiter, rate_limit_json};
use crate::state::AppState;

/// Create the plate routes router.
pub fn plate_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(plates::list).post(plates::create))
        .route("/{id}", get(plates::show).delete(plates::delete))
        .route("/price/{tier}", get(plates::price))
        .route("/check-availability/{text}", get(plates::check_availability))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list_mine).post(orders::create))
        .route("/admin", get(orders::list_all))
        .route("/{id}", get(orders::show))
        .route("/{id}/pay", put(orders::pay))
        .route("/{id}/status", put(orders::set_status))
}

fn throttle(route: MethodRouter<AppState>, rate_limit: bool) -> MethodRouter<AppState> {
    if rate_limit {
        route
            .layer(auth_rate_limiter())
            .layer(map_response(rate_limit_json))
    } else {
        route
    }
}

/// Create the user routes router.
///
/// Registration and login are throttled per client IP when `rate_limit` is set.
pub fn user_routes(rate_limit: bool) -> Router<AppState> {
    Router::new()
        .route(
            "/",
            throttle(post(users::register), rate_limit).get(users::list),
        )
        .route("/login", throttle(post(users::login), rate_limit))
        .route("/logout", post(users::logout))
        .route(
            "/profile",
            get(users::profile).put(users::update_profile),
        )
}

/// Create all routes for the storefront.
pub fn routes(rate_limit: bool) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/api/plates", plate_routes())
        .nest("/api/orders", order_routes())
        .nest("/api/users", user_routes(rate_limit))
}
