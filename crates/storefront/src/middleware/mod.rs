//! HTTP middleware stack for the storefront.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Session layer (tower-sessions with `PostgreSQL` store)
//! 5. Rate limiting on the user routes (governor)

pub mod auth;
pub mod rate_limit;
pub mod request_id;
pub mod session;

pub use auth::{
    OptionalAuth, RequireAuth, RequireOperator, SessionCaller, caller_or_new_guest,
    clear_current_user, set_current_user,
};
pub use rate_limit::{auth_rate_limiter, rate_limit_json};
pub use request_id::request_id_middleware;
pub use session::create_session_layer;
