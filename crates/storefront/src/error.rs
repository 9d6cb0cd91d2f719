//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server-class errors to
//! Sentry before responding to the client. All route handlers return
//! `Result<T, AppError>`.
//!
//! Every error response is JSON:
//!
//! ```json
//! { "kind": "plate_unavailable", "message": "plate text KBB100K is not available" }
//! ```

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::catalog::CatalogError;
use crate::services::orders::OrderError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Storage operation failed outside a service.
    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Order workflow failed.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Catalog operation failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Malformed request body, path or query.
    #[error("{0}")]
    Validation(String),

    /// Caller is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller lacks the required capability.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Wire form of an error.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub kind: &'static str,
    pub message: String,
}

const INTERNAL: (StatusCode, &str) = (StatusCode::INTERNAL_SERVER_ERROR, "internal_error");
const UNAVAILABLE: (StatusCode, &str) = (StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable");
const VALIDATION: (StatusCode, &str) = (StatusCode::BAD_REQUEST, "validation_error");
const CONFLICT: (StatusCode, &str) = (StatusCode::CONFLICT, "conflict");
const NOT_FOUND: (StatusCode, &str) = (StatusCode::NOT_FOUND, "not_found");
const UNAUTHORIZED: (StatusCode, &str) = (StatusCode::UNAUTHORIZED, "unauthorized");
const FORBIDDEN: (StatusCode, &str) = (StatusCode::FORBIDDEN, "forbidden");

const fn repository_kind(err: &RepositoryError) -> (StatusCode, &'static str) {
    match err {
        RepositoryError::Database(_) | RepositoryError::Timeout(_) => UNAVAILABLE,
        RepositoryError::NotFound => NOT_FOUND,
        RepositoryError::Conflict(_) => CONFLICT,
        RepositoryError::TextReserved(_) => (StatusCode::BAD_REQUEST, "plate_unavailable"),
        RepositoryError::DataCorruption(_) => INTERNAL,
    }
}

impl AppError {
    /// HTTP status and error kind for this error.
    #[must_use]
    pub const fn kind(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Repository(err) => repository_kind(err),
            Self::Order(err) => match err {
                OrderError::Validation(_) => VALIDATION,
                OrderError::PlateUnavailable(_) => (StatusCode::BAD_REQUEST, "plate_unavailable"),
                OrderError::Forbidden(_) => FORBIDDEN,
                OrderError::NotFound => NOT_FOUND,
                OrderError::InvalidTransition { .. } => {
                    (StatusCode::CONFLICT, "invalid_transition")
                }
                OrderError::StorageUnavailable(_) => UNAVAILABLE,
                OrderError::Internal(_) => INTERNAL,
            },
            Self::Catalog(err) => match err {
                CatalogError::Validation(_) => VALIDATION,
                CatalogError::Forbidden => FORBIDDEN,
                CatalogError::NotFound => NOT_FOUND,
                CatalogError::Conflict(_) => CONFLICT,
                CatalogError::Repository(err) => repository_kind(err),
            },
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials | AuthError::UserNotFound => UNAUTHORIZED,
                AuthError::UserAlreadyExists(_) => CONFLICT,
                AuthError::WeakPassword(_)
                | AuthError::InvalidEmail(_)
                | AuthError::MissingField(_) => VALIDATION,
                AuthError::Forbidden => FORBIDDEN,
                AuthError::Repository(err) => repository_kind(err),
                AuthError::PasswordHash => INTERNAL,
            },
            Self::Validation(_) => VALIDATION,
            Self::Unauthorized(_) => UNAUTHORIZED,
            Self::Forbidden(_) => FORBIDDEN,
            Self::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate_limited"),
            Self::Internal(_) => INTERNAL,
        }
    }

    /// Message safe to show the client.
    fn public_message(&self, status: StatusCode) -> String {
        if status == StatusCode::SERVICE_UNAVAILABLE {
            return "Storage temporarily unavailable, please retry".to_owned();
        }
        if status.is_server_error() {
            // Don't expose internal error details to clients
            return "Internal server error".to_owned();
        }
        match self {
            Self::Auth(AuthError::InvalidCredentials | AuthError::UserNotFound) => {
                "Invalid credentials".to_owned()
            }
            Self::Auth(AuthError::InvalidEmail(_)) => "Invalid email address".to_owned(),
            Self::Auth(AuthError::WeakPassword(msg)) => msg.clone(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = self.kind();

        // Capture server errors to Sentry
        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                kind,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let body = ErrorBody {
            kind,
            message: self.public_message(status),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use plateshop_core::{OrderStatus, PlateText};

    fn kind_of(err: AppError) -> (StatusCode, &'static str) {
        err.kind()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::Unauthorized("login required".to_string());
        assert_eq!(err.to_string(), "Unauthorized: login required");
    }

    #[test]
    fn test_order_error_kinds() {
        let text = PlateText::parse("KBB100K").unwrap();
        assert_eq!(
            kind_of(OrderError::PlateUnavailable(text).into()),
            (StatusCode::BAD_REQUEST, "plate_unavailable")
        );
        assert_eq!(
            kind_of(
                OrderError::InvalidTransition {
                    from: OrderStatus::Delivered,
                    to: OrderStatus::Cancelled,
                }
                .into()
            ),
            (StatusCode::CONFLICT, "invalid_transition")
        );
        assert_eq!(
            kind_of(OrderError::StorageUnavailable(RepositoryError::Timeout("get_order")).into()),
            (StatusCode::SERVICE_UNAVAILABLE, "storage_unavailable")
        );
        assert_eq!(
            kind_of(OrderError::Forbidden("nope").into()).0,
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_auth_and_catalog_kinds() {
        assert_eq!(
            kind_of(AuthError::UserAlreadyExists("email already registered".into()).into()),
            CONFLICT
        );
        assert_eq!(kind_of(AuthError::InvalidCredentials.into()), UNAUTHORIZED);
        assert_eq!(kind_of(CatalogError::Forbidden.into()), FORBIDDEN);
        assert_eq!(
            kind_of(RepositoryError::DataCorruption("bad row".into()).into()),
            INTERNAL
        );
        assert_eq!(
            kind_of(AppError::RateLimited),
            (StatusCode::TOO_MANY_REQUESTS, "rate_limited")
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::Internal("connection string leaked".into());
        let (status, _) = err.kind();
        assert_eq!(err.public_message(status), "Internal server error");

        let err = AppError::Auth(AuthError::UserNotFound);
        let (status, _) = err.kind();
        assert_eq!(err.public_message(status), "Invalid credentials");
    }
}
