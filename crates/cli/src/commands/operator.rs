//! Operator role management.
//!
//! Operators manage the catalog and move orders through fulfilment. The role
//! is stored on the user row and copied into the session at login, so a
//! change takes effect on the user's next login.

use thiserror::Error;

use plateshop_core::{Email, UserRole};
use plateshop_storefront::db::{PgStore, RepositoryError, UserStore};

use super::{CommandError, connect};

/// Errors that can occur during operator management.
#[derive(Debug, Error)]
pub enum OperatorError {
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Invalid email.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] plateshop_core::EmailError),

    /// No user registered with that email.
    #[error("No user registered with email: {0}")]
    UserNotFound(String),

    #[error("Repository error: {0}")]
    Repository(RepositoryError),
}

async fn set_role(email: &str, role: UserRole) -> Result<(), OperatorError> {
    let email = Email::parse(email)?;
    let store = PgStore::new(connect().await?);

    let user = store.set_role(&email, role).await.map_err(|e| match e {
        RepositoryError::NotFound => OperatorError::UserNotFound(email.to_string()),
        other => OperatorError::Repository(other),
    })?;

    tracing::info!(user_id = %user.id, email = %user.email, role = %user.role, "Role updated");
    Ok(())
}

/// Grant the operator role.
pub async fn grant(email: &str) -> Result<(), OperatorError> {
    set_role(email, UserRole::Operator).await
}

/// Revoke the operator role.
pub async fn revoke(email: &str) -> Result<(), OperatorError> {
    set_role(email, UserRole::Customer).await
}
