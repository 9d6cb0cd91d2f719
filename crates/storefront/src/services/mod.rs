//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `orders` - Order workflow (create, pay, status, retrieval) and availability
//! - `catalog` - Plate catalog management and price quotes
//! - `auth` - User registration, login and profiles
//!
//! Services hold an `Arc<dyn Storage>` and never see the database pool
//! directly, so tests can inject an in-memory store.

pub mod auth;
pub mod catalog;
pub mod orders;

use std::future::Future;
use std::time::Duration;

use crate::db::RepositoryError;

/// Run a storage call with a deadline.
///
/// # Errors
///
/// Returns [`RepositoryError::Timeout`] naming `op` if `limit` elapses first,
/// otherwise whatever the call itself returned.
pub(crate) async fn with_deadline<T, F>(
    limit: Duration,
    op: &'static str,
    call: F,
) -> Result<T, RepositoryError>
where
    F: Future<Output = Result<T, RepositoryError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| RepositoryError::Timeout(op))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_with_deadline_passes_result_through() {
        let result = with_deadline(Duration::from_secs(1), "ping", async { Ok(7) }).await;
        assert!(matches!(result, Ok(7)));
    }

    #[tokio::test]
    async fn test_with_deadline_times_out() {
        let result: Result<(), _> = with_deadline(Duration::from_millis(5), "slow", async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(RepositoryError::Timeout("slow"))));
    }
}
