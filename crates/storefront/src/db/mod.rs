//! Storage layer for the storefront.
//!
//! # Database: `plateshop`
//!
//! ## Tables
//!
//! - `catalog_entries` - Plate products; `reserved` marks a text that has been ordered
//! - `orders` - Order headers (owner, shipping, totals, status, payment)
//! - `order_line_items` - One row per plate text in an order
//! - `users` - Registered customers and operators
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! The order workflow only sees the [`Storage`] trait. [`PgStore`] is the one
//! production implementation; tests substitute an in-memory store.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p plateshop-cli -- migrate
//! ```

pub mod catalog;
pub mod orders;
pub mod users;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use plateshop_core::{
    CatalogEntryId, Email, OrderId, OrderStatus, OwnerId, PlateText, PlateTier, UserId, UserRole,
};

use crate::models::catalog::{CatalogEntry, NewCatalogEntry};
use crate::models::order::{NewOrder, Order, StatusUpdate};
use crate::models::user::{NewUser, ProfileUpdate, User};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The storage call did not finish before its deadline.
    #[error("storage call {0} timed out")]
    Timeout(&'static str),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A plate text could not be reserved because another order holds it.
    #[error("plate text {0} is already reserved")]
    TextReserved(PlateText),
}

impl RepositoryError {
    /// Whether the failure is transient and the call may be retried.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Timeout(_))
    }
}

/// Map a unique-constraint violation to [`RepositoryError::Conflict`].
pub(crate) fn conflict_on_unique(err: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(err)
}

// =============================================================================
// Storage Traits
// =============================================================================

/// Plate catalog persistence.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// All entries, newest first, optionally restricted to one tier.
    async fn list_catalog(
        &self,
        tier: Option<PlateTier>,
    ) -> Result<Vec<CatalogEntry>, RepositoryError>;

    async fn get_catalog_entry(
        &self,
        id: CatalogEntryId,
    ) -> Result<Option<CatalogEntry>, RepositoryError>;

    /// Insert an unreserved entry. A duplicate text is a `Conflict`.
    async fn create_catalog_entry(
        &self,
        entry: &NewCatalogEntry,
    ) -> Result<CatalogEntry, RepositoryError>;

    /// Delete an entry that is neither reserved nor referenced by a line item.
    ///
    /// Returns `NotFound` for an unknown id and `Conflict` when the entry is in use.
    async fn delete_catalog_entry(&self, id: CatalogEntryId) -> Result<(), RepositoryError>;

    /// Whether `text` is held by a reserved catalog entry or a live order.
    async fn is_text_reserved(&self, text: &PlateText) -> Result<bool, RepositoryError>;
}

/// Order persistence.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persist an order, its line items and the reservation of every text in
    /// one atomic unit.
    ///
    /// Returns `TextReserved` if any text is already held; nothing is written
    /// in that case.
    async fn place_order(&self, order: &NewOrder) -> Result<Order, RepositoryError>;

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Orders belonging to `owner`, newest first.
    async fn list_orders_for_owner(&self, owner: OwnerId) -> Result<Vec<Order>, RepositoryError>;

    /// Every order, newest first.
    async fn list_all_orders(&self) -> Result<Vec<Order>, RepositoryError>;

    /// Compare-and-set the order status.
    ///
    /// Applies `update` only while the stored status still equals `expected`
    /// and returns `None` otherwise. Moving to `cancelled` releases the order's
    /// catalog reservations in the same unit.
    async fn update_order_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        update: &StatusUpdate,
    ) -> Result<Option<Order>, RepositoryError>;
}

/// User persistence.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user. A duplicate email or ID number is a `Conflict`.
    async fn create_user(&self, user: &NewUser, password_hash: &str)
    -> Result<User, RepositoryError>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// The user and their stored PHC password hash.
    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<User, RepositoryError>;

    /// Every user, oldest first.
    async fn list_users(&self) -> Result<Vec<User>, RepositoryError>;

    async fn set_role(&self, email: &Email, role: UserRole) -> Result<User, RepositoryError>;
}

/// The complete storage interface injected into the application state.
#[async_trait]
pub trait Storage: CatalogStore + OrderStore + UserStore {
    /// Cheap connectivity check used by the readiness probe.
    async fn ping(&self) -> Result<(), RepositoryError>;
}

// =============================================================================
// PostgreSQL
// =============================================================================

/// `PostgreSQL`-backed [`Storage`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Storage for PgStore {
    async fn ping(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
