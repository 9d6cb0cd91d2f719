//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::StorefrontConfig;
use crate::db::Storage;
use crate::services::auth::AuthService;
use crate::services::catalog::CatalogService;
use crate::services::orders::OrderService;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. The storage handle is injected
/// at construction so tests can substitute an in-memory store.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    store: Arc<dyn Storage>,
    orders: OrderService,
    catalog: CatalogService,
    auth: AuthService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `store` - Storage backend shared by every service
    #[must_use]
    pub fn new(config: StorefrontConfig, store: Arc<dyn Storage>) -> Self {
        let timeout = config.storage_timeout;
        Self {
            inner: Arc::new(AppStateInner {
                orders: OrderService::new(Arc::clone(&store), timeout),
                catalog: CatalogService::new(Arc::clone(&store), timeout),
                auth: AuthService::new(Arc::clone(&store), timeout),
                store,
                config,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the storage backend.
    #[must_use]
    pub fn store(&self) -> &dyn Storage {
        self.inner.store.as_ref()
    }

    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    /// Where the client sends the customer to pay for `order_id`.
    #[must_use]
    pub fn payment_url(&self, order_id: plateshop_core::OrderId) -> String {
        format!("{}/payment/{order_id}", self.inner.config.base_url)
    }
}
