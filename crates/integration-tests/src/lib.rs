//! Integration test support for Plate Shop.
//!
//! # Running Tests
//!
//! ```bash
//! # In-memory workflow and HTTP tests
//! cargo test -p plateshop-integration-tests
//!
//! # PostgreSQL tests (migrated database required)
//! TEST_DATABASE_URL=postgres://... cargo test -p plateshop-integration-tests -- --ignored
//! ```
//!
//! # Test Categories
//!
//! - `order_workflow` - `OrderService` against [`MemoryStorage`]
//! - `api_*` - The full router driven with `tower::ServiceExt::oneshot`
//! - `postgres_store` - `PgStore` against a real database (ignored by default)

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::Utc;
use serde_json::Value;
use tower::ServiceExt;

use plateshop_core::{
    CatalogEntryId, Email, LineItemId, OrderId, OrderStatus, OwnerId, PlateText, PlateTier,
    UserId, UserRole, price_for,
};
use plateshop_storefront::config::StorefrontConfig;
use plateshop_storefront::db::{CatalogStore, OrderStore, RepositoryError, Storage, UserStore};
use plateshop_storefront::models::{
    CatalogEntry, NewCatalogEntry, NewOrder, NewUser, Order, OrderLineItem, ProfileUpdate,
    StatusUpdate, User,
};
use plateshop_storefront::state::AppState;

// =============================================================================
// In-memory storage
// =============================================================================

#[derive(Default)]
struct Inner {
    catalog: Vec<CatalogEntry>,
    next_catalog_id: i32,
    orders: Vec<Order>,
    next_line_item_id: i32,
    users: Vec<(User, String)>,
}

impl Inner {
    fn entry_mut(&mut self, text: &PlateText) -> Option<&mut CatalogEntry> {
        self.catalog.iter_mut().find(|e| &e.text == text)
    }

    fn text_held(&self, text: &PlateText) -> bool {
        self.catalog.iter().any(|e| &e.text == text && !e.is_available)
            || self.orders.iter().any(|o| {
                o.status != OrderStatus::Cancelled
                    && o.line_items.iter().any(|li| &li.plate_text == text)
            })
    }

    fn referenced(&self, text: &PlateText) -> bool {
        self.orders
            .iter()
            .any(|o| o.line_items.iter().any(|li| &li.plate_text == text))
    }
}

/// [`Storage`] kept in process memory, with failure injection.
///
/// Each call takes one lock, so every operation is atomic the way a
/// transaction is in `PgStore`.
#[derive(Default)]
pub struct MemoryStorage {
    inner: Mutex<Inner>,
    unavailable: AtomicBool,
    stale_availability: AtomicBool,
    delay: Mutex<Option<Duration>>,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every call fail as if the database were down.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Report every text as free from `is_text_reserved`, so the
    /// reservation itself has to catch conflicts.
    pub fn set_stale_availability(&self, stale: bool) {
        self.stale_availability.store(stale, Ordering::SeqCst);
    }

    /// Delay every call by `delay`.
    pub fn set_delay(&self, delay: Option<Duration>) {
        *self.delay.lock().unwrap_or_else(PoisonError::into_inner) = delay;
    }

    /// Number of stored orders.
    #[must_use]
    pub fn order_count(&self) -> usize {
        self.lock().orders.len()
    }

    /// Whether `text` has a reserved catalog entry.
    #[must_use]
    pub fn is_reserved_in_catalog(&self, text: &str) -> bool {
        let text = PlateText::parse(text).unwrap();
        self.lock()
            .catalog
            .iter()
            .any(|e| e.text == text && !e.is_available)
    }

    async fn enter(&self) -> Result<(), RepositoryError> {
        let delay = *self.delay.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl CatalogStore for MemoryStorage {
    async fn list_catalog(
        &self,
        tier: Option<PlateTier>,
    ) -> Result<Vec<CatalogEntry>, RepositoryError> {
        self.enter().await?;
        Ok(self
            .lock()
            .catalog
            .iter()
            .rev()
            .filter(|e| tier.is_none_or(|t| e.tier == t))
            .cloned()
            .collect())
    }

    async fn get_catalog_entry(
        &self,
        id: CatalogEntryId,
    ) -> Result<Option<CatalogEntry>, RepositoryError> {
        self.enter().await?;
        Ok(self.lock().catalog.iter().find(|e| e.id == id).cloned())
    }

    async fn create_catalog_entry(
        &self,
        entry: &NewCatalogEntry,
    ) -> Result<CatalogEntry, RepositoryError> {
        self.enter().await?;
        let mut inner = self.lock();
        if inner.catalog.iter().any(|e| e.text == entry.text) {
            return Err(RepositoryError::Conflict("plate text already exists".to_owned()));
        }
        inner.next_catalog_id += 1;
        let now = Utc::now();
        let created = CatalogEntry {
            id: CatalogEntryId::new(inner.next_catalog_id),
            text: entry.text.clone(),
            tier: entry.tier,
            price: entry.price,
            description: entry.description.clone(),
            is_available: true,
            created_at: now,
            updated_at: now,
        };
        inner.catalog.push(created.clone());
        Ok(created)
    }

    async fn delete_catalog_entry(&self, id: CatalogEntryId) -> Result<(), RepositoryError> {
        self.enter().await?;
        let mut inner = self.lock();
        let entry = inner
            .catalog
            .iter()
            .find(|e| e.id == id)
            .cloned()
            .ok_or(RepositoryError::NotFound)?;
        if !entry.is_available || inner.referenced(&entry.text) {
            return Err(RepositoryError::Conflict(
                "plate is reserved or referenced by an order".to_owned(),
            ));
        }
        inner.catalog.retain(|e| e.id != id);
        Ok(())
    }

    async fn is_text_reserved(&self, text: &PlateText) -> Result<bool, RepositoryError> {
        self.enter().await?;
        if self.stale_availability.load(Ordering::SeqCst) {
            return Ok(false);
        }
        Ok(self.lock().text_held(text))
    }
}

#[async_trait]
impl OrderStore for MemoryStorage {
    async fn place_order(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        self.enter().await?;
        let mut inner = self.lock();

        // Check everything first so a conflict writes nothing.
        for item in &order.line_items {
            if inner
                .catalog
                .iter()
                .any(|e| e.text == item.plate_text && (!e.is_available || e.tier != item.tier))
            {
                return Err(RepositoryError::TextReserved(item.plate_text.clone()));
            }
        }

        let now = Utc::now();
        let mut line_items = Vec::with_capacity(order.line_items.len());
        for item in &order.line_items {
            if let Some(entry) = inner.entry_mut(&item.plate_text) {
                entry.is_available = false;
                entry.updated_at = now;
            } else {
                inner.next_catalog_id += 1;
                let id = CatalogEntryId::new(inner.next_catalog_id);
                inner.catalog.push(CatalogEntry {
                    id,
                    text: item.plate_text.clone(),
                    tier: item.tier,
                    price: price_for(item.tier),
                    description: None,
                    is_available: false,
                    created_at: now,
                    updated_at: now,
                });
            }

            inner.next_line_item_id += 1;
            line_items.push(OrderLineItem {
                id: LineItemId::new(inner.next_line_item_id),
                plate_text: item.plate_text.clone(),
                tier: item.tier,
                quantity: item.quantity,
                unit_price: item.unit_price,
                background_index: item.background_index,
            });
        }

        let placed = Order {
            id: order.id,
            owner_id: order.owner_id,
            line_items,
            shipping_method: order.shipping_method,
            shipping_cost: order.shipping_cost,
            total_amount: order.total_amount,
            status: OrderStatus::Pending,
            payment_method: None,
            payment_reference: None,
            address: order.address.clone(),
            city: order.city.clone(),
            phone_number: order.phone_number.clone(),
            created_at: now,
            updated_at: now,
        };
        inner.orders.push(placed.clone());
        Ok(placed)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        self.enter().await?;
        Ok(self.lock().orders.iter().find(|o| o.id == id).cloned())
    }

    async fn list_orders_for_owner(&self, owner: OwnerId) -> Result<Vec<Order>, RepositoryError> {
        self.enter().await?;
        Ok(self
            .lock()
            .orders
            .iter()
            .rev()
            .filter(|o| o.owner_id == owner)
            .cloned()
            .collect())
    }

    async fn list_all_orders(&self) -> Result<Vec<Order>, RepositoryError> {
        self.enter().await?;
        Ok(self.lock().orders.iter().rev().cloned().collect())
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        update: &StatusUpdate,
    ) -> Result<Option<Order>, RepositoryError> {
        self.enter().await?;
        let mut inner = self.lock();

        let Some(order) = inner
            .orders
            .iter_mut()
            .find(|o| o.id == id && o.status == expected)
        else {
            return Ok(None);
        };

        order.status = update.next;
        if let Some(payment) = &update.payment {
            order.payment_method = Some(payment.method);
            order.payment_reference = Some(payment.reference.clone());
        }
        order.updated_at = Utc::now();
        let updated = order.clone();

        if update.next == OrderStatus::Cancelled {
            for item in &updated.line_items {
                if let Some(entry) = inner.entry_mut(&item.plate_text) {
                    entry.is_available = true;
                }
            }
        }

        Ok(Some(updated))
    }
}

#[async_trait]
impl UserStore for MemoryStorage {
    async fn create_user(
        &self,
        user: &NewUser,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        self.enter().await?;
        let mut inner = self.lock();
        if inner.users.iter().any(|(u, _)| u.email == user.email) {
            return Err(RepositoryError::Conflict("email already registered".to_owned()));
        }
        if inner.users.iter().any(|(u, _)| u.id_number == user.id_number) {
            return Err(RepositoryError::Conflict("ID number already registered".to_owned()));
        }
        let now = Utc::now();
        let created = User {
            id: UserId::random(),
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            id_number: user.id_number.clone(),
            address: user.address.clone(),
            city: user.city.clone(),
            role: UserRole::Customer,
            created_at: now,
            updated_at: now,
        };
        inner.users.push((created.clone(), password_hash.to_owned()));
        Ok(created)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        self.enter().await?;
        Ok(self
            .lock()
            .users
            .iter()
            .find(|(u, _)| u.id == id)
            .map(|(u, _)| u.clone()))
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        self.enter().await?;
        Ok(self
            .lock()
            .users
            .iter()
            .find(|(u, _)| &u.email == email)
            .cloned())
    }

    async fn update_profile(
        &self,
        id: UserId,
        update: &ProfileUpdate,
    ) -> Result<User, RepositoryError> {
        self.enter().await?;
        let mut inner = self.lock();
        let (user, _) = inner
            .users
            .iter_mut()
            .find(|(u, _)| u.id == id)
            .ok_or(RepositoryError::NotFound)?;
        update.apply_to(user);
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn list_users(&self) -> Result<Vec<User>, RepositoryError> {
        self.enter().await?;
        Ok(self.lock().users.iter().map(|(u, _)| u.clone()).collect())
    }

    async fn set_role(&self, email: &Email, role: UserRole) -> Result<User, RepositoryError> {
        self.enter().await?;
        let mut inner = self.lock();
        let (user, _) = inner
            .users
            .iter_mut()
            .find(|(u, _)| &u.email == email)
            .ok_or(RepositoryError::NotFound)?;
        user.role = role;
        Ok(user.clone())
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn ping(&self) -> Result<(), RepositoryError> {
        self.enter().await
    }
}

// =============================================================================
// Application helpers
// =============================================================================

/// Public base URL used by test configuration.
pub const BASE_URL: &str = "http://localhost:3000";

/// Configuration with a short storage deadline.
#[must_use]
pub fn test_config(timeout_ms: u64) -> StorefrontConfig {
    let vars: HashMap<&str, String> = HashMap::from([
        ("STOREFRONT_DATABASE_URL", "postgres://unused".to_owned()),
        ("STOREFRONT_BASE_URL", format!("{BASE_URL}/")),
        ("STOREFRONT_STORAGE_TIMEOUT_MS", timeout_ms.to_string()),
    ]);
    StorefrontConfig::from_lookup(|key| vars.get(key).cloned()).unwrap()
}

/// Application state over `store` with a 200 ms storage deadline.
#[must_use]
pub fn test_state(store: Arc<MemoryStorage>) -> AppState {
    AppState::new(test_config(200), store)
}

/// The full router over `store`, with in-memory sessions and no rate limit.
#[must_use]
pub fn test_app(store: Arc<MemoryStorage>) -> Router {
    plateshop_storefront::app(test_state(store), tower_sessions::MemoryStore::default(), false)
}

/// A cookie-carrying client that drives the router in process.
#[derive(Clone)]
pub struct TestClient {
    app: Router,
    cookie: Option<String>,
}

impl TestClient {
    #[must_use]
    pub const fn new(app: Router) -> Self {
        Self { app, cookie: None }
    }

    /// Send a request and decode the JSON body (`Value::Null` when empty).
    pub async fn send(&mut self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = &self.cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();

        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_owned());
        }

        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }

    pub async fn get(&mut self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::GET, uri, None).await
    }

    pub async fn post(&mut self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&mut self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(Method::PUT, uri, Some(body)).await
    }

    pub async fn delete(&mut self, uri: &str) -> (StatusCode, Value) {
        self.send(Method::DELETE, uri, None).await
    }

    /// Register and stay signed in.
    pub async fn register(&mut self, name: &str, email: &str, id_number: &str) -> Value {
        let (status, body) = self
            .post(
                "/api/users",
                serde_json::json!({
                    "name": name,
                    "email": email,
                    "phone": "0712345678",
                    "idNumber": id_number,
                    "password": "s3cret-pass",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
        body
    }

    pub async fn login(&mut self, email: &str) -> (StatusCode, Value) {
        self.post(
            "/api/users/login",
            serde_json::json!({ "email": email, "password": "s3cret-pass" }),
        )
        .await
    }
}

/// A client signed in as an operator.
pub async fn operator_client(app: Router, store: &MemoryStorage) -> TestClient {
    let mut client = TestClient::new(app);
    client.register("Ops", "ops@plateshop.test", "OPS-1").await;
    store
        .set_role(&Email::parse("ops@plateshop.test").unwrap(), UserRole::Operator)
        .await
        .unwrap();
    // The role is captured in the session at login.
    let (status, _) = client.login("ops@plateshop.test").await;
    assert_eq!(status, StatusCode::OK);
    client
}

/// A one-plate cart body.
#[must_use]
pub fn cart(text: &str, tier: &str) -> Value {
    serde_json::json!({
        "items": [{ "text": text, "tier": tier }],
        "shippingMethod": "free",
    })
}
