//! Domain models for the storefront.
//!
//! These types are what the storage layer returns and what the API
//! serializes. Row types used for decoding live next to their queries in
//! `db/`.

pub mod catalog;
pub mod order;
pub mod session;
pub mod user;

pub use catalog::{
    Availability, CatalogEntry, CatalogQuery, CreateCatalogEntryRequest, NewCatalogEntry,
};
pub use order::{
    CreateOrderRequest, LineItemRequest, NewLineItem, NewOrder, Order, OrderCreated,
    OrderLineItem, PayOrderRequest, PaymentDetails, StatusUpdate, UpdateStatusRequest,
};
pub use session::{Caller, CurrentUser, keys as session_keys};
pub use user::{
    LoginRequest, NewUser, ProfileUpdate, RegisterRequest, RegisteredUser, UpdateProfileRequest,
    User,
};
