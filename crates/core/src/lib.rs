//! Plate Shop Core - Shared domain types.
//!
//! This crate provides the types used by every Plate Shop component:
//! - `storefront` - Order, catalog, and identity API
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and pure rules - no I/O, no database
//! access, no HTTP. Plate text validation, tier pricing, and the order status
//! lifecycle live here so they can be tested without any infrastructure.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, plate text, prices, emails, and status enums

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
