//! Core types for Plate Shop.
//!
//! This module provides type-safe wrappers for the storefront's domain concepts.

pub mod email;
pub mod id;
pub mod plate;
pub mod price;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use plate::{BackgroundIndex, PlateText, PlateTextError, PlateTier};
pub use price::{PriceQuote, Price, PriceError, price_for, price_for_code};
pub use status::*;
