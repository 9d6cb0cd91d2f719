//! Order aggregate and its request shapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use plateshop_core::{
    BackgroundIndex, LineItemId, OrderId, OrderStatus, OwnerId, PaymentMethod, PlateText,
    PlateTier, Price, PriceError, ShippingMethod,
};

/// One plate in an order. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineItem {
    pub id: LineItemId,
    pub plate_text: PlateText,
    pub tier: PlateTier,
    pub quantity: u32,
    pub unit_price: Price,
    pub background_index: Option<BackgroundIndex>,
}

impl OrderLineItem {
    /// `unit_price * quantity`.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Overflow`] if the product does not fit.
    pub fn subtotal(&self) -> Result<Price, PriceError> {
        self.unit_price.checked_mul(self.quantity)
    }
}

/// A purchase of one or more plates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    pub owner_id: OwnerId,
    pub line_items: Vec<OrderLineItem>,
    pub shipping_method: ShippingMethod,
    pub shipping_cost: Price,
    pub total_amount: Price,
    pub status: OrderStatus,
    pub payment_method: Option<PaymentMethod>,
    pub payment_reference: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// `Σ(unit_price × quantity) + shipping_cost`.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Overflow`] if the total does not fit.
    pub fn compute_total<I>(items: I, shipping_cost: Price) -> Result<Price, PriceError>
    where
        I: IntoIterator<Item = (Price, u32)>,
    {
        let subtotals = items
            .into_iter()
            .map(|(unit, quantity)| unit.checked_mul(quantity))
            .collect::<Result<Vec<_>, _>>()?;
        Price::checked_sum(subtotals)?.checked_add(shipping_cost)
    }

    /// Recompute the total from the line items.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Overflow`] if the total does not fit.
    pub fn recomputed_total(&self) -> Result<Price, PriceError> {
        Self::compute_total(
            self.line_items.iter().map(|li| (li.unit_price, li.quantity)),
            self.shipping_cost,
        )
    }

    #[must_use]
    pub fn is_owned_by(&self, owner: OwnerId) -> bool {
        self.owner_id == owner
    }
}

/// A validated order ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub id: OrderId,
    pub owner_id: OwnerId,
    pub line_items: Vec<NewLineItem>,
    pub shipping_method: ShippingMethod,
    pub shipping_cost: Price,
    pub total_amount: Price,
    pub address: Option<String>,
    pub city: Option<String>,
    pub phone_number: Option<String>,
}

/// A validated, priced line item ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLineItem {
    pub plate_text: PlateText,
    pub tier: PlateTier,
    pub quantity: u32,
    pub unit_price: Price,
    pub background_index: Option<BackgroundIndex>,
}

/// Payment fields recorded when an order is paid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentDetails {
    pub method: PaymentMethod,
    pub reference: String,
}

/// The change applied by a status compare-and-set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub next: OrderStatus,
    pub payment: Option<PaymentDetails>,
}

impl StatusUpdate {
    #[must_use]
    pub const fn to(next: OrderStatus) -> Self {
        Self {
            next,
            payment: None,
        }
    }

    #[must_use]
    pub const fn paid(payment: PaymentDetails) -> Self {
        Self {
            next: OrderStatus::PaymentCompleted,
            payment: Some(payment),
        }
    }
}

// =============================================================================
// Request Types
// =============================================================================

const fn default_quantity() -> u32 {
    1
}

/// One cart line as submitted by the client.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LineItemRequest {
    pub text: String,
    pub tier: String,
    #[serde(default = "default_quantity")]
    pub quantity: u32,
    pub background_index: Option<u8>,
    pub unit_price: Option<i64>,
}

/// Body of `POST /api/orders`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateOrderRequest {
    pub items: Vec<LineItemRequest>,
    #[serde(default)]
    pub shipping_method: ShippingMethod,
    pub address: Option<String>,
    pub city: Option<String>,
    pub phone_number: Option<String>,
}

/// Body of `PUT /api/orders/{id}/pay`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PayOrderRequest {
    pub payment_method: PaymentMethod,
    pub payment_reference: String,
}

/// Body of `PUT /api/orders/{id}/status`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateStatusRequest {
    pub status: OrderStatus,
}

/// Response of `POST /api/orders`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    pub order: Order,
    pub payment_url: String,
}
