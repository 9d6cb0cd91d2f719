//! Order workflow.
//!
//! Turns a validated cart into a persisted, reserved order and moves orders
//! through their lifecycle:
//!
//! ```text
//! pending -> payment_completed -> processing -> shipped -> delivered
//!     \______________\_______________\____________\-> cancelled
//! ```
//!
//! Every storage call is bounded by the configured storage timeout. Status
//! changes are compare-and-set against the status that was read, so two
//! racing writers cannot both win.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, instrument, warn};

use plateshop_core::{
    BackgroundIndex, OrderId, OrderStatus, OwnerId, PlateText, PlateTextError, PlateTier, Price,
    PriceError, ShippingMethod, price_for,
};

use super::with_deadline;
use crate::db::{RepositoryError, Storage};
use crate::models::order::{
    CreateOrderRequest, NewLineItem, NewOrder, Order, PaymentDetails, StatusUpdate,
};
use crate::models::session::Caller;

/// Largest quantity accepted for a single line item.
pub const MAX_QUANTITY: u32 = 100;

/// Errors returned by the order workflow.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The request is malformed (text, tier, quantity, price, payment fields).
    #[error("{0}")]
    Validation(String),

    /// The plate text is already reserved by another order.
    #[error("plate text {0} is not available")]
    PlateUnavailable(PlateText),

    /// The caller may not act on this order.
    #[error("{0}")]
    Forbidden(&'static str),

    #[error("order not found")]
    NotFound,

    /// The requested status change is not a lifecycle edge.
    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    /// Storage failed transiently or timed out; the call may be retried.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] RepositoryError),

    /// Stored data is inconsistent or an invariant was violated.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for OrderError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::TextReserved(text) => Self::PlateUnavailable(text),
            RepositoryError::NotFound => Self::NotFound,
            err if err.is_transient() => Self::StorageUnavailable(err),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<PlateTextError> for OrderError {
    fn from(err: PlateTextError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<PriceError> for OrderError {
    fn from(err: PriceError) -> Self {
        Self::Validation(err.to_string())
    }
}

// =============================================================================
// Draft
// =============================================================================

/// One validated cart line, not yet priced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftItem {
    pub text: PlateText,
    pub tier: PlateTier,
    pub quantity: u32,
    pub background_index: Option<BackgroundIndex>,
    /// Client-supplied unit price, honored only for operators.
    pub unit_price: Option<Price>,
}

/// A cart that has passed every check that needs no storage access.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub items: Vec<DraftItem>,
    pub shipping_method: ShippingMethod,
    pub address: Option<String>,
    pub city: Option<String>,
    pub phone_number: Option<String>,
}

impl OrderDraft {
    /// Validate a create-order request.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Validation`] for an empty cart, an unknown tier, a
    /// text that breaks its tier rule, a quantity outside `1..=100`, a
    /// background on a non-prestige plate, a negative price or a text that
    /// appears twice.
    pub fn parse(req: &CreateOrderRequest) -> Result<Self, OrderError> {
        if req.items.is_empty() {
            return Err(OrderError::Validation(
                "order must contain at least one plate".to_owned(),
            ));
        }

        let mut seen = HashSet::new();
        let mut items = Vec::with_capacity(req.items.len());

        for item in &req.items {
            let tier: PlateTier = item.tier.parse()?;
            let text = PlateText::parse_for_tier(&item.text, tier)?;

            if !(1..=MAX_QUANTITY).contains(&item.quantity) {
                return Err(OrderError::Validation(format!(
                    "quantity for {text} must be between 1 and {MAX_QUANTITY}"
                )));
            }

            let background_index = item.background_index.map(BackgroundIndex::new).transpose()?;
            tier.check_background(background_index)?;

            let unit_price = item.unit_price.map(Price::new).transpose()?;

            if !seen.insert(text.clone()) {
                return Err(OrderError::Validation(format!(
                    "plate text {text} appears more than once"
                )));
            }

            items.push(DraftItem {
                text,
                tier,
                quantity: item.quantity,
                background_index,
                unit_price,
            });
        }

        Ok(Self {
            items,
            shipping_method: req.shipping_method,
            address: non_blank(req.address.as_deref()),
            city: non_blank(req.city.as_deref()),
            phone_number: non_blank(req.phone_number.as_deref()),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// Resolve the unit price for a line, applying the override rule.
fn unit_price_for(item: &DraftItem, caller: Caller) -> Result<Price, OrderError> {
    let list_price = price_for(item.tier);
    match item.unit_price {
        None => Ok(list_price),
        Some(price) if caller.is_operator || price == list_price => Ok(price),
        Some(price) => Err(OrderError::Validation(format!(
            "unit price {price} for {} does not match the {} price {list_price}",
            item.text, item.tier
        ))),
    }
}

// =============================================================================
// Service
// =============================================================================

/// Order workflow over an injected storage handle.
#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Storage>,
    timeout: Duration,
}

impl OrderService {
    #[must_use]
    pub fn new(store: Arc<dyn Storage>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Whether `text` can still be ordered.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::StorageUnavailable`] if the lookup fails. A failed
    /// lookup is never reported as "unavailable".
    pub async fn is_available(&self, text: &PlateText) -> Result<bool, OrderError> {
        let reserved = with_deadline(
            self.timeout,
            "is_text_reserved",
            self.store.is_text_reserved(text),
        )
        .await?;
        Ok(!reserved)
    }

    /// Normalize an untrusted text and check its availability.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Validation`] if `raw` is not a plate text.
    #[instrument(skip(self))]
    pub async fn check_availability(&self, raw: &str) -> Result<(PlateText, bool), OrderError> {
        let text = PlateText::parse(raw)?;
        let available = self.is_available(&text).await?;
        Ok((text, available))
    }

    /// Create an order and reserve every plate text in it.
    ///
    /// # Errors
    ///
    /// - [`OrderError::PlateUnavailable`] if any text is already reserved,
    ///   including when a concurrent order wins the reservation race
    /// - [`OrderError::Validation`] for a rejected price override
    /// - [`OrderError::StorageUnavailable`] on storage failure or timeout
    #[instrument(
        skip(self, draft),
        fields(owner = %caller.owner_id, items = draft.items.len())
    )]
    pub async fn create_order(&self, caller: Caller, draft: OrderDraft) -> Result<Order, OrderError> {
        let shipping_cost = draft.shipping_method.shipping_cost();

        let line_items = draft
            .items
            .iter()
            .map(|item| {
                Ok(NewLineItem {
                    plate_text: item.text.clone(),
                    tier: item.tier,
                    quantity: item.quantity,
                    unit_price: unit_price_for(item, caller)?,
                    background_index: item.background_index,
                })
            })
            .collect::<Result<Vec<_>, OrderError>>()?;

        let total_amount = Order::compute_total(
            line_items.iter().map(|li| (li.unit_price, li.quantity)),
            shipping_cost,
        )?;

        for item in &line_items {
            if !self.is_available(&item.plate_text).await? {
                info!(text = %item.plate_text, "Plate text already reserved");
                return Err(OrderError::PlateUnavailable(item.plate_text.clone()));
            }
        }

        let new_order = NewOrder {
            id: OrderId::random(),
            owner_id: caller.owner_id,
            line_items,
            shipping_method: draft.shipping_method,
            shipping_cost,
            total_amount,
            address: draft.address,
            city: draft.city,
            phone_number: draft.phone_number,
        };

        let order = with_deadline(
            self.timeout,
            "place_order",
            self.store.place_order(&new_order),
        )
        .await?;

        info!(order_id = %order.id, total = %order.total_amount, "Order placed");
        Ok(order)
    }

    /// Record payment for a pending order.
    ///
    /// Repeating the call with the reference already recorded returns the
    /// order unchanged.
    ///
    /// # Errors
    ///
    /// - [`OrderError::Forbidden`] unless the caller owns the order
    /// - [`OrderError::InvalidTransition`] if the order is not pending
    /// - [`OrderError::NotFound`] for an unknown order
    #[instrument(skip(self, payment), fields(owner = %caller.owner_id, method = ?payment.method))]
    pub async fn mark_paid(
        &self,
        caller: Caller,
        id: OrderId,
        payment: PaymentDetails,
    ) -> Result<Order, OrderError> {
        let reference = payment.reference.trim();
        if reference.is_empty() {
            return Err(OrderError::Validation(
                "payment reference is required".to_owned(),
            ));
        }
        let payment = PaymentDetails {
            method: payment.method,
            reference: reference.to_owned(),
        };

        let order = self.load(id).await?;
        if !order.is_owned_by(caller.owner_id) {
            return Err(OrderError::Forbidden("only the owner can pay for an order"));
        }

        if let Some(order) = already_paid(order.clone(), &payment) {
            return Ok(order);
        }
        if order.status != OrderStatus::Pending {
            return Err(OrderError::InvalidTransition {
                from: order.status,
                to: OrderStatus::PaymentCompleted,
            });
        }

        let updated = with_deadline(
            self.timeout,
            "update_order_status",
            self.store
                .update_order_status(id, OrderStatus::Pending, &StatusUpdate::paid(payment.clone())),
        )
        .await?;

        match updated {
            Some(order) => {
                info!(order_id = %order.id, "Order paid");
                Ok(order)
            }
            None => {
                let current = self.load(id).await?;
                let from = current.status;
                already_paid(current, &payment)
                    .ok_or(OrderError::InvalidTransition {
                        from,
                        to: OrderStatus::PaymentCompleted,
                    })
            }
        }
    }

    /// Move an order one step along its lifecycle, or cancel it.
    ///
    /// # Errors
    ///
    /// - [`OrderError::Forbidden`] unless the caller is an operator
    /// - [`OrderError::InvalidTransition`] if `next` is not reachable in one step
    /// - [`OrderError::NotFound`] for an unknown order
    #[instrument(skip(self), fields(operator = %caller.owner_id))]
    pub async fn set_status(
        &self,
        caller: Caller,
        id: OrderId,
        next: OrderStatus,
    ) -> Result<Order, OrderError> {
        if !caller.is_operator {
            return Err(OrderError::Forbidden("only operators can change order status"));
        }

        let order = self.load(id).await?;
        let from = order.status;
        if !from.can_transition_to(next) {
            return Err(OrderError::InvalidTransition { from, to: next });
        }

        let updated = with_deadline(
            self.timeout,
            "update_order_status",
            self.store
                .update_order_status(id, from, &StatusUpdate::to(next)),
        )
        .await?;

        match updated {
            Some(order) => {
                info!(order_id = %order.id, %from, to = %next, "Order status changed");
                Ok(order)
            }
            None => {
                let current = self.load(id).await?;
                warn!(order_id = %id, expected = %from, actual = %current.status, "Lost status race");
                Err(OrderError::InvalidTransition {
                    from: current.status,
                    to: next,
                })
            }
        }
    }

    /// Fetch an order for its owner or an operator.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::NotFound`] or [`OrderError::Forbidden`].
    pub async fn get_order(&self, caller: Caller, id: OrderId) -> Result<Order, OrderError> {
        let order = self.load(id).await?;
        if order.is_owned_by(caller.owner_id) || caller.is_operator {
            Ok(order)
        } else {
            Err(OrderError::Forbidden("order belongs to another customer"))
        }
    }

    /// Orders owned by `owner`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::StorageUnavailable`] on storage failure.
    pub async fn list_orders_for_owner(&self, owner: OwnerId) -> Result<Vec<Order>, OrderError> {
        Ok(with_deadline(
            self.timeout,
            "list_orders_for_owner",
            self.store.list_orders_for_owner(owner),
        )
        .await?)
    }

    /// Every order, newest first. Operators only.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Forbidden`] for non-operators.
    pub async fn list_all_orders(&self, caller: Caller) -> Result<Vec<Order>, OrderError> {
        if !caller.is_operator {
            return Err(OrderError::Forbidden("only operators can list all orders"));
        }
        Ok(with_deadline(self.timeout, "list_all_orders", self.store.list_all_orders()).await?)
    }

    async fn load(&self, id: OrderId) -> Result<Order, OrderError> {
        with_deadline(self.timeout, "get_order", self.store.get_order(id))
            .await?
            .ok_or(OrderError::NotFound)
    }
}

/// `Some(order)` if it is already paid with this exact method and reference.
fn already_paid(order: Order, payment: &PaymentDetails) -> Option<Order> {
    (order.status == OrderStatus::PaymentCompleted
        && order.payment_method == Some(payment.method)
        && order.payment_reference.as_deref() == Some(payment.reference.as_str()))
    .then_some(order)
}
