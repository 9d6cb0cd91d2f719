//! Order lifecycle, shipping, payment and role enums.

use serde::{Deserialize, Serialize};

use super::price::Price;

/// Order status.
///
/// The lifecycle is linear:
///
/// ```text
/// pending -> payment_completed -> processing -> shipped -> delivered
/// ```
///
/// `cancelled` is reachable from every state before `delivered`. There are no
/// backward transitions and no stage may be skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    PaymentCompleted,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::PaymentCompleted,
        Self::Processing,
        Self::Shipped,
        Self::Delivered,
        Self::Cancelled,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PaymentCompleted => "payment_completed",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    /// The next stage on the happy path, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::PaymentCompleted),
            Self::PaymentCompleted => Some(Self::Processing),
            Self::Processing => Some(Self::Shipped),
            Self::Shipped => Some(Self::Delivered),
            Self::Delivered | Self::Cancelled => None,
        }
    }

    /// Whether the order has reached a state it can never leave.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// Whether `self -> next` is an edge of the lifecycle.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        if next == Self::Cancelled {
            return !self.is_terminal();
        }
        self.next() == Some(next)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the plates reach the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shipping_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum ShippingMethod {
    #[default]
    Free,
    Express,
    Pickup,
}

impl ShippingMethod {
    /// Flat fee for express delivery, in KES.
    pub const EXPRESS_FEE: i64 = 500;

    #[must_use]
    pub const fn shipping_cost(self) -> Price {
        match self {
            Self::Express => Price::from_static(Self::EXPRESS_FEE),
            Self::Free | Self::Pickup => Price::ZERO,
        }
    }
}

/// How the customer paid. Payment is recorded, never executed here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "payment_method", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Card,
    Mpesa,
}

/// Capability level of a registered user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "user_role", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Places and pays for their own orders.
    #[default]
    Customer,
    /// Manages the catalog and moves orders through fulfilment.
    Operator,
}

impl UserRole {
    #[must_use]
    pub const fn is_operator(self) -> bool {
        matches!(self, Self::Operator)
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "customer"),
            Self::Operator => write!(f, "operator"),
        }
    }
}
