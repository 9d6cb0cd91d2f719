//! Prices in whole Kenyan shillings and the tier pricing rules.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::plate::PlateTier;

/// Errors from price construction and arithmetic.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceError {
    #[error("price cannot be negative: {0}")]
    Negative(i64),
    #[error("price arithmetic overflowed")]
    Overflow,
}

/// A non-negative amount in whole KES.
///
/// All arithmetic is checked; an order total that would overflow is rejected
/// rather than wrapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(try_from = "i64", into = "i64")]
pub struct Price(i64);

impl Price {
    pub const ZERO: Self = Self(0);

    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] for amounts below zero.
    pub const fn new(amount: i64) -> Result<Self, PriceError> {
        if amount < 0 {
            Err(PriceError::Negative(amount))
        } else {
            Ok(Self(amount))
        }
    }

    /// For compile-time constants known to be non-negative.
    pub(crate) const fn from_static(amount: i64) -> Self {
        Self(amount)
    }

    #[must_use]
    pub const fn amount(self) -> i64 {
        self.0
    }

    /// # Errors
    ///
    /// Returns [`PriceError::Overflow`] if the sum does not fit in an `i64`.
    pub const fn checked_add(self, other: Self) -> Result<Self, PriceError> {
        match self.0.checked_add(other.0) {
            Some(sum) => Ok(Self(sum)),
            None => Err(PriceError::Overflow),
        }
    }

    /// # Errors
    ///
    /// Returns [`PriceError::Overflow`] if the product does not fit in an `i64`.
    pub fn checked_mul(self, quantity: u32) -> Result<Self, PriceError> {
        self.0
            .checked_mul(i64::from(quantity))
            .map(Self)
            .ok_or(PriceError::Overflow)
    }

    /// Sum prices, failing on overflow.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Overflow`] if any partial sum overflows.
    pub fn checked_sum<I: IntoIterator<Item = Self>>(prices: I) -> Result<Self, PriceError> {
        prices
            .into_iter()
            .try_fold(Self::ZERO, Self::checked_add)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KES {}", self.0)
    }
}

impl TryFrom<i64> for Price {
    type Error = PriceError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for i64 {
    fn from(price: Price) -> Self {
        price.0
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i64 as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <i64 as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <i64 as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i64 as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

/// Unit price for a plate tier.
#[must_use]
pub const fn price_for(tier: PlateTier) -> Price {
    match tier {
        PlateTier::Special => Price::from_static(20_000),
        PlateTier::StandardCustom => Price::from_static(40_000),
        PlateTier::Prestige => Price::from_static(80_000),
    }
}

/// Result of pricing a tier code supplied by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceQuote {
    /// The code as received.
    pub code: String,
    /// The tier the price was taken from.
    pub tier: PlateTier,
    pub price: Price,
    /// `true` when `code` was not a known tier and the default price was used.
    pub fallback: bool,
}

/// Price an untrusted tier code.
///
/// Unknown codes are priced as [`PlateTier::Special`] and flagged with
/// `fallback: true`.
#[must_use]
pub fn price_for_code(code: &str) -> PriceQuote {
    let (tier, fallback) = match code.parse::<PlateTier>() {
        Ok(tier) => (tier, false),
        Err(_) => (PlateTier::Special, true),
    };
    PriceQuote {
        code: code.to_owned(),
        tier,
        price: price_for(tier),
        fallback,
    }
}
