//! Plate catalog entries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use plateshop_core::{CatalogEntryId, PlateText, PlateTier, Price};

/// A plate product, and for ordered plates, the reserved text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: CatalogEntryId,
    pub text: PlateText,
    pub tier: PlateTier,
    pub price: Price,
    pub description: Option<String>,
    /// `false` once an order has reserved this text.
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for a catalog entry created by an operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCatalogEntry {
    pub text: PlateText,
    pub tier: PlateTier,
    pub price: Price,
    pub description: Option<String>,
}

// =============================================================================
// Request Types
// =============================================================================

/// Query string of `GET /api/plates`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CatalogQuery {
    #[serde(rename = "type")]
    pub tier: Option<String>,
}

/// Body of `POST /api/plates`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateCatalogEntryRequest {
    pub text: String,
    pub tier: String,
    pub price: Option<i64>,
    pub description: Option<String>,
}

/// Response of `GET /api/plates/check-availability/{text}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Availability {
    pub text: PlateText,
    pub is_available: bool,
    pub message: String,
}

impl Availability {
    #[must_use]
    pub fn new(text: PlateText, is_available: bool) -> Self {
        let message = if is_available {
            format!("Plate text {text} is available")
        } else {
            format!("Plate text {text} is already taken")
        };
        Self {
            text,
            is_available,
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_availability_wire_shape() {
        let text = PlateText::parse("kaa007a").unwrap();
        let json = serde_json::to_value(Availability::new(text.clone(), true)).unwrap();
        assert_eq!(json["text"], "KAA007A");
        assert_eq!(json["isAvailable"], true);
        assert_eq!(json["message"], "Plate text KAA007A is available");

        let taken = Availability::new(text, false);
        assert!(!taken.is_available);
        assert_eq!(taken.message, "Plate text KAA007A is already taken");
    }
}
