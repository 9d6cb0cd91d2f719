//! Plate catalog management and price quotes.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, instrument};

use plateshop_core::{
    CatalogEntryId, PlateText, PlateTextError, PlateTier, Price, PriceError, PriceQuote,
    price_for, price_for_code,
};

use super::with_deadline;
use crate::db::{RepositoryError, Storage};
use crate::models::catalog::{CatalogEntry, CreateCatalogEntryRequest, NewCatalogEntry};
use crate::models::session::Caller;

/// Errors returned by catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{0}")]
    Validation(String),

    #[error("only operators can manage the catalog")]
    Forbidden,

    #[error("plate not found")]
    NotFound,

    /// Duplicate text, or a delete refused because the plate is in use.
    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for CatalogError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::Conflict(msg) => Self::Conflict(msg),
            other => Self::Repository(other),
        }
    }
}

impl From<PlateTextError> for CatalogError {
    fn from(err: PlateTextError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<PriceError> for CatalogError {
    fn from(err: PriceError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Catalog operations over an injected storage handle.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Storage>,
    timeout: Duration,
}

impl CatalogService {
    #[must_use]
    pub fn new(store: Arc<dyn Storage>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    /// Catalog entries, newest first, optionally for one tier code.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Validation`] for an unknown tier code.
    pub async fn list(&self, tier: Option<&str>) -> Result<Vec<CatalogEntry>, CatalogError> {
        let tier = tier
            .filter(|t| !t.is_empty())
            .map(str::parse::<PlateTier>)
            .transpose()?;
        Ok(with_deadline(self.timeout, "list_catalog", self.store.list_catalog(tier)).await?)
    }

    /// # Errors
    ///
    /// Returns [`CatalogError::NotFound`] for an unknown id.
    pub async fn get(&self, id: CatalogEntryId) -> Result<CatalogEntry, CatalogError> {
        with_deadline(self.timeout, "get_catalog_entry", self.store.get_catalog_entry(id))
            .await?
            .ok_or(CatalogError::NotFound)
    }

    /// Add an unreserved plate to the catalog.
    ///
    /// The price defaults to the tier price.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::Forbidden`] unless the caller is an operator
    /// - [`CatalogError::Validation`] if the text breaks the tier rule
    /// - [`CatalogError::Conflict`] if the text is already in the catalog
    #[instrument(skip(self, req), fields(text = %req.text, tier = %req.tier))]
    pub async fn create(
        &self,
        caller: Caller,
        req: &CreateCatalogEntryRequest,
    ) -> Result<CatalogEntry, CatalogError> {
        if !caller.is_operator {
            return Err(CatalogError::Forbidden);
        }

        let tier: PlateTier = req.tier.parse()?;
        let entry = NewCatalogEntry {
            text: PlateText::parse_for_tier(&req.text, tier)?,
            tier,
            price: req.price.map_or(Ok(price_for(tier)), Price::new)?,
            description: req
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_owned),
        };

        let created = with_deadline(
            self.timeout,
            "create_catalog_entry",
            self.store.create_catalog_entry(&entry),
        )
        .await?;

        info!(id = %created.id, "Catalog entry created");
        Ok(created)
    }

    /// Remove a plate that no order has reserved.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::Forbidden`] unless the caller is an operator
    /// - [`CatalogError::Conflict`] if the plate is reserved or ordered
    /// - [`CatalogError::NotFound`] for an unknown id
    #[instrument(skip(self))]
    pub async fn delete(&self, caller: Caller, id: CatalogEntryId) -> Result<(), CatalogError> {
        if !caller.is_operator {
            return Err(CatalogError::Forbidden);
        }

        with_deadline(
            self.timeout,
            "delete_catalog_entry",
            self.store.delete_catalog_entry(id),
        )
        .await?;

        info!(%id, "Catalog entry deleted");
        Ok(())
    }

    /// Price an untrusted tier code. Unknown codes get the default price.
    #[must_use]
    pub fn quote(code: &str) -> PriceQuote {
        price_for_code(code)
    }
}
