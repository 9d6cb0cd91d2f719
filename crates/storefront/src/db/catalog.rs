//! Catalog queries for [`PgStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use plateshop_core::{CatalogEntryId, PlateText, PlateTier, Price};

use super::{CatalogStore, PgStore, RepositoryError, conflict_on_unique};
use crate::models::catalog::{CatalogEntry, NewCatalogEntry};

const CATALOG_COLUMNS: &str =
    "id, text, tier, price, description, reserved, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct CatalogRow {
    id: CatalogEntryId,
    text: String,
    tier: PlateTier,
    price: i64,
    description: Option<String>,
    reserved: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<CatalogRow> for CatalogEntry {
    type Error = RepositoryError;

    fn try_from(row: CatalogRow) -> Result<Self, Self::Error> {
        let text = PlateText::parse(&row.text).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid plate text in catalog: {e}"))
        })?;
        let price = Price::new(row.price).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price for {text}: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            text,
            tier: row.tier,
            price,
            description: row.description,
            is_available: !row.reserved,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn list_catalog(
        &self,
        tier: Option<PlateTier>,
    ) -> Result<Vec<CatalogEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, CatalogRow>(&format!(
            r"
            SELECT {CATALOG_COLUMNS}
            FROM catalog_entries
            WHERE ($1::plate_tier IS NULL OR tier = $1)
            ORDER BY created_at DESC, id DESC
            "
        ))
        .bind(tier)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(CatalogEntry::try_from).collect()
    }

    async fn get_catalog_entry(
        &self,
        id: CatalogEntryId,
    ) -> Result<Option<CatalogEntry>, RepositoryError> {
        let row = sqlx::query_as::<_, CatalogRow>(&format!(
            "SELECT {CATALOG_COLUMNS} FROM catalog_entries WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        row.map(CatalogEntry::try_from).transpose()
    }

    async fn create_catalog_entry(
        &self,
        entry: &NewCatalogEntry,
    ) -> Result<CatalogEntry, RepositoryError> {
        let row = sqlx::query_as::<_, CatalogRow>(&format!(
            r"
            INSERT INTO catalog_entries (text, tier, price, description)
            VALUES ($1, $2, $3, $4)
            RETURNING {CATALOG_COLUMNS}
            "
        ))
        .bind(&entry.text)
        .bind(entry.tier)
        .bind(entry.price)
        .bind(entry.description.as_deref())
        .fetch_one(self.pool())
        .await
        .map_err(|e| conflict_on_unique(e, "plate text"))?;

        CatalogEntry::try_from(row)
    }

    async fn delete_catalog_entry(&self, id: CatalogEntryId) -> Result<(), RepositoryError> {
        let deleted = sqlx::query(
            r"
            DELETE FROM catalog_entries c
            WHERE c.id = $1
              AND NOT c.reserved
              AND NOT EXISTS (
                  SELECT 1 FROM order_line_items li WHERE li.plate_text = c.text
              )
            ",
        )
        .bind(id)
        .execute(self.pool())
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
                RepositoryError::Conflict("plate is referenced by an order".to_owned())
            }
            other => RepositoryError::Database(other),
        })?
        .rows_affected();

        if deleted > 0 {
            return Ok(());
        }

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM catalog_entries WHERE id = $1)")
                .bind(id)
                .fetch_one(self.pool())
                .await?;

        if exists {
            Err(RepositoryError::Conflict(
                "plate is reserved or referenced by an order".to_owned(),
            ))
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    async fn is_text_reserved(&self, text: &PlateText) -> Result<bool, RepositoryError> {
        let reserved: bool = sqlx::query_scalar(
            r"
            SELECT EXISTS (
                SELECT 1 FROM catalog_entries WHERE text = $1 AND reserved
            ) OR EXISTS (
                SELECT 1
                FROM order_line_items li
                JOIN orders o ON o.id = li.order_id
                WHERE li.plate_text = $1 AND o.status <> 'cancelled'
            )
            ",
        )
        .bind(text)
        .fetch_one(self.pool())
        .await?;

        Ok(reserved)
    }
}
