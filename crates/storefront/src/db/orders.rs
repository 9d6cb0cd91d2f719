//! Order queries for [`PgStore`].
//!
//! Placing an order and changing its status each run in a single transaction.
//! Dropping the transaction before `commit` rolls it back, so a cancelled
//! request never leaves a partial order behind.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgConnection;

use plateshop_core::{
    BackgroundIndex, CatalogEntryId, LineItemId, OrderId, OrderStatus, OwnerId, PaymentMethod,
    PlateText, PlateTier, Price, ShippingMethod, price_for,
};

use super::{OrderStore, PgStore, RepositoryError};
use crate::models::order::{NewLineItem, NewOrder, Order, OrderLineItem, StatusUpdate};

const ORDER_COLUMNS: &str = "id, owner_id, status, shipping_method, shipping_cost, total_amount, \
     payment_method, payment_reference, address, city, phone_number, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct OrderRow {
    id: OrderId,
    owner_id: OwnerId,
    status: OrderStatus,
    shipping_method: ShippingMethod,
    shipping_cost: i64,
    total_amount: i64,
    payment_method: Option<PaymentMethod>,
    payment_reference: Option<String>,
    address: Option<String>,
    city: Option<String>,
    phone_number: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, sqlx::FromRow)]
struct LineItemRow {
    id: LineItemId,
    order_id: OrderId,
    plate_text: String,
    tier: PlateTier,
    quantity: i32,
    unit_price: i64,
    background_index: Option<i16>,
}

impl TryFrom<LineItemRow> for OrderLineItem {
    type Error = RepositoryError;

    fn try_from(row: LineItemRow) -> Result<Self, Self::Error> {
        let corrupt =
            |what: &str| RepositoryError::DataCorruption(format!("line item {}: {what}", row.id));

        let plate_text = PlateText::parse(&row.plate_text).map_err(|_| corrupt("invalid text"))?;
        let quantity = u32::try_from(row.quantity).map_err(|_| corrupt("negative quantity"))?;
        let unit_price = Price::new(row.unit_price).map_err(|_| corrupt("negative price"))?;
        let background_index = row
            .background_index
            .map(|bg| {
                u8::try_from(bg)
                    .ok()
                    .and_then(|bg| BackgroundIndex::new(bg).ok())
                    .ok_or_else(|| corrupt("invalid background"))
            })
            .transpose()?;

        Ok(Self {
            id: row.id,
            plate_text,
            tier: row.tier,
            quantity,
            unit_price,
            background_index,
        })
    }
}

/// Build an [`Order`] and check the stored total against the line items.
fn assemble(row: OrderRow, items: Vec<LineItemRow>) -> Result<Order, RepositoryError> {
    let corrupt = |what: String| RepositoryError::DataCorruption(format!("order {}: {what}", row.id));

    if items.is_empty() {
        return Err(corrupt("no line items".to_owned()));
    }
    let line_items = items
        .into_iter()
        .map(OrderLineItem::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    let shipping_cost =
        Price::new(row.shipping_cost).map_err(|e| corrupt(format!("shipping cost: {e}")))?;
    let total_amount =
        Price::new(row.total_amount).map_err(|e| corrupt(format!("total: {e}")))?;

    let order = Order {
        id: row.id,
        owner_id: row.owner_id,
        line_items,
        shipping_method: row.shipping_method,
        shipping_cost,
        total_amount,
        status: row.status,
        payment_method: row.payment_method,
        payment_reference: row.payment_reference,
        address: row.address,
        city: row.city,
        phone_number: row.phone_number,
        created_at: row.created_at,
        updated_at: row.updated_at,
    };

    let expected = order
        .recomputed_total()
        .map_err(|e| corrupt(format!("total: {e}")))?;
    if expected != order.total_amount {
        return Err(corrupt(format!(
            "stored total {} does not match line items {}",
            order.total_amount, expected
        )));
    }

    Ok(order)
}

/// Load line items for `rows` and assemble the orders, preserving row order.
async fn with_line_items(
    conn: &mut PgConnection,
    rows: Vec<OrderRow>,
) -> Result<Vec<Order>, RepositoryError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }

    let ids: Vec<uuid::Uuid> = rows.iter().map(|r| r.id.as_uuid()).collect();
    let items = sqlx::query_as::<_, LineItemRow>(
        r"
        SELECT id, order_id, plate_text, tier, quantity, unit_price, background_index
        FROM order_line_items
        WHERE order_id = ANY($1)
        ORDER BY id
        ",
    )
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut by_order: HashMap<OrderId, Vec<LineItemRow>> = HashMap::new();
    for item in items {
        by_order.entry(item.order_id).or_default().push(item);
    }

    rows.into_iter()
        .map(|row| {
            let items = by_order.remove(&row.id).unwrap_or_default();
            assemble(row, items)
        })
        .collect()
}

async fn load_order(conn: &mut PgConnection, id: OrderId) -> Result<Option<Order>, RepositoryError> {
    let row = sqlx::query_as::<_, OrderRow>(&format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => Ok(with_line_items(conn, vec![row]).await?.pop()),
        None => Ok(None),
    }
}

/// Translate a failed reservation into `TextReserved` when it lost a race.
fn reservation_error(err: sqlx::Error, text: &PlateText) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = err
        && (db_err.is_unique_violation()
            || matches!(db_err.code().as_deref(), Some("40P01" | "40001")))
    {
        return RepositoryError::TextReserved(text.clone());
    }
    RepositoryError::Database(err)
}

#[async_trait]
impl OrderStore for PgStore {
    async fn place_order(&self, order: &NewOrder) -> Result<Order, RepositoryError> {
        let mut tx = self.pool().begin().await?;

        sqlx::query(
            r"
            INSERT INTO orders (id, owner_id, status, shipping_method, shipping_cost,
                                total_amount, address, city, phone_number)
            VALUES ($1, $2, 'pending', $3, $4, 0, $5, $6, $7)
            ",
        )
        .bind(order.id)
        .bind(order.owner_id)
        .bind(order.shipping_method)
        .bind(order.shipping_cost)
        .bind(order.address.as_deref())
        .bind(order.city.as_deref())
        .bind(order.phone_number.as_deref())
        .execute(&mut *tx)
        .await?;

        // Lock catalog rows in text order so overlapping carts cannot deadlock.
        let mut by_text: Vec<&NewLineItem> = order.line_items.iter().collect();
        by_text.sort_by(|a, b| a.plate_text.cmp(&b.plate_text));

        for item in by_text {
            // Reserve atomically: a conflicting row that is already reserved,
            // or listed under another tier, is left untouched and yields no id.
            let reserved = sqlx::query_scalar::<_, CatalogEntryId>(
                r"
                INSERT INTO catalog_entries (text, tier, price, reserved)
                VALUES ($1, $2, $3, TRUE)
                ON CONFLICT (text) DO UPDATE
                    SET reserved = TRUE, updated_at = now()
                    WHERE NOT catalog_entries.reserved
                      AND catalog_entries.tier = EXCLUDED.tier
                RETURNING id
                ",
            )
            .bind(&item.plate_text)
            .bind(item.tier)
            .bind(price_for(item.tier))
            .fetch_optional(&mut *tx)
            .await
            .map_err(|e| reservation_error(e, &item.plate_text))?;

            if reserved.is_none() {
                return Err(RepositoryError::TextReserved(item.plate_text.clone()));
            }
        }

        for item in &order.line_items {
            let quantity = i32::try_from(item.quantity).map_err(|_| {
                RepositoryError::DataCorruption(format!("quantity {} out of range", item.quantity))
            })?;

            sqlx::query(
                r"
                INSERT INTO order_line_items (order_id, plate_text, tier, quantity,
                                              unit_price, background_index)
                VALUES ($1, $2, $3, $4, $5, $6)
                ",
            )
            .bind(order.id)
            .bind(&item.plate_text)
            .bind(item.tier)
            .bind(quantity)
            .bind(item.unit_price)
            .bind(item.background_index.map(i16::from))
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE orders SET total_amount = $2, updated_at = now() WHERE id = $1")
            .bind(order.id)
            .bind(order.total_amount)
            .execute(&mut *tx)
            .await?;

        let placed = load_order(&mut tx, order.id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        tx.commit().await?;

        Ok(placed)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        let mut conn = self.pool().acquire().await?;
        load_order(&mut conn, id).await
    }

    async fn list_orders_for_owner(&self, owner: OwnerId) -> Result<Vec<Order>, RepositoryError> {
        let mut conn = self.pool().acquire().await?;
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE owner_id = $1 ORDER BY created_at DESC"
        ))
        .bind(owner)
        .fetch_all(&mut *conn)
        .await?;

        with_line_items(&mut conn, rows).await
    }

    async fn list_all_orders(&self) -> Result<Vec<Order>, RepositoryError> {
        let mut conn = self.pool().acquire().await?;
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC"
        ))
        .fetch_all(&mut *conn)
        .await?;

        with_line_items(&mut conn, rows).await
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        expected: OrderStatus,
        update: &StatusUpdate,
    ) -> Result<Option<Order>, RepositoryError> {
        let mut tx = self.pool().begin().await?;

        let (method, reference) = update
            .payment
            .as_ref()
            .map_or((None, None), |p| (Some(p.method), Some(p.reference.as_str())));

        let updated = sqlx::query(
            r"
            UPDATE orders
            SET status = $3,
                payment_method = COALESCE($4, payment_method),
                payment_reference = COALESCE($5, payment_reference),
                updated_at = now()
            WHERE id = $1 AND status = $2
            ",
        )
        .bind(id)
        .bind(expected)
        .bind(update.next)
        .bind(method)
        .bind(reference)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            return Ok(None);
        }

        if update.next == OrderStatus::Cancelled {
            sqlx::query(
                r"
                UPDATE catalog_entries
                SET reserved = FALSE, updated_at = now()
                WHERE text IN (SELECT plate_text FROM order_line_items WHERE order_id = $1)
                ",
            )
            .bind(id)
            .execute(&mut *tx)
            .await?;
        }

        let order = load_order(&mut tx, id).await?.ok_or(RepositoryError::NotFound)?;
        tx.commit().await?;

        Ok(Some(order))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn order_row(total: i64) -> OrderRow {
        OrderRow {
            id: OrderId::random(),
            owner_id: OwnerId::random(),
            status: OrderStatus::Pending,
            shipping_method: ShippingMethod::Express,
            shipping_cost: 500,
            total_amount: total,
            payment_method: None,
            payment_reference: None,
            address: None,
            city: None,
            phone_number: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn item_row(order_id: OrderId, text: &str, quantity: i32, price: i64) -> LineItemRow {
        LineItemRow {
            id: LineItemId::new(1),
            order_id,
            plate_text: text.to_owned(),
            tier: PlateTier::Special,
            quantity,
            unit_price: price,
            background_index: None,
        }
    }

    #[test]
    fn test_assemble_checks_total() {
        let row = order_row(40_500);
        let id = row.id;
        let order = assemble(row, vec![item_row(id, "KBB100K", 2, 20_000)]).unwrap();
        assert_eq!(order.total_amount.amount(), 40_500);
        assert_eq!(order.line_items[0].quantity, 2);
    }

    #[test]
    fn test_assemble_total_mismatch_is_corruption() {
        let row = order_row(1);
        let id = row.id;
        let err = assemble(row, vec![item_row(id, "KBB100K", 1, 20_000)]).unwrap_err();
        assert!(matches!(err, RepositoryError::DataCorruption(_)));
    }

    #[test]
    fn test_assemble_requires_line_items() {
        let err = assemble(order_row(500), Vec::new()).unwrap_err();
        assert!(matches!(err, RepositoryError::DataCorruption(_)));
    }

    #[test]
    fn test_line_item_rejects_bad_background() {
        let mut row = item_row(OrderId::random(), "BOSS1", 1, 80_000);
        row.background_index = Some(9);
        assert!(OrderLineItem::try_from(row).is_err());
    }
}
