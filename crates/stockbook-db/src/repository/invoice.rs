//! # Invoice Repository
//!
//! Invoices are written exactly once, together with all of their items, on
//! the transaction that reserved their stock. Reads assemble invoices with
//! their items through explicit join queries.
//!
//! ## Paginated Listing
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. SELECT COUNT(*)        ─► total                                     │
//! │  2. SELECT invoices ... ORDER BY created_at DESC LIMIT ? OFFSET ?       │
//! │  3. SELECT invoice_items JOIN (the same page of invoice ids)            │
//! │     ORDER BY invoice_id, line_no                                        │
//! │  4. group items under their invoice                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//! Steps 1-3 run in one read transaction so the page and the total agree.

use std::collections::HashMap;

use sqlx::{SqliteConnection, SqlitePool};
use stockbook_core::{Invoice, InvoiceItem, InvoiceWithItems};
use tracing::debug;

use crate::error::{DbError, DbResult};

/// One page of invoices plus the number of invoices matching the filter.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoicePageRows {
    pub invoices: Vec<InvoiceWithItems>,
    pub total: i64,
}

#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Inserts an invoice and all of its items on the caller's connection.
    ///
    /// Totals must already be final; no row is ever patched afterwards.
    pub async fn insert_with_items(
        conn: &mut SqliteConnection,
        invoice: &Invoice,
        items: &[InvoiceItem],
    ) -> DbResult<()> {
        debug!(
            id = %invoice.id,
            shop_id = %invoice.shop_id,
            items = items.len(),
            "Inserting invoice"
        );

        sqlx::query(
            r#"
            INSERT INTO invoices (
                id, shop_id, customer_id, discount_bps,
                total_amount_cents, total_amount_after_discount_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&invoice.id)
        .bind(&invoice.shop_id)
        .bind(&invoice.customer_id)
        .bind(invoice.discount_bps)
        .bind(invoice.total_amount_cents)
        .bind(invoice.total_amount_after_discount_cents)
        .bind(invoice.created_at)
        .execute(&mut *conn)
        .await?;

        for item in items {
            sqlx::query(
                r#"
                INSERT INTO invoice_items (
                    id, invoice_id, product_id, line_no, quantity,
                    selling_price_cents, discount_bps, gst_bps,
                    total_amount_cents, total_amount_with_gst_cents, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
                "#,
            )
            .bind(&item.id)
            .bind(&item.invoice_id)
            .bind(&item.product_id)
            .bind(item.line_no)
            .bind(item.quantity)
            .bind(item.selling_price_cents)
            .bind(item.discount_bps)
            .bind(item.gst_bps)
            .bind(item.total_amount_cents)
            .bind(item.total_amount_with_gst_cents)
            .bind(item.created_at)
            .execute(&mut *conn)
            .await?;
        }

        Ok(())
    }

    /// Gets an invoice of `shop_id` with its items.
    pub async fn get(&self, shop_id: &str, id: &str) -> DbResult<Option<InvoiceWithItems>> {
        debug!(id = %id, shop_id = %shop_id, "Loading invoice");

        let mut conn = self.pool.acquire().await?;
        Self::find_with_items(&mut conn, shop_id, id).await
    }

    /// Loads an invoice of `shop_id` with its items on the caller's connection.
    pub async fn find_with_items(
        conn: &mut SqliteConnection,
        shop_id: &str,
        id: &str,
    ) -> DbResult<Option<InvoiceWithItems>> {
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT
                id, shop_id, customer_id, discount_bps,
                total_amount_cents, total_amount_after_discount_cents, created_at
            FROM invoices
            WHERE id = ?1 AND shop_id = ?2
            "#,
        )
        .bind(id)
        .bind(shop_id)
        .fetch_optional(&mut *conn)
        .await?;

        let Some(invoice) = invoice else {
            return Ok(None);
        };

        let items = sqlx::query_as::<_, InvoiceItem>(
            r#"
            SELECT
                id, invoice_id, product_id, line_no, quantity,
                selling_price_cents, discount_bps, gst_bps,
                total_amount_cents, total_amount_with_gst_cents, created_at
            FROM invoice_items
            WHERE invoice_id = ?1
            ORDER BY line_no
            "#,
        )
        .bind(&invoice.id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(Some(InvoiceWithItems { invoice, items }))
    }

    /// Lists invoices of `shop_id`, newest first, optionally for one customer.
    pub async fn list(
        &self,
        shop_id: &str,
        customer_id: Option<&str>,
        offset: i64,
        limit: i64,
    ) -> DbResult<InvoicePageRows> {
        debug!(shop_id = %shop_id, ?customer_id, offset, limit, "Listing invoices");

        let mut tx = self.pool.begin().await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM invoices WHERE shop_id = ?1 AND (?2 IS NULL OR customer_id = ?2)",
        )
        .bind(shop_id)
        .bind(customer_id)
        .fetch_one(&mut *tx)
        .await?;

        let invoices = sqlx::query_as::<_, Invoice>(
            r#"
            SELECT
                id, shop_id, customer_id, discount_bps,
                total_amount_cents, total_amount_after_discount_cents, created_at
            FROM invoices
            WHERE shop_id = ?1 AND (?2 IS NULL OR customer_id = ?2)
            ORDER BY created_at DESC, id
            LIMIT ?3 OFFSET ?4
            "#,
        )
        .bind(shop_id)
        .bind(customer_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *tx)
        .await?;

        let items = sqlx::query_as::<_, InvoiceItem>(
            r#"
            SELECT
                ii.id, ii.invoice_id, ii.product_id, ii.line_no, ii.quantity,
                ii.selling_price_cents, ii.discount_bps, ii.gst_bps,
                ii.total_amount_cents, ii.total_amount_with_gst_cents, ii.created_at
            FROM invoice_items ii
            INNER JOIN (
                SELECT id
                FROM invoices
                WHERE shop_id = ?1 AND (?2 IS NULL OR customer_id = ?2)
                ORDER BY created_at DESC, id
                LIMIT ?3 OFFSET ?4
            ) page ON page.id = ii.invoice_id
            ORDER BY ii.invoice_id, ii.line_no
            "#,
        )
        .bind(shop_id)
        .bind(customer_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&mut *tx)
        .await?;

        tx.commit().await.map_err(DbError::from)?;

        let mut by_invoice: HashMap<String, Vec<InvoiceItem>> = HashMap::new();
        for item in items {
            by_invoice.entry(item.invoice_id.clone()).or_default().push(item);
        }

        let invoices = invoices
            .into_iter()
            .map(|invoice| {
                let items = by_invoice.remove(&invoice.id).unwrap_or_default();
                InvoiceWithItems { invoice, items }
            })
            .collect();

        Ok(InvoicePageRows { invoices, total })
    }

    /// Counts the invoices of a shop.
    pub async fn count(&self, shop_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoices WHERE shop_id = ?1")
            .bind(shop_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
