//! # Stock Ledger
//!
//! The single gate on `products.quantity`. Every stock change in the
//! repository goes through one of the calls below, always on a connection
//! or transaction owned by the caller.
//!
//! ## Reservation (optimistic, per product)
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  reserve(product, shop, qty)          inside the caller's transaction   │
//! │                                                                         │
//! │  1. SELECT quantity, version                                            │
//! │     FROM products WHERE id = ? AND shop_id = ?                          │
//! │        │                                                                │
//! │        ├── no row ─────────────────► ProductNotFound                    │
//! │        ├── qty > quantity ─────────► InsufficientStock                  │
//! │        ▼                                                                │
//! │  2. UPDATE products                                                     │
//! │     SET quantity = quantity - qty, version = version + 1                │
//! │     WHERE id = ? AND shop_id = ? AND version = ? AND quantity >= qty    │
//! │        │                                                                │
//! │        ├── 0 rows (version moved) ─► Conflict        ┐ retry the whole  │
//! │        ├── SQLITE_BUSY* ───────────► Db(Busy)        ┘ transaction      │
//! │        ▼                                                                │
//! │  Reservation { remaining, version }                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The compare-and-swap touches one product row only, so unrelated products
//! never conflict. Rolling back the caller's transaction undoes every
//! reservation it made; [`StockLedger::release`] exists only for callers
//! that must compensate outside a transaction.

use chrono::{TimeDelta, Utc};
use sqlx::SqliteConnection;
use stockbook_core::validation::validate_quantity;
use stockbook_core::{CoreError, StockBatch, ValidationError};
use thiserror::Error;
use tracing::{debug, info};

use crate::error::DbError;
use crate::repository::new_id;

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, Error)]
pub enum LedgerError {
    /// Business rule failure: unknown product, insufficient stock, bad quantity.
    #[error(transparent)]
    Stock(#[from] CoreError),

    /// The product's version changed between read and write.
    #[error("Stock of product {product_id} changed concurrently")]
    Conflict { product_id: String },

    #[error(transparent)]
    Db(#[from] DbError),
}

impl LedgerError {
    /// Whether retrying the enclosing transaction may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            LedgerError::Conflict { .. } => true,
            LedgerError::Db(e) => e.is_retryable(),
            LedgerError::Stock(_) => false,
        }
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        LedgerError::Db(err.into())
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

// =============================================================================
// Reservation
// =============================================================================

/// A successful stock decrement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub product_id: String,
    pub quantity: i64,
    /// Stock left after this reservation, as seen by the transaction.
    pub remaining: i64,
    /// Product version written by this reservation.
    pub version: i64,
}

// =============================================================================
// StockLedger
// =============================================================================

#[derive(Debug, Clone, Copy, Default)]
pub struct StockLedger;

impl StockLedger {
    pub fn new() -> Self {
        StockLedger
    }

    /// Checks and decrements stock in one step.
    ///
    /// ## Errors
    /// - `Stock(ProductNotFound)` if the product is absent or in another shop
    /// - `Stock(InsufficientStock)` if `quantity` exceeds current stock
    /// - `Stock(Validation)` if `quantity <= 0`
    /// - `Conflict` / `Db(Busy)` when another transaction got there first
    pub async fn reserve(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        shop_id: &str,
        quantity: i64,
    ) -> LedgerResult<Reservation> {
        validate_quantity("quantity", quantity).map_err(CoreError::from)?;

        let (available, version) = Self::read_stock(conn, product_id, shop_id).await?;

        if quantity > available {
            debug!(product_id = %product_id, available, requested = quantity, "Insufficient stock");
            return Err(CoreError::InsufficientStock {
                product_id: product_id.to_string(),
                available,
                requested: quantity,
            }
            .into());
        }

        let result = sqlx::query(
            r#"
            UPDATE products
            SET quantity = quantity - ?1, version = version + 1, updated_at = ?2
            WHERE id = ?3 AND shop_id = ?4 AND version = ?5 AND quantity >= ?1
            "#,
        )
        .bind(quantity)
        .bind(Utc::now())
        .bind(product_id)
        .bind(shop_id)
        .bind(version)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            debug!(product_id = %product_id, version, "Stock version moved");
            return Err(LedgerError::Conflict {
                product_id: product_id.to_string(),
            });
        }

        debug!(
            product_id = %product_id,
            reserved = quantity,
            remaining = available - quantity,
            "Stock reserved"
        );

        Ok(Reservation {
            product_id: product_id.to_string(),
            quantity,
            remaining: available - quantity,
            version: version + 1,
        })
    }

    /// Returns `quantity` units to a product. Returns the new stock level.
    ///
    /// Not used when a transaction aborts; rollback already restores stock.
    pub async fn release(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        quantity: i64,
    ) -> LedgerResult<i64> {
        validate_quantity("quantity", quantity).map_err(CoreError::from)?;

        let remaining: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET quantity = quantity + ?1, version = version + 1, updated_at = ?2
            WHERE id = ?3
            RETURNING quantity
            "#,
        )
        .bind(quantity)
        .bind(Utc::now())
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;

        let remaining =
            remaining.ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        info!(product_id = %product_id, released = quantity, remaining, "Stock released");
        Ok(remaining)
    }

    /// Restocks a product and records the batch with its expiry date
    /// (`now + expire_time_in_days`).
    pub async fn receive(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        shop_id: &str,
        quantity: i64,
    ) -> LedgerResult<StockBatch> {
        validate_quantity("quantity", quantity).map_err(CoreError::from)?;

        let shelf_life: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET quantity = quantity + ?1, version = version + 1, updated_at = ?2
            WHERE id = ?3 AND shop_id = ?4
            RETURNING expire_time_in_days
            "#,
        )
        .bind(quantity)
        .bind(Utc::now())
        .bind(product_id)
        .bind(shop_id)
        .fetch_optional(&mut *conn)
        .await?;

        let shelf_life =
            shelf_life.ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()))?;

        let now = Utc::now();
        let expire_at = TimeDelta::try_days(shelf_life)
            .and_then(|shelf_life| now.checked_add_signed(shelf_life))
            .ok_or_else(|| {
                CoreError::from(ValidationError::Overflow {
                    field: "expireTimeInDays".to_string(),
                })
            })?;

        let batch = StockBatch {
            id: new_id(),
            product_id: product_id.to_string(),
            quantity,
            expire_at,
            created_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO stock_batches (id, product_id, quantity, expire_at, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&batch.id)
        .bind(&batch.product_id)
        .bind(batch.quantity)
        .bind(batch.expire_at)
        .bind(batch.created_at)
        .execute(&mut *conn)
        .await?;

        info!(
            product_id = %product_id,
            received = quantity,
            expire_at = %batch.expire_at,
            "Stock received"
        );
        Ok(batch)
    }

    /// Current stock of a product owned by `shop_id`.
    pub async fn available(
        &self,
        conn: &mut SqliteConnection,
        product_id: &str,
        shop_id: &str,
    ) -> LedgerResult<i64> {
        let (available, _) = Self::read_stock(conn, product_id, shop_id).await?;
        Ok(available)
    }

    async fn read_stock(
        conn: &mut SqliteConnection,
        product_id: &str,
        shop_id: &str,
    ) -> LedgerResult<(i64, i64)> {
        let row: Option<(i64, i64)> =
            sqlx::query_as("SELECT quantity, version FROM products WHERE id = ?1 AND shop_id = ?2")
                .bind(product_id)
                .bind(shop_id)
                .fetch_optional(&mut *conn)
                .await?;

        row.ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()).into())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
