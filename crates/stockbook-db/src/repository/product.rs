//! # Product Repository
//!
//! Registration and shop-scoped lookup of products.
//!
//! ## Stock Column
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  products.quantity is NOT written here.                                 │
//! │                                                                         │
//! │  insert()  ──► quantity = 0, version = 0                                │
//! │  create()  ──► insert() + StockLedger::receive(opening stock)           │
//! │                 in one transaction                                      │
//! │                                                                         │
//! │  Every later change goes through StockLedger (reserve / receive /       │
//! │  release), which bumps `version`.                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use stockbook_core::validation::{validate_name, validate_price_cents};
use stockbook_core::{Product, ValidationError};
use tracing::{debug, info};

use super::new_id;
use crate::error::{DbError, DbResult};
use crate::ledger::{LedgerResult, StockLedger};
use crate::pool::BEGIN_IMMEDIATE;

/// Input for registering a product.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProduct {
    pub category_id: String,
    pub product_name: String,
    pub description: Option<String>,
    pub unit_price_cents: i64,
    pub selling_price_cents: i64,
    /// Shelf life given to each received batch.
    pub expire_time_in_days: i64,
}

impl NewProduct {
    fn validate(&self) -> Result<(), ValidationError> {
        validate_name("productName", &self.product_name)?;
        validate_price_cents("unitPrice", self.unit_price_cents)?;
        validate_price_cents("sellingPrice", self.selling_price_cents)?;
        if self.expire_time_in_days < 0 {
            return Err(ValidationError::Negative {
                field: "expireTimeInDays".to_string(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Registers a product and books its opening stock as the first batch.
    ///
    /// ## Errors
    /// - `Db(Validation)` for a bad name, price or shelf life
    /// - `Db(NotFound)` if the category doesn't belong to `shop_id`
    /// - `Stock(Validation)` for a negative opening stock
    pub async fn create(
        &self,
        shop_id: &str,
        input: &NewProduct,
        opening_stock: i64,
    ) -> LedgerResult<Product> {
        if opening_stock < 0 {
            return Err(DbError::from(ValidationError::Negative {
                field: "quantity".to_string(),
            })
            .into());
        }

        let mut tx = self
            .pool
            .begin_with(BEGIN_IMMEDIATE)
            .await
            .map_err(DbError::from)?;

        let product = Self::insert(&mut tx, shop_id, input).await?;
        if opening_stock > 0 {
            StockLedger::new()
                .receive(&mut tx, &product.id, shop_id, opening_stock)
                .await?;
        }

        let product = Self::find_in_shop(&mut tx, &product.id, shop_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", &product.id))?;

        tx.commit().await.map_err(DbError::from)?;

        info!(
            id = %product.id,
            shop_id = %shop_id,
            quantity = product.quantity,
            "Product registered"
        );
        Ok(product)
    }

    /// Inserts a product with zero stock on the caller's connection.
    pub async fn insert(
        conn: &mut SqliteConnection,
        shop_id: &str,
        input: &NewProduct,
    ) -> DbResult<Product> {
        input.validate()?;

        let category_in_shop: Option<String> =
            sqlx::query_scalar("SELECT id FROM categories WHERE id = ?1 AND shop_id = ?2")
                .bind(&input.category_id)
                .bind(shop_id)
                .fetch_optional(&mut *conn)
                .await?;
        if category_in_shop.is_none() {
            return Err(DbError::not_found("Category", &input.category_id));
        }

        let now = Utc::now();
        let product = Product {
            id: new_id(),
            shop_id: shop_id.to_string(),
            category_id: input.category_id.clone(),
            product_name: input.product_name.trim().to_string(),
            description: input.description.clone(),
            unit_price_cents: input.unit_price_cents,
            selling_price_cents: input.selling_price_cents,
            quantity: 0,
            expire_time_in_days: input.expire_time_in_days,
            version: 0,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, shop_id = %shop_id, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, shop_id, category_id, product_name, description,
                unit_price_cents, selling_price_cents,
                quantity, expire_time_in_days, version,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
        )
        .bind(&product.id)
        .bind(&product.shop_id)
        .bind(&product.category_id)
        .bind(&product.product_name)
        .bind(&product.description)
        .bind(product.unit_price_cents)
        .bind(product.selling_price_cents)
        .bind(product.quantity)
        .bind(product.expire_time_in_days)
        .bind(product.version)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(product)
    }

    /// Gets a product by its ID, regardless of shop.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT
                id, shop_id, category_id, product_name, description,
                unit_price_cents, selling_price_cents,
                quantity, expire_time_in_days, version,
                created_at, updated_at
            FROM products
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Looks up a product owned by `shop_id` on the caller's connection.
    pub async fn find_in_shop(
        conn: &mut SqliteConnection,
        id: &str,
        shop_id: &str,
    ) -> DbResult<Option<Product>> {
        debug!(id = %id, shop_id = %shop_id, "Resolving product");

        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT
                id, shop_id, category_id, product_name, description,
                unit_price_cents, selling_price_cents,
                quantity, expire_time_in_days, version,
                created_at, updated_at
            FROM products
            WHERE id = ?1 AND shop_id = ?2
            "#,
        )
        .bind(id)
        .bind(shop_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(product)
    }

    pub async fn list_by_shop(&self, shop_id: &str) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT
                id, shop_id, category_id, product_name, description,
                unit_price_cents, selling_price_cents,
                quantity, expire_time_in_days, version,
                created_at, updated_at
            FROM products
            WHERE shop_id = ?1
            ORDER BY product_name
            "#,
        )
        .bind(shop_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Counts the products of a shop.
    pub async fn count(&self, shop_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE shop_id = ?1")
            .bind(shop_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
