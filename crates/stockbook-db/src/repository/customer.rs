//! # Customer Repository
//!
//! Customers are registered here and only ever read by invoice creation.
//! [`CustomerRepository::find_in_shop`] is the shop-scoped lookup the
//! invoice transaction runs on its own connection.

use chrono::Utc;
use serde::Deserialize;
use sqlx::{SqliteConnection, SqlitePool};
use stockbook_core::validation::validate_name;
use stockbook_core::Customer;
use tracing::debug;

use super::new_id;
use crate::error::DbResult;

/// Input for registering a customer.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCustomer {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    pub async fn create(&self, shop_id: &str, input: &NewCustomer) -> DbResult<Customer> {
        validate_name("name", &input.name)?;

        let customer = Customer {
            id: new_id(),
            shop_id: shop_id.to_string(),
            name: input.name.trim().to_string(),
            phone: input.phone.clone(),
            email: input.email.clone(),
            address: input.address.clone(),
            created_at: Utc::now(),
        };

        debug!(id = %customer.id, shop_id = %shop_id, "Creating customer");

        sqlx::query(
            r#"
            INSERT INTO customers (id, shop_id, name, phone, email, address, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.shop_id)
        .bind(&customer.name)
        .bind(&customer.phone)
        .bind(&customer.email)
        .bind(&customer.address)
        .bind(customer.created_at)
        .execute(&self.pool)
        .await?;

        Ok(customer)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT id, shop_id, name, phone, email, address, created_at FROM customers WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    pub async fn list_by_shop(&self, shop_id: &str) -> DbResult<Vec<Customer>> {
        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, shop_id, name, phone, email, address, created_at
            FROM customers
            WHERE shop_id = ?1
            ORDER BY name
            "#,
        )
        .bind(shop_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// Looks up a customer owned by `shop_id` on the caller's connection.
    ///
    /// A customer of another shop is indistinguishable from a missing one.
    pub async fn find_in_shop(
        conn: &mut SqliteConnection,
        id: &str,
        shop_id: &str,
    ) -> DbResult<Option<Customer>> {
        debug!(id = %id, shop_id = %shop_id, "Resolving customer");

        let customer = sqlx::query_as::<_, Customer>(
            r#"
            SELECT id, shop_id, name, phone, email, address, created_at
            FROM customers
            WHERE id = ?1 AND shop_id = ?2
            "#,
        )
        .bind(id)
        .bind(shop_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(customer)
    }
}
