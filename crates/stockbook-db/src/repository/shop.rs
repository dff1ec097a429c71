//! # Shop Repository

use chrono::Utc;
use sqlx::SqlitePool;
use stockbook_core::validation::validate_name;
use stockbook_core::Shop;
use tracing::debug;

use super::new_id;
use crate::error::DbResult;

#[derive(Debug, Clone)]
pub struct ShopRepository {
    pool: SqlitePool,
}

impl ShopRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ShopRepository { pool }
    }

    /// Registers a shop owned by `owner_id`.
    pub async fn create(&self, name: &str, owner_id: &str) -> DbResult<Shop> {
        validate_name("name", name)?;

        let shop = Shop {
            id: new_id(),
            name: name.trim().to_string(),
            owner_id: owner_id.to_string(),
            created_at: Utc::now(),
        };

        debug!(id = %shop.id, owner_id = %owner_id, "Creating shop");

        sqlx::query("INSERT INTO shops (id, name, owner_id, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(&shop.id)
            .bind(&shop.name)
            .bind(&shop.owner_id)
            .bind(shop.created_at)
            .execute(&self.pool)
            .await?;

        Ok(shop)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Shop>> {
        let shop = sqlx::query_as::<_, Shop>(
            "SELECT id, name, owner_id, created_at FROM shops WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(shop)
    }

    pub async fn list_by_owner(&self, owner_id: &str) -> DbResult<Vec<Shop>> {
        let shops = sqlx::query_as::<_, Shop>(
            "SELECT id, name, owner_id, created_at FROM shops WHERE owner_id = ?1 ORDER BY name",
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(shops)
    }
}
