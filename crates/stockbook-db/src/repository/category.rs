//! # Category Repository

use chrono::Utc;
use sqlx::SqlitePool;
use stockbook_core::validation::validate_name;
use stockbook_core::Category;
use tracing::debug;

use super::new_id;
use crate::error::{DbError, DbResult};

#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// Creates a category; names are unique within a shop.
    pub async fn create(&self, shop_id: &str, name: &str) -> DbResult<Category> {
        validate_name("name", name)?;

        let category = Category {
            id: new_id(),
            shop_id: shop_id.to_string(),
            name: name.trim().to_string(),
            created_at: Utc::now(),
        };

        debug!(shop_id = %shop_id, name = %category.name, "Creating category");

        sqlx::query("INSERT INTO categories (id, shop_id, name, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(&category.id)
            .bind(&category.shop_id)
            .bind(&category.name)
            .bind(category.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| match DbError::from(e) {
                DbError::UniqueViolation { field, .. } => DbError::duplicate(field, &category.name),
                other => other,
            })?;

        Ok(category)
    }

    pub async fn list_by_shop(&self, shop_id: &str) -> DbResult<Vec<Category>> {
        let categories = sqlx::query_as::<_, Category>(
            "SELECT id, shop_id, name, created_at FROM categories WHERE shop_id = ?1 ORDER BY name",
        )
        .bind(shop_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }
}
