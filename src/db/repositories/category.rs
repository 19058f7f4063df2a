//! Category repository
//!
//! Categories are created together with the articles that use them (see
//! [`CreateArticleInput::with_new_category`](crate::models::CreateArticleInput::with_new_category)),
//! so this repository only counts.

use crate::db::DynDatabasePool;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::Row;

/// Category repository trait
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Count all categories
    async fn count(&self) -> Result<i64>;
}

/// SQLx-based category repository implementation
pub struct SqlxCategoryRepository {
    pool: DynDatabasePool,
}

impl SqlxCategoryRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }
}

const COUNT_CATEGORIES: &str = "SELECT COUNT(*) as count FROM categories";

#[async_trait]
impl CategoryRepository for SqlxCategoryRepository {
    async fn count(&self) -> Result<i64> {
        if let Some(pool) = self.pool.as_sqlite() {
            let row = sqlx::query(COUNT_CATEGORIES)
                .fetch_one(pool)
                .await
                .context("Failed to count categories")?;
            return Ok(row.get("count"));
        }
        if let Some(pool) = self.pool.as_mysql() {
            let row = sqlx::query(COUNT_CATEGORIES)
                .fetch_one(pool)
                .await
                .context("Failed to count categories")?;
            return Ok(row.get("count"));
        }
        anyhow::bail!("Unsupported database pool")
    }
}
