//! Favorite items of a user.

use sqlx::SqlitePool;

use crate::Result;

/// Repository for item favorites.
///
/// A favorite is a unique (item, user) pair; adding and removing are
/// idempotent and report whether the row actually changed.
pub struct FavoriteRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> FavoriteRepository<'a> {
    /// Create a new FavoriteRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Mark an item as favorite. Returns false if it already was.
    pub async fn add(&self, item_id: &str, user_id: &str) -> Result<bool> {
        let result =
            sqlx::query("INSERT OR IGNORE INTO item_favorites (item_id, user_id) VALUES (?, ?)")
                .bind(item_id)
                .bind(user_id)
                .execute(self.pool)
                .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Unmark an item as favorite. Returns false if it was not marked.
    pub async fn remove(&self, item_id: &str, user_id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM item_favorites WHERE item_id = ? AND user_id = ?")
            .bind(item_id)
            .bind(user_id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Check whether a user marked an item as favorite.
    pub async fn exists(&self, item_id: &str, user_id: &str) -> Result<bool> {
        let found: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM item_favorites WHERE item_id = ? AND user_id = ?")
                .bind(item_id)
                .bind(user_id)
                .fetch_optional(self.pool)
                .await?;
        Ok(found.is_some())
    }

    /// Count the users who marked an item as favorite.
    pub async fn count_for_item(&self, item_id: &str) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM item_favorites WHERE item_id = ?")
            .bind(item_id)
            .fetch_one(self.pool)
            .await?;
        Ok(count.0)
    }
}
