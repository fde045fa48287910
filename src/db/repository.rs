//! User repository for drive.
//!
//! This module provides CRUD operations for users in the database.

use sqlx::{QueryBuilder, SqlitePool};

use super::user::{NewUser, User, UserUpdate};
use crate::{DriveError, Result};

/// Repository for user CRUD operations.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new UserRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user in the database.
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        sqlx::query("INSERT INTO users (id, email, full_name) VALUES (?, ?, ?)")
            .bind(&new_user.id)
            .bind(&new_user.email)
            .bind(&new_user.full_name)
            .execute(self.pool)
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;

        self.get_by_id(&new_user.id)
            .await?
            .ok_or_else(|| DriveError::NotFound("user".to_string()))
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<User>> {
        let result = sqlx::query_as::<_, User>(
            "SELECT id, email, full_name, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;

        Ok(result)
    }

    /// Return the user with the given ID, creating it on first sight.
    ///
    /// Email and display name are refreshed from the identity claims when they
    /// changed since the last call.
    pub async fn get_or_create(&self, new_user: &NewUser) -> Result<User> {
        let existing = match self.get_by_id(&new_user.id).await? {
            Some(user) => user,
            None => {
                sqlx::query("INSERT OR IGNORE INTO users (id, email, full_name) VALUES (?, ?, ?)")
                    .bind(&new_user.id)
                    .bind(&new_user.email)
                    .bind(&new_user.full_name)
                    .execute(self.pool)
                    .await
                    .map_err(|e| DriveError::Database(e.to_string()))?;
                tracing::info!(user_id = %new_user.id, "Provisioned user from identity token");
                return self
                    .get_by_id(&new_user.id)
                    .await?
                    .ok_or_else(|| DriveError::NotFound("user".to_string()));
            }
        };

        let mut update = UserUpdate::new();
        if new_user.email.is_some() && existing.email != new_user.email {
            update = update.email(new_user.email.clone());
        }
        if new_user.full_name.is_some() && existing.full_name != new_user.full_name {
            update = update.full_name(new_user.full_name.clone());
        }
        if update.is_empty() {
            return Ok(existing);
        }

        self.update(&existing.id, &update)
            .await?
            .ok_or_else(|| DriveError::NotFound("user".to_string()))
    }

    /// Update a user by ID.
    ///
    /// Only fields that are set in the update will be modified.
    /// Returns the updated user, or None if not found.
    pub async fn update(&self, id: &str, update: &UserUpdate) -> Result<Option<User>> {
        if update.is_empty() {
            return self.get_by_id(id).await;
        }

        let mut query: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new("UPDATE users SET ");
        let mut separated = query.separated(", ");

        if let Some(ref email) = update.email {
            separated.push("email = ");
            separated.push_bind_unseparated(email.clone());
        }
        if let Some(ref full_name) = update.full_name {
            separated.push("full_name = ");
            separated.push_bind_unseparated(full_name.clone());
        }

        query.push(" WHERE id = ");
        query.push_bind(id);

        let result = query
            .build()
            .execute(self.pool)
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.get_by_id(id).await
    }

    /// Delete a user by ID.
    ///
    /// Returns true if a user was deleted, false if not found.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    /// Count all users.
    pub async fn count(&self) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(self.pool)
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;
        Ok(count.0)
    }
}
