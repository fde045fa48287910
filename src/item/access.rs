//! Item accesses: roles granted to users or teams.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use sqlx::{QueryBuilder, SqlitePool};

use crate::{DriveError, Result};

/// Role granted on an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Can read the item and its descendants.
    #[default]
    Reader = 0,
    /// Can also create, rename and move items.
    Editor = 1,
    /// Can also manage accesses and link settings.
    Administrator = 2,
    /// Can also delete the item.
    Owner = 3,
}

impl Role {
    /// Convert role to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Reader => "reader",
            Role::Editor => "editor",
            Role::Administrator => "administrator",
            Role::Owner => "owner",
        }
    }

    /// Check if this role has at least the required level.
    ///
    /// # Examples
    ///
    /// ```
    /// use drive::item::Role;
    ///
    /// assert!(Role::Owner.at_least(Role::Editor));
    /// assert!(!Role::Reader.at_least(Role::Editor));
    /// ```
    pub fn at_least(&self, required: Role) -> bool {
        *self >= required
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "reader" => Ok(Role::Reader),
            "editor" => Ok(Role::Editor),
            "administrator" | "admin" => Ok(Role::Administrator),
            "owner" => Ok(Role::Owner),
            _ => Err(format!("unknown role: {s}")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// A role granted on an item to a user or to a team.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ItemAccess {
    /// Unique access ID.
    pub id: String,
    /// Item the access is granted on.
    pub item_id: String,
    /// Grantee user (None for team accesses).
    pub user_id: Option<String>,
    /// Grantee team (empty for user accesses).
    pub team: String,
    /// Granted role.
    #[sqlx(try_from = "String")]
    pub role: Role,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

/// Data for granting a new access.
#[derive(Debug, Clone)]
pub struct NewItemAccess {
    pub id: String,
    pub item_id: String,
    pub user_id: Option<String>,
    pub team: String,
    pub role: Role,
}

impl NewItemAccess {
    /// Grant `role` on `item_id` to a user.
    pub fn for_user(item_id: impl Into<String>, user_id: impl Into<String>, role: Role) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            item_id: item_id.into(),
            user_id: Some(user_id.into()),
            team: String::new(),
            role,
        }
    }

    /// Grant `role` on `item_id` to every member of a team.
    pub fn for_team(item_id: impl Into<String>, team: impl Into<String>, role: Role) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            item_id: item_id.into(),
            user_id: None,
            team: team.into(),
            role,
        }
    }
}

const ACCESS_COLUMNS: &str = "id, item_id, user_id, team, role, created_at, updated_at";

/// Repository for item access operations.
pub struct ItemAccessRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ItemAccessRepository<'a> {
    /// Create a new ItemAccessRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Grant an access.
    pub async fn create(&self, access: &NewItemAccess) -> Result<ItemAccess> {
        {
            let mut conn = self.pool.acquire().await?;
            Self::insert(&mut conn, access).await?;
        }

        self.get_by_id(&access.id)
            .await?
            .ok_or_else(|| DriveError::NotFound("access".to_string()))
    }

    /// Insert an access on an existing connection.
    ///
    /// Used inside item creation transactions to give the creator ownership.
    pub async fn insert(conn: &mut sqlx::SqliteConnection, access: &NewItemAccess) -> Result<()> {
        sqlx::query(
            "INSERT INTO item_accesses (id, item_id, user_id, team, role) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&access.id)
        .bind(&access.item_id)
        .bind(&access.user_id)
        .bind(&access.team)
        .bind(access.role.as_str())
        .execute(&mut *conn)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get an access by ID.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<ItemAccess>> {
        let access = sqlx::query_as::<_, ItemAccess>(&format!(
            "SELECT {ACCESS_COLUMNS} FROM item_accesses WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(access)
    }

    /// Find the access a user or team already holds on an item.
    pub async fn find_for_grantee(
        &self,
        item_id: &str,
        user_id: Option<&str>,
        team: &str,
    ) -> Result<Option<ItemAccess>> {
        let access = match user_id {
            Some(user_id) => {
                sqlx::query_as::<_, ItemAccess>(&format!(
                    "SELECT {ACCESS_COLUMNS} FROM item_accesses WHERE item_id = ? AND user_id = ?"
                ))
                .bind(item_id)
                .bind(user_id)
                .fetch_optional(self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, ItemAccess>(&format!(
                    "SELECT {ACCESS_COLUMNS} FROM item_accesses WHERE item_id = ? AND team = ?"
                ))
                .bind(item_id)
                .bind(team)
                .fetch_optional(self.pool)
                .await?
            }
        };
        Ok(access)
    }

    /// List the accesses granted directly on an item.
    pub async fn list_by_item(&self, item_id: &str) -> Result<Vec<ItemAccess>> {
        let accesses = sqlx::query_as::<_, ItemAccess>(&format!(
            "SELECT {ACCESS_COLUMNS} FROM item_accesses WHERE item_id = ? ORDER BY created_at, id"
        ))
        .bind(item_id)
        .fetch_all(self.pool)
        .await?;
        Ok(accesses)
    }

    /// Change the role of an access.
    ///
    /// Returns the updated access, or None if not found.
    pub async fn update_role(&self, id: &str, role: Role) -> Result<Option<ItemAccess>> {
        let result = sqlx::query(
            "UPDATE item_accesses SET role = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(role.as_str())
        .bind(id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    /// Revoke an access.
    ///
    /// Returns true if an access was deleted, false if not found.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM item_accesses WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count the owner accesses granted directly on an item.
    pub async fn count_owners(&self, item_id: &str) -> Result<i64> {
        let count: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM item_accesses WHERE item_id = ? AND role = 'owner'",
        )
        .bind(item_id)
        .fetch_one(self.pool)
        .await?;
        Ok(count.0)
    }

    /// Roles held by a user, directly or through a team, on an item or any
    /// of its ancestors.
    pub async fn roles_for(
        &self,
        item_id: &str,
        user_id: Option<&str>,
        teams: &[String],
    ) -> Result<Vec<Role>> {
        if user_id.is_none() && teams.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(
            "WITH RECURSIVE lineage(id, parent_id) AS (
                 SELECT id, parent_id FROM items WHERE id = ",
        );
        query.push_bind(item_id);
        query.push(
            " UNION ALL
                 SELECT i.id, i.parent_id FROM items i JOIN lineage l ON i.id = l.parent_id
             )
             SELECT a.role FROM item_accesses a JOIN lineage l ON a.item_id = l.id WHERE (",
        );

        let mut grantees = query.separated(" OR ");
        if let Some(user_id) = user_id {
            grantees.push("a.user_id = ");
            grantees.push_bind_unseparated(user_id.to_string());
        }
        if !teams.is_empty() {
            grantees.push("(a.user_id IS NULL AND a.team IN (");
            let mut first = true;
            for team in teams {
                if !first {
                    grantees.push_unseparated(", ");
                }
                grantees.push_bind_unseparated(team.clone());
                first = false;
            }
            grantees.push_unseparated("))");
        }
        query.push(")");

        let raw: Vec<String> = query
            .build_query_scalar()
            .fetch_all(self.pool)
            .await?;

        raw.into_iter()
            .map(|role| role.parse().map_err(DriveError::Database))
            .collect()
    }

    /// Highest role held by a user on an item, accounting for ancestors.
    pub async fn max_role(
        &self,
        item_id: &str,
        user_id: Option<&str>,
        teams: &[String],
    ) -> Result<Option<Role>> {
        Ok(self
            .roles_for(item_id, user_id, teams)
            .await?
            .into_iter()
            .max())
    }
}
