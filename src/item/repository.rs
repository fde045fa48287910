//! Item repository for drive.
//!
//! Suspicious files are only visible to their creator: the `*_visible`
//! queries take the caller's user ID and filter them out for everyone else.

use sqlx::{QueryBuilder, SqliteConnection, SqlitePool};

use super::model::{Item, ItemUpdate, NewItem};
use super::naming::SiblingName;
use crate::{DriveError, Result};

const ITEM_COLUMNS: &str = "id, parent_id, title, filename, type, upload_state, size, mimetype, \
                            creator_id, link_reach, link_role, created_at, updated_at";

const VISIBLE: &str =
    "(upload_state IS NULL OR upload_state != 'suspicious' OR creator_id = ?)";

/// Repository for item operations.
pub struct ItemRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ItemRepository<'a> {
    /// Create a new ItemRepository with the given database pool reference.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new item.
    pub async fn create(&self, new_item: &NewItem) -> Result<Item> {
        {
            let mut conn = self.pool.acquire().await?;
            Self::insert(&mut conn, new_item).await?;
        }

        self.get_by_id(&new_item.id)
            .await?
            .ok_or_else(|| DriveError::NotFound("item".to_string()))
    }

    /// Insert an item on an existing connection.
    pub async fn insert(conn: &mut SqliteConnection, new_item: &NewItem) -> Result<()> {
        sqlx::query(
            "INSERT INTO items (id, parent_id, title, filename, type, upload_state, size, \
             mimetype, creator_id, link_reach, link_role) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&new_item.id)
        .bind(&new_item.parent_id)
        .bind(&new_item.title)
        .bind(&new_item.filename)
        .bind(new_item.item_type.as_str())
        .bind(new_item.upload_state.map(|s| s.as_str()))
        .bind(new_item.size)
        .bind(&new_item.mimetype)
        .bind(&new_item.creator_id)
        .bind(new_item.link_reach.as_str())
        .bind(new_item.link_role.as_str())
        .execute(&mut *conn)
        .await
        .map_err(|e| DriveError::Database(e.to_string()))?;
        Ok(())
    }

    /// Get an item by ID, regardless of its state.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(item)
    }

    /// Get an item by ID as seen by `user_id`.
    pub async fn get_visible(&self, id: &str, user_id: Option<&str>) -> Result<Option<Item>> {
        let item = sqlx::query_as::<_, Item>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE id = ? AND {VISIBLE}"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(item)
    }

    /// List the children of a folder visible to `user_id`, folders first.
    pub async fn list_children_visible(
        &self,
        parent_id: &str,
        user_id: Option<&str>,
    ) -> Result<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE parent_id = ? AND {VISIBLE}
             ORDER BY CASE type WHEN 'folder' THEN 0 ELSE 1 END, title"
        ))
        .bind(parent_id)
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(items)
    }

    /// List the item followed by its ancestors, up to the root.
    pub async fn lineage(&self, id: &str) -> Result<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(&format!(
            "WITH RECURSIVE lineage(id, depth) AS (
                 SELECT id, 0 FROM items WHERE id = ?
                 UNION ALL
                 SELECT i.parent_id, l.depth + 1 FROM items i JOIN lineage l ON i.id = l.id
                 WHERE i.parent_id IS NOT NULL
             )
             SELECT {ITEM_COLUMNS} FROM items JOIN lineage USING (id) ORDER BY depth"
        ))
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        Ok(items)
    }

    /// List the item followed by all of its descendants.
    pub async fn subtree(&self, id: &str) -> Result<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(&format!(
            "WITH RECURSIVE subtree(id) AS (
                 SELECT id FROM items WHERE id = ?
                 UNION ALL
                 SELECT i.id FROM items i JOIN subtree s ON i.parent_id = s.id
             )
             SELECT {ITEM_COLUMNS} FROM items WHERE id IN (SELECT id FROM subtree)"
        ))
        .bind(id)
        .fetch_all(self.pool)
        .await?;
        Ok(items)
    }

    /// Check whether `id` is `ancestor_id` or lies below it.
    pub async fn is_within(&self, id: &str, ancestor_id: &str) -> Result<bool> {
        Ok(self.lineage(id).await?.iter().any(|item| item.id == ancestor_id))
    }

    /// List the items on which a user or one of their teams holds a direct
    /// access, most recent first.
    pub async fn list_accessible(&self, user_id: &str, teams: &[String]) -> Result<Vec<Item>> {
        let mut query: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new(format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE id IN (
                 SELECT item_id FROM item_accesses WHERE user_id = "
        ));
        query.push_bind(user_id.to_string());
        if !teams.is_empty() {
            query.push(" OR (user_id IS NULL AND team IN (");
            let mut separated = query.separated(", ");
            for team in teams {
                separated.push_bind(team.clone());
            }
            separated.push_unseparated("))");
        }
        query.push(") AND (upload_state IS NULL OR upload_state != 'suspicious' OR creator_id = ");
        query.push_bind(user_id.to_string());
        query.push(") ORDER BY created_at DESC, title");

        let items = query.build_query_as::<Item>().fetch_all(self.pool).await?;
        Ok(items)
    }

    /// List the items a user marked as favorite.
    pub async fn list_favorites(&self, user_id: &str) -> Result<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>(&format!(
            "SELECT {ITEM_COLUMNS} FROM items
             WHERE id IN (SELECT item_id FROM item_favorites WHERE user_id = ?) AND {VISIBLE}
             ORDER BY title"
        ))
        .bind(user_id)
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(items)
    }

    /// Titles and filenames of the items below `parent_id`, except `exclude_id`.
    pub async fn sibling_names(
        conn: &mut SqliteConnection,
        parent_id: &str,
        exclude_id: Option<&str>,
    ) -> Result<Vec<SiblingName>> {
        let names = sqlx::query_as::<_, SiblingName>(
            "SELECT title, filename FROM items WHERE parent_id = ? AND id IS NOT ?",
        )
        .bind(parent_id)
        .bind(exclude_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(names)
    }

    /// Update an item by ID.
    ///
    /// Only fields that are set in the update will be modified.
    /// Returns the updated item, or None if not found.
    pub async fn update(&self, id: &str, update: &ItemUpdate) -> Result<Option<Item>> {
        let updated = {
            let mut conn = self.pool.acquire().await?;
            Self::apply_update(&mut conn, id, update).await?
        };

        if !updated {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    /// Apply an update on an existing connection. Returns false if not found.
    pub async fn apply_update(
        conn: &mut SqliteConnection,
        id: &str,
        update: &ItemUpdate,
    ) -> Result<bool> {
        let mut query: QueryBuilder<sqlx::Sqlite> = QueryBuilder::new("UPDATE items SET ");
        let mut separated = query.separated(", ");
        separated.push("updated_at = datetime('now')");

        if let Some(ref title) = update.title {
            separated.push("title = ");
            separated.push_bind_unseparated(title.clone());
        }
        if let Some(ref filename) = update.filename {
            separated.push("filename = ");
            separated.push_bind_unseparated(filename.clone());
        }
        if let Some(ref parent_id) = update.parent_id {
            separated.push("parent_id = ");
            separated.push_bind_unseparated(parent_id.clone());
        }
        if let Some(state) = update.upload_state {
            separated.push("upload_state = ");
            separated.push_bind_unseparated(state.as_str());
        }
        if let Some(size) = update.size {
            separated.push("size = ");
            separated.push_bind_unseparated(size);
        }
        if let Some(ref mimetype) = update.mimetype {
            separated.push("mimetype = ");
            separated.push_bind_unseparated(mimetype.clone());
        }
        if let Some(reach) = update.link_reach {
            separated.push("link_reach = ");
            separated.push_bind_unseparated(reach.as_str());
        }
        if let Some(role) = update.link_role {
            separated.push("link_role = ");
            separated.push_bind_unseparated(role.as_str());
        }

        query.push(" WHERE id = ");
        query.push_bind(id.to_string());

        let result = query
            .build()
            .execute(&mut *conn)
            .await
            .map_err(|e| DriveError::Database(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete an item by ID, along with its descendants, accesses and favorites.
    ///
    /// Returns true if an item was deleted, false if not found.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM items WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count the direct children of a folder.
    pub async fn count_children(&self, parent_id: &str) -> Result<i64> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM items WHERE parent_id = ?")
            .bind(parent_id)
            .fetch_one(self.pool)
            .await?;
        Ok(count.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, UserRepository};
    use crate::item::{ItemAccessRepository, NewItemAccess, Role, UploadState};
    use crate::Database;

    async fn setup_db() -> Database {
        let db = Database::open_in_memory().await.unwrap();
        let users = UserRepository::new(db.pool());
        users.create(&NewUser::with_id("alice")).await.unwrap();
        users.create(&NewUser::with_id("bob")).await.unwrap();
        db
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let db = setup_db().await;
        let repo = ItemRepository::new(db.pool());

        let root = repo
            .create(&NewItem::folder("Projects").with_creator("alice"))
            .await
            .unwrap();
        let file = repo
            .create(&NewItem::file("plan", "plan.odt").with_parent(&root.id))
            .await
            .unwrap();

        assert!(root.is_folder());
        assert!(root.parent_id.is_none());
        assert_eq!(file.parent_id.as_deref(), Some(root.id.as_str()));
        assert_eq!(file.upload_state, Some(UploadState::Pending));
        assert_eq!(repo.get_by_id(&file.id).await.unwrap(), Some(file));
        assert!(repo.get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_root_file_rejected() {
        let db = setup_db().await;
        let repo = ItemRepository::new(db.pool());

        assert!(repo.create(&NewItem::file("loose", "loose.txt")).await.is_err());
    }

    #[tokio::test]
    async fn test_suspicious_visible_to_creator_only() {
        let db = setup_db().await;
        let repo = ItemRepository::new(db.pool());
        let root = repo.create(&NewItem::folder("root")).await.unwrap();
        let file = repo
            .create(
                &NewItem::file("virus", "virus.exe")
                    .with_parent(&root.id)
                    .with_creator("alice")
                    .with_upload_state(UploadState::Suspicious),
            )
            .await
            .unwrap();

        assert!(repo.get_visible(&file.id, Some("alice")).await.unwrap().is_some());
        assert!(repo.get_visible(&file.id, Some("bob")).await.unwrap().is_none());
        assert!(repo.get_visible(&file.id, None).await.unwrap().is_none());

        assert_eq!(repo.list_children_visible(&root.id, Some("alice")).await.unwrap().len(), 1);
        assert!(repo.list_children_visible(&root.id, Some("bob")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_children_folders_first() {
        let db = setup_db().await;
        let repo = ItemRepository::new(db.pool());
        let root = repo.create(&NewItem::folder("root")).await.unwrap();
        repo.create(&NewItem::file("a file", "a file.txt").with_parent(&root.id))
            .await
            .unwrap();
        repo.create(&NewItem::folder("z folder").with_parent(&root.id))
            .await
            .unwrap();

        let titles: Vec<_> = repo
            .list_children_visible(&root.id, None)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.title)
            .collect();
        assert_eq!(titles, vec!["z folder", "a file"]);
        assert_eq!(repo.count_children(&root.id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_lineage_and_subtree() {
        let db = setup_db().await;
        let repo = ItemRepository::new(db.pool());
        let root = repo.create(&NewItem::folder("root")).await.unwrap();
        let mid = repo
            .create(&NewItem::folder("mid").with_parent(&root.id))
            .await
            .unwrap();
        let leaf = repo
            .create(&NewItem::file("leaf", "leaf.txt").with_parent(&mid.id))
            .await
            .unwrap();

        let lineage: Vec<_> = repo
            .lineage(&leaf.id)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.title)
            .collect();
        assert_eq!(lineage, vec!["leaf", "mid", "root"]);

        assert_eq!(repo.subtree(&root.id).await.unwrap().len(), 3);
        assert!(repo.is_within(&leaf.id, &root.id).await.unwrap());
        assert!(!repo.is_within(&root.id, &leaf.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_sibling_names_excludes_self() {
        let db = setup_db().await;
        let repo = ItemRepository::new(db.pool());
        let root = repo.create(&NewItem::folder("root")).await.unwrap();
        let a = repo
            .create(&NewItem::file("a", "a.odt").with_parent(&root.id))
            .await
            .unwrap();
        repo.create(&NewItem::folder("b").with_parent(&root.id))
            .await
            .unwrap();

        let mut conn = db.pool().acquire().await.unwrap();
        let all = ItemRepository::sibling_names(&mut conn, &root.id, None)
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let others = ItemRepository::sibling_names(&mut conn, &root.id, Some(&a.id))
            .await
            .unwrap();
        assert_eq!(others, vec![SiblingName::new("b", None)]);
    }

    #[tokio::test]
    async fn test_update_item() {
        let db = setup_db().await;
        let repo = ItemRepository::new(db.pool());
        let root = repo.create(&NewItem::folder("root")).await.unwrap();
        let file = repo
            .create(&NewItem::file("a", "a.txt").with_parent(&root.id))
            .await
            .unwrap();

        let updated = repo
            .update(
                &file.id,
                &ItemUpdate::new()
                    .title("b")
                    .filename("b.txt")
                    .upload_state(UploadState::Ready)
                    .size(42),
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.title, "b");
        assert_eq!(updated.filename.as_deref(), Some("b.txt"));
        assert_eq!(updated.upload_state, Some(UploadState::Ready));
        assert_eq!(updated.size, Some(42));
        assert!(repo.update("missing", &ItemUpdate::new().title("x")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_cascades() {
        let db = setup_db().await;
        let repo = ItemRepository::new(db.pool());
        let root = repo.create(&NewItem::folder("root")).await.unwrap();
        let child = repo
            .create(&NewItem::folder("child").with_parent(&root.id))
            .await
            .unwrap();
        ItemAccessRepository::new(db.pool())
            .create(&NewItemAccess::for_user(&child.id, "bob", Role::Reader))
            .await
            .unwrap();

        assert!(repo.delete(&root.id).await.unwrap());
        assert!(repo.get_by_id(&child.id).await.unwrap().is_none());
        assert!(ItemAccessRepository::new(db.pool())
            .list_by_item(&child.id)
            .await
            .unwrap()
            .is_empty());
        assert!(!repo.delete(&root.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_accessible_and_favorites() {
        let db = setup_db().await;
        let repo = ItemRepository::new(db.pool());
        let accesses = ItemAccessRepository::new(db.pool());
        let mine = repo.create(&NewItem::folder("mine")).await.unwrap();
        let team = repo.create(&NewItem::folder("team")).await.unwrap();
        repo.create(&NewItem::folder("other")).await.unwrap();

        accesses
            .create(&NewItemAccess::for_user(&mine.id, "alice", Role::Owner))
            .await
            .unwrap();
        accesses
            .create(&NewItemAccess::for_team(&team.id, "ops", Role::Reader))
            .await
            .unwrap();

        assert_eq!(repo.list_accessible("alice", &[]).await.unwrap().len(), 1);
        let with_team = repo
            .list_accessible("alice", &["ops".to_string()])
            .await
            .unwrap();
        assert_eq!(with_team.len(), 2);
        // User accesses carry an empty team and must not match it
        assert!(repo
            .list_accessible("bob", &[String::new()])
            .await
            .unwrap()
            .is_empty());

        crate::item::FavoriteRepository::new(db.pool())
            .add(&team.id, "alice")
            .await
            .unwrap();
        let favorites = repo.list_favorites("alice").await.unwrap();
        assert_eq!(favorites.len(), 1);
        assert_eq!(favorites[0].id, team.id);
    }
}
