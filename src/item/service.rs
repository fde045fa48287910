//! Item service.
//!
//! Combines the repositories with object storage. Operations touching both
//! run the database side in a transaction that is rolled back when storage
//! fails, so rows never point at missing objects.

use tracing::{error, info, warn};

use super::abilities::ItemPermissions;
use super::access::{ItemAccessRepository, NewItemAccess, Role};
use super::model::{split_extension, Item, ItemUpdate, NewItem, UploadState};
use super::naming::{filename_for, unique_title};
use super::repository::ItemRepository;
use super::template::DocumentTemplate;
use crate::db::{Database, User};
use crate::storage::{item_key, ObjectStorage};
use crate::{DriveError, Result};

/// Maximum title length in characters.
pub const MAX_TITLE_LENGTH: usize = 255;

/// Check that a title can be used as an item title.
pub fn validate_title(title: &str) -> Result<()> {
    if title.trim().is_empty() {
        return Err(DriveError::Validation("title must not be blank".to_string()));
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(DriveError::Validation(format!(
            "title must be at most {MAX_TITLE_LENGTH} characters"
        )));
    }
    if title.contains('/') {
        return Err(DriveError::Validation(
            "title must not contain '/'".to_string(),
        ));
    }
    Ok(())
}

/// Service for item operations.
pub struct ItemService<'a> {
    db: &'a Database,
    storage: &'a dyn ObjectStorage,
}

impl<'a> ItemService<'a> {
    /// Create a new ItemService.
    pub fn new(db: &'a Database, storage: &'a dyn ObjectStorage) -> Self {
        Self { db, storage }
    }

    fn repo(&self) -> ItemRepository<'_> {
        ItemRepository::new(self.db.pool())
    }

    /// Resolve what a caller holds on an item.
    pub async fn permissions(
        &self,
        item: &Item,
        user_id: Option<&str>,
        teams: &[String],
    ) -> Result<ItemPermissions> {
        let lineage = self.repo().lineage(&item.id).await?;
        let roles = ItemAccessRepository::new(self.db.pool())
            .roles_for(&item.id, user_id, teams)
            .await?;
        Ok(ItemPermissions::new(roles, &lineage, user_id.is_some()))
    }

    /// Create a root folder owned by `creator`.
    pub async fn create_root_folder(&self, creator: &User, title: &str) -> Result<Item> {
        validate_title(title)?;

        let new_item = NewItem::folder(title).with_creator(&creator.id);
        let mut tx = self.db.pool().begin().await?;
        ItemRepository::insert(&mut tx, &new_item).await?;
        ItemAccessRepository::insert(
            &mut tx,
            &NewItemAccess::for_user(&new_item.id, &creator.id, Role::Owner),
        )
        .await?;
        tx.commit().await?;

        info!(item_id = %new_item.id, user_id = %creator.id, "Created root folder");
        self.fetch(&new_item.id).await
    }

    /// Create a folder below `parent`.
    pub async fn create_folder(&self, parent: &Item, creator: &User, title: &str) -> Result<Item> {
        validate_title(title)?;
        self.ensure_folder(parent)?;

        let mut tx = self.db.pool().begin().await?;
        let siblings = ItemRepository::sibling_names(&mut tx, &parent.id, None).await?;
        let title = unique_title(title, None, &siblings);
        let new_item = NewItem::folder(title)
            .with_parent(&parent.id)
            .with_creator(&creator.id);
        ItemRepository::insert(&mut tx, &new_item).await?;
        tx.commit().await?;

        info!(item_id = %new_item.id, parent_id = %parent.id, "Created folder");
        self.fetch(&new_item.id).await
    }

    /// Create a file below `parent` from a blank document template.
    ///
    /// The title is de-duplicated against the siblings, the template is
    /// written under `item/{id}/{filename}` and the item is ready at once.
    pub async fn create_from_template(
        &self,
        parent: &Item,
        creator: &User,
        title: &str,
        template: &DocumentTemplate,
    ) -> Result<Item> {
        validate_title(title)?;
        self.ensure_folder(parent)?;

        let mut tx = self.db.pool().begin().await?;
        let siblings = ItemRepository::sibling_names(&mut tx, &parent.id, None).await?;
        let title = unique_title(title, Some(template.extension), &siblings);
        let filename = filename_for(&title, Some(template.extension));
        let new_item = NewItem::file(title, filename.clone())
            .with_parent(&parent.id)
            .with_creator(&creator.id)
            .with_upload_state(UploadState::Ready)
            .with_content_info(template.size(), template.mimetype);
        ItemRepository::insert(&mut tx, &new_item).await?;

        let key = item_key(&new_item.id, &filename);
        if let Err(e) = self.storage.save(&key, template.content) {
            error!(item_id = %new_item.id, key = %key, "Failed to store template: {}", e);
            tx.rollback().await?;
            return Err(DriveError::Storage(e.to_string()));
        }
        if let Err(e) = tx.commit().await {
            self.discard_object(&new_item.id, &key);
            return Err(e.into());
        }

        info!(
            item_id = %new_item.id,
            parent_id = %parent.id,
            extension = template.extension,
            "Created file from template"
        );
        self.fetch(&new_item.id).await
    }

    /// Create a file below `parent` whose content will be uploaded later.
    pub async fn create_pending_file(
        &self,
        parent: &Item,
        creator: &User,
        filename: &str,
    ) -> Result<Item> {
        let (stem, extension) = match split_extension(filename) {
            Some((stem, ext)) => (stem, Some(ext)),
            None => (filename, None),
        };
        validate_title(stem)?;
        self.ensure_folder(parent)?;

        let mut tx = self.db.pool().begin().await?;
        let siblings = ItemRepository::sibling_names(&mut tx, &parent.id, None).await?;
        let title = unique_title(stem, extension, &siblings);
        let filename = filename_for(&title, extension);
        let mimetype = mime_guess::from_path(&filename)
            .first_or_octet_stream()
            .to_string();
        let mut new_item = NewItem::file(title, filename)
            .with_parent(&parent.id)
            .with_creator(&creator.id);
        new_item.mimetype = Some(mimetype);
        ItemRepository::insert(&mut tx, &new_item).await?;
        tx.commit().await?;

        info!(item_id = %new_item.id, parent_id = %parent.id, "Created pending file");
        self.fetch(&new_item.id).await
    }

    /// Store the content of a pending file and mark it ready.
    pub async fn upload_content(&self, item: &Item, content: &[u8]) -> Result<Item> {
        if item.upload_state != Some(UploadState::Pending) {
            return Err(DriveError::Validation(
                "content can only be uploaded to a pending file".to_string(),
            ));
        }
        let Some(key) = item.file_key() else {
            return Err(DriveError::Validation("item is not a file".to_string()));
        };

        self.storage.save(&key, content).map_err(|e| {
            error!(item_id = %item.id, key = %key, "Failed to store upload: {}", e);
            DriveError::Storage(e.to_string())
        })?;

        let mimetype = mime_guess::from_path(&key).first_or_octet_stream().to_string();
        let update = ItemUpdate::new()
            .upload_state(UploadState::Ready)
            .size(content.len() as i64)
            .mimetype(mimetype);

        info!(item_id = %item.id, size = content.len(), "Uploaded file content");
        self.repo()
            .update(&item.id, &update)
            .await?
            .ok_or_else(|| DriveError::NotFound("item".to_string()))
    }

    /// Rename an item, de-duplicating against its siblings.
    ///
    /// A file keeps its extension and its stored object follows the new
    /// filename.
    pub async fn rename(&self, item: &Item, title: &str) -> Result<Item> {
        validate_title(title)?;
        if title == item.title {
            return Ok(item.clone());
        }
        self.relocate(item, item.parent_id.as_deref(), title).await
    }

    /// Move an item below `target`, de-duplicating against its new siblings.
    pub async fn move_item(&self, item: &Item, target: &Item) -> Result<Item> {
        self.ensure_folder(target)?;
        if self.repo().is_within(&target.id, &item.id).await? {
            return Err(DriveError::Validation(
                "cannot move an item into itself or one of its descendants".to_string(),
            ));
        }
        if item.parent_id.as_deref() == Some(target.id.as_str()) {
            return Ok(item.clone());
        }
        self.relocate(item, Some(&target.id), &item.title).await
    }

    async fn relocate(&self, item: &Item, parent_id: Option<&str>, title: &str) -> Result<Item> {
        let mut tx = self.db.pool().begin().await?;

        let title = match parent_id {
            Some(parent_id) => {
                let siblings =
                    ItemRepository::sibling_names(&mut tx, parent_id, Some(&item.id)).await?;
                unique_title(title, item.extension(), &siblings)
            }
            None => title.to_string(),
        };

        let mut update = ItemUpdate::new().title(title.clone());
        if let Some(parent_id) = parent_id {
            if item.parent_id.as_deref() != Some(parent_id) {
                update = update.parent_id(parent_id);
            }
        }

        let mut moved_object = None;
        if item.is_file() {
            let filename = filename_for(&title, item.extension());
            if item.filename.as_deref() != Some(filename.as_str()) {
                update = update.filename(filename.clone());
                let has_content = item.upload_state != Some(UploadState::Pending);
                if let (Some(old_key), true) = (item.file_key(), has_content) {
                    moved_object = Some((old_key, item_key(&item.id, &filename)));
                }
            }
        }

        ItemRepository::apply_update(&mut tx, &item.id, &update).await?;

        if let Some((from, to)) = &moved_object {
            if let Err(e) = self.storage.rename(from, to) {
                error!(item_id = %item.id, from = %from, to = %to, "Failed to move object: {}", e);
                tx.rollback().await?;
                return Err(DriveError::Storage(e.to_string()));
            }
        }

        if let Err(e) = tx.commit().await {
            if let Some((from, to)) = &moved_object {
                if let Err(undo) = self.storage.rename(to, from) {
                    warn!(item_id = %item.id, "Failed to restore object after rollback: {}", undo);
                }
            }
            return Err(e.into());
        }

        info!(item_id = %item.id, title = %title, "Updated item location");
        self.fetch(&item.id).await
    }

    /// Delete an item with its descendants and their stored content.
    ///
    /// Objects are removed after the rows; failures are logged and left
    /// behind.
    pub async fn delete(&self, item: &Item) -> Result<()> {
        let keys: Vec<String> = self
            .repo()
            .subtree(&item.id)
            .await?
            .iter()
            .filter_map(Item::file_key)
            .collect();

        if !self.repo().delete(&item.id).await? {
            return Err(DriveError::NotFound("item".to_string()));
        }

        for key in keys {
            if let Err(e) = self.storage.delete(&key) {
                warn!(item_id = %item.id, key = %key, "Failed to delete object: {}", e);
            }
        }

        info!(item_id = %item.id, "Deleted item");
        Ok(())
    }

    /// Remove an object written for a row that was never committed.
    fn discard_object(&self, item_id: &str, key: &str) {
        match self.storage.delete(key) {
            Ok(_) => warn!(item_id = %item_id, key = %key, "Discarded object after failed commit"),
            Err(e) => warn!(item_id = %item_id, key = %key, "Failed to discard object: {}", e),
        }
    }

    fn ensure_folder(&self, item: &Item) -> Result<()> {
        if item.is_folder() {
            Ok(())
        } else {
            Err(DriveError::Validation("only folders can have children".to_string()))
        }
    }

    async fn fetch(&self, id: &str) -> Result<Item> {
        self.repo()
            .get_by_id(id)
            .await?
            .ok_or_else(|| DriveError::NotFound("item".to_string()))
    }
}
