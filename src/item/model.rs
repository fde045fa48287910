//! Item types for the drive tree.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

use crate::storage::item_key;

/// Kind of tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemType {
    /// A file with stored content.
    File,
    /// A folder holding other items.
    Folder,
}

impl ItemType {
    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::File => "file",
            ItemType::Folder => "folder",
        }
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(ItemType::File),
            "folder" => Ok(ItemType::Folder),
            _ => Err(format!("unknown item type: {s}")),
        }
    }
}

/// Content lifecycle of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadState {
    /// Created, content not uploaded yet.
    Pending,
    /// Content is being analyzed.
    Analyzing,
    /// Content too large for analysis, served as is.
    FileTooLargeToAnalyze,
    /// Content flagged by the analysis pipeline.
    Suspicious,
    /// Content available.
    Ready,
}

impl UploadState {
    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadState::Pending => "pending",
            UploadState::Analyzing => "analyzing",
            UploadState::FileTooLargeToAnalyze => "file_too_large_to_analyze",
            UploadState::Suspicious => "suspicious",
            UploadState::Ready => "ready",
        }
    }

    /// Whether content in this state may be served.
    pub fn is_downloadable(&self) -> bool {
        matches!(
            self,
            UploadState::Ready | UploadState::Analyzing | UploadState::FileTooLargeToAnalyze
        )
    }
}

impl fmt::Display for UploadState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UploadState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(UploadState::Pending),
            "analyzing" => Ok(UploadState::Analyzing),
            "file_too_large_to_analyze" => Ok(UploadState::FileTooLargeToAnalyze),
            "suspicious" => Ok(UploadState::Suspicious),
            "ready" => Ok(UploadState::Ready),
            _ => Err(format!("unknown upload state: {s}")),
        }
    }
}

/// Who can reach an item through its link, without an explicit access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkReach {
    /// Only users holding an access.
    #[default]
    Restricted,
    /// Any authenticated user.
    Authenticated,
    /// Anyone, including anonymous visitors.
    Public,
}

impl LinkReach {
    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkReach::Restricted => "restricted",
            LinkReach::Authenticated => "authenticated",
            LinkReach::Public => "public",
        }
    }

    /// Whether the link reach alone lets the caller in.
    pub fn admits(&self, authenticated: bool) -> bool {
        match self {
            LinkReach::Restricted => false,
            LinkReach::Authenticated => authenticated,
            LinkReach::Public => true,
        }
    }
}

impl fmt::Display for LinkReach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkReach {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "restricted" => Ok(LinkReach::Restricted),
            "authenticated" => Ok(LinkReach::Authenticated),
            "public" => Ok(LinkReach::Public),
            _ => Err(format!("unknown link reach: {s}")),
        }
    }
}

/// Role granted to callers admitted by the link reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkRole {
    /// Read only.
    #[default]
    Reader,
    /// Read and write.
    Editor,
}

impl LinkRole {
    /// Convert to database string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkRole::Reader => "reader",
            LinkRole::Editor => "editor",
        }
    }
}

impl fmt::Display for LinkRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LinkRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reader" => Ok(LinkRole::Reader),
            "editor" => Ok(LinkRole::Editor),
            _ => Err(format!("unknown link role: {s}")),
        }
    }
}

/// A node of the drive tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Unique item ID (UUID).
    pub id: String,
    /// Parent folder ID (None for root folders).
    pub parent_id: Option<String>,
    /// Display title.
    pub title: String,
    /// Stored filename (files only).
    pub filename: Option<String>,
    /// File or folder.
    pub item_type: ItemType,
    /// Content lifecycle (files only).
    pub upload_state: Option<UploadState>,
    /// Content size in bytes.
    pub size: Option<i64>,
    /// Content MIME type.
    pub mimetype: Option<String>,
    /// ID of the user who created the item.
    pub creator_id: Option<String>,
    /// Link reach set on this item.
    pub link_reach: LinkReach,
    /// Link role set on this item.
    pub link_role: LinkRole,
    /// Creation timestamp.
    pub created_at: String,
    /// Last update timestamp.
    pub updated_at: String,
}

impl Item {
    /// Whether this item is a file.
    pub fn is_file(&self) -> bool {
        self.item_type == ItemType::File
    }

    /// Whether this item is a folder.
    pub fn is_folder(&self) -> bool {
        self.item_type == ItemType::Folder
    }

    /// Whether `user_id` created this item.
    pub fn is_created_by(&self, user_id: Option<&str>) -> bool {
        matches!((self.creator_id.as_deref(), user_id), (Some(a), Some(b)) if a == b)
    }

    /// Storage key of the content, for files.
    pub fn file_key(&self) -> Option<String> {
        match (&self.item_type, &self.filename) {
            (ItemType::File, Some(filename)) => Some(item_key(&self.id, filename)),
            _ => None,
        }
    }

    /// Extension of the filename, without the dot.
    pub fn extension(&self) -> Option<&str> {
        self.filename.as_deref().and_then(split_extension).map(|(_, ext)| ext)
    }
}

/// Split `name.ext` into (`name`, `ext`).
///
/// Dotfiles such as `.hidden` have no extension.
pub fn split_extension(filename: &str) -> Option<(&str, &str)> {
    match filename.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < filename.len() => {
            Some((&filename[..idx], &filename[idx + 1..]))
        }
        _ => None,
    }
}

fn decode_enum<T: FromStr<Err = String>>(column: &str, value: &str) -> sqlx::Result<T> {
    value.parse().map_err(|e: String| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: e.into(),
    })
}

impl<'r> FromRow<'r, SqliteRow> for Item {
    fn from_row(row: &'r SqliteRow) -> sqlx::Result<Self> {
        let item_type: String = row.try_get("type")?;
        let upload_state: Option<String> = row.try_get("upload_state")?;
        let link_reach: String = row.try_get("link_reach")?;
        let link_role: String = row.try_get("link_role")?;

        Ok(Self {
            id: row.try_get("id")?,
            parent_id: row.try_get("parent_id")?,
            title: row.try_get("title")?,
            filename: row.try_get("filename")?,
            item_type: decode_enum("type", &item_type)?,
            upload_state: upload_state
                .as_deref()
                .map(|s| decode_enum("upload_state", s))
                .transpose()?,
            size: row.try_get("size")?,
            mimetype: row.try_get("mimetype")?,
            creator_id: row.try_get("creator_id")?,
            link_reach: decode_enum("link_reach", &link_reach)?,
            link_role: decode_enum("link_role", &link_role)?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Data for creating a new item.
#[derive(Debug, Clone)]
pub struct NewItem {
    /// Item ID. Generated up front so the storage key is known before insert.
    pub id: String,
    /// Parent folder ID.
    pub parent_id: Option<String>,
    /// Display title.
    pub title: String,
    /// Stored filename.
    pub filename: Option<String>,
    /// File or folder.
    pub item_type: ItemType,
    /// Content lifecycle.
    pub upload_state: Option<UploadState>,
    /// Content size.
    pub size: Option<i64>,
    /// Content MIME type.
    pub mimetype: Option<String>,
    /// Creator user ID.
    pub creator_id: Option<String>,
    /// Link reach.
    pub link_reach: LinkReach,
    /// Link role.
    pub link_role: LinkRole,
}

impl NewItem {
    /// Create a new folder.
    pub fn folder(title: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            parent_id: None,
            title: title.into(),
            filename: None,
            item_type: ItemType::Folder,
            upload_state: None,
            size: None,
            mimetype: None,
            creator_id: None,
            link_reach: LinkReach::Restricted,
            link_role: LinkRole::Reader,
        }
    }

    /// Create a new file awaiting its content.
    pub fn file(title: impl Into<String>, filename: impl Into<String>) -> Self {
        Self {
            item_type: ItemType::File,
            filename: Some(filename.into()),
            upload_state: Some(UploadState::Pending),
            ..Self::folder(title)
        }
    }

    /// Set the parent folder.
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Set the creator.
    pub fn with_creator(mut self, creator_id: impl Into<String>) -> Self {
        self.creator_id = Some(creator_id.into());
        self
    }

    /// Set the upload state.
    pub fn with_upload_state(mut self, state: UploadState) -> Self {
        self.upload_state = Some(state);
        self
    }

    /// Set size and MIME type of the content.
    pub fn with_content_info(mut self, size: i64, mimetype: impl Into<String>) -> Self {
        self.size = Some(size);
        self.mimetype = Some(mimetype.into());
        self
    }

    /// Set the link reach.
    pub fn with_link_reach(mut self, reach: LinkReach) -> Self {
        self.link_reach = reach;
        self
    }

    /// Set the link role.
    pub fn with_link_role(mut self, role: LinkRole) -> Self {
        self.link_role = role;
        self
    }
}

/// Builder for updating an item.
#[derive(Debug, Clone, Default)]
pub struct ItemUpdate {
    /// New title.
    pub title: Option<String>,
    /// New filename.
    pub filename: Option<String>,
    /// New parent folder.
    pub parent_id: Option<String>,
    /// New upload state.
    pub upload_state: Option<UploadState>,
    /// New content size.
    pub size: Option<i64>,
    /// New MIME type.
    pub mimetype: Option<String>,
    /// New link reach.
    pub link_reach: Option<LinkReach>,
    /// New link role.
    pub link_role: Option<LinkRole>,
}

impl ItemUpdate {
    /// Create a new ItemUpdate.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the filename.
    pub fn filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }

    /// Set the parent folder.
    pub fn parent_id(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Set the upload state.
    pub fn upload_state(mut self, state: UploadState) -> Self {
        self.upload_state = Some(state);
        self
    }

    /// Set the content size.
    pub fn size(mut self, size: i64) -> Self {
        self.size = Some(size);
        self
    }

    /// Set the MIME type.
    pub fn mimetype(mut self, mimetype: impl Into<String>) -> Self {
        self.mimetype = Some(mimetype.into());
        self
    }

    /// Set the link reach.
    pub fn link_reach(mut self, reach: LinkReach) -> Self {
        self.link_reach = Some(reach);
        self
    }

    /// Set the link role.
    pub fn link_role(mut self, role: LinkRole) -> Self {
        self.link_role = Some(role);
        self
    }

    /// Check if any fields are set.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.filename.is_none()
            && self.parent_id.is_none()
            && self.upload_state.is_none()
            && self.size.is_none()
            && self.mimetype.is_none()
            && self.link_reach.is_none()
            && self.link_role.is_none()
    }
}
