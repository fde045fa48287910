//! Response DTOs for Web API.

use serde::Serialize;

use crate::db::User;
use crate::item::{Abilities, Item, ItemAccess, ItemType, LinkReach, LinkRole, Role, UploadState};
use crate::storage::media_url;

/// List response wrapper.
#[derive(Debug, Serialize)]
pub struct ListResponse<T: Serialize> {
    /// Number of results.
    pub count: usize,
    /// Results.
    pub results: Vec<T>,
}

impl<T: Serialize> ListResponse<T> {
    /// Create a new list response.
    pub fn new(results: Vec<T>) -> Self {
        Self {
            count: results.len(),
            results,
        }
    }
}

/// Plain message about an outcome that changed nothing.
#[derive(Debug, Serialize)]
pub struct DetailResponse {
    pub detail: String,
}

impl DetailResponse {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }
}

/// Plain message about a successful action.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Favorite state of an item for the caller.
#[derive(Debug, Serialize)]
pub struct FavoriteResponse {
    pub id: String,
    pub is_favorite: bool,
}

/// User response.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
        }
    }
}

/// Item response.
#[derive(Debug, Serialize)]
pub struct ItemResponse {
    pub id: String,
    pub parent_id: Option<String>,
    pub title: String,
    pub filename: Option<String>,
    #[serde(rename = "type")]
    pub item_type: ItemType,
    pub upload_state: Option<UploadState>,
    pub size: Option<i64>,
    pub mimetype: Option<String>,
    /// ID of the creator.
    pub creator: Option<String>,
    pub link_reach: LinkReach,
    pub link_role: LinkRole,
    /// Media URL of the content, for files whose content can be downloaded.
    pub url: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub is_favorite: bool,
    pub abilities: Abilities,
    /// Highest role held by the caller, None when access comes from the link only.
    pub user_role: Option<Role>,
}

impl ItemResponse {
    /// Build the response for a caller.
    pub fn new(
        item: Item,
        abilities: Abilities,
        user_role: Option<Role>,
        is_favorite: bool,
        media_base_url: &str,
    ) -> Self {
        let url = abilities
            .download
            .then(|| item.file_key())
            .flatten()
            .map(|key| media_url(media_base_url, &key));

        Self {
            id: item.id,
            parent_id: item.parent_id,
            title: item.title,
            filename: item.filename,
            item_type: item.item_type,
            upload_state: item.upload_state,
            size: item.size,
            mimetype: item.mimetype,
            creator: item.creator_id,
            link_reach: item.link_reach,
            link_role: item.link_role,
            url,
            created_at: item.created_at,
            updated_at: item.updated_at,
            is_favorite,
            abilities,
            user_role,
        }
    }
}

/// Access response.
#[derive(Debug, Serialize)]
pub struct AccessResponse {
    pub id: String,
    pub item: String,
    pub user_id: Option<String>,
    pub team: String,
    pub role: Role,
    pub created_at: String,
    pub updated_at: String,
}

impl From<ItemAccess> for AccessResponse {
    fn from(access: ItemAccess) -> Self {
        Self {
            id: access.id,
            item: access.item_id,
            user_id: access.user_id,
            team: access.team,
            role: access.role,
            created_at: access.created_at,
            updated_at: access.updated_at,
        }
    }
}
