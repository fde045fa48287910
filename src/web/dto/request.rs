//! Request DTOs for Web API.

use serde::Deserialize;
use validator::{Validate, ValidationError, ValidationErrors};

use super::validation::{invalid_choice, valid_role, valid_title};
use crate::item::{find_template, DocumentTemplate, ItemType, LinkReach, LinkRole};

/// Create root folder request.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateItemRequest {
    /// Folder title.
    #[validate(
        length(min = 1, max = 255, message = "Ensure this field has between 1 and 255 characters."),
        custom(function = "valid_title")
    )]
    pub title: String,
}

/// Create child request.
///
/// Three shapes are accepted:
/// - `{title, extension}` (type `file`, the default): a file instantiated
///   from the blank template of that extension
/// - `{filename}` (type `file`): a pending file awaiting its upload
/// - `{title, type: "folder"}`: a folder
#[derive(Debug, Default, Deserialize)]
pub struct CreateChildRequest {
    /// Item title.
    pub title: Option<String>,
    /// Template extension.
    pub extension: Option<String>,
    /// Item type (`file` or `folder`).
    #[serde(rename = "type")]
    pub item_type: Option<String>,
    /// Filename of a file to upload later.
    pub filename: Option<String>,
}

/// What a validated child request creates.
#[derive(Debug, Clone, Copy)]
pub enum ChildKind<'a> {
    /// Folder with this title.
    Folder { title: &'a str },
    /// File instantiated from a template.
    Template {
        title: &'a str,
        template: &'static DocumentTemplate,
    },
    /// File awaiting upload.
    Pending { filename: &'a str },
}

fn required() -> ValidationError {
    ValidationError::new("invalid").with_message("This field is required.".into())
}

impl CreateChildRequest {
    fn item_type(&self) -> Option<ItemType> {
        match self.item_type.as_deref() {
            None => Some(ItemType::File),
            Some(value) => value.parse().ok(),
        }
    }

    fn is_pending_upload(&self) -> bool {
        self.filename.is_some() && self.extension.is_none()
    }

    /// Resolve what to create. Call after `validate()`.
    pub fn kind(&self) -> Option<ChildKind<'_>> {
        match self.item_type()? {
            ItemType::Folder => Some(ChildKind::Folder {
                title: self.title.as_deref()?,
            }),
            ItemType::File if self.is_pending_upload() => Some(ChildKind::Pending {
                filename: self.filename.as_deref()?,
            }),
            ItemType::File => Some(ChildKind::Template {
                title: self.title.as_deref()?,
                template: find_template(self.extension.as_deref()?)?,
            }),
        }
    }
}

impl Validate for CreateChildRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let Some(item_type) = self.item_type() else {
            let value = self.item_type.as_deref().unwrap_or_default();
            errors.add("type", invalid_choice(value));
            return Err(errors);
        };

        if item_type == ItemType::File && self.is_pending_upload() {
            if let Some(filename) = self.filename.as_deref() {
                if let Err(e) = valid_title(filename) {
                    errors.add("filename", e);
                }
            }
        } else {
            match self.title.as_deref() {
                None => errors.add("title", required()),
                Some(title) => {
                    if let Err(e) = valid_title(title) {
                        errors.add("title", e);
                    }
                }
            }

            if item_type == ItemType::File {
                match self.extension.as_deref() {
                    None => errors.add("extension", required()),
                    Some(ext) if find_template(ext).is_none() => {
                        errors.add("extension", invalid_choice(ext))
                    }
                    Some(_) => {}
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Update item request.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateItemRequest {
    /// New title.
    #[validate(
        length(min = 1, max = 255, message = "Ensure this field has between 1 and 255 characters."),
        custom(function = "valid_title")
    )]
    pub title: Option<String>,
    /// New link reach.
    pub link_reach: Option<LinkReach>,
    /// New link role.
    pub link_role: Option<LinkRole>,
}

impl UpdateItemRequest {
    /// Whether the link settings change.
    pub fn changes_link(&self) -> bool {
        self.link_reach.is_some() || self.link_role.is_some()
    }
}

/// Move item request.
#[derive(Debug, Deserialize, Validate)]
pub struct MoveItemRequest {
    /// Destination folder.
    #[validate(length(min = 1, message = "This field may not be blank."))]
    pub target_item_id: String,
}

/// Grant access request: exactly one of `user_id` and `team`.
#[derive(Debug, Deserialize)]
pub struct CreateAccessRequest {
    pub user_id: Option<String>,
    pub team: Option<String>,
    pub role: String,
}

impl Validate for CreateAccessRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let user = self.user_id.as_deref().filter(|u| !u.is_empty());
        let team = self.team.as_deref().filter(|t| !t.is_empty());
        if user.is_some() == team.is_some() {
            errors.add(
                "user_id",
                ValidationError::new("invalid")
                    .with_message("Either user or team must be set, not both.".into()),
            );
        }
        if let Err(e) = valid_role(&self.role) {
            errors.add("role", e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Update access request.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAccessRequest {
    #[validate(custom(function = "valid_role"))]
    pub role: String,
}
