//! Item tree for drive.
//!
//! This module provides:
//! - Items (files and folders) and their repository
//! - Accesses granted to users and teams, inherited down the tree
//! - Abilities derived from accesses and link settings
//! - Favorites
//! - Sibling name de-duplication and blank document templates

mod abilities;
mod access;
mod favorite;
mod model;
mod naming;
mod repository;
mod service;
pub mod template;

pub use abilities::{Abilities, ItemPermissions};
pub use access::{ItemAccess, ItemAccessRepository, NewItemAccess, Role};
pub use favorite::FavoriteRepository;
pub use model::{
    split_extension, Item, ItemType, ItemUpdate, LinkReach, LinkRole, NewItem, UploadState,
};
pub use naming::{filename_for, unique_title, SiblingName};
pub use repository::ItemRepository;
pub use service::{validate_title, ItemService, MAX_TITLE_LENGTH};
pub use template::{allowed_extensions, find_template, DocumentTemplate};
