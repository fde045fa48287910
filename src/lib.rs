//! drive - Collaborative file storage backend
//!
//! An item tree of folders and files with per-user and per-team accesses,
//! link sharing, favorites and files created from document templates,
//! served over a REST API.

pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod item;
pub mod logging;
pub mod storage;
pub mod web;

pub use analytics::Analytics;
pub use config::Config;
pub use db::{Database, NewUser, User, UserRepository, UserUpdate};
pub use error::{DriveError, Result};
pub use item::{
    Abilities, Item, ItemAccess, ItemRepository, ItemService, ItemType, LinkReach, LinkRole,
    NewItem, Role, UploadState,
};
pub use storage::{FileStorage, ObjectStorage};
pub use web::WebServer;
