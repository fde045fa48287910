//! Object storage for drive.
//!
//! Item content is addressed by a key of the form `item/{id}/{filename}`.
//! The key follows the item's current filename: renaming a file moves its
//! object, so the download permalink always resolves to the current name.

mod local;

pub use local::FileStorage;

use crate::Result;

/// Prefix shared by every item object key.
pub const ITEM_KEY_PREFIX: &str = "item";

/// Build the storage key of an item's content.
pub fn item_key(item_id: &str, filename: &str) -> String {
    format!("{ITEM_KEY_PREFIX}/{item_id}/{filename}")
}

/// Build the public URL of an object below the media base URL.
///
/// Each key segment is percent-encoded.
pub fn media_url(media_base_url: &str, key: &str) -> String {
    let encoded: Vec<String> = key
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect();
    format!("{}/{}", media_base_url.trim_end_matches('/'), encoded.join("/"))
}

/// Backend able to store item content.
///
/// Implementations are shared between request handlers, hence `Send + Sync`.
pub trait ObjectStorage: Send + Sync {
    /// Store `content` under `key`, replacing any previous object.
    fn save(&self, key: &str, content: &[u8]) -> Result<()>;

    /// Read the object stored under `key`.
    fn load(&self, key: &str) -> Result<Vec<u8>>;

    /// Move the object stored under `from` to `to`.
    fn rename(&self, from: &str, to: &str) -> Result<()>;

    /// Delete the object under `key`. Returns `false` when nothing was stored.
    fn delete(&self, key: &str) -> Result<bool>;

    /// Check whether an object exists under `key`.
    fn exists(&self, key: &str) -> bool;
}
