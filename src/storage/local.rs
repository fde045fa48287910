//! Local filesystem object storage.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use super::ObjectStorage;
use crate::{DriveError, Result};

/// Object storage backed by a local directory.
///
/// Keys map to relative paths below the base directory:
/// ```text
/// {base_path}/
/// └── item/
///     └── 0b0c9f0e-5c6b-4f43-9d3e-2f2d6b0e8a11/
///         └── my document.odt
/// ```
#[derive(Debug, Clone)]
pub struct FileStorage {
    /// Base directory for object storage.
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a new FileStorage with the given base path.
    ///
    /// The base directory will be created if it doesn't exist.
    pub fn new(base_path: impl Into<PathBuf>) -> Result<Self> {
        let base_path = base_path.into();
        fs::create_dir_all(&base_path)?;

        Ok(Self { base_path })
    }

    /// Get the base path of this storage.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Get the full path for a key.
    ///
    /// Keys must be relative and free of `..` components.
    pub fn get_file_path(&self, key: &str) -> Result<PathBuf> {
        let relative = Path::new(key);
        let is_safe = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !is_safe {
            return Err(DriveError::Storage(format!("invalid object key: {key}")));
        }
        Ok(self.base_path.join(relative))
    }

    /// Remove empty directories left behind on the way from `path` up to the base.
    fn prune_empty_parents(&self, path: &Path) {
        let mut current = path.parent();
        while let Some(dir) = current {
            if dir == self.base_path || !dir.starts_with(&self.base_path) {
                break;
            }
            if fs::remove_dir(dir).is_err() {
                break;
            }
            current = dir.parent();
        }
    }
}

impl ObjectStorage for FileStorage {
    fn save(&self, key: &str, content: &[u8]) -> Result<()> {
        let file_path = self.get_file_path(key)?;

        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(&file_path, content)?;
        Ok(())
    }

    fn load(&self, key: &str) -> Result<Vec<u8>> {
        let file_path = self.get_file_path(key)?;

        match fs::read(&file_path) {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(DriveError::NotFound(format!("object {key}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn rename(&self, from: &str, to: &str) -> Result<()> {
        let from_path = self.get_file_path(from)?;
        let to_path = self.get_file_path(to)?;

        if !from_path.exists() {
            return Err(DriveError::NotFound(format!("object {from}")));
        }
        if let Some(parent) = to_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::rename(&from_path, &to_path)?;
        self.prune_empty_parents(&from_path);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<bool> {
        let file_path = self.get_file_path(key)?;

        match fs::remove_file(&file_path) {
            Ok(()) => {
                self.prune_empty_parents(&file_path);
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn exists(&self, key: &str) -> bool {
        self.get_file_path(key)
            .map(|path| path.is_file())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_storage() -> (TempDir, FileStorage) {
        let temp_dir = TempDir::new().unwrap();
        let storage = FileStorage::new(temp_dir.path()).unwrap();
        (temp_dir, storage)
    }

    #[test]
    fn test_new_creates_directory() {
        let temp_dir = TempDir::new().unwrap();
        let storage_path = temp_dir.path().join("media");

        assert!(!storage_path.exists());

        let storage = FileStorage::new(&storage_path).unwrap();

        assert!(storage_path.exists());
        assert_eq!(storage.base_path(), storage_path);
    }

    #[test]
    fn test_save_and_load() {
        let (_temp_dir, storage) = setup_storage();

        storage.save("item/abc/hello.txt", b"Hello, World!").unwrap();

        assert_eq!(storage.load("item/abc/hello.txt").unwrap(), b"Hello, World!");
        assert!(storage.base_path().join("item/abc/hello.txt").is_file());
    }

    #[test]
    fn test_load_not_found() {
        let (_temp_dir, storage) = setup_storage();

        let result = storage.load("item/abc/missing.txt");
        assert!(matches!(result, Err(DriveError::NotFound(_))));
    }

    #[test]
    fn test_rename_moves_object() {
        let (_temp_dir, storage) = setup_storage();
        storage.save("item/abc/old.pdf", b"pdf").unwrap();

        storage.rename("item/abc/old.pdf", "item/abc/new.pdf").unwrap();

        assert!(!storage.exists("item/abc/old.pdf"));
        assert_eq!(storage.load("item/abc/new.pdf").unwrap(), b"pdf");
    }

    #[test]
    fn test_rename_missing_object() {
        let (_temp_dir, storage) = setup_storage();

        let result = storage.rename("item/abc/old.pdf", "item/abc/new.pdf");
        assert!(matches!(result, Err(DriveError::NotFound(_))));
    }

    #[test]
    fn test_delete_prunes_empty_directories() {
        let (_temp_dir, storage) = setup_storage();
        storage.save("item/abc/file.txt", b"x").unwrap();

        assert!(storage.delete("item/abc/file.txt").unwrap());
        assert!(!storage.base_path().join("item/abc").exists());
        assert!(storage.base_path().exists());
    }

    #[test]
    fn test_delete_not_found() {
        let (_temp_dir, storage) = setup_storage();
        assert!(!storage.delete("item/abc/nothing.txt").unwrap());
    }

    #[test]
    fn test_rejects_traversal_keys() {
        let (_temp_dir, storage) = setup_storage();

        assert!(storage.save("../escape.txt", b"x").is_err());
        assert!(storage.save("/etc/passwd", b"x").is_err());
        assert!(storage.save("", b"x").is_err());
        assert!(!storage.exists("item/../../escape.txt"));
    }
}
