//! File System Access Implementation using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::FileSystemAccess,
};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Tokio-based file system implementation
///
/// Provides async file I/O operations using:
/// - `tokio::fs` for async operations
/// - Standard library paths
///
/// The OneDrive database folder and the sheet directory are ordinary
/// directories here; the consumer sync client mirrors them to the cloud.
pub struct TokioFileSystem;

impl TokioFileSystem {
    pub fn new() -> Self {
        Self
    }

    /// Convert std::io::Error to BridgeError, keeping NotFound distinct
    /// so callers can tell an absent file from an I/O failure.
    fn map_io_error(path: &Path, e: std::io::Error) -> BridgeError {
        if e.kind() == std::io::ErrorKind::NotFound {
            BridgeError::NotFound(path.display().to_string())
        } else {
            BridgeError::Io(e)
        }
    }
}

impl Default for TokioFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileSystemAccess for TokioFileSystem {
    async fn exists(&self, path: &Path) -> Result<bool> {
        Ok(fs::try_exists(path)
            .await
            .map_err(|e| Self::map_io_error(path, e))?)
    }

    async fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)
            .await
            .map_err(|e| Self::map_io_error(path, e))?;
        debug!(path = ?path, "Created directory");
        Ok(())
    }

    async fn read_file(&self, path: &Path) -> Result<Bytes> {
        let data = fs::read(path)
            .await
            .map_err(|e| Self::map_io_error(path, e))?;
        debug!(path = ?path, size = data.len(), "Read file");
        Ok(Bytes::from(data))
    }

    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent).await?;
        }

        fs::write(path, data.as_ref())
            .await
            .map_err(|e| Self::map_io_error(path, e))?;
        debug!(path = ?path, size = data.len(), "Wrote file");
        Ok(())
    }

    async fn rename_file(&self, old_path: &Path, new_path: &Path) -> Result<()> {
        fs::rename(old_path, new_path)
            .await
            .map_err(|e| Self::map_io_error(old_path, e))?;
        debug!(from = ?old_path, to = ?new_path, "Renamed file");
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path)
            .await
            .map_err(|e| Self::map_io_error(path, e))?;
        debug!(path = ?path, "Deleted file");
        Ok(())
    }

    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        let mut read_dir = fs::read_dir(path)
            .await
            .map_err(|e| Self::map_io_error(path, e))?;

        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| Self::map_io_error(path, e))?
        {
            entries.push(entry.path());
        }

        debug!(path = ?path, count = entries.len(), "Listed directory");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn scratch_file(name: &str) -> PathBuf {
        env::temp_dir().join(format!("{}-{}", name, uuid::Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_write_and_read() {
        let fs = TokioFileSystem::new();
        let test_file = scratch_file("bridge-desktop-rw");

        let data = Bytes::from("Amazing Grace (C) (abc123).jpg contents");
        fs.write_file(&test_file, data.clone()).await.unwrap();

        let read_data = fs.read_file(&test_file).await.unwrap();
        assert_eq!(data, read_data);

        fs.delete_file(&test_file).await.unwrap();
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let fs = TokioFileSystem::new();
        let missing = scratch_file("bridge-desktop-missing");

        let err = fs.read_file(&missing).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_rename_moves_file() {
        let fs = TokioFileSystem::new();
        let old_path = scratch_file("bridge-desktop-old");
        let new_path = scratch_file("bridge-desktop-new");

        fs.write_file(&old_path, Bytes::from("sheet")).await.unwrap();
        fs.rename_file(&old_path, &new_path).await.unwrap();

        assert!(!fs.exists(&old_path).await.unwrap());
        assert!(fs.exists(&new_path).await.unwrap());

        fs.delete_file(&new_path).await.unwrap();
    }

    #[tokio::test]
    async fn test_rename_missing_source_fails() {
        let fs = TokioFileSystem::new();
        let old_path = scratch_file("bridge-desktop-ghost");
        let new_path = scratch_file("bridge-desktop-target");

        let err = fs.rename_file(&old_path, &new_path).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_list_directory() {
        let fs = TokioFileSystem::new();
        let dir = scratch_file("bridge-desktop-list");
        fs.create_dir_all(&dir).await.unwrap();

        fs.write_file(&dir.join("a.jpg"), Bytes::from("a")).await.unwrap();
        fs.write_file(&dir.join("b.jpg"), Bytes::from("b")).await.unwrap();

        let mut names: Vec<String> = fs
            .list_directory(&dir)
            .await
            .unwrap()
            .into_iter()
            .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
            .collect();
        names.sort();
        assert_eq!(names, vec!["a.jpg", "b.jpg"]);
    }
}
