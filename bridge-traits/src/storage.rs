//! Storage and File System Abstractions
//!
//! Provides platform-agnostic traits for file I/O and key-value cache storage.

use async_trait::async_trait;
use bytes::Bytes;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// File system access trait
///
/// Abstracts the file operations the core needs against the sheet-music
/// directory and the cloud-synced database folder. The OneDrive folder is an
/// ordinary directory from the core's point of view; the consumer sync client
/// owns transport.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn load_database(fs: &dyn FileSystemAccess, path: &std::path::Path) -> Result<()> {
///     if fs.exists(path).await? {
///         let data = fs.read_file(path).await?;
///         // ...
///     }
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Create a directory and all parent directories if they don't exist
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Read entire file contents into memory
    ///
    /// Returns [`BridgeError::NotFound`](crate::error::BridgeError::NotFound)
    /// when the file is absent.
    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Write data to a file, creating it and any missing parent directories
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// Rename a file
    ///
    /// Both paths must be on the same filesystem; this is the primitive the
    /// reconciler uses to keep sheet filenames in step with song records.
    async fn rename_file(&self, old_path: &Path, new_path: &Path) -> Result<()>;

    /// Delete a file
    async fn delete_file(&self, path: &Path) -> Result<()>;

    /// List all entries in a directory
    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>>;
}

/// Key-value cache storage trait
///
/// The local-cache capability: a string-to-string store that survives app
/// restarts and acts as the durability floor when the remote store is
/// unreachable. Values are opaque to the store (the repository keeps
/// serialized JSON documents and timestamps in it).
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::CacheStore;
///
/// async fn remember(cache: &dyn CacheStore) -> Result<()> {
///     cache.set("songs_saved_at", "2024-01-07T10:00:00Z").await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Retrieve a value, `Ok(None)` if the key doesn't exist
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store a value, overwriting any previous one
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a key; deleting an absent key is not an error
    async fn remove(&self, key: &str) -> Result<()>;

    /// Check if a key exists without retrieving it
    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.get(key).await?.is_some())
    }

    /// List all keys
    async fn keys(&self) -> Result<Vec<String>>;

    /// Clear the entire cache
    ///
    /// Use with caution! The next load falls back to the remote store.
    async fn clear(&self) -> Result<()>;
}
