//! # Core Configuration Module
//!
//! Provides configuration management for the WorshipNote core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a `CoreConfig`
//! instance that holds the storage layout and the bridge capabilities the core
//! requires. It enforces fail-fast validation so a missing capability is
//! reported at startup rather than at first use.
//!
//! ## Required Dependencies
//!
//! - `FileSystemAccess` - file I/O against the database and sheet folders
//! - `CacheStore` - local key-value cache (durability floor)
//!
//! ## Optional Dependencies
//!
//! - `Clock` - time source (defaults to the system clock)
//!
//! When the `desktop-shims` feature of `core-service` is enabled, desktop
//! implementations are injected automatically if not provided.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .database_dir("/home/user/OneDrive/WorshipNote/Database")
//!     .sheets_dir("/home/user/OneDrive/WorshipNote/Sheets")
//!     .file_system(Arc::new(MyFileSystem))
//!     .cache_store(Arc::new(MyCacheStore))
//!     .build()
//!     .expect("Failed to build config");
//! ```

use crate::error::{Error, Result};
use bridge_traits::{CacheStore, Clock, FileSystemAccess, SystemClock};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Core configuration for the WorshipNote core.
///
/// This struct holds the storage layout and capabilities required to
/// initialize the core library. Use [`CoreConfigBuilder`] to construct
/// instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Directory holding the remote JSON store (`songs.json`,
    /// `worship_lists.json`), expected to live under the OneDrive folder
    pub database_dir: PathBuf,

    /// Directory holding the sheet image files
    pub sheets_dir: PathBuf,

    /// Directory backup snapshots are written to
    pub backup_dir: PathBuf,

    /// File system access bridge (required)
    pub file_system: Arc<dyn FileSystemAccess>,

    /// Local cache bridge (required)
    pub cache_store: Arc<dyn CacheStore>,

    /// Time source (defaults to the system clock)
    pub clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("database_dir", &self.database_dir)
            .field("sheets_dir", &self.sheets_dir)
            .field("backup_dir", &self.backup_dir)
            .field("file_system", &"FileSystemAccess { ... }")
            .field("cache_store", &"CacheStore { ... }")
            .field("clock", &"Clock { ... }")
            .finish()
    }
}

impl CoreConfig {
    /// Create a new builder
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }
}

/// Builder for [`CoreConfig`]
#[derive(Default)]
pub struct CoreConfigBuilder {
    database_dir: Option<PathBuf>,
    sheets_dir: Option<PathBuf>,
    backup_dir: Option<PathBuf>,
    file_system: Option<Arc<dyn FileSystemAccess>>,
    cache_store: Option<Arc<dyn CacheStore>>,
    clock: Option<Arc<dyn Clock>>,
}

impl CoreConfigBuilder {
    /// Set the remote database directory
    pub fn database_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.database_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the sheet image directory
    pub fn sheets_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.sheets_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the backup directory (defaults to `<database_dir>/Backups`)
    pub fn backup_dir(mut self, path: impl AsRef<Path>) -> Self {
        self.backup_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set the file system bridge
    pub fn file_system(mut self, fs: Arc<dyn FileSystemAccess>) -> Self {
        self.file_system = Some(fs);
        self
    }

    /// Set the cache store bridge
    pub fn cache_store(mut self, cache: Arc<dyn CacheStore>) -> Self {
        self.cache_store = Some(cache);
        self
    }

    /// Set the time source
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Validate the configuration and build a [`CoreConfig`]
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when a storage path is missing and
    /// `Error::CapabilityMissing` when a required bridge was not provided.
    pub fn build(self) -> Result<CoreConfig> {
        let database_dir = self
            .database_dir
            .ok_or_else(|| Error::Config("database_dir is required".to_string()))?;

        let sheets_dir = self
            .sheets_dir
            .ok_or_else(|| Error::Config("sheets_dir is required".to_string()))?;

        let backup_dir = self
            .backup_dir
            .unwrap_or_else(|| database_dir.join("Backups"));

        let file_system = self.file_system.ok_or_else(|| Error::CapabilityMissing {
            capability: "FileSystemAccess".to_string(),
            message: "No file system implementation provided. \
                      Desktop: enable the desktop-shims feature of core-service. \
                      Otherwise: inject a FileSystemAccess adapter."
                .to_string(),
        })?;

        let cache_store = self.cache_store.ok_or_else(|| Error::CapabilityMissing {
            capability: "CacheStore".to_string(),
            message: "No cache store implementation provided. \
                      Desktop: enable the desktop-shims feature of core-service. \
                      Otherwise: inject a CacheStore adapter."
                .to_string(),
        })?;

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        Ok(CoreConfig {
            database_dir,
            sheets_dir,
            backup_dir,
            file_system,
            cache_store,
            clock,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bytes::Bytes;

    struct NullFileSystem;

    #[async_trait]
    impl FileSystemAccess for NullFileSystem {
        async fn exists(&self, _path: &Path) -> BridgeResult<bool> {
            Ok(false)
        }
        async fn create_dir_all(&self, _path: &Path) -> BridgeResult<()> {
            Ok(())
        }
        async fn read_file(&self, path: &Path) -> BridgeResult<Bytes> {
            Err(bridge_traits::BridgeError::NotFound(
                path.display().to_string(),
            ))
        }
        async fn write_file(&self, _path: &Path, _data: Bytes) -> BridgeResult<()> {
            Ok(())
        }
        async fn rename_file(&self, _old: &Path, _new: &Path) -> BridgeResult<()> {
            Ok(())
        }
        async fn delete_file(&self, _path: &Path) -> BridgeResult<()> {
            Ok(())
        }
        async fn list_directory(&self, _path: &Path) -> BridgeResult<Vec<PathBuf>> {
            Ok(Vec::new())
        }
    }

    struct NullCacheStore;

    #[async_trait]
    impl CacheStore for NullCacheStore {
        async fn get(&self, _key: &str) -> BridgeResult<Option<String>> {
            Ok(None)
        }
        async fn set(&self, _key: &str, _value: &str) -> BridgeResult<()> {
            Ok(())
        }
        async fn remove(&self, _key: &str) -> BridgeResult<()> {
            Ok(())
        }
        async fn keys(&self) -> BridgeResult<Vec<String>> {
            Ok(Vec::new())
        }
        async fn clear(&self) -> BridgeResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_build_with_all_dependencies() {
        let config = CoreConfig::builder()
            .database_dir("/tmp/db")
            .sheets_dir("/tmp/sheets")
            .file_system(Arc::new(NullFileSystem))
            .cache_store(Arc::new(NullCacheStore))
            .build()
            .unwrap();

        assert_eq!(config.database_dir, PathBuf::from("/tmp/db"));
        assert_eq!(config.backup_dir, PathBuf::from("/tmp/db/Backups"));
    }

    #[test]
    fn test_missing_file_system_fails() {
        let err = CoreConfig::builder()
            .database_dir("/tmp/db")
            .sheets_dir("/tmp/sheets")
            .cache_store(Arc::new(NullCacheStore))
            .build()
            .unwrap_err();

        match err {
            Error::CapabilityMissing { capability, .. } => {
                assert_eq!(capability, "FileSystemAccess");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_missing_paths_fail() {
        let err = CoreConfig::builder()
            .file_system(Arc::new(NullFileSystem))
            .cache_store(Arc::new(NullCacheStore))
            .build()
            .unwrap_err();

        assert!(matches!(err, Error::Config(_)));
    }
}
