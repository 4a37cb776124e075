//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (filesystem, cache
//! store, clock) into the shared core. Desktop apps typically enable the
//! `desktop-shims` feature (which depends on `bridge-desktop` and
//! `provider-onedrive`) and call [`bootstrap_desktop`]; other hosts build a
//! [`core_runtime::CoreConfig`] with their own adapters and construct
//! [`WorshipNoteService`] directly.

pub mod error;
mod service;

pub use error::{CoreError, Result};
pub use service::{CollectionStatus, SongDraft, WorshipNoteService};

// Re-exported so hosts can configure the service without naming every crate
pub use core_runtime::{CoreConfig, CoreConfigBuilder};

/// Convenience bootstrapper for desktop hosts.
///
/// Discovers the OneDrive folder, opens the SQLite cache under the platform
/// data directory, and wires the desktop bridges into a ready service. The
/// library still needs [`WorshipNoteService::load`] before first use.
///
/// ```ignore
/// # async fn example() -> core_service::Result<()> {
/// let core = core_service::bootstrap_desktop().await?;
/// core.load().await;
/// let songs = core.songs().await;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "desktop-shims")]
pub async fn bootstrap_desktop() -> Result<WorshipNoteService> {
    use bridge_desktop::{SqliteCacheStore, TokioFileSystem};
    use provider_onedrive::OneDriveLayout;
    use std::sync::Arc;

    let layout = OneDriveLayout::discover()
        .map_err(|e| CoreError::InitializationFailed(e.to_string()))?;

    let cache_path = dirs::data_dir()
        .ok_or_else(|| {
            CoreError::InitializationFailed("no platform data directory".to_string())
        })?
        .join("worshipnote")
        .join("cache.db");

    let cache = SqliteCacheStore::new(cache_path)
        .await
        .map_err(|e| CoreError::InitializationFailed(e.to_string()))?;

    let config = CoreConfig::builder()
        .database_dir(&layout.database_dir)
        .sheets_dir(&layout.sheets_dir)
        .file_system(Arc::new(TokioFileSystem::new()))
        .cache_store(Arc::new(cache))
        .build()?;

    Ok(WorshipNoteService::new(config))
}
