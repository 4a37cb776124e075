//! Backup & Restore
//!
//! Full-database snapshots: both collections plus metadata serialized into a
//! single JSON file with a strictly increasing, collision-free name. Backups
//! are additive; creating one never deletes or mutates prior backups.
//! Restore validates the snapshot wholesale before touching either store, so
//! a corrupt snapshot is never partially applied.

use crate::error::{Result, SyncError};
use crate::repository::{DatabaseRepository, SaveStatus};
use bridge_traits::{Clock, FileSystemAccess};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use core_library::{LibraryError, Song, WorshipLists};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, instrument, warn};

/// Current snapshot type tag
pub const BACKUP_TYPE: &str = "worshipnote_database";
/// Type tag written by older releases, still accepted on restore
pub const LEGACY_BACKUP_TYPE: &str = "database";
/// Snapshot format version
pub const BACKUP_VERSION: &str = "1.0";

/// Per-snapshot statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupStats {
    pub total_songs: usize,
    pub total_worship_lists: usize,
    pub total_worship_list_songs: usize,
    /// Serialized size of the snapshot, in bytes (estimate: computed before
    /// the stats themselves are patched in)
    pub backup_size: usize,
}

/// One full-database snapshot document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupSnapshot {
    pub version: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub backup_date: DateTime<Utc>,
    pub songs: Vec<Song>,
    pub worship_lists: WorshipLists,
    pub stats: BackupStats,
}

/// What `backup()` produced
#[derive(Debug, Clone)]
pub struct BackupReceipt {
    pub path: PathBuf,
    pub stats: BackupStats,
}

/// Collections recovered from a validated snapshot
#[derive(Debug, Clone)]
pub struct RestoredDatabase {
    pub songs: Vec<Song>,
    pub worship_lists: WorshipLists,
}

impl DatabaseRepository {
    /// Write a snapshot of both collections to the backup directory
    ///
    /// The filename carries a second-resolution timestamp; a counter suffix
    /// is appended if a file of that name already exists.
    #[instrument(skip(self, songs, worship_lists))]
    pub async fn backup(
        &self,
        songs: &[Song],
        worship_lists: &WorshipLists,
    ) -> Result<BackupReceipt> {
        let now = self.clock().now();

        let mut snapshot = BackupSnapshot {
            version: BACKUP_VERSION.to_string(),
            kind: BACKUP_TYPE.to_string(),
            backup_date: now,
            songs: songs.to_vec(),
            worship_lists: worship_lists.clone(),
            stats: BackupStats {
                total_songs: songs.len(),
                total_worship_lists: worship_lists.len(),
                total_worship_list_songs: worship_lists.total_songs(),
                backup_size: 0,
            },
        };

        let unsized_json =
            serde_json::to_string_pretty(&snapshot).map_err(LibraryError::Serialization)?;
        snapshot.stats.backup_size = unsized_json.len();
        let json = serde_json::to_string_pretty(&snapshot).map_err(LibraryError::Serialization)?;

        let path = self.next_backup_path(now).await?;
        self.fs().write_file(&path, Bytes::from(json)).await?;

        info!(path = ?path, songs = snapshot.stats.total_songs, "Wrote backup snapshot");

        Ok(BackupReceipt {
            path,
            stats: snapshot.stats,
        })
    }

    async fn next_backup_path(&self, now: DateTime<Utc>) -> Result<PathBuf> {
        let stamp = now.format("%Y-%m-%dT%H-%M-%S");
        let mut counter = 0u32;
        loop {
            let name = if counter == 0 {
                format!("worshipnote_backup_{stamp}.json")
            } else {
                format!("worshipnote_backup_{stamp}-{counter}.json")
            };
            let candidate = self.backup_dir().join(name);
            if !self.fs().exists(&candidate).await? {
                return Ok(candidate);
            }
            counter += 1;
        }
    }

    /// Validate a snapshot and overwrite both stores with its contents
    ///
    /// Validation happens entirely before the first write: the type tag must
    /// be recognized and both collection keys must be present (even if
    /// empty). A snapshot failing any check leaves the caches and the remote
    /// store untouched.
    ///
    /// # Errors
    ///
    /// [`SyncError::InvalidBackupFormat`] for malformed JSON, an unrecognized
    /// type tag, or missing keys. Cache-write failures surface as
    /// [`SyncError::Cache`]; a remote-write failure is tolerated (logged, to
    /// be retried by the next save).
    #[instrument(skip(self, snapshot_json))]
    pub async fn restore(&self, snapshot_json: &str) -> Result<RestoredDatabase> {
        let value: serde_json::Value = serde_json::from_str(snapshot_json)
            .map_err(|e| SyncError::InvalidBackupFormat(format!("not valid JSON: {e}")))?;

        let kind = value
            .get("type")
            .and_then(|v| v.as_str())
            .ok_or_else(|| SyncError::InvalidBackupFormat("missing type tag".to_string()))?;
        if kind != BACKUP_TYPE && kind != LEGACY_BACKUP_TYPE {
            return Err(SyncError::InvalidBackupFormat(format!(
                "unrecognized type tag: {kind}"
            )));
        }

        let songs_value = value
            .get("songs")
            .ok_or_else(|| SyncError::InvalidBackupFormat("missing songs key".to_string()))?;
        let lists_value = value.get("worshipLists").ok_or_else(|| {
            SyncError::InvalidBackupFormat("missing worshipLists key".to_string())
        })?;

        let songs: Vec<Song> = serde_json::from_value(songs_value.clone())
            .map_err(|e| SyncError::InvalidBackupFormat(format!("songs: {e}")))?;
        let worship_lists: WorshipLists = serde_json::from_value(lists_value.clone())
            .map_err(|e| SyncError::InvalidBackupFormat(format!("worshipLists: {e}")))?;

        // Validation complete; only now are the stores overwritten.
        if let SaveStatus::SavedLocalOnly { remote_error } = self.save_songs(&songs).await? {
            warn!(error = %remote_error, "Restore: remote songs write failed");
        }
        if let SaveStatus::SavedLocalOnly { remote_error } =
            self.save_worship_lists(&worship_lists).await?
        {
            warn!(error = %remote_error, "Restore: remote worship lists write failed");
        }

        info!(
            songs = songs.len(),
            dates = worship_lists.len(),
            "Restored database from snapshot"
        );

        Ok(RestoredDatabase {
            songs,
            worship_lists,
        })
    }
}
