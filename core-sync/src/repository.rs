//! Database Repository
//!
//! Single entry point for loading and persisting the two top-level
//! collections (songs, worship lists) across the dual-write targets: the
//! local cache (durability floor) and the cloud-synced remote JSON files.
//!
//! ## Overview
//!
//! - `load()` never fails: local cache first, refreshed from the remote store
//!   when the comparator says a remote collection is strictly newer; an empty
//!   cache falls back to the remote store, then the bundled seed dataset,
//!   then empty collections.
//! - `save_*` writes the cache synchronously (must succeed), then the remote
//!   file best-effort; a remote failure is reported as a distinct status, not
//!   an error, and is retried by the next save or explicit sync.
//! - Writes to a given logical file are serialized behind a per-file mutex; a
//!   second save arriving mid-flight waits instead of racing.
//!
//! Last-write-wins at file granularity is the documented policy; concurrent
//! multi-process edits of the same remote store are not supported.

use crate::comparator::{compare_versions, SnapshotTimes, SyncDecision};
use crate::error::{Result, SyncError};
use bridge_traits::{CacheStore, Clock, FileSystemAccess};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use core_library::{Song, SongsDocument, WorshipLists, WorshipListsDocument};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

/// Remote store filenames under the database directory
pub const SONGS_FILE: &str = "songs.json";
pub const WORSHIP_LISTS_FILE: &str = "worship_lists.json";

/// Local cache keys
const CACHE_KEY_SONGS: &str = "worshipnote_songs";
const CACHE_KEY_WORSHIP_LISTS: &str = "worshipnote_worship_lists";
const CACHE_KEY_SONGS_SAVED_AT: &str = "worshipnote_songs_saved_at";
const CACHE_KEY_WORSHIP_LISTS_SAVED_AT: &str = "worshipnote_worship_lists_saved_at";

/// Bundled starter library used when both the cache and the remote store are
/// empty or unreachable on first run.
const SEED_SONGS: &str = include_str!("seed_songs.json");

/// Where `load()` got its data from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// Local cache, remote equal-or-older (or unreachable)
    Cache,
    /// Local cache, with at least one collection refreshed from the remote
    CacheRefreshed,
    /// Cache was empty; the remote store supplied the data
    Remote,
    /// Both sides empty; the bundled seed dataset was installed
    Seed,
    /// Nothing anywhere; empty-but-valid collections
    Empty,
}

/// Result of a `load()` call
#[derive(Debug, Clone)]
pub struct LoadedDatabase {
    pub songs: Vec<Song>,
    pub worship_lists: WorshipLists,
    pub source: LoadSource,
}

/// Result of a save
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveStatus {
    /// Cache and remote both written
    Saved,
    /// Cache written; the remote write failed and will be retried on the next
    /// save or explicit sync
    SavedLocalOnly { remote_error: String },
}

impl SaveStatus {
    pub fn remote_ok(&self) -> bool {
        matches!(self, Self::Saved)
    }
}

/// Dual-write repository over the local cache and the remote JSON store
pub struct DatabaseRepository {
    fs: Arc<dyn FileSystemAccess>,
    cache: Arc<dyn CacheStore>,
    clock: Arc<dyn Clock>,
    database_dir: PathBuf,
    backup_dir: PathBuf,
    songs_write_lock: Mutex<()>,
    lists_write_lock: Mutex<()>,
}

impl DatabaseRepository {
    pub fn new(
        fs: Arc<dyn FileSystemAccess>,
        cache: Arc<dyn CacheStore>,
        clock: Arc<dyn Clock>,
        database_dir: PathBuf,
        backup_dir: PathBuf,
    ) -> Self {
        Self {
            fs,
            cache,
            clock,
            database_dir,
            backup_dir,
            songs_write_lock: Mutex::new(()),
            lists_write_lock: Mutex::new(()),
        }
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub(crate) fn fs(&self) -> &dyn FileSystemAccess {
        self.fs.as_ref()
    }

    pub(crate) fn backup_dir(&self) -> &PathBuf {
        &self.backup_dir
    }

    fn songs_path(&self) -> PathBuf {
        self.database_dir.join(SONGS_FILE)
    }

    fn worship_lists_path(&self) -> PathBuf {
        self.database_dir.join(WORSHIP_LISTS_FILE)
    }

    /// Load both collections
    ///
    /// Infallible by design: every failure path degrades to the next source
    /// in the chain (cache, remote, seed, empty) and is logged rather than
    /// surfaced.
    #[instrument(skip(self))]
    pub async fn load(&self) -> LoadedDatabase {
        let cached_songs = self.read_cached_songs().await;
        let cached_lists = self.read_cached_worship_lists().await;

        let cache_has_data = cached_songs
            .as_ref()
            .map(|d| !d.songs.is_empty())
            .unwrap_or(false)
            || cached_lists
                .as_ref()
                .map(|d| !d.worship_lists.is_empty())
                .unwrap_or(false);

        if cache_has_data {
            return self.refresh_from_remote(cached_songs, cached_lists).await;
        }

        match self.read_remote().await {
            Ok((songs_doc, lists_doc))
                if !songs_doc.songs.is_empty() || !lists_doc.worship_lists.is_empty() =>
            {
                info!(
                    songs = songs_doc.songs.len(),
                    dates = lists_doc.worship_lists.len(),
                    "Cache empty, adopted remote store"
                );
                self.cache_songs(&songs_doc).await;
                self.cache_worship_lists(&lists_doc).await;
                LoadedDatabase {
                    songs: songs_doc.songs,
                    worship_lists: lists_doc.worship_lists,
                    source: LoadSource::Remote,
                }
            }
            Ok(_) | Err(_) => self.load_seed().await,
        }
    }

    async fn refresh_from_remote(
        &self,
        cached_songs: Option<SongsDocument>,
        cached_lists: Option<WorshipListsDocument>,
    ) -> LoadedDatabase {
        let mut songs = cached_songs.map(|d| d.songs).unwrap_or_default();
        let mut worship_lists = cached_lists.map(|d| d.worship_lists).unwrap_or_default();

        let local_times = self.local_snapshot_times().await;

        match self.read_remote().await {
            Ok((remote_songs, remote_lists)) => {
                let remote_times =
                    SnapshotTimes::new(remote_songs.last_updated, remote_lists.last_updated);
                let decision = compare_versions(&local_times, &remote_times);
                debug!(?decision, "Compared local cache against remote store");

                // Each collection is re-checked on its own flag; an
                // equal-or-newer local copy is never overwritten.
                if decision.pull_songs {
                    self.cache_songs(&remote_songs).await;
                    songs = remote_songs.songs;
                }
                if decision.pull_worship_lists {
                    self.cache_worship_lists(&remote_lists).await;
                    worship_lists = remote_lists.worship_lists;
                }

                let source = if decision.needs_sync() {
                    info!(reason = ?decision.reason, "Adopted newer remote collections");
                    LoadSource::CacheRefreshed
                } else {
                    LoadSource::Cache
                };

                LoadedDatabase {
                    songs,
                    worship_lists,
                    source,
                }
            }
            Err(e) => {
                warn!(error = %e, "Remote store unreachable, keeping local cache");
                LoadedDatabase {
                    songs,
                    worship_lists,
                    source: LoadSource::Cache,
                }
            }
        }
    }

    async fn load_seed(&self) -> LoadedDatabase {
        match SongsDocument::from_json(SEED_SONGS) {
            Ok(seed) if !seed.songs.is_empty() => {
                info!(songs = seed.songs.len(), "Installed bundled seed dataset");
                self.cache_songs(&seed).await;
                LoadedDatabase {
                    songs: seed.songs,
                    worship_lists: WorshipLists::new(),
                    source: LoadSource::Seed,
                }
            }
            Ok(_) => LoadedDatabase {
                songs: Vec::new(),
                worship_lists: WorshipLists::new(),
                source: LoadSource::Empty,
            },
            Err(e) => {
                warn!(error = %e, "Seed dataset unreadable");
                LoadedDatabase {
                    songs: Vec::new(),
                    worship_lists: WorshipLists::new(),
                    source: LoadSource::Empty,
                }
            }
        }
    }

    /// Persist the songs collection to both targets
    ///
    /// # Errors
    ///
    /// Only when the local cache write fails; the cache is the durability
    /// floor for a session and its failure is fatal to the operation. A
    /// remote failure is reported through [`SaveStatus::SavedLocalOnly`].
    #[instrument(skip(self, songs), fields(count = songs.len()))]
    pub async fn save_songs(&self, songs: &[Song]) -> Result<SaveStatus> {
        let _guard = self.songs_write_lock.lock().await;

        let now = self.clock.now();
        let doc = SongsDocument::new(songs.to_vec(), now);
        let json = doc.to_json()?;

        self.cache
            .set(CACHE_KEY_SONGS, &json)
            .await
            .map_err(|e| SyncError::Cache(e.to_string()))?;
        self.cache
            .set(CACHE_KEY_SONGS_SAVED_AT, &now.to_rfc3339())
            .await
            .map_err(|e| SyncError::Cache(e.to_string()))?;

        Ok(self.write_remote(self.songs_path(), json).await)
    }

    /// Persist the worship-lists collection to both targets
    #[instrument(skip(self, worship_lists), fields(dates = worship_lists.len()))]
    pub async fn save_worship_lists(&self, worship_lists: &WorshipLists) -> Result<SaveStatus> {
        let _guard = self.lists_write_lock.lock().await;

        let now = self.clock.now();
        let doc = WorshipListsDocument::new(worship_lists.clone(), now);
        let json = doc.to_json()?;

        self.cache
            .set(CACHE_KEY_WORSHIP_LISTS, &json)
            .await
            .map_err(|e| SyncError::Cache(e.to_string()))?;
        self.cache
            .set(CACHE_KEY_WORSHIP_LISTS_SAVED_AT, &now.to_rfc3339())
            .await
            .map_err(|e| SyncError::Cache(e.to_string()))?;

        Ok(self.write_remote(self.worship_lists_path(), json).await)
    }

    async fn write_remote(&self, path: PathBuf, json: String) -> SaveStatus {
        match self.fs.write_file(&path, Bytes::from(json)).await {
            Ok(()) => {
                debug!(path = ?path, "Wrote remote store file");
                SaveStatus::Saved
            }
            Err(e) => {
                warn!(path = ?path, error = %e, "Remote write failed, cache remains source of truth");
                SaveStatus::SavedLocalOnly {
                    remote_error: e.to_string(),
                }
            }
        }
    }

    /// Compare the local cache against the remote store without adopting
    /// anything
    pub async fn check_sync_state(&self) -> Result<SyncDecision> {
        let local_times = self.local_snapshot_times().await;
        let (remote_songs, remote_lists) = self.read_remote().await?;
        let remote_times = SnapshotTimes::new(remote_songs.last_updated, remote_lists.last_updated);
        Ok(compare_versions(&local_times, &remote_times))
    }

    async fn local_snapshot_times(&self) -> SnapshotTimes {
        SnapshotTimes::new(
            self.read_cached_time(CACHE_KEY_SONGS_SAVED_AT).await,
            self.read_cached_time(CACHE_KEY_WORSHIP_LISTS_SAVED_AT).await,
        )
    }

    async fn read_cached_time(&self, key: &str) -> Option<DateTime<Utc>> {
        let raw = self.cache.get(key).await.ok()??;
        DateTime::parse_from_rfc3339(&raw)
            .map(|t| t.with_timezone(&Utc))
            .ok()
    }

    async fn read_cached_songs(&self) -> Option<SongsDocument> {
        let raw = self.cache.get(CACHE_KEY_SONGS).await.ok()??;
        match SongsDocument::from_json(&raw) {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!(error = %e, "Cached songs document unreadable, ignoring");
                None
            }
        }
    }

    async fn read_cached_worship_lists(&self) -> Option<WorshipListsDocument> {
        let raw = self.cache.get(CACHE_KEY_WORSHIP_LISTS).await.ok()??;
        match WorshipListsDocument::from_json(&raw) {
            Ok(doc) => Some(doc),
            Err(e) => {
                warn!(error = %e, "Cached worship lists document unreadable, ignoring");
                None
            }
        }
    }

    async fn cache_songs(&self, doc: &SongsDocument) {
        let Ok(json) = doc.to_json() else { return };
        if let Err(e) = self.cache.set(CACHE_KEY_SONGS, &json).await {
            warn!(error = %e, "Failed to cache songs document");
            return;
        }
        if let Some(t) = doc.last_updated {
            let _ = self
                .cache
                .set(CACHE_KEY_SONGS_SAVED_AT, &t.to_rfc3339())
                .await;
        }
    }

    async fn cache_worship_lists(&self, doc: &WorshipListsDocument) {
        let Ok(json) = doc.to_json() else { return };
        if let Err(e) = self.cache.set(CACHE_KEY_WORSHIP_LISTS, &json).await {
            warn!(error = %e, "Failed to cache worship lists document");
            return;
        }
        if let Some(t) = doc.last_updated {
            let _ = self
                .cache
                .set(CACHE_KEY_WORSHIP_LISTS_SAVED_AT, &t.to_rfc3339())
                .await;
        }
    }

    /// Read both remote files
    ///
    /// An absent file parses as an empty document (a fresh database folder is
    /// not an error); any other I/O failure is `RemoteUnavailable`.
    pub(crate) async fn read_remote(&self) -> Result<(SongsDocument, WorshipListsDocument)> {
        let songs = match self.fs.read_file(&self.songs_path()).await {
            Ok(bytes) => parse_remote(&bytes, SONGS_FILE, SongsDocument::from_json)?,
            Err(e) if e.is_not_found() => SongsDocument::default(),
            Err(e) => return Err(SyncError::RemoteUnavailable(e.to_string())),
        };

        let lists = match self.fs.read_file(&self.worship_lists_path()).await {
            Ok(bytes) => parse_remote(&bytes, WORSHIP_LISTS_FILE, WorshipListsDocument::from_json)?,
            Err(e) if e.is_not_found() => WorshipListsDocument::default(),
            Err(e) => return Err(SyncError::RemoteUnavailable(e.to_string())),
        };

        Ok((songs, lists))
    }
}

fn parse_remote<T>(
    bytes: &[u8],
    file: &str,
    parse: impl FnOnce(&str) -> core_library::Result<T>,
) -> Result<T> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| SyncError::RemoteUnavailable(format!("{file}: invalid UTF-8: {e}")))?;
    parse(text).map_err(|e| SyncError::RemoteUnavailable(format!("{file}: {e}")))
}
