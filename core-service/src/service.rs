//! WorshipNote service façade
//!
//! Owns the in-memory copy of both collections (the third redundant copy
//! besides the local cache and the remote store) and round-trips every edit
//! through the repository. UI layers hold transient clones; nothing is
//! durable until it has passed through here.

use crate::error::{CoreError, Result};
use bridge_traits::{Clock, FileSystemAccess};
use chrono::NaiveDate;
use core_library::{Song, SongId, WorshipLists};
use core_runtime::CoreConfig;
use core_sync::backup::BackupReceipt;
use core_sync::{
    propagate_song, DatabaseRepository, LibraryScanReport, LoadSource, RecordReconciler,
    RenameOutcome, SaveStatus, SyncDecision,
};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

/// Lifecycle of one collection, as exposed to the UI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionStatus {
    Unloaded,
    Loading,
    Loaded,
    LoadedEmpty,
    Dirty,
    Saving,
    Saved,
    /// Saved to the local cache; the remote write failed and is retried by
    /// the next save or explicit sync
    SaveFailedRemote,
}

/// Fields the add-flow collects for a new song
#[derive(Debug, Clone, Default)]
pub struct SongDraft {
    pub title: String,
    pub chord: String,
    pub tempo: String,
    pub first_lyrics: String,
    /// Leaf filename of an already-imported sheet, if any
    pub file_name: Option<String>,
}

struct LibraryState {
    songs: Vec<Song>,
    worship_lists: WorshipLists,
    songs_status: CollectionStatus,
    lists_status: CollectionStatus,
}

/// Primary façade exposed to host applications
pub struct WorshipNoteService {
    config: CoreConfig,
    repository: Arc<DatabaseRepository>,
    reconciler: RecordReconciler,
    state: RwLock<LibraryState>,
}

impl WorshipNoteService {
    /// Create a new service from a validated configuration
    pub fn new(config: CoreConfig) -> Self {
        let repository = Arc::new(DatabaseRepository::new(
            config.file_system.clone(),
            config.cache_store.clone(),
            config.clock.clone(),
            config.database_dir.clone(),
            config.backup_dir.clone(),
        ));
        let reconciler =
            RecordReconciler::new(config.file_system.clone(), config.sheets_dir.clone());

        Self {
            config,
            repository,
            reconciler,
            state: RwLock::new(LibraryState {
                songs: Vec::new(),
                worship_lists: WorshipLists::new(),
                songs_status: CollectionStatus::Unloaded,
                lists_status: CollectionStatus::Unloaded,
            }),
        }
    }

    /// Load both collections into memory
    #[instrument(skip(self))]
    pub async fn load(&self) -> LoadSource {
        {
            let mut state = self.state.write().await;
            state.songs_status = CollectionStatus::Loading;
            state.lists_status = CollectionStatus::Loading;
        }

        let loaded = self.repository.load().await;
        let mut state = self.state.write().await;
        state.songs_status = if loaded.songs.is_empty() {
            CollectionStatus::LoadedEmpty
        } else {
            CollectionStatus::Loaded
        };
        state.lists_status = if loaded.worship_lists.is_empty() {
            CollectionStatus::LoadedEmpty
        } else {
            CollectionStatus::Loaded
        };
        state.songs = loaded.songs;
        state.worship_lists = loaded.worship_lists;

        info!(source = ?loaded.source, songs = state.songs.len(), "Loaded library");
        loaded.source
    }

    /// Snapshot of the song collection
    pub async fn songs(&self) -> Vec<Song> {
        self.state.read().await.songs.clone()
    }

    /// Snapshot of the worship lists
    pub async fn worship_lists(&self) -> WorshipLists {
        self.state.read().await.worship_lists.clone()
    }

    /// One date's list, if present
    pub async fn worship_list(&self, date: &NaiveDate) -> Option<Vec<Song>> {
        self.state
            .read()
            .await
            .worship_lists
            .get(date)
            .map(|songs| songs.to_vec())
    }

    /// Current per-collection lifecycle status (songs, worship lists)
    pub async fn statuses(&self) -> (CollectionStatus, CollectionStatus) {
        let state = self.state.read().await;
        (state.songs_status, state.lists_status)
    }

    /// Case-insensitive substring search over titles and first lyrics
    pub async fn search_songs(&self, query: &str) -> Vec<Song> {
        let needle = Song::normalize(query);
        if needle.is_empty() {
            return self.songs().await;
        }

        self.state
            .read()
            .await
            .songs
            .iter()
            .filter(|s| {
                Song::normalize(&s.title).contains(&needle)
                    || Song::normalize(&s.first_lyrics).contains(&needle)
            })
            .cloned()
            .collect()
    }

    /// Add a new song to the library
    ///
    /// Mints a fresh id and stamps both timestamps; an attached sheet file is
    /// referenced as-is (import/conversion happens before this call).
    #[instrument(skip(self, draft), fields(title = %draft.title))]
    pub async fn add_song(&self, draft: SongDraft) -> Result<Song> {
        let now = self.config.clock.now();
        let mut song = Song::new(draft.title, now);
        song.chord = draft.chord;
        song.tempo = draft.tempo;
        song.first_lyrics = draft.first_lyrics;
        song.file_name = draft.file_name;

        song.validate()
            .map_err(|message| core_library::LibraryError::invalid_input("Song", message))?;

        let mut state = self.state.write().await;
        state.songs.push(song.clone());
        self.save_songs_locked(&mut state).await?;

        info!(song_id = %song.id, "Added song");
        Ok(song)
    }

    /// Apply an edit to an existing song
    ///
    /// When the identity fields (`title`, `chord`) changed, the sheet file is
    /// renamed before any state is touched; a rename failure leaves the
    /// record, the worship lists, and the disk exactly as they were. On
    /// success the edit fans out into every worship-list snapshot sharing the
    /// id, and both collections are persisted.
    #[instrument(skip(self, edited), fields(song_id = %edited.id))]
    pub async fn update_song(&self, edited: Song) -> Result<Song> {
        edited
            .validate()
            .map_err(|message| core_library::LibraryError::invalid_input("Song", message))?;

        let mut state = self.state.write().await;

        let current = state
            .songs
            .iter()
            .find(|s| s.id == edited.id)
            .cloned()
            .ok_or_else(|| CoreError::SongNotFound(edited.id.to_string()))?;

        // Rename first: an identity change must land on disk before any state
        // is touched. The edited record may also attach or replace the sheet
        // reference itself (file import happens upstream); a successful
        // rename overrides it.
        let outcome = self
            .reconciler
            .update_file_name_for_song(&current, &edited)
            .await?;

        let mut updated = edited;
        updated.created_at = current.created_at;
        updated.updated_at = self.config.clock.now();
        if let RenameOutcome::Renamed { file_name } = outcome {
            updated.file_name = Some(file_name);
        }

        if let Some(slot) = state.songs.iter_mut().find(|s| s.id == updated.id) {
            *slot = updated.clone();
        }
        let fanned_out = propagate_song(&mut state.worship_lists, &updated);

        self.save_songs_locked(&mut state).await?;
        if fanned_out > 0 {
            self.save_worship_lists_locked(&mut state).await?;
        }

        info!(song_id = %updated.id, fanned_out, "Updated song");
        Ok(updated)
    }

    /// Remove a song and every worship-list snapshot of it
    ///
    /// With `delete_sheet`, the sheet file is deleted first; an
    /// already-missing file is tolerated, any other failure aborts the whole
    /// operation with the record intact. Callers are expected to have
    /// confirmed this with the user.
    #[instrument(skip(self), fields(song_id = %id))]
    pub async fn delete_song(&self, id: &SongId, delete_sheet: bool) -> Result<()> {
        let mut state = self.state.write().await;

        let song = state
            .songs
            .iter()
            .find(|s| &s.id == id)
            .cloned()
            .ok_or_else(|| CoreError::SongNotFound(id.to_string()))?;

        if delete_sheet {
            if let Some(file_name) = song.file_name.as_deref() {
                let path = self.reconciler.sheet_path(file_name);
                match self.config.file_system.delete_file(&path).await {
                    Ok(()) => {}
                    Err(e) if e.is_not_found() => {
                        warn!(file = file_name, "Sheet already absent on delete");
                    }
                    Err(e) => return Err(core_sync::SyncError::Bridge(e).into()),
                }
            }
        }

        state.songs.retain(|s| &s.id != id);
        let removed_snapshots = state.worship_lists.remove_song(id);

        self.save_songs_locked(&mut state).await?;
        if removed_snapshots > 0 {
            self.save_worship_lists_locked(&mut state).await?;
        }

        info!(song_id = %id, removed_snapshots, "Deleted song");
        Ok(())
    }

    /// Copy the current master snapshot of a song into a date's list
    ///
    /// The entry is a denormalized copy; later edits reach it only through
    /// the reconciler's fan-out.
    #[instrument(skip(self), fields(song_id = %id, date = %date))]
    pub async fn add_to_worship_list(&self, date: NaiveDate, id: &SongId) -> Result<Song> {
        let mut state = self.state.write().await;

        let snapshot = state
            .songs
            .iter()
            .find(|s| &s.id == id)
            .cloned()
            .ok_or_else(|| CoreError::SongNotFound(id.to_string()))?;

        state.worship_lists.push_entry(date, snapshot.clone());
        self.save_worship_lists_locked(&mut state).await?;

        Ok(snapshot)
    }

    /// Remove one entry from a date's list by position
    #[instrument(skip(self), fields(date = %date, index))]
    pub async fn remove_from_worship_list(&self, date: &NaiveDate, index: usize) -> Result<Song> {
        let mut state = self.state.write().await;

        let removed = state
            .worship_lists
            .remove_entry(date, index)
            .ok_or_else(|| {
                CoreError::SongNotFound(format!("no entry {index} on {date}"))
            })?;

        self.save_worship_lists_locked(&mut state).await?;
        Ok(removed)
    }

    /// Compare against the remote store and adopt any newer collections
    #[instrument(skip(self))]
    pub async fn sync(&self) -> Result<SyncDecision> {
        let decision = self.repository.check_sync_state().await?;

        if decision.needs_sync() {
            let loaded = self.repository.load().await;
            let mut state = self.state.write().await;
            state.songs = loaded.songs;
            state.worship_lists = loaded.worship_lists;
            state.songs_status = CollectionStatus::Loaded;
            state.lists_status = CollectionStatus::Loaded;
            info!(reason = ?decision.reason, "Adopted remote collections");
        }

        Ok(decision)
    }

    /// Write a snapshot of the current in-memory collections
    pub async fn backup(&self) -> Result<BackupReceipt> {
        let state = self.state.read().await;
        Ok(self
            .repository
            .backup(&state.songs, &state.worship_lists)
            .await?)
    }

    /// Restore the database from a snapshot file
    ///
    /// The current collections are backed up automatically before the
    /// overwrite; the snapshot is validated wholesale before either store is
    /// touched.
    #[instrument(skip(self))]
    pub async fn restore_from_file(&self, snapshot_path: &Path) -> Result<()> {
        let bytes = self
            .config
            .file_system
            .read_file(snapshot_path)
            .await
            .map_err(core_sync::SyncError::Bridge)?;
        let snapshot_json = String::from_utf8(bytes.to_vec()).map_err(|e| {
            core_sync::SyncError::InvalidBackupFormat(format!("not valid UTF-8: {e}"))
        })?;

        // Safety net before a wholesale overwrite
        self.backup().await?;

        let restored = self.repository.restore(&snapshot_json).await?;

        let mut state = self.state.write().await;
        state.songs = restored.songs;
        state.worship_lists = restored.worship_lists;
        state.songs_status = CollectionStatus::Saved;
        state.lists_status = CollectionStatus::Saved;

        info!(songs = state.songs.len(), "Restored database from file");
        Ok(())
    }

    /// Triage report for every sheet file against the current library
    pub async fn scan_library(&self) -> Result<LibraryScanReport> {
        let songs = self.songs().await;
        Ok(self.reconciler.scan_sheets_directory(&songs).await?)
    }

    async fn save_songs_locked(&self, state: &mut LibraryState) -> Result<()> {
        state.songs_status = CollectionStatus::Saving;
        match self.repository.save_songs(&state.songs).await {
            Ok(SaveStatus::Saved) => {
                state.songs_status = CollectionStatus::Saved;
                Ok(())
            }
            Ok(SaveStatus::SavedLocalOnly { remote_error }) => {
                warn!(error = %remote_error, "Songs saved locally only");
                state.songs_status = CollectionStatus::SaveFailedRemote;
                Ok(())
            }
            Err(e) => {
                state.songs_status = CollectionStatus::Dirty;
                Err(e.into())
            }
        }
    }

    async fn save_worship_lists_locked(&self, state: &mut LibraryState) -> Result<()> {
        state.lists_status = CollectionStatus::Saving;
        match self.repository.save_worship_lists(&state.worship_lists).await {
            Ok(SaveStatus::Saved) => {
                state.lists_status = CollectionStatus::Saved;
                Ok(())
            }
            Ok(SaveStatus::SavedLocalOnly { remote_error }) => {
                warn!(error = %remote_error, "Worship lists saved locally only");
                state.lists_status = CollectionStatus::SaveFailedRemote;
                Ok(())
            }
            Err(e) => {
                state.lists_status = CollectionStatus::Dirty;
                Err(e.into())
            }
        }
    }
}
