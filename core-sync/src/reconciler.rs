//! Record Reconciliation
//!
//! Keeps the on-disk sheet filename, the master song record, and every
//! worship-list snapshot of that song consistent whenever the identity
//! fields (`title`, `chord`) change.
//!
//! ## Overview
//!
//! - [`RecordReconciler::update_file_name_for_song`]: recompute the canonical
//!   filename after an edit and rename the sheet on disk. The record and the
//!   disk never diverge: either both change or neither does.
//! - [`match_file_to_song`]: recover the owning song for an arbitrary
//!   historical filename (id first, then title, then a chord tie-break).
//!   Ambiguity is reported, never silently resolved.
//! - [`propagate_song`]: the single path by which worship-list snapshots are
//!   mutated.
//! - [`RecordReconciler::scan_sheets_directory`]: read-only triage report for
//!   an entire sheet directory.
//!
//! The exists-then-rename sequence has a window in which an operator could
//! touch the file; that surfaces as an ordinary rename error, not state
//! corruption, because the record is only updated after the rename reports
//! success.

use crate::error::{Result, SyncError};
use bridge_traits::FileSystemAccess;
use core_library::filename::{
    canonical_file_name, is_canonical_file_name, parse_file_name, parse_legacy_file_name,
    SHEET_EXTENSION,
};
use core_library::{Song, SongId, WorshipLists};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Outcome of a filename update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    /// Neither title nor chord changed; the filesystem was not touched
    NoChangeNeeded,
    /// The song has no sheet attached; nothing to rename
    NoFileAttached,
    /// The stored filename already matches the canonical form
    AlreadyCurrent,
    /// The sheet was renamed on disk; callers must write `file_name` back to
    /// the song record and fan out to every worship-list snapshot
    Renamed { file_name: String },
}

/// Outcome of matching one file against the song collection
#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome<'a> {
    /// The filename carried an id that exists in the collection; authoritative
    ById(&'a Song),
    /// Resolved through title matching (possibly with a chord tie-break)
    ByTitle(&'a Song),
    /// Nothing matched; report for manual triage
    Unmatched,
    /// More than one song remained equally plausible
    Ambiguous { candidates: Vec<SongId> },
}

impl MatchOutcome<'_> {
    pub fn song(&self) -> Option<&Song> {
        match self {
            Self::ById(song) | Self::ByTitle(song) => Some(song),
            _ => None,
        }
    }
}

/// Classification of every file found in the sheet directory
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibraryScanReport {
    /// Already canonically named and linked to a known song
    pub canonical: Vec<String>,
    /// Legacy name whose embedded id resolved directly
    pub matched_by_id: Vec<(String, SongId)>,
    /// Resolved through title matching
    pub matched_by_title: Vec<(String, SongId)>,
    /// Multiple equally plausible candidates; needs manual resolution
    pub ambiguous: Vec<(String, Vec<SongId>)>,
    /// No candidate at all
    pub unmatched: Vec<String>,
}

impl LibraryScanReport {
    pub fn total_files(&self) -> usize {
        self.canonical.len()
            + self.matched_by_id.len()
            + self.matched_by_title.len()
            + self.ambiguous.len()
            + self.unmatched.len()
    }
}

/// Reconciler for song records and their on-disk sheet files
pub struct RecordReconciler {
    fs: Arc<dyn FileSystemAccess>,
    sheets_dir: PathBuf,
}

impl RecordReconciler {
    pub fn new(fs: Arc<dyn FileSystemAccess>, sheets_dir: PathBuf) -> Self {
        Self { fs, sheets_dir }
    }

    /// Absolute path of a sheet file within the sheet directory
    pub fn sheet_path(&self, file_name: &str) -> PathBuf {
        self.sheets_dir.join(file_name)
    }

    /// Bring the on-disk filename in line with an edited song
    ///
    /// `old_song` is the record as persisted, `new_song` the edited version
    /// sharing the same id. On `Renamed` the caller owns updating the record
    /// and fanning out to worship lists; on any error the filesystem and the
    /// record are both unchanged.
    ///
    /// # Errors
    ///
    /// - [`SyncError::SourceFileMissing`] when the record claims a file that
    ///   is absent on disk; the rename is not attempted.
    /// - [`SyncError::Library`] when the edited song cannot produce a
    ///   canonical name (empty id/title).
    /// - [`SyncError::Bridge`] when the underlying rename fails; propagated
    ///   verbatim.
    #[instrument(skip(self, old_song, new_song), fields(song_id = %new_song.id))]
    pub async fn update_file_name_for_song(
        &self,
        old_song: &Song,
        new_song: &Song,
    ) -> Result<RenameOutcome> {
        if !old_song.identity_differs_from(new_song) {
            return Ok(RenameOutcome::NoChangeNeeded);
        }

        let Some(old_file_name) = old_song.file_name.as_deref() else {
            return Ok(RenameOutcome::NoFileAttached);
        };

        let new_file_name = canonical_file_name(new_song)?;
        if new_file_name == old_file_name {
            return Ok(RenameOutcome::AlreadyCurrent);
        }

        let old_path = self.sheet_path(old_file_name);
        if !self.fs.exists(&old_path).await? {
            warn!(file = old_file_name, "Sheet file claimed by song is absent");
            return Err(SyncError::SourceFileMissing {
                file_name: old_file_name.to_string(),
            });
        }

        let new_path = self.sheet_path(&new_file_name);
        self.fs.rename_file(&old_path, &new_path).await?;

        info!(
            song_id = %new_song.id,
            from = old_file_name,
            to = %new_file_name,
            "Renamed sheet file"
        );

        Ok(RenameOutcome::Renamed {
            file_name: new_file_name,
        })
    }

    /// Classify every sheet file in the directory against the song collection
    ///
    /// Read-only: nothing is renamed or relinked. Non-sheet entries are
    /// skipped.
    #[instrument(skip(self, songs))]
    pub async fn scan_sheets_directory(&self, songs: &[Song]) -> Result<LibraryScanReport> {
        let entries = self.fs.list_directory(&self.sheets_dir).await?;
        let mut report = LibraryScanReport::default();

        for entry in entries {
            let is_sheet = entry
                .extension()
                .map(|ext| ext.eq_ignore_ascii_case(SHEET_EXTENSION))
                .unwrap_or(false);
            if !is_sheet {
                continue;
            }

            let Some(file_name) = entry.file_name().map(|n| n.to_string_lossy().into_owned())
            else {
                continue;
            };

            match match_file_to_song(&file_name, songs) {
                MatchOutcome::ById(song) => {
                    if is_canonical_file_name(&file_name) {
                        report.canonical.push(file_name);
                    } else {
                        report.matched_by_id.push((file_name, song.id.clone()));
                    }
                }
                MatchOutcome::ByTitle(song) => {
                    report.matched_by_title.push((file_name, song.id.clone()));
                }
                MatchOutcome::Ambiguous { candidates } => {
                    report.ambiguous.push((file_name, candidates));
                }
                MatchOutcome::Unmatched => report.unmatched.push(file_name),
            }
        }

        info!(
            total = report.total_files(),
            canonical = report.canonical.len(),
            unmatched = report.unmatched.len(),
            ambiguous = report.ambiguous.len(),
            "Scanned sheet directory"
        );

        Ok(report)
    }
}

/// Recover the owning song for an arbitrary (possibly historical) filename
///
/// 1. An id recovered from the name (canonical or legacy) and present in the
///    collection is authoritative; no further checks.
/// 2. Otherwise collect every song whose title equals, contains, or is
///    contained by the recovered title (trimmed, case-insensitive).
///    - exactly one candidate: accept it
///    - zero: unmatched
///    - several: a chord tie-break must leave exactly one exact match, else
///      the file stays ambiguous. Guessing is never an option.
pub fn match_file_to_song<'a>(file_name: &str, songs: &'a [Song]) -> MatchOutcome<'a> {
    let (recovered_id, recovered_title, recovered_chord) = recover_components(file_name);

    if let Some(id) = recovered_id {
        if let Some(song) = songs.iter().find(|s| s.id.as_str() == id) {
            debug!(file = file_name, song_id = %song.id, "Matched by embedded id");
            return MatchOutcome::ById(song);
        }
    }

    let Some(title) = recovered_title else {
        return MatchOutcome::Unmatched;
    };

    let needle = Song::normalize(&title);
    if needle.is_empty() {
        return MatchOutcome::Unmatched;
    }

    let candidates: Vec<&Song> = songs
        .iter()
        .filter(|s| {
            let hay = Song::normalize(&s.title);
            hay == needle || hay.contains(&needle) || needle.contains(&hay)
        })
        .collect();

    match candidates.len() {
        0 => MatchOutcome::Unmatched,
        1 => MatchOutcome::ByTitle(candidates[0]),
        _ => {
            let chord = recovered_chord.unwrap_or_default();
            let chord = chord.trim();
            let by_chord: Vec<&Song> = candidates
                .iter()
                .copied()
                .filter(|s| !chord.is_empty() && s.chord.trim() == chord)
                .collect();

            if by_chord.len() == 1 {
                MatchOutcome::ByTitle(by_chord[0])
            } else {
                MatchOutcome::Ambiguous {
                    candidates: candidates.iter().map(|s| s.id.clone()).collect(),
                }
            }
        }
    }
}

/// Fan a master song's current state out into every worship-list snapshot
///
/// Every entry sharing the song's id has its display fields and filename
/// overwritten; order and per-date duplicates are preserved. Returns the
/// number of entries updated. This is the only path that mutates snapshots.
pub fn propagate_song(lists: &mut WorshipLists, song: &Song) -> usize {
    let mut updated = 0;
    for (_, entries) in lists.iter_mut() {
        for entry in entries.iter_mut().filter(|e| e.id == song.id) {
            entry.title = song.title.clone();
            entry.chord = song.chord.clone();
            entry.tempo = song.tempo.clone();
            entry.first_lyrics = song.first_lyrics.clone();
            entry.file_name = song.file_name.clone();
            entry.file_path = song.file_path.clone();
            entry.updated_at = song.updated_at;
            updated += 1;
        }
    }
    if updated > 0 {
        debug!(song_id = %song.id, updated, "Propagated song into worship lists");
    }
    updated
}

/// Pull id/title/chord out of a filename, canonical format first, then the
/// legacy patterns, then the bare stem as an unverified title.
fn recover_components(file_name: &str) -> (Option<String>, Option<String>, Option<String>) {
    let info = parse_file_name(file_name);
    if info.is_canonical {
        return (info.id, Some(info.title), info.chord);
    }

    if let Some(legacy) = parse_legacy_file_name(file_name) {
        return (legacy.id, legacy.title, legacy.chord);
    }

    (None, Some(info.title), None)
}
