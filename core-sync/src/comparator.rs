//! Sync State Comparison
//!
//! Decides which side is authoritative for each collection, given the
//! last-saved timestamp of the local cache and the last-updated timestamp of
//! the remote store. The two collections (`songs`, `worship_lists`) are
//! persisted as separate remote files and are evaluated independently; a
//! caller acting on the decision must re-check each collection's flag rather
//! than the overall `needs_sync()`, so a collection whose local copy is
//! equal-or-newer is never overwritten.
//!
//! Comparison is a strict `>` on the timestamps with no clock-skew tolerance,
//! matching the documented last-timestamp-wins policy. Concurrent
//! multi-process edits to the same remote store are out of contract.

use chrono::{DateTime, Utc};

/// Last-write timestamps of one side's snapshot, per collection
///
/// `None` means that side has never persisted the collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotTimes {
    pub songs: Option<DateTime<Utc>>,
    pub worship_lists: Option<DateTime<Utc>>,
}

impl SnapshotTimes {
    pub fn new(songs: Option<DateTime<Utc>>, worship_lists: Option<DateTime<Utc>>) -> Self {
        Self {
            songs,
            worship_lists,
        }
    }

    /// Neither collection has ever been persisted on this side
    pub fn is_empty(&self) -> bool {
        self.songs.is_none() && self.worship_lists.is_none()
    }
}

/// Why the comparator decided the way it did
///
/// Named so callers can render distinct messaging without re-deriving the
/// comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncReason {
    /// Neither side has anything
    BothEmpty,
    /// The local cache has nothing; pull whatever the remote has
    LocalEmpty,
    /// The remote store has nothing; the local cache stands
    RemoteEmpty,
    /// At least one remote collection is strictly newer
    RemoteNewer,
    /// Both local collections are equal-or-newer
    NoSyncNeeded,
}

/// Outcome of comparing the two sides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncDecision {
    /// The songs collection should be adopted from the remote store
    pub pull_songs: bool,
    /// The worship-lists collection should be adopted from the remote store
    pub pull_worship_lists: bool,
    pub reason: SyncReason,
}

impl SyncDecision {
    /// Logical OR of the per-collection flags
    ///
    /// Callers that act on the decision must still check each collection's
    /// flag separately before overwriting it.
    pub fn needs_sync(&self) -> bool {
        self.pull_songs || self.pull_worship_lists
    }
}

/// Compare the local cache against the remote store
///
/// A collection needs pulling when the remote timestamp exists and the local
/// one is absent or strictly older.
pub fn compare_versions(local: &SnapshotTimes, remote: &SnapshotTimes) -> SyncDecision {
    let pull_songs = needs_pull(local.songs, remote.songs);
    let pull_worship_lists = needs_pull(local.worship_lists, remote.worship_lists);

    let reason = if local.is_empty() && remote.is_empty() {
        SyncReason::BothEmpty
    } else if remote.is_empty() {
        SyncReason::RemoteEmpty
    } else if local.is_empty() {
        SyncReason::LocalEmpty
    } else if pull_songs || pull_worship_lists {
        SyncReason::RemoteNewer
    } else {
        SyncReason::NoSyncNeeded
    };

    SyncDecision {
        pull_songs,
        pull_worship_lists,
        reason,
    }
}

fn needs_pull(local: Option<DateTime<Utc>>, remote: Option<DateTime<Utc>>) -> bool {
    match (local, remote) {
        (_, None) => false,
        (None, Some(_)) => true,
        (Some(local), Some(remote)) => remote > local,
    }
}
