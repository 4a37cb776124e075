//! # Sync & Reconciliation Module
//!
//! Keeps the three redundant copies of the library (in-memory state, local
//! cache, cloud-synced JSON store) consistent, and keeps sheet filenames in
//! step with their song records.
//!
//! ## Components
//!
//! - **Sync State Comparator** (`comparator`): decides which side is
//!   authoritative per collection from the snapshot timestamps
//! - **Record Reconciler** (`reconciler`): rename orchestration, legacy
//!   file-to-song recovery, worship-list fan-out
//! - **Database Repository** (`repository`): dual-write persistence with a
//!   cache-remote-seed-empty load fallback chain
//! - **Backup** (`backup`): additive full-database snapshots and validated
//!   restore

pub mod backup;
pub mod comparator;
pub mod error;
pub mod reconciler;
pub mod repository;

pub use backup::{BackupReceipt, BackupSnapshot, BackupStats, RestoredDatabase};
pub use comparator::{compare_versions, SnapshotTimes, SyncDecision, SyncReason};
pub use error::{Result, SyncError};
pub use reconciler::{
    match_file_to_song, propagate_song, LibraryScanReport, MatchOutcome, RecordReconciler,
    RenameOutcome,
};
pub use repository::{DatabaseRepository, LoadSource, LoadedDatabase, SaveStatus};
