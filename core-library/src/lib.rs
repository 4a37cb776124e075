//! # Core Library Module
//!
//! Domain model and filename codec for the worship song library.
//!
//! ## Overview
//!
//! - [`models`]: `Song`, `SongId`, `WorshipLists` and the wire documents
//!   persisted to the cloud-synced store
//! - [`filename`]: bidirectional mapping between a song's identifying fields
//!   and its sheet filename, plus the legacy filename recovery matcher
//!
//! Everything in this crate is pure: no I/O, no clocks, no globals. The sync
//! engine in `core-sync` layers persistence and reconciliation on top.

pub mod error;
pub mod filename;
pub mod models;

pub use error::{LibraryError, Result};
pub use filename::{
    canonical_file_name, is_canonical_file_name, parse_file_name, parse_legacy_file_name,
    LegacyFileInfo, LegacyPattern, SongFileInfo,
};
pub use models::{Song, SongId, SongsDocument, WorshipLists, WorshipListsDocument};
