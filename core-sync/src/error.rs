use bridge_traits::BridgeError;
use core_library::{LibraryError, SongId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Source file missing: {file_name}")]
    SourceFileMissing { file_name: String },

    #[error("Ambiguous match for {file_name}: {} candidates", candidates.len())]
    AmbiguousMatch {
        file_name: String,
        candidates: Vec<SongId>,
    },

    #[error("Remote store unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Invalid backup format: {0}")]
    InvalidBackupFormat(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Library error: {0}")]
    Library(#[from] LibraryError),
}

pub type Result<T> = std::result::Result<T, SyncError>;
