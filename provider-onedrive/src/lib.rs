//! # OneDrive Provider
//!
//! Locates the consumer OneDrive sync folder on disk and derives the
//! WorshipNote storage layout inside it.
//!
//! ## Overview
//!
//! Transport belongs to the consumer OneDrive sync client; from the core's
//! point of view the remote store is an ordinary directory that happens to be
//! mirrored across devices. This module answers one question: where is that
//! directory on this machine?
//!
//! Discovery order:
//! 1. `OneDriveConsumer` environment variable (Windows, personal accounts)
//! 2. `OneDrive` environment variable (Windows, either account type)
//! 3. `~/OneDrive` (macOS/Linux sync clients and sensible defaults)
//!
//! The first candidate that exists as a directory wins; when none does, the
//! remote store is unreachable and the caller falls back to the local cache.

pub mod error;

pub use error::{OneDriveError, Result};

use std::path::PathBuf;
use tracing::debug;

/// Application folder created directly under the OneDrive root
pub const APP_DIR: &str = "WorshipNote";
/// Database folder holding `songs.json` / `worship_lists.json`
pub const DATABASE_DIR: &str = "Database";
/// Folder holding the sheet image files
pub const SHEETS_DIR: &str = "Sheets";

/// Storage layout of the WorshipNote data inside the OneDrive folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneDriveLayout {
    /// The OneDrive sync root itself
    pub root: PathBuf,
    /// `<root>/WorshipNote`
    pub app_dir: PathBuf,
    /// `<root>/WorshipNote/Database`
    pub database_dir: PathBuf,
    /// `<root>/WorshipNote/Sheets`
    pub sheets_dir: PathBuf,
}

impl OneDriveLayout {
    /// Derive the layout from a known OneDrive root, without touching disk
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let app_dir = root.join(APP_DIR);
        let database_dir = app_dir.join(DATABASE_DIR);
        let sheets_dir = app_dir.join(SHEETS_DIR);
        Self {
            root,
            app_dir,
            database_dir,
            sheets_dir,
        }
    }

    /// Locate the OneDrive folder on this machine and derive the layout
    ///
    /// # Errors
    ///
    /// [`OneDriveError::NotFound`] when no candidate directory exists; the
    /// caller should treat the remote store as unavailable and keep working
    /// from the local cache.
    pub fn discover() -> Result<Self> {
        locate_onedrive_root().map(Self::from_root)
    }
}

/// Find the consumer OneDrive sync folder
pub fn locate_onedrive_root() -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();

    for var in ["OneDriveConsumer", "OneDrive"] {
        if let Some(path) = std::env::var_os(var) {
            if !path.is_empty() {
                candidates.push(PathBuf::from(path));
            }
        }
    }

    if let Some(home) = dirs::home_dir() {
        candidates.push(home.join("OneDrive"));
    }

    locate_from_candidates(&candidates)
}

fn locate_from_candidates(candidates: &[PathBuf]) -> Result<PathBuf> {
    for candidate in candidates {
        if candidate.is_dir() {
            debug!(path = ?candidate, "Located OneDrive folder");
            return Ok(candidate.clone());
        }
    }

    Err(OneDriveError::NotFound(
        candidates
            .iter()
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", "),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::path::Path;

    #[test]
    fn test_layout_from_root() {
        let layout = OneDriveLayout::from_root("/home/user/OneDrive");
        assert_eq!(layout.app_dir, Path::new("/home/user/OneDrive/WorshipNote"));
        assert_eq!(
            layout.database_dir,
            Path::new("/home/user/OneDrive/WorshipNote/Database")
        );
        assert_eq!(
            layout.sheets_dir,
            Path::new("/home/user/OneDrive/WorshipNote/Sheets")
        );
    }

    #[test]
    fn test_first_existing_candidate_wins() {
        let missing = env::temp_dir().join(format!("missing-{}", uuid::Uuid::new_v4()));
        let existing = env::temp_dir();

        let root =
            locate_from_candidates(&[missing.clone(), existing.clone(), missing]).unwrap();
        assert_eq!(root, existing);
    }

    #[test]
    fn test_no_candidates_is_not_found() {
        let missing = env::temp_dir().join(format!("missing-{}", uuid::Uuid::new_v4()));
        let err = locate_from_candidates(&[missing]).unwrap_err();
        assert!(matches!(err, OneDriveError::NotFound(_)));
    }
}
