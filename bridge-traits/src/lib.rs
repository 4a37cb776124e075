//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by the host process.
//!
//! ## Overview
//!
//! This crate defines the contract between the core library and the host
//! environment. Each trait represents a capability the core requires but that
//! the host supplies: file I/O against the sheet directory and the
//! cloud-synced database folder, the local cache store, and the time source.
//!
//! ## Traits
//!
//! - [`FileSystemAccess`](storage::FileSystemAccess) - read/write/rename/delete/list by absolute path
//! - [`CacheStore`](storage::CacheStore) - key-value local cache (durability floor for a session)
//! - [`Clock`](time::Clock) - time source for deterministic testing
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type for
//! consistent error handling. Implementations should:
//!
//! - Convert platform-specific errors to `BridgeError`
//! - Report an absent file as `NotFound` rather than a generic failure
//! - Include error context (e.g., file paths)
//!
//! Expected conditions (a missing file, an unreachable folder) are reported
//! through the error value, never by panicking.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds to support safe concurrent
//! usage across async tasks. Implementations must ensure thread safety.

pub mod error;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use storage::{CacheStore, FileSystemAccess};
pub use time::{Clock, SystemClock};
