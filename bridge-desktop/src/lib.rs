//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! This crate provides production-ready implementations of all bridge traits
//! using desktop-appropriate libraries:
//! - `FileSystemAccess` using `tokio::fs`
//! - `CacheStore` using a SQLite-backed key-value store
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{SqliteCacheStore, TokioFileSystem};
//! use bridge_traits::{CacheStore, FileSystemAccess};
//!
//! #[tokio::main]
//! async fn main() {
//!     let fs = TokioFileSystem::new();
//!     let cache = SqliteCacheStore::new("cache.db".into()).await.unwrap();
//!
//!     // Use in core configuration
//! }
//! ```

mod cache;
mod filesystem;

pub use cache::SqliteCacheStore;
pub use filesystem::TokioFileSystem;
