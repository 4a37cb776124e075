//! Integration tests for the database repository
//!
//! These tests verify the dual-write persistence model end to end:
//! - Cache-first load with remote refresh when the remote is newer
//! - Graceful degradation when the remote store is unreachable
//! - Seed fallback when both sides are empty
//! - Additive backups and wholesale-validated restore

mod common;

use chrono::{TimeZone, Utc};
use common::{FixedClock, MemoryCacheStore, MemoryFileSystem};
use core_library::{Song, SongId, WorshipLists};
use core_sync::{DatabaseRepository, LoadSource, SaveStatus, SyncError};
use std::path::{Path, PathBuf};
use std::sync::Arc;

fn song(id: &str, title: &str, chord: &str) -> Song {
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    Song {
        id: SongId::new(id),
        title: title.to_string(),
        chord: chord.to_string(),
        tempo: "Medium".to_string(),
        first_lyrics: String::new(),
        file_name: None,
        file_path: None,
        created_at: now,
        updated_at: now,
    }
}

struct Fixture {
    fs: Arc<MemoryFileSystem>,
    cache: Arc<MemoryCacheStore>,
    clock: Arc<FixedClock>,
    repo: DatabaseRepository,
}

fn fixture() -> Fixture {
    let fs = Arc::new(MemoryFileSystem::new());
    let cache = Arc::new(MemoryCacheStore::new());
    let clock = Arc::new(FixedClock::at(2024, 1, 7, 10));
    let repo = DatabaseRepository::new(
        fs.clone(),
        cache.clone(),
        clock.clone(),
        PathBuf::from("/onedrive/Database"),
        PathBuf::from("/onedrive/Database/Backups"),
    );
    Fixture {
        fs,
        cache,
        clock,
        repo,
    }
}

#[tokio::test]
async fn save_writes_cache_and_remote() {
    let f = fixture();
    let songs = vec![song("1", "Amazing Grace", "C")];

    let status = f.repo.save_songs(&songs).await.unwrap();
    assert_eq!(status, SaveStatus::Saved);

    let remote = f
        .fs
        .contents(Path::new("/onedrive/Database/songs.json"))
        .expect("remote songs.json written");
    assert!(remote.contains("Amazing Grace"));
    assert!(remote.contains("lastUpdated"));

    let cached = f.cache.snapshot();
    assert!(cached["worshipnote_songs"].contains("Amazing Grace"));
    assert_eq!(
        cached["worshipnote_songs_saved_at"],
        "2024-01-07T10:00:00+00:00"
    );
}

#[tokio::test]
async fn remote_write_failure_degrades_to_local_only() {
    let f = fixture();
    f.fs.set_fail_writes(true);

    let status = f.repo.save_songs(&[song("1", "Amazing Grace", "C")]).await.unwrap();
    match status {
        SaveStatus::SavedLocalOnly { remote_error } => {
            assert!(remote_error.contains("injected write failure"));
        }
        other => panic!("expected SavedLocalOnly, got {other:?}"),
    }

    // Local cache is still the durability floor
    assert!(f.cache.snapshot()["worshipnote_songs"].contains("Amazing Grace"));
    assert!(f
        .fs
        .contents(Path::new("/onedrive/Database/songs.json"))
        .is_none());
}

#[tokio::test]
async fn load_prefers_cache_when_remote_is_older() {
    let f = fixture();
    f.repo
        .save_songs(&[song("1", "Local Version", "C")])
        .await
        .unwrap();

    // An older remote copy appears (e.g. synced from another stale device)
    f.fs.insert_file(
        "/onedrive/Database/songs.json",
        r#"{"songs":[{"id":"1","title":"Stale Remote","chord":"C",
            "createdAt":"2023-01-01T00:00:00Z","updatedAt":"2023-01-01T00:00:00Z"}],
            "lastUpdated":"2023-01-01T00:00:00Z"}"#,
    );

    let loaded = f.repo.load().await;
    assert_eq!(loaded.source, LoadSource::Cache);
    assert_eq!(loaded.songs[0].title, "Local Version");
}

#[tokio::test]
async fn load_adopts_newer_remote_songs() {
    let f = fixture();
    f.repo
        .save_songs(&[song("1", "Local Version", "C")])
        .await
        .unwrap();

    // A strictly newer remote copy (edited on another device)
    f.fs.insert_file(
        "/onedrive/Database/songs.json",
        r#"{"songs":[{"id":"1","title":"Newer Remote","chord":"G",
            "createdAt":"2024-01-01T00:00:00Z","updatedAt":"2024-02-01T00:00:00Z"}],
            "lastUpdated":"2024-02-01T00:00:00Z"}"#,
    );

    let loaded = f.repo.load().await;
    assert_eq!(loaded.source, LoadSource::CacheRefreshed);
    assert_eq!(loaded.songs[0].title, "Newer Remote");

    // The adopted copy is re-cached for the next session
    assert!(f.cache.snapshot()["worshipnote_songs"].contains("Newer Remote"));
}

#[tokio::test]
async fn load_keeps_cache_when_remote_unreachable() {
    let f = fixture();
    f.repo
        .save_songs(&[song("1", "Local Version", "C")])
        .await
        .unwrap();

    f.fs.set_fail_reads(true);

    let loaded = f.repo.load().await;
    assert_eq!(loaded.source, LoadSource::Cache);
    assert_eq!(loaded.songs[0].title, "Local Version");
}

#[tokio::test]
async fn empty_cache_adopts_remote() {
    let f = fixture();
    f.fs.insert_file(
        "/onedrive/Database/songs.json",
        r#"{"songs":[{"id":"1","title":"Remote Only","chord":"D",
            "createdAt":"2024-01-01T00:00:00Z","updatedAt":"2024-01-01T00:00:00Z"}],
            "lastUpdated":"2024-01-01T00:00:00Z"}"#,
    );

    let loaded = f.repo.load().await;
    assert_eq!(loaded.source, LoadSource::Remote);
    assert_eq!(loaded.songs[0].title, "Remote Only");
}

#[tokio::test]
async fn everything_empty_installs_seed() {
    let f = fixture();

    let loaded = f.repo.load().await;
    assert_eq!(loaded.source, LoadSource::Seed);
    assert!(!loaded.songs.is_empty());
    assert!(loaded.worship_lists.is_empty());
    assert!(loaded.songs.iter().any(|s| s.title == "Amazing Grace"));
}

#[tokio::test]
async fn worship_lists_round_trip_through_remote() {
    let f = fixture();
    let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
    let mut lists = WorshipLists::new();
    lists.push_entry(date, song("1", "Amazing Grace", "C"));
    lists.push_entry(date, song("1", "Amazing Grace", "C")); // duplicate is legal

    f.repo.save_worship_lists(&lists).await.unwrap();

    let remote = f
        .fs
        .contents(Path::new("/onedrive/Database/worship_lists.json"))
        .unwrap();
    assert!(remote.contains("2024-01-07"));

    // A fresh repository over the same stores sees the same data
    let f2 = DatabaseRepository::new(
        f.fs.clone(),
        Arc::new(MemoryCacheStore::new()),
        f.clock.clone(),
        PathBuf::from("/onedrive/Database"),
        PathBuf::from("/onedrive/Database/Backups"),
    );
    let loaded = f2.load().await;
    assert_eq!(loaded.source, LoadSource::Remote);
    assert_eq!(loaded.worship_lists.get(&date).unwrap().len(), 2);
}

#[tokio::test]
async fn backups_are_additive_and_collision_free() {
    let f = fixture();
    let songs = vec![song("1", "Amazing Grace", "C")];
    let lists = WorshipLists::new();

    let first = f.repo.backup(&songs, &lists).await.unwrap();
    // Same second: the name must get a counter suffix, not overwrite
    let second = f.repo.backup(&songs, &lists).await.unwrap();

    assert_ne!(first.path, second.path);
    assert_eq!(
        f.fs.file_names(),
        vec![
            "worshipnote_backup_2024-01-07T10-00-00-1.json",
            "worshipnote_backup_2024-01-07T10-00-00.json",
        ]
    );
    assert_eq!(first.stats.total_songs, 1);
    assert!(first.stats.backup_size > 0);
}

#[tokio::test]
async fn backup_restore_round_trip() {
    let f = fixture();
    let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
    let songs = vec![song("1", "Amazing Grace", "C"), song("2", "Doxology", "G")];
    let mut lists = WorshipLists::new();
    lists.push_entry(date, songs[0].clone());

    let receipt = f.repo.backup(&songs, &lists).await.unwrap();
    let snapshot = f.fs.contents(&receipt.path).unwrap();

    let restored = f.repo.restore(&snapshot).await.unwrap();
    assert_eq!(restored.songs.len(), 2);
    assert_eq!(restored.worship_lists.get(&date).unwrap().len(), 1);

    // Restore overwrote both stores
    assert!(f
        .fs
        .contents(Path::new("/onedrive/Database/songs.json"))
        .unwrap()
        .contains("Doxology"));
    assert!(f.cache.snapshot()["worshipnote_songs"].contains("Doxology"));
}

#[tokio::test]
async fn corrupt_backup_is_rejected_wholesale() {
    let f = fixture();
    f.repo
        .save_songs(&[song("1", "Untouched", "C")])
        .await
        .unwrap();
    let cache_before = f.cache.snapshot();
    let remote_before = f
        .fs
        .contents(Path::new("/onedrive/Database/songs.json"))
        .unwrap();

    // Missing the worshipLists key entirely
    let snapshot = r#"{"version":"1.0","type":"worshipnote_database",
        "backupDate":"2024-01-07T10:00:00Z","songs":[]}"#;

    let err = f.repo.restore(snapshot).await.unwrap_err();
    assert!(matches!(err, SyncError::InvalidBackupFormat(_)));

    // Neither store was modified
    assert_eq!(f.cache.snapshot(), cache_before);
    assert_eq!(
        f.fs.contents(Path::new("/onedrive/Database/songs.json"))
            .unwrap(),
        remote_before
    );
}

#[tokio::test]
async fn unrecognized_type_tag_is_rejected() {
    let f = fixture();
    let snapshot = r#"{"version":"1.0","type":"something_else",
        "backupDate":"2024-01-07T10:00:00Z","songs":[],"worshipLists":{}}"#;

    let err = f.repo.restore(snapshot).await.unwrap_err();
    assert!(matches!(err, SyncError::InvalidBackupFormat(_)));
}

#[tokio::test]
async fn legacy_type_tag_is_accepted() {
    let f = fixture();
    let snapshot = r#"{"version":"1.0","type":"database",
        "backupDate":"2024-01-07T10:00:00Z","songs":[],"worshipLists":{}}"#;

    let restored = f.repo.restore(snapshot).await.unwrap();
    assert!(restored.songs.is_empty());
}
