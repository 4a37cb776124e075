//! Domain models for the worship song library
//!
//! This module contains the domain models with validation and the wire
//! documents persisted to the cloud-synced JSON store. Wire field names are
//! camelCase for compatibility with existing `songs.json` /
//! `worship_lists.json` documents.

use chrono::{DateTime, NaiveDate, Utc};
use serde::de::{IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Reserved key legacy documents smuggled a timestamp under, alongside the
/// date keys. It is hoisted out during deserialization and never iterated
/// as a date.
pub const LAST_UPDATED_KEY: &str = "lastUpdated";

/// Format of the date keys in `worship_lists.json`
pub const DATE_KEY_FORMAT: &str = "%Y-%m-%d";

// =============================================================================
// ID Types
// =============================================================================

/// Unique identifier for a song
///
/// Opaque and stable across renames; never recomputed. Newly added songs get
/// a generated UUID, but ids recovered from historical filenames are accepted
/// verbatim (early libraries used timestamp-derived ids).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SongId(String);

impl SongId {
    /// Mint a fresh id for a newly added song
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Wrap an existing id
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for SongId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SongId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for SongId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

// =============================================================================
// Domain Models
// =============================================================================

/// A worship song and its associated sheet-music asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    /// Unique identifier
    pub id: SongId,
    /// Display title; may carry a trailing page fraction ("Song 1/2") that
    /// the filename codec normalizes before use
    pub title: String,
    /// Musical key; pre-merge documents stored this under `key`
    #[serde(default, alias = "key")]
    pub chord: String,
    /// Descriptive tempo tag (Fast/Medium/Slow in practice, free text)
    #[serde(default)]
    pub tempo: String,
    /// Opening lyrics, used for search only, never for filenames
    #[serde(default)]
    pub first_lyrics: String,
    /// Current on-disk leaf filename of the sheet image, if one is attached
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        serialize_with = "none_as_empty"
    )]
    pub file_name: Option<String>,
    /// Advisory full/partial path; may be stale or use another platform's
    /// separators. `file_name` is the reliable field.
    #[serde(
        default,
        deserialize_with = "empty_as_none",
        serialize_with = "none_as_empty"
    )]
    pub file_path: Option<String>,
    /// When first added
    #[serde(default = "epoch")]
    pub created_at: DateTime<Utc>,
    /// Last update time
    #[serde(default = "epoch")]
    pub updated_at: DateTime<Utc>,
}

fn epoch() -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

fn none_as_empty<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(value.as_deref().unwrap_or(""))
}

impl Song {
    /// Create a new song with a generated id and the given timestamps
    pub fn new(title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: SongId::generate(),
            title: title.into(),
            chord: String::new(),
            tempo: String::new(),
            first_lyrics: String::new(),
            file_name: None,
            file_path: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Validate song data
    pub fn validate(&self) -> Result<(), String> {
        if self.id.is_empty() {
            return Err("Song id cannot be empty".to_string());
        }

        if self.title.trim().is_empty() {
            return Err("Song title cannot be empty".to_string());
        }

        Ok(())
    }

    /// Whether `title` or `chord` differ from `other`'s
    ///
    /// These are the fields embedded in the sheet filename; changing either
    /// obligates a rename.
    pub fn identity_differs_from(&self, other: &Song) -> bool {
        self.title != other.title || self.chord != other.chord
    }

    /// Normalize a string for matching (lowercase, trimmed)
    pub fn normalize(s: &str) -> String {
        s.trim().to_lowercase()
    }
}

// =============================================================================
// Worship Lists
// =============================================================================

/// Date-keyed ordered worship set-lists
///
/// Each entry is a denormalized `Song` snapshot, not a reference; the same
/// song may legitimately appear more than once in one date's list. Snapshots
/// are only ever mutated by the reconciler's fan-out.
///
/// The map is explicitly ordered by date. The legacy `lastUpdated` key some
/// documents embed among the date keys is not represented here; see
/// [`WorshipListsDocument`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorshipLists {
    lists: BTreeMap<NaiveDate, Vec<Song>>,
}

impl WorshipLists {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of dates with a list
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    /// Total number of song entries across all dates
    pub fn total_songs(&self) -> usize {
        self.lists.values().map(Vec::len).sum()
    }

    pub fn get(&self, date: &NaiveDate) -> Option<&[Song]> {
        self.lists.get(date).map(Vec::as_slice)
    }

    /// Replace the list for a date
    pub fn insert(&mut self, date: NaiveDate, songs: Vec<Song>) {
        self.lists.insert(date, songs);
    }

    /// Append a song snapshot to a date's list, creating the list if absent
    pub fn push_entry(&mut self, date: NaiveDate, song: Song) {
        self.lists.entry(date).or_default().push(song);
    }

    /// Remove the entry at `index` from a date's list
    ///
    /// Returns the removed snapshot; an emptied list is dropped from the map.
    pub fn remove_entry(&mut self, date: &NaiveDate, index: usize) -> Option<Song> {
        let songs = self.lists.get_mut(date)?;
        if index >= songs.len() {
            return None;
        }
        let removed = songs.remove(index);
        if songs.is_empty() {
            self.lists.remove(date);
        }
        Some(removed)
    }

    /// Remove an entire date's list
    pub fn remove(&mut self, date: &NaiveDate) -> Option<Vec<Song>> {
        self.lists.remove(date)
    }

    /// Remove every snapshot of the given song across all dates
    ///
    /// Returns the number of entries removed; emptied lists are dropped.
    pub fn remove_song(&mut self, id: &SongId) -> usize {
        let mut removed = 0;
        self.lists.retain(|_, songs| {
            let before = songs.len();
            songs.retain(|s| &s.id != id);
            removed += before - songs.len();
            !songs.is_empty()
        });
        removed
    }

    /// Iterate dates in chronological order
    pub fn dates(&self) -> impl Iterator<Item = &NaiveDate> {
        self.lists.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NaiveDate, &Vec<Song>)> {
        self.lists.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&NaiveDate, &mut Vec<Song>)> {
        self.lists.iter_mut()
    }
}

impl Serialize for WorshipLists {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.lists.len()))?;
        for (date, songs) in &self.lists {
            map.serialize_entry(&date.format(DATE_KEY_FORMAT).to_string(), songs)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for WorshipLists {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ListsVisitor;

        impl<'de> Visitor<'de> for ListsVisitor {
            type Value = WorshipLists;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of YYYY-MM-DD keys to song lists")
            }

            fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut lists = BTreeMap::new();
                while let Some(key) = access.next_key::<String>()? {
                    if key == LAST_UPDATED_KEY {
                        let _ = access.next_value::<IgnoredAny>()?;
                        continue;
                    }
                    match NaiveDate::parse_from_str(&key, DATE_KEY_FORMAT) {
                        Ok(date) => {
                            lists.insert(date, access.next_value::<Vec<Song>>()?);
                        }
                        Err(_) => {
                            tracing::warn!(key = %key, "Skipping non-date worship list key");
                            let _ = access.next_value::<IgnoredAny>()?;
                        }
                    }
                }
                Ok(WorshipLists { lists })
            }
        }

        deserializer.deserialize_map(ListsVisitor)
    }
}

// =============================================================================
// Wire Documents
// =============================================================================

/// On-disk layout of `songs.json`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongsDocument {
    #[serde(default)]
    pub songs: Vec<Song>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl SongsDocument {
    pub fn new(songs: Vec<Song>, last_updated: DateTime<Utc>) -> Self {
        Self {
            songs,
            last_updated: Some(last_updated),
        }
    }

    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// On-disk layout of `worship_lists.json`
///
/// Legacy documents carried the `lastUpdated` timestamp inside the
/// `worshipLists` map itself; on read it is accepted there (and used when the
/// top-level field is absent), on write it is only ever emitted at the top
/// level.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorshipListsDocument {
    pub worship_lists: WorshipLists,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

impl WorshipListsDocument {
    pub fn new(worship_lists: WorshipLists, last_updated: DateTime<Utc>) -> Self {
        Self {
            worship_lists,
            last_updated: Some(last_updated),
        }
    }

    pub fn from_json(json: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl<'de> Deserialize<'de> for WorshipListsDocument {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Raw {
            #[serde(default)]
            worship_lists: serde_json::Value,
            #[serde(default)]
            last_updated: Option<DateTime<Utc>>,
        }

        let raw = Raw::deserialize(deserializer)?;

        // Hoist the smuggled timestamp before handing the map to WorshipLists,
        // which skips the reserved key entirely.
        let embedded = raw
            .worship_lists
            .get(LAST_UPDATED_KEY)
            .cloned()
            .and_then(|v| serde_json::from_value::<DateTime<Utc>>(v).ok());

        let worship_lists = if raw.worship_lists.is_null() {
            WorshipLists::new()
        } else {
            serde_json::from_value(raw.worship_lists).map_err(serde::de::Error::custom)?
        };

        Ok(Self {
            worship_lists,
            last_updated: raw.last_updated.or(embedded),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_song(id: &str, title: &str) -> Song {
        let now = Utc.with_ymd_and_hms(2024, 1, 7, 10, 0, 0).unwrap();
        Song {
            id: SongId::new(id),
            title: title.to_string(),
            chord: "C".to_string(),
            tempo: "Medium".to_string(),
            first_lyrics: String::new(),
            file_name: None,
            file_path: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_song_validation() {
        let song = sample_song("abc123", "Amazing Grace");
        assert!(song.validate().is_ok());

        let mut nameless = song.clone();
        nameless.title = "  ".to_string();
        assert!(nameless.validate().is_err());

        let mut idless = song;
        idless.id = SongId::new("");
        assert!(idless.validate().is_err());
    }

    #[test]
    fn test_song_wire_names_are_camel_case() {
        let mut song = sample_song("abc123", "Amazing Grace");
        song.first_lyrics = "Amazing grace, how sweet the sound".to_string();
        song.file_name = Some("Amazing Grace (C) (abc123).jpg".to_string());

        let json = serde_json::to_value(&song).unwrap();
        assert_eq!(json["firstLyrics"], "Amazing grace, how sweet the sound");
        assert_eq!(json["fileName"], "Amazing Grace (C) (abc123).jpg");
        assert!(json.get("first_lyrics").is_none());
    }

    #[test]
    fn test_empty_file_name_reads_as_none() {
        let json = r#"{
            "id": "abc123",
            "title": "Amazing Grace",
            "chord": "C",
            "fileName": "",
            "createdAt": "2024-01-07T10:00:00Z",
            "updatedAt": "2024-01-07T10:00:00Z"
        }"#;

        let song: Song = serde_json::from_str(json).unwrap();
        assert_eq!(song.file_name, None);

        // And None writes back out as the empty string
        let value = serde_json::to_value(&song).unwrap();
        assert_eq!(value["fileName"], "");
    }

    #[test]
    fn test_legacy_key_field_maps_to_chord() {
        let json = r#"{
            "id": "abc123",
            "title": "Amazing Grace",
            "key": "G",
            "createdAt": "2024-01-07T10:00:00Z",
            "updatedAt": "2024-01-07T10:00:00Z"
        }"#;

        let song: Song = serde_json::from_str(json).unwrap();
        assert_eq!(song.chord, "G");
    }

    #[test]
    fn test_worship_lists_skip_last_updated_key() {
        let json = r#"{
            "2024-01-07": [],
            "lastUpdated": "2024-01-08T09:00:00Z",
            "2024-01-14": []
        }"#;

        let lists: WorshipLists = serde_json::from_str(json).unwrap();
        let dates: Vec<String> = lists
            .dates()
            .map(|d| d.format(DATE_KEY_FORMAT).to_string())
            .collect();
        assert_eq!(dates, vec!["2024-01-07", "2024-01-14"]);
    }

    #[test]
    fn test_worship_lists_document_hoists_embedded_timestamp() {
        let json = r#"{
            "worshipLists": {
                "2024-01-07": [],
                "lastUpdated": "2024-01-08T09:00:00Z"
            }
        }"#;

        let doc = WorshipListsDocument::from_json(json).unwrap();
        assert_eq!(doc.worship_lists.len(), 1);
        let hoisted = doc.last_updated.unwrap();
        assert_eq!(hoisted.to_rfc3339(), "2024-01-08T09:00:00+00:00");

        // The reserved key is not re-emitted among the date keys
        let out = serde_json::to_value(&doc).unwrap();
        assert!(out["worshipLists"].get(LAST_UPDATED_KEY).is_none());
        let emitted: DateTime<Utc> = serde_json::from_value(out["lastUpdated"].clone()).unwrap();
        assert_eq!(emitted, hoisted);
    }

    #[test]
    fn test_worship_lists_preserve_order_and_duplicates() {
        let mut lists = WorshipLists::new();
        let date = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        let song = sample_song("1", "Repeated Song");
        lists.push_entry(date, song.clone());
        lists.push_entry(date, sample_song("2", "Other Song"));
        lists.push_entry(date, song.clone());

        let entries = lists.get(&date).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].id, entries[2].id);

        let round_tripped: WorshipLists =
            serde_json::from_str(&serde_json::to_string(&lists).unwrap()).unwrap();
        assert_eq!(round_tripped, lists);
    }

    #[test]
    fn test_remove_song_drops_emptied_lists() {
        let mut lists = WorshipLists::new();
        let d1 = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2024, 1, 14).unwrap();
        let song = sample_song("1", "Target");
        lists.push_entry(d1, song.clone());
        lists.push_entry(d2, song.clone());
        lists.push_entry(d2, sample_song("2", "Keeper"));

        let removed = lists.remove_song(&SongId::new("1"));
        assert_eq!(removed, 2);
        assert!(lists.get(&d1).is_none());
        assert_eq!(lists.get(&d2).unwrap().len(), 1);
    }
}
