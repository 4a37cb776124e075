//! Canonical sheet filename codec
//!
//! Bidirectional mapping between a song's identifying fields and its
//! filesystem-safe sheet filename, plus the recovery matcher for every
//! historical filename format this library has produced.
//!
//! ## Canonical format
//!
//! `"<title> (<chord>) (<id>).jpg"`: the title and chord are sanitized, the
//! id is embedded verbatim so the song can be recovered from the filename
//! alone, even without the database. Canonicality is judged against the
//! current rule only: names produced by earlier rules parse (see
//! [`parse_legacy_file_name`]) but are never considered canonical.
//!
//! ## Legacy formats
//!
//! Historical libraries contain several overlapping formats. The matcher
//! tries them in a fixed priority order and the first match wins; because
//! ambiguous stems can match more than one pattern, the ordering is part of
//! the contract and must not be rearranged.

use crate::error::{LibraryError, Result};
use crate::models::Song;
use once_cell::sync::Lazy;
use regex::Regex;

/// Sheet files are always stored as JPEG; PDFs and PNGs are converted before
/// they reach this library.
pub const SHEET_EXTENSION: &str = "jpg";

/// Characters that are unsafe in filenames on at least one supported platform
const ILLEGAL_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Maximum length of a sanitized name component, in characters
const MAX_COMPONENT_CHARS: usize = 200;

/// Chord as it appears in parenthesized forms: one uppercase letter A-G,
/// optional accidental, optional minor marker.
const CHORD_CLASS: &str = r"[A-G][b#]?m?";

static CANONICAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<title>.+?)\s+\((?P<chord>[A-G][b#]?m?)\)\s+\((?P<id>[^()]+)\)$").unwrap()
});

static PAGE_FRACTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<head>.*?)\s*(?P<num>\d+)\s*/\s*\d+\s*$").unwrap());

/// Result of parsing a sheet filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongFileInfo {
    /// Recovered title, or the whole stem when nothing else matched
    pub title: String,
    /// Recovered chord, if the name carried one
    pub chord: Option<String>,
    /// Recovered id, if the name carried one
    pub id: Option<String>,
    /// Whether the name matches the current canonical rule
    pub is_canonical: bool,
}

/// Replace the trailing page fraction of a multi-page title with its numerator
///
/// `"Song 2/2"` becomes `"Song 2"`; titles without a fraction are only
/// trimmed.
pub fn normalize_title(title: &str) -> String {
    let trimmed = title.trim();
    if let Some(caps) = PAGE_FRACTION_RE.captures(trimmed) {
        let head = caps.name("head").map(|m| m.as_str()).unwrap_or("");
        let num = &caps["num"];
        if head.is_empty() {
            num.to_string()
        } else {
            format!("{} {}", head, num)
        }
    } else {
        trimmed.to_string()
    }
}

/// Sanitize a name component for filesystem use
///
/// Each illegal character becomes `-`; internal whitespace is preserved (one
/// retired format collapsed spaces to underscores, the current rule does
/// not). The result is trimmed and truncated to 200 characters on a character
/// boundary.
pub fn sanitize_component(s: &str) -> String {
    let replaced: String = s
        .chars()
        .map(|c| if ILLEGAL_CHARS.contains(&c) { '-' } else { c })
        .collect();
    replaced.trim().chars().take(MAX_COMPONENT_CHARS).collect()
}

/// Derive the canonical sheet filename for a song
///
/// Deterministic: the same fields always produce the same name, byte for
/// byte. The chord is omitted (along with its parentheses) when empty.
///
/// # Errors
///
/// Returns [`LibraryError::InvalidInput`] when `id` or `title` is empty; the
/// caller must not attempt any I/O in that case.
pub fn canonical_file_name(song: &Song) -> Result<String> {
    if song.id.is_empty() {
        return Err(LibraryError::invalid_input(
            "id",
            "cannot derive a filename without an id",
        ));
    }

    let title = sanitize_component(&normalize_title(&song.title));
    if title.is_empty() {
        return Err(LibraryError::invalid_input(
            "title",
            "cannot derive a filename without a title",
        ));
    }

    let chord = sanitize_component(&song.chord);
    let name = if chord.is_empty() {
        format!("{} ({}).{}", title, song.id, SHEET_EXTENSION)
    } else {
        format!("{} ({}) ({}).{}", title, chord, song.id, SHEET_EXTENSION)
    };

    Ok(name)
}

/// Whether a filename already matches the current canonical rule
///
/// Every legacy format returns false, including ones earlier versions of this
/// codec produced themselves.
pub fn is_canonical_file_name(name: &str) -> bool {
    CANONICAL_RE.is_match(file_stem(name))
}

/// Parse a sheet filename into its components
///
/// Tries the canonical pattern; on failure degrades to treating the whole
/// stem as an unverified title. Never fails.
pub fn parse_file_name(name: &str) -> SongFileInfo {
    let stem = file_stem(name);

    if let Some(caps) = CANONICAL_RE.captures(stem) {
        return SongFileInfo {
            title: caps["title"].to_string(),
            chord: Some(caps["chord"].to_string()),
            id: Some(caps["id"].to_string()),
            is_canonical: true,
        };
    }

    SongFileInfo {
        title: stem.to_string(),
        chord: None,
        id: None,
        is_canonical: false,
    }
}

// =============================================================================
// Legacy recovery matcher
// =============================================================================

/// Historical filename formats, in match priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyPattern {
    /// `title_chord_(id)`: underscore-joined, parenthesized id
    UnderscoreParenId,
    /// `title_chord_id`: underscore-joined, bare id
    UnderscoreBareId,
    /// bare alphanumeric id, no title at all
    BareId,
    /// `title chord`: space-separated trailing chord
    SpaceChord,
    /// `title (chord)`: parenthesized chord, no id
    ParenChord,
    /// `title chord <page>`: trailing page number
    SpaceChordPage,
    /// `title (chord) <page>`: parenthesized chord and trailing page number
    ParenChordPage,
}

/// Result of matching a legacy filename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyFileInfo {
    pub title: Option<String>,
    pub chord: Option<String>,
    pub id: Option<String>,
    pub page: Option<u32>,
    pub pattern: LegacyPattern,
}

static UNDERSCORE_PAREN_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(?P<title>.+)_(?P<chord>{CHORD_CLASS})_\((?P<id>[A-Za-z0-9]+)\)$"
    ))
    .unwrap()
});

static UNDERSCORE_BARE_ID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(?P<title>.+)_(?P<chord>{CHORD_CLASS})_(?P<id>[A-Za-z0-9]+)$"
    ))
    .unwrap()
});

static BARE_ID_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9]{6,}$").unwrap());

static SPACE_CHORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<title>.+)\s+(?P<chord>[A-G][b#]?)$").unwrap());

static PAREN_CHORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^(?P<title>.+?)\s*\((?P<chord>{CHORD_CLASS})\)$")).unwrap()
});

static SPACE_CHORD_PAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?P<title>.+)\s+(?P<chord>[A-G][b#]?)\s+(?P<page>\d+)$").unwrap());

static PAREN_CHORD_PAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"^(?P<title>.+?)\s*\((?P<chord>{CHORD_CLASS})\)\s*(?P<page>\d+)$"
    ))
    .unwrap()
});

/// Match a filename against the historical formats
///
/// Patterns are tried in the [`LegacyPattern`] order; the first match wins.
/// A bare stem only counts as an id when it is at least six characters and
/// contains a digit, so one-word titles fall through to title matching.
///
/// Returns `None` when no legacy pattern applies; callers fall back to
/// treating the stem as a title (see [`parse_file_name`]).
pub fn parse_legacy_file_name(name: &str) -> Option<LegacyFileInfo> {
    let stem = file_stem(name);

    if let Some(caps) = UNDERSCORE_PAREN_ID_RE.captures(stem) {
        return Some(LegacyFileInfo {
            title: Some(caps["title"].replace('_', " ")),
            chord: Some(caps["chord"].to_string()),
            id: Some(caps["id"].to_string()),
            page: None,
            pattern: LegacyPattern::UnderscoreParenId,
        });
    }

    if let Some(caps) = UNDERSCORE_BARE_ID_RE.captures(stem) {
        return Some(LegacyFileInfo {
            title: Some(caps["title"].replace('_', " ")),
            chord: Some(caps["chord"].to_string()),
            id: Some(caps["id"].to_string()),
            page: None,
            pattern: LegacyPattern::UnderscoreBareId,
        });
    }

    if BARE_ID_RE.is_match(stem) && stem.chars().any(|c| c.is_ascii_digit()) {
        return Some(LegacyFileInfo {
            title: None,
            chord: None,
            id: Some(stem.to_string()),
            page: None,
            pattern: LegacyPattern::BareId,
        });
    }

    if let Some(caps) = SPACE_CHORD_RE.captures(stem) {
        return Some(LegacyFileInfo {
            title: Some(caps["title"].to_string()),
            chord: Some(caps["chord"].to_string()),
            id: None,
            page: None,
            pattern: LegacyPattern::SpaceChord,
        });
    }

    if let Some(caps) = PAREN_CHORD_RE.captures(stem) {
        return Some(LegacyFileInfo {
            title: Some(caps["title"].to_string()),
            chord: Some(caps["chord"].to_string()),
            id: None,
            page: None,
            pattern: LegacyPattern::ParenChord,
        });
    }

    if let Some(caps) = SPACE_CHORD_PAGE_RE.captures(stem) {
        return Some(LegacyFileInfo {
            title: Some(caps["title"].to_string()),
            chord: Some(caps["chord"].to_string()),
            id: None,
            page: caps["page"].parse().ok(),
            pattern: LegacyPattern::SpaceChordPage,
        });
    }

    if let Some(caps) = PAREN_CHORD_PAGE_RE.captures(stem) {
        return Some(LegacyFileInfo {
            title: Some(caps["title"].to_string()),
            chord: Some(caps["chord"].to_string()),
            id: None,
            page: caps["page"].parse().ok(),
            pattern: LegacyPattern::ParenChordPage,
        });
    }

    None
}

fn file_stem(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem,
        _ => name,
    }
}
