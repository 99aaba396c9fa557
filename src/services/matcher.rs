//! Finds the library entry a detected title refers to.
//!
//! Order: human-confirmed title mapping, exact title equality, then
//! season-filtered containment with the closest title length winning. A
//! season-1 title never matches an entry carrying a season 2+ marker and
//! vice versa.

use crate::models::{LibraryEntry, TitleMapping};
use crate::parser::{
    extract_season_number, normalize_for_matching, season_of_titles, strip_season_markers,
};

/// How a match was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Mapping,
    Exact,
    Fuzzy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryMatch<'a> {
    pub entry: &'a LibraryEntry,
    pub kind: MatchKind,
}

/// Matches `raw_title` against the library.
///
/// `season_hint` is an explicit season from the detection source; without
/// one the season is read from the title itself.
#[must_use]
pub fn find_match<'a>(
    raw_title: &str,
    season_hint: Option<u32>,
    library: &'a [LibraryEntry],
    mappings: &[TitleMapping],
) -> Option<LibraryMatch<'a>> {
    let key = TitleMapping::key_for(raw_title);
    if key.is_empty() {
        return None;
    }

    let mapping_key = TitleMapping::key_with_season(raw_title, season_hint);
    if let Some(mapping) = mappings.iter().find(|m| m.raw_title_key == mapping_key)
        && let Some(entry) = library.iter().find(|e| e.id == mapping.anime_id)
    {
        return Some(LibraryMatch {
            entry,
            kind: MatchKind::Mapping,
        });
    }

    let wanted_season = season_hint
        .or_else(|| extract_season_number(raw_title))
        .unwrap_or(1);

    // An exact title hit still has to agree with an explicit season hint.
    if let Some(entry) = library.iter().find(|e| {
        e.titles().any(|t| t.trim().to_lowercase() == key)
            && (season_hint.is_none() || entry_season(e) == wanted_season)
    }) {
        return Some(LibraryMatch {
            entry,
            kind: MatchKind::Exact,
        });
    }

    let needle = base_title(raw_title);
    if needle.is_empty() {
        return None;
    }

    library
        .iter()
        .filter(|e| entry_season(e) == wanted_season)
        .filter_map(|e| {
            e.titles()
                .filter_map(|t| {
                    let candidate = base_title(t);
                    let contains = !candidate.is_empty()
                        && (candidate.contains(&needle) || needle.contains(&candidate));
                    contains.then(|| candidate.len().abs_diff(needle.len()))
                })
                .min()
                .map(|distance| (distance, e))
        })
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, entry)| LibraryMatch {
            entry,
            kind: MatchKind::Fuzzy,
        })
}

/// Normalized title without its season marker; seasons are compared
/// separately.
fn base_title(title: &str) -> String {
    normalize_for_matching(&strip_season_markers(title))
}

/// Season an entry represents, read from its title fields.
#[must_use]
pub fn entry_season(entry: &LibraryEntry) -> u32 {
    season_of_titles(entry.titles())
}
