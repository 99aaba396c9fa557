//! Title and episode extraction from filenames and window/tab titles.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

use super::get_regex;
use crate::constants::VIDEO_EXTENSIONS;

/// Result of [`parse`]. `None` fields mean "not enough information".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedTitle {
    pub title: Option<String>,
    pub episode: Option<u32>,
    /// Season from a combined `S01E05` marker, if that form matched.
    pub season: Option<u32>,
}

struct EpisodePattern {
    regex: Regex,
    episode_group: usize,
    season_group: Option<usize>,
    /// Trailing delimiter group that must stay in the remainder.
    end_group: Option<usize>,
}

/// Ordered from most to least specific; the first numeric match wins.
fn episode_patterns() -> &'static [EpisodePattern] {
    static PATTERNS: OnceLock<Vec<EpisodePattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        let pattern = |re: &str, episode_group, season_group, end_group| EpisodePattern {
            regex: Regex::new(re).expect("Invalid Regex"),
            episode_group,
            season_group,
            end_group,
        };

        vec![
            pattern(r"(?i)\bS(\d+)\s?E(\d+)(?:v\d+)?", 2, Some(1), None),
            pattern(r"(?i)\bEp(?:isode)?\.?\s*(\d+)(?:v\d+)?", 1, None, None),
            pattern(r"\b[Ee](\d+)(?:v\d+)?(\s|$|\[|\()", 1, None, Some(2)),
            pattern(r"\s-\s*(\d+)(?:v\d+)?(\s|$|\[|\()", 1, None, Some(2)),
            pattern(r"\[(\d+)(?:v\d+)?\](\s|$)", 1, None, Some(2)),
            pattern(r"\((\d+)\)(\s|$)", 1, None, Some(2)),
            pattern(r"\s(\d+)(?:v\d+)?(\s|$|\[|\()", 1, None, Some(2)),
        ]
    })
}

/// Extracts a show title and episode number from an unstructured string.
///
/// ```rust
/// use shiori::parser::parse;
///
/// let parsed = parse("[SubsPlease] Sousou no Frieren - 05 (1080p) [A1B2C3D4].mkv");
/// assert_eq!(parsed.title.as_deref(), Some("Sousou no Frieren"));
/// assert_eq!(parsed.episode, Some(5));
/// ```
#[must_use]
pub fn parse(raw: &str) -> ParsedTitle {
    let stem = separators_to_spaces(strip_extension(raw.trim()));

    let mut episode = None;
    let mut season = None;
    let mut remainder = stem.clone();

    for pattern in episode_patterns() {
        let Some(caps) = pattern.regex.captures(&stem) else {
            continue;
        };
        let Some(number) = caps
            .get(pattern.episode_group)
            .and_then(|m| m.as_str().parse::<u32>().ok())
        else {
            continue;
        };

        let Some(whole) = caps.get(0) else {
            continue;
        };
        let end = pattern
            .end_group
            .and_then(|g| caps.get(g))
            .map_or(whole.end(), |m| m.start());

        episode = Some(number);
        season = pattern
            .season_group
            .and_then(|g| caps.get(g))
            .and_then(|m| m.as_str().parse::<u32>().ok());
        remainder = format!("{} {}", &stem[..whole.start()], &stem[end..]);
        break;
    }

    let mut title = clean_decorations(&remainder);

    if episode.is_some() && title.chars().count() < 2 {
        title = collapse_whitespace(&strip_groups(&stem));
    }

    ParsedTitle {
        title: (!title.is_empty()).then_some(title),
        episode,
        season,
    }
}

fn strip_extension(s: &str) -> &str {
    if let Some((stem, ext)) = s.rsplit_once('.')
        && VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    {
        return stem;
    }
    s
}

/// `Show.Name.05` and `Show_Name_05` become space separated when the string
/// has no spaces of its own.
fn separators_to_spaces(s: &str) -> String {
    if s.contains(' ') {
        s.to_string()
    } else {
        s.replace(['_', '.'], " ")
    }
}

fn clean_decorations(s: &str) -> String {
    static LEADING_GROUP: OnceLock<Regex> = OnceLock::new();
    static TRAILING_BRACKET: OnceLock<Regex> = OnceLock::new();
    static TRAILING_PAREN: OnceLock<Regex> = OnceLock::new();
    static TRAILING_SEPARATOR: OnceLock<Regex> = OnceLock::new();

    let leading = get_regex(&LEADING_GROUP, r"^\s*\[[^\]]*\]\s*");
    let bracket = get_regex(&TRAILING_BRACKET, r"\s*\[[^\]]*\]\s*$");
    let paren = get_regex(&TRAILING_PAREN, r"\s*\([^)]*\)\s*$");
    let separator = get_regex(&TRAILING_SEPARATOR, r"[\s\-_~:|.]+$");

    let mut result = leading.replace(s, "").into_owned();
    loop {
        let next = separator.replace(&result, "");
        let next = bracket.replace(&next, "");
        let next = paren.replace(&next, "").into_owned();
        if next == result {
            break;
        }
        result = next;
    }

    collapse_whitespace(&result)
}

fn strip_groups(s: &str) -> String {
    static GROUPS: OnceLock<Regex> = OnceLock::new();
    get_regex(&GROUPS, r"\[[^\]]*\]|\([^)]*\)")
        .replace_all(s, "")
        .into_owned()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Removes the player name media players append to their window titles.
#[must_use]
pub fn strip_player_suffix(window_title: &str) -> &str {
    static SUFFIX: OnceLock<Regex> = OnceLock::new();
    let re = get_regex(
        &SUFFIX,
        r"(?i)\s+-\s+(?:VLC media player|mpv|MPC-HC|MPC-BE|PotPlayer|Kodi|Windows Media Player|KMPlayer|GOM Player|Plex|ffplay)\s*$",
    );
    re.find(window_title)
        .map_or(window_title, |m| &window_title[..m.start()])
        .trim()
}

/// Lower-cased, punctuation-free form used for title comparison.
#[must_use]
pub fn normalize_for_matching(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(raw: &str) -> (Option<String>, Option<u32>) {
        let p = parse(raw);
        (p.title, p.episode)
    }

    #[test]
    fn test_group_title_dash_episode() {
        assert_eq!(
            parsed("[SubsPlease] Sousou no Frieren - 05 (1080p) [A1B2C3D4].mkv"),
            (Some("Sousou no Frieren".to_string()), Some(5))
        );
        assert_eq!(
            parsed("[Erai-raws] Kusuriya no Hitorigoto - 12 [1080p][Multiple Subtitle]"),
            (Some("Kusuriya no Hitorigoto".to_string()), Some(12))
        );
    }

    #[test]
    fn test_zero_padded_fixtures() {
        for n in [1_u32, 7, 10, 99, 123] {
            let raw = format!("[Group] Title - {n:02}");
            let p = parse(&raw);
            assert_eq!(p.episode, Some(n), "{raw}");
            assert!(p.title.unwrap().to_lowercase().contains("title"));
        }
    }

    #[test]
    fn test_season_episode_form() {
        let p = parse("Spy x Family S02E07 1080p WEB.mkv");
        assert_eq!(p.episode, Some(7));
        assert_eq!(p.season, Some(2));
        assert_eq!(p.title.as_deref(), Some("Spy x Family 1080p WEB"));
    }

    #[test]
    fn test_season_episode_wins_over_dash() {
        let p = parse("Oshi no Ko - S01E03 - Idol");
        assert_eq!(p.episode, Some(3));
        assert_eq!(p.season, Some(1));
    }

    #[test]
    fn test_episode_word_forms() {
        assert_eq!(parsed("Bocchi the Rock! Episode 4").1, Some(4));
        assert_eq!(parsed("Bocchi the Rock! Ep 4").1, Some(4));
        assert_eq!(parsed("Bocchi the Rock! ep.11").1, Some(11));
        assert_eq!(parsed("Bocchi the Rock! E09").1, Some(9));
        assert_eq!(
            parsed("Bocchi the Rock! Episode 4").0.as_deref(),
            Some("Bocchi the Rock!")
        );
    }

    #[test]
    fn test_bracketed_and_parenthesized_numbers() {
        assert_eq!(
            parsed("[Group] Dungeon Meshi [08] [1080p]"),
            (Some("Dungeon Meshi".to_string()), Some(8))
        );
        assert_eq!(
            parsed("Dungeon Meshi (08)"),
            (Some("Dungeon Meshi".to_string()), Some(8))
        );
    }

    #[test]
    fn test_bare_number() {
        assert_eq!(
            parsed("Dandadan 03 1080p"),
            (Some("Dandadan 1080p".to_string()), Some(3))
        );
    }

    #[test]
    fn test_version_suffix() {
        assert_eq!(
            parsed("[Group] Mushoku Tensei - 11v2 [720p]"),
            (Some("Mushoku Tensei".to_string()), Some(11))
        );
    }

    #[test]
    fn test_dot_separated() {
        assert_eq!(
            parsed("Made.in.Abyss.S01E02.mkv"),
            (Some("Made in Abyss".to_string()), Some(2))
        );
    }

    #[test]
    fn test_no_digits_means_no_episode() {
        for raw in ["Cowboy Bebop", "[Group] Mononoke (BD)", "Re:Zero kara Hajimeru", ""] {
            assert_eq!(parse(raw).episode, None, "{raw}");
        }
        assert_eq!(parse("").title, None);
    }

    #[test]
    fn test_title_fallback_when_stripped_too_far() {
        let p = parse("[Group] - 05 [1080p]");
        assert_eq!(p.episode, Some(5));
        assert_eq!(p.title.as_deref(), Some("- 05"));
    }

    #[test]
    fn test_numeric_title_survives() {
        assert_eq!(parsed("86 - 05").0.as_deref(), Some("86"));
        assert_eq!(parsed("Mob Psycho 100 - 03"), (Some("Mob Psycho 100".to_string()), Some(3)));
    }

    #[test]
    fn test_extension_only_stripped_for_video() {
        assert_eq!(strip_extension("Show - 01.mkv"), "Show - 01");
        assert_eq!(strip_extension("Dr. Stone"), "Dr. Stone");
    }

    #[test]
    fn test_strip_player_suffix() {
        assert_eq!(
            strip_player_suffix("Frieren - 05.mkv - VLC media player"),
            "Frieren - 05.mkv"
        );
        assert_eq!(strip_player_suffix("Frieren - 05.mkv - mpv"), "Frieren - 05.mkv");
        assert_eq!(strip_player_suffix("Frieren - 05.mkv"), "Frieren - 05.mkv");
    }

    #[test]
    fn test_normalize_for_matching() {
        assert_eq!(
            normalize_for_matching("Frieren: Beyond Journey's End"),
            "frieren beyond journey s end"
        );
        assert_eq!(normalize_for_matching("  SPY×FAMILY  "), "spy family");
    }
}
