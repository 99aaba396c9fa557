use regex::Regex;
use std::sync::OnceLock;

/// Explicit season marker in a title, if any.
///
/// Recognizes `Season N`, `Nth Season`, `Part N`, a standalone `SN` and a
/// trailing Roman numeral from II to X.
#[must_use]
pub fn extract_season_number(title: &str) -> Option<u32> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r"(?i)\bseason\s*(\d+)\b").expect("Invalid Regex"),
            Regex::new(r"(?i)\b(\d+)(?:st|nd|rd|th)\s+season\b").expect("Invalid Regex"),
            Regex::new(r"(?i)\bpart\s+(\d+|[ivx]+)\b").expect("Invalid Regex"),
            Regex::new(r"(?i)\bs(\d+)\b").expect("Invalid Regex"),
            Regex::new(r"(?i)\s(ii|iii|iv|v|vi|vii|viii|ix|x)\s*$").expect("Invalid Regex"),
        ]
    });

    for pattern in patterns {
        if let Some(caps) = pattern.captures(title)
            && let Some(m) = caps.get(1)
        {
            let num_str = m.as_str();

            if let Ok(n) = num_str.parse::<u32>() {
                return Some(n);
            }

            if let Some(n) = roman_to_int(num_str) {
                return Some(n);
            }
        }
    }

    None
}

/// Season a title refers to; no marker means season 1.
#[must_use]
pub fn season_number(title: &str) -> u32 {
    extract_season_number(title).unwrap_or(1)
}

/// Season of an entry known by several titles: the first title carrying a
/// marker decides, otherwise season 1.
pub fn season_of_titles<'a>(titles: impl IntoIterator<Item = &'a str>) -> u32 {
    titles
        .into_iter()
        .find_map(extract_season_number)
        .unwrap_or(1)
}

/// Removes season markers so titles of different seasons compare equal.
#[must_use]
pub fn strip_season_markers(title: &str) -> String {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    let patterns = PATTERNS.get_or_init(|| {
        vec![
            Regex::new(r"(?i)\b\d+(?:st|nd|rd|th)\s+season\b").expect("Invalid Regex"),
            Regex::new(r"(?i)\bseason\s*\d+\b").expect("Invalid Regex"),
            Regex::new(r"(?i)\bpart\s+(?:\d+|[ivx]+)\b").expect("Invalid Regex"),
            Regex::new(r"(?i)\bs\d+\b").expect("Invalid Regex"),
            Regex::new(r"(?i)\s(?:ii|iii|iv|v|vi|vii|viii|ix|x)\s*$").expect("Invalid Regex"),
        ]
    });

    let mut result = title.to_string();
    for pattern in patterns {
        result = pattern.replace_all(&result, " ").into_owned();
    }

    result.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn roman_to_int(s: &str) -> Option<u32> {
    let s = s.to_uppercase();
    match s.as_str() {
        "I" => Some(1),
        "II" => Some(2),
        "III" => Some(3),
        "IV" => Some(4),
        "V" => Some(5),
        "VI" => Some(6),
        "VII" => Some(7),
        "VIII" => Some(8),
        "IX" => Some(9),
        "X" => Some(10),
        _ => None,
    }
}
