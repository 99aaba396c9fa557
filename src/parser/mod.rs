pub mod season;
pub mod title;

pub use season::{extract_season_number, season_number, season_of_titles, strip_season_markers};
pub use title::{ParsedTitle, normalize_for_matching, parse, strip_player_suffix};

use regex::Regex;
use std::sync::OnceLock;

fn get_regex(re: &'static OnceLock<Regex>, pattern: &str) -> &'static Regex {
    re.get_or_init(|| Regex::new(pattern).expect("Invalid regex pattern defined in code"))
}
