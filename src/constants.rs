pub const VIDEO_EXTENSIONS: &[&str] = &["mkv", "mp4", "avi", "webm", "mov", "wmv", "flv", "m4v"];

pub mod resolution {

    /// Assumed length of a season whose episode count is unknown.
    pub const FALLBACK_EPISODE_COUNT: u32 = 25;

    /// Absolute numbers above this are treated as franchise-global when a
    /// season hint of 2 or more is present.
    pub const ABSOLUTE_EPISODE_THRESHOLD: u32 = 24;

    pub const MAX_RELATION_STEPS: usize = 64;

    pub const SEARCH_RESULT_LIMIT: usize = 10;
}

pub mod anilist {

    pub const API_URL: &str = "https://graphql.anilist.co";

    pub const CACHE_TTL_SECONDS: u64 = 300;

    pub const MIN_REQUEST_INTERVAL_MS: u64 = 1000;

    pub const MAX_RETRIES: u32 = 3;

    pub const RETRY_BASE_DELAY_MS: u64 = 1000;
}

pub mod pipeline {

    pub const COMMAND_QUEUE_SIZE: usize = 64;
}

pub mod limits {

    pub const DEFAULT_HISTORY_LIMIT: u64 = 10;

    pub const MAX_HISTORY_LIMIT: u64 = 500;

    /// Episode numbers above this are treated as noise, not as progress.
    pub const MAX_EPISODE_NUMBER: u32 = 10_000;

    /// Rows per INSERT when writing watch events; keeps each statement
    /// under SQLite's bound-parameter limit.
    pub const WATCH_EVENT_BATCH_SIZE: usize = 500;
}
