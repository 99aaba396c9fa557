pub mod library;
pub mod mappings;
pub mod watch_events;

use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};

/// Fixed-width UTC form, so stored timestamps also sort as text.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(value: &str) -> anyhow::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|ts| ts.with_timezone(&Utc))
        .with_context(|| format!("Invalid stored timestamp: {value}"))
}

pub(crate) fn to_db_count(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}

pub(crate) fn from_db_count(value: i32) -> u32 {
    u32::try_from(value).unwrap_or(0)
}
