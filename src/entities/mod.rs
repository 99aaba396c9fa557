pub mod prelude;

pub mod library_entries;
pub mod title_mappings;
pub mod watch_events;
