pub use super::library_entries::Entity as LibraryEntries;
pub use super::title_mappings::Entity as TitleMappings;
pub use super::watch_events::Entity as WatchEvents;
