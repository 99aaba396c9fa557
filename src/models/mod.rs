pub mod detection;
pub mod library;
pub mod media;

pub use detection::{EpisodeDetection, usable_episode};
pub use library::{ClampReason, LibraryEntry, ProgressClamp, TitleMapping, WatchEvent};
pub use media::{FranchiseTimeline, MediaSummary, MediaWithRelations, SeasonEntry};
