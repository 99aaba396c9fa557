pub mod matcher;
pub mod reconciler;
pub mod resolver;
pub mod timeline;

pub mod library_service;
pub use library_service::{EnsuredEntry, LibraryError, LibraryService, MergeSummary};

pub mod library_service_impl;
pub use library_service_impl::SeaOrmLibraryService;

pub mod sync;
pub use sync::RemoteSync;

pub mod orchestrator;
pub use orchestrator::{
    DetectionOutcome, Orchestrator, OrchestratorError, PendingDisambiguation, PipelineHandle,
};

pub mod watcher;
pub use watcher::{PlayerWatcher, TasklistSource, WindowSource};
