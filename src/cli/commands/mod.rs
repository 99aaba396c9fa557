mod add;
mod history;
mod import;
mod list;
mod mappings;
mod parse;
mod progress;
mod remove;
mod timeline;

pub use add::cmd_add_anime;
pub use history::cmd_history;
pub use import::cmd_import;
pub use list::cmd_list_anime;
pub use mappings::{cmd_map, cmd_mappings, cmd_unmap};
pub use parse::{cmd_parse, cmd_season};
pub use progress::{cmd_progress, cmd_status};
pub use remove::cmd_remove_anime;
pub use timeline::{cmd_resolve, cmd_timeline};

use tokio::sync::broadcast;

use crate::clients::anilist::AnilistClient;
use crate::config::Config;
use crate::db::Store;
use crate::services::SeaOrmLibraryService;

/// Library service for one-shot commands. Nothing listens on its event bus
/// and remote sync stays off: the process exits before a push would finish.
async fn open_library(config: &Config) -> anyhow::Result<SeaOrmLibraryService> {
    let store = Store::new(&config.general.database_path).await?;
    let (event_bus, _) = broadcast::channel(1);
    Ok(SeaOrmLibraryService::new(store, event_bus))
}

fn anilist(config: &Config) -> anyhow::Result<AnilistClient> {
    Ok(AnilistClient::new(&config.anilist)?)
}
