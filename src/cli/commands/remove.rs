use crate::config::Config;
use crate::domain::AnimeId;
use crate::services::{LibraryError, LibraryService};

pub async fn cmd_remove_anime(config: &Config, id: AnimeId) -> anyhow::Result<()> {
    let library = super::open_library(config).await?;

    match library.remove_entry(id).await {
        Ok(()) => println!("✓ Removed anime {id} (watch history kept)"),
        Err(LibraryError::NotFound(_)) => {
            println!("Anime with ID {id} not found in library");
            println!("Use 'shiori list' to see IDs");
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
