use crate::config::Config;
use crate::domain::AnimeId;
use crate::services::LibraryService;

pub async fn cmd_map(config: &Config, raw_title: &str, id: AnimeId) -> anyhow::Result<()> {
    let library = super::open_library(config).await?;
    let entry = library.get_entry(id).await?;
    let mapping = library.add_mapping(raw_title, entry.id).await?;
    println!("✓ \"{}\" -> {} [{}]", mapping.raw_title_key, entry.title, entry.id);
    Ok(())
}

pub async fn cmd_unmap(config: &Config, raw_title: &str) -> anyhow::Result<()> {
    let library = super::open_library(config).await?;
    if library.remove_mapping(raw_title).await? {
        println!("✓ Removed mapping for \"{raw_title}\"");
    } else {
        println!("No mapping for \"{raw_title}\"");
    }
    Ok(())
}

pub async fn cmd_mappings(config: &Config) -> anyhow::Result<()> {
    let library = super::open_library(config).await?;
    let mappings = library.list_mappings().await?;

    if mappings.is_empty() {
        println!("No title mappings.");
        return Ok(());
    }

    let entries = library.list_entries().await?;
    let title_of = |id: AnimeId| -> String {
        entries
            .iter()
            .find(|e| e.id == id)
            .map_or_else(|| format!("Unknown (ID: {id})"), |e| e.title.clone())
    };

    println!("Title mappings ({}):", mappings.len());
    println!("{:-<70}", "");
    for mapping in mappings {
        println!("\"{}\" -> {} [{}]", mapping.raw_title_key, title_of(mapping.anime_id), mapping.anime_id);
    }

    Ok(())
}
