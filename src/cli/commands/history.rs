use crate::config::Config;
use crate::domain::AnimeId;
use crate::services::LibraryService;

pub async fn cmd_history(config: &Config, limit: u64) -> anyhow::Result<()> {
    let library = super::open_library(config).await?;
    let events = library.history(limit).await?;

    if events.is_empty() {
        println!("No watch history.");
        return Ok(());
    }

    println!("Recent Episodes (last {}):", events.len());
    println!("{:-<70}", "");

    let entries = library.list_entries().await?;
    let get_title = |id: AnimeId| -> String {
        entries
            .iter()
            .find(|a| a.id == id)
            .map_or_else(|| format!("Unknown (ID: {id})"), |a| a.title.clone())
    };

    for event in events {
        println!("• {} - Episode {}", get_title(event.anime_id), event.episode_number);
        println!(
            "  Source: {} | {}",
            event.source,
            event.timestamp.format("%Y-%m-%d %H:%M:%S")
        );
    }

    Ok(())
}
