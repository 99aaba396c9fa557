use anyhow::Context;

use crate::clients::MediaProvider;
use crate::config::Config;
use crate::domain::{AnimeId, WatchStatus};
use crate::services::LibraryService;

pub async fn cmd_add_anime(config: &Config, id: AnimeId, status: &str) -> anyhow::Result<()> {
    let status: WatchStatus = status.parse()?;
    let client = super::anilist(config)?;
    let media = client
        .get_media_relations(id)
        .await
        .with_context(|| format!("Failed to fetch anime {id}"))?
        .media;

    let library = super::open_library(config).await?;
    let ensured = library.ensure_entry(&media, status).await?;

    if ensured.created {
        println!("✓ Added {} [{}] as {}", media.title, media.id, status);
    } else {
        println!(
            "{} is already in the library ({}, {})",
            ensured.entry.title,
            ensured.entry.status,
            ensured.entry.display_progress()
        );
    }

    Ok(())
}
