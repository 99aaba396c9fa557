use crate::config::Config;
use crate::domain::{AnimeId, WatchStatus};
use crate::services::LibraryService;
use crate::services::reconciler::Reconciliation;

fn report(r: &Reconciliation) {
    println!(
        "✓ {}: {} -> {} ({})",
        r.entry.title,
        r.previous_progress,
        r.entry.display_progress(),
        r.entry.status
    );
    if let Some(clamp) = r.clamp {
        println!(
            "  Note: {} clamped to {} ({:?})",
            clamp.clamped_from, clamp.clamped_to, clamp.reason
        );
    }
}

pub async fn cmd_progress(config: &Config, id: AnimeId, episode: u32) -> anyhow::Result<()> {
    let library = super::open_library(config).await?;
    let result = library.override_progress(id, episode).await?;
    report(&result);
    Ok(())
}

pub async fn cmd_status(config: &Config, id: AnimeId, status: &str) -> anyhow::Result<()> {
    let status: WatchStatus = status.parse()?;
    let library = super::open_library(config).await?;
    let result = library.set_status(id, status).await?;
    report(&result);
    Ok(())
}
