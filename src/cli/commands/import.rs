use anyhow::Context;

use crate::clients::ListSync;
use crate::config::Config;
use crate::services::LibraryService;

pub async fn cmd_import(config: &Config, user: Option<&str>) -> anyhow::Result<()> {
    let client = super::anilist(config)?;
    let user = match user {
        Some(user) => user.to_string(),
        None => client
            .viewer_name()
            .await
            .context("No user given and the access token did not resolve to a user")?,
    };

    println!("Fetching list of {user}...");
    let remote = client
        .fetch_list(&user)
        .await
        .with_context(|| format!("Failed to fetch the list of {user}"))?;

    if remote.is_empty() {
        println!("Remote list is empty, nothing to import.");
        return Ok(());
    }

    let total = remote.len();
    let library = super::open_library(config).await?;
    let summary = library.merge_remote(remote).await?;

    println!("✓ Imported {total} remote entries");
    println!(
        "  Added: {} | Updated: {} | Unchanged: {}",
        summary.added, summary.updated, summary.unchanged
    );

    Ok(())
}
