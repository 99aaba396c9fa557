use crate::config::Config;
use crate::services::LibraryService;

pub async fn cmd_list_anime(config: &Config) -> anyhow::Result<()> {
    let library = super::open_library(config).await?;
    let entries = library.list_entries().await?;

    if entries.is_empty() {
        println!("Library is empty.");
        println!("Use 'shiori add <id>' or 'shiori import <user>' to add anime.");
        return Ok(());
    }

    println!("Library ({} entries):", entries.len());
    println!("{:-<70}", "");

    for entry in entries {
        println!(
            "[{}] {} ({})",
            entry.id,
            entry.title,
            entry.display_progress()
        );
        if let Some(english) = entry.title_english.as_deref().filter(|t| *t != entry.title) {
            println!("    EN: {english}");
        }
        println!(
            "    Status: {} | Updated: {}",
            entry.status,
            entry.updated_at.format("%Y-%m-%d %H:%M")
        );
    }

    Ok(())
}
