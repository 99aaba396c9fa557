use crate::config::Config;
use crate::domain::AnimeId;
use crate::services::resolver::EpisodeResolver;
use crate::services::timeline::TimelineBuilder;

pub async fn cmd_timeline(config: &Config, id: AnimeId) -> anyhow::Result<()> {
    let client = super::anilist(config)?;
    let timeline = TimelineBuilder::new(&client, config.resolution.max_relation_steps)
        .build(id, None)
        .await;

    println!("Franchise timeline for ID {id}:");
    println!("{:-<60}", "");
    for (i, season) in timeline.seasons.iter().enumerate() {
        let marker = if season.anime_id == id { "*" } else { " " };
        let eps = season
            .episode_count
            .map_or_else(|| "? eps".to_string(), |e| format!("{e} eps"));
        println!("{marker}[{}] {} ({eps}) | ID: {}", i + 1, season.title, season.anime_id);
    }
    if timeline.partial {
        println!();
        println!("Warning: relation lookups failed, the timeline may be incomplete.");
    }

    Ok(())
}

pub async fn cmd_resolve(config: &Config, id: AnimeId, absolute: u32) -> anyhow::Result<()> {
    let client = super::anilist(config)?;
    let timeline = TimelineBuilder::new(&client, config.resolution.max_relation_steps)
        .build(id, None)
        .await;

    let Some(resolved) = EpisodeResolver::new(&config.resolution).resolve(&timeline, absolute)
    else {
        println!("No seasons found for ID {id}");
        return Ok(());
    };

    println!(
        "Episode {absolute} -> {} (season {}) episode {} | ID: {}",
        resolved.title,
        resolved.season_index + 1,
        resolved.episode,
        resolved.anime_id
    );
    if resolved.extrapolated {
        println!("Note: past the last known season, counted from its start.");
    }

    Ok(())
}
