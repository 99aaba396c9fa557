use crate::parser::{extract_season_number, parse, strip_player_suffix};

pub fn cmd_parse(raw: &str) -> anyhow::Result<()> {
    let cleaned = strip_player_suffix(raw);
    let parsed = parse(cleaned);

    println!("Input:   {raw}");
    if cleaned != raw {
        println!("Cleaned: {cleaned}");
    }
    println!(
        "Title:   {}",
        parsed.title.as_deref().unwrap_or("(not found)")
    );
    println!(
        "Episode: {}",
        parsed
            .episode
            .map_or_else(|| "(not found)".to_string(), |e| e.to_string())
    );
    if let Some(season) = parsed
        .season
        .or_else(|| parsed.title.as_deref().and_then(extract_season_number))
    {
        println!("Season:  {season}");
    }

    Ok(())
}

pub fn cmd_season(title: &str) -> anyhow::Result<()> {
    match extract_season_number(title) {
        Some(season) => println!("Season {season}"),
        None => println!("Season 1 (no season marker)"),
    }
    Ok(())
}
