use anyhow::{Context, Result, anyhow};
use tracing::warn;

use transfer_predictor::clubs::ClubRegistry;
use transfer_predictor::config::Settings;
use transfer_predictor::logging;
use transfer_predictor::squad_fetch;

fn main() -> Result<()> {
    logging::init();
    let settings = Settings::from_env();
    let args = std::env::args().skip(1).collect::<Vec<_>>();

    if let Some(raw) = parse_value_arg(&args, "--player") {
        let player_id: u64 = raw
            .parse()
            .with_context(|| format!("--player expects a numeric id, got {raw}"))?;
        let key = settings
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("FOOTBALL_API_KEY is required for --player"))?;
        return print_player(key, player_id, settings.season);
    }

    if settings.api_key.is_none() {
        warn!("FOOTBALL_API_KEY not set, showing static position needs");
    }

    let registry = ClubRegistry::big_six();
    let needs = squad_fetch::live_position_needs(settings.api_key.as_deref(), &registry);

    println!("Position needs (season {})", settings.season);
    for name in registry.names() {
        let Some(table) = needs.get(&name) else {
            continue;
        };
        let cells = table
            .iter()
            .map(|(pos, need)| format!("{pos}={need}"))
            .collect::<Vec<_>>()
            .join(" ");
        println!("  {name:<18} {cells}");
    }
    Ok(())
}

fn print_player(api_key: &str, player_id: u64, season: u32) -> Result<()> {
    let Some(stats) = squad_fetch::fetch_player_stats(api_key, player_id, season) else {
        println!("No Premier League stats for player {player_id} in season {season}");
        return Ok(());
    };
    let position = stats
        .position
        .map(|p| p.to_string())
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{} ({}) season {season}: team={} position={position} apps={} minutes={} goals={} assists={}",
        stats.name,
        stats.age.map(|a| a.to_string()).unwrap_or_else(|| "?".to_string()),
        stats.team.as_deref().unwrap_or("-"),
        stats.appearances,
        stats.minutes,
        stats.goals,
        stats.assists,
    );
    Ok(())
}

fn parse_value_arg(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    args.iter().enumerate().find_map(|(idx, arg)| {
        if let Some(v) = arg.strip_prefix(&prefix) {
            return Some(v.trim().to_string()).filter(|v| !v.is_empty());
        }
        if arg == flag {
            return args
                .get(idx + 1)
                .map(|next| next.trim().to_string())
                .filter(|v| !v.is_empty());
        }
        None
    })
}
