use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use serde_json::Value;

use transfer_predictor::config::Settings;
use transfer_predictor::logging;
use transfer_predictor::predict::{ClubResolution, PredictionService};
use transfer_predictor::request::{
    MultiClubRequest, PredictionRequest, handle_club_analysis, handle_multi_club,
    handle_prediction,
};

fn main() -> Result<()> {
    logging::init();
    let settings = Settings::from_env();
    let args = std::env::args().skip(1).collect::<Vec<_>>();

    let mut service = PredictionService::load_or_train(&settings)?;
    if args.iter().any(|a| a == "--strict") {
        service = service.with_resolution(ClubResolution::Strict);
    }

    if let Some(club) = parse_value_arg(&args, "--club") {
        let analysis = handle_club_analysis(&service, &club)?;
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }

    let path = args
        .iter()
        .find(|a| !a.starts_with("--"))
        .map(PathBuf::from)
        .ok_or_else(|| {
            anyhow!("usage: transfer_predictor [--strict] <request.json> | --club <name>")
        })?;
    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("read request {}", path.display()))?;
    let value: Value = serde_json::from_str(&raw).context("request is not valid JSON")?;

    let out = if value.get("target_club").is_some() {
        let req: PredictionRequest =
            serde_json::from_value(value).context("invalid prediction request")?;
        serde_json::to_string_pretty(&handle_prediction(&service, &req)?)?
    } else {
        let req: MultiClubRequest =
            serde_json::from_value(value).context("invalid multi-club request")?;
        serde_json::to_string_pretty(&handle_multi_club(&service, &req)?)?
    };
    println!("{out}");
    Ok(())
}

fn parse_value_arg(args: &[String], flag: &str) -> Option<String> {
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(v) = arg.strip_prefix(&prefix) {
            let trimmed = v.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }
        if arg == flag {
            let Some(next) = args.get(idx + 1) else {
                continue;
            };
            if !next.trim().is_empty() {
                return Some(next.trim().to_string());
            }
        }
    }
    None
}
