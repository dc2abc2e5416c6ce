use std::path::PathBuf;

use anyhow::Result;

use transfer_predictor::config::Settings;
use transfer_predictor::{dataset, logging, synthetic};

fn main() -> Result<()> {
    logging::init();
    let settings = Settings::from_env();
    let samples = parse_usize_arg("--samples").unwrap_or(settings.samples);
    let seed = parse_usize_arg("--seed")
        .map(|s| s as u64)
        .unwrap_or(settings.seed);
    let path = parse_path_arg("--out").unwrap_or(settings.dataset_path.clone());

    let rows = synthetic::generate(samples, seed);
    dataset::save_dataset(&path, &rows)?;

    println!("Dataset written");
    println!("Path: {}", path.display());
    println!("Shape: ({}, {})", rows.len(), dataset::column_names().len());
    println!("Transfer rate: {:.2}%", synthetic::transfer_rate(&rows) * 100.0);
    Ok(())
}

fn arg_value(flag: &str) -> Option<String> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let prefix = format!("{flag}=");
    for (idx, arg) in args.iter().enumerate() {
        if let Some(v) = arg.strip_prefix(&prefix) {
            return Some(v.trim().to_string()).filter(|v| !v.is_empty());
        }
        if arg == flag {
            return args.get(idx + 1).map(|v| v.trim().to_string());
        }
    }
    None
}

fn parse_usize_arg(flag: &str) -> Option<usize> {
    arg_value(flag).and_then(|v| v.parse().ok())
}

fn parse_path_arg(flag: &str) -> Option<PathBuf> {
    arg_value(flag).filter(|v| !v.is_empty()).map(PathBuf::from)
}
