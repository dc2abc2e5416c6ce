use std::path::PathBuf;

use crate::synthetic::{DEFAULT_SAMPLES, DEFAULT_SEED};

const DEFAULT_MODEL_DIR: &str = "models";
const DEFAULT_DATASET_PATH: &str = "transfer_data.sqlite";
const DEFAULT_SEASON: u32 = 2024;

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub model_dir: PathBuf,
    pub dataset_path: PathBuf,
    pub samples: usize,
    pub seed: u64,
    pub api_key: Option<String>,
    pub season: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from(DEFAULT_MODEL_DIR),
            dataset_path: PathBuf::from(DEFAULT_DATASET_PATH),
            samples: DEFAULT_SAMPLES,
            seed: DEFAULT_SEED,
            api_key: None,
            season: DEFAULT_SEASON,
        }
    }
}

impl Settings {
    /// Loads `.env.local` then `.env` (existing variables win) and reads the environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::from_filename(".env.local");
        let _ = dotenvy::from_filename(".env");
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let d = Settings::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        Self {
            model_dir: non_empty("TRANSFER_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or(d.model_dir),
            dataset_path: non_empty("TRANSFER_DATASET_PATH")
                .map(PathBuf::from)
                .unwrap_or(d.dataset_path),
            samples: non_empty("TRANSFER_SAMPLES")
                .and_then(|v| v.trim().parse::<usize>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(d.samples),
            seed: non_empty("TRANSFER_SEED")
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(d.seed),
            api_key: non_empty("FOOTBALL_API_KEY").map(|v| v.trim().to_string()),
            season: non_empty("FOOTBALL_API_SEASON")
                .and_then(|v| v.trim().parse::<u32>().ok())
                .unwrap_or(d.season),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn unset_and_garbage_values_use_defaults() {
        let env = HashMap::from([
            ("TRANSFER_SAMPLES", "lots"),
            ("TRANSFER_SEED", "7"),
            ("FOOTBALL_API_KEY", "  "),
        ]);
        let s = Settings::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(s.samples, DEFAULT_SAMPLES);
        assert_eq!(s.seed, 7);
        assert_eq!(s.api_key, None);
        assert_eq!(s.model_dir, PathBuf::from("models"));
    }
}
