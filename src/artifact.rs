use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::clubs::{ClubRegistry, ClubSnapshot};
use crate::error::{Result, TransferError};
use crate::features::{CategoryEncoder, FeatureColumn, FittedPipeline, StandardScaler};
use crate::forest::{self, RandomForest};
use crate::training::TrainingOutcome;

pub const ARTIFACT_VERSION: u32 = 1;

pub const MODEL_FILE: &str = "transfer_model.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const ENCODERS_FILE: &str = "label_encoders.json";
pub const CONFIG_FILE: &str = "model_config.json";

const POSITION_ENCODER_KEY: &str = "position";

/// Everything needed to serve predictions without retraining.
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    pub forest: RandomForest,
    pub pipeline: FittedPipeline,
    pub clubs: ClubRegistry,
}

impl ModelArtifact {
    pub fn from_training(outcome: TrainingOutcome, clubs: ClubRegistry) -> Self {
        Self {
            forest: outcome.forest,
            pipeline: outcome.pipeline,
            clubs,
        }
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.pipeline.feature_names()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ModelConfig {
    version: u32,
    generated_at: String,
    feature_names: Vec<String>,
    club_registry: BTreeMap<String, ClubSnapshot>,
}

pub fn artifact_exists(dir: &Path) -> bool {
    [MODEL_FILE, SCALER_FILE, ENCODERS_FILE, CONFIG_FILE]
        .iter()
        .all(|f| dir.join(f).is_file())
}

pub fn save(artifact: &ModelArtifact, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;

    let mut encoders = BTreeMap::new();
    encoders.insert(
        POSITION_ENCODER_KEY.to_string(),
        artifact.pipeline.encoder().clone(),
    );
    let config = ModelConfig {
        version: ARTIFACT_VERSION,
        generated_at: chrono::Utc::now().to_rfc3339(),
        feature_names: artifact.feature_names(),
        club_registry: artifact.clubs.snapshot(),
    };

    write_json(&dir.join(MODEL_FILE), &artifact.forest, false)?;
    write_json(&dir.join(SCALER_FILE), artifact.pipeline.scaler(), false)?;
    write_json(&dir.join(ENCODERS_FILE), &encoders, true)?;
    // The config record is the human-readable part of the bundle.
    write_json(&dir.join(CONFIG_FILE), &config, true)?;

    info!(dir = %dir.display(), features = config.feature_names.len(), "model artifact saved");
    Ok(())
}

pub fn load(dir: &Path) -> Result<ModelArtifact> {
    let model_path = dir.join(MODEL_FILE);
    let scaler_path = dir.join(SCALER_FILE);
    let encoders_path = dir.join(ENCODERS_FILE);
    let config_path = dir.join(CONFIG_FILE);
    for path in [&model_path, &scaler_path, &encoders_path, &config_path] {
        if !path.is_file() {
            return Err(TransferError::ArtifactNotFound(path.clone()));
        }
    }

    let config: ModelConfig = read_json(&config_path)?;
    if config.version != ARTIFACT_VERSION {
        return Err(TransferError::corrupt(
            &config_path,
            format!("unsupported artifact version {}", config.version),
        ));
    }
    let columns = config
        .feature_names
        .iter()
        .map(|name| name.parse::<FeatureColumn>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| TransferError::corrupt(&config_path, e))?;

    let forest = read_forest(&model_path, columns.len())?;
    let scaler: StandardScaler = read_json(&scaler_path)?;
    let mut encoders: BTreeMap<String, CategoryEncoder> = read_json(&encoders_path)?;
    let encoder = match encoders.remove(POSITION_ENCODER_KEY) {
        Some(enc) => enc,
        None if !columns.contains(&FeatureColumn::Position) => CategoryEncoder::default(),
        None => {
            return Err(TransferError::corrupt(
                &encoders_path,
                "missing position encoder",
            ));
        }
    };

    if forest.n_features != columns.len() {
        return Err(TransferError::corrupt(
            &model_path,
            format!(
                "classifier expects {} features, config lists {}",
                forest.n_features,
                columns.len()
            ),
        ));
    }
    let pipeline = FittedPipeline::from_parts(columns, encoder, scaler).ok_or_else(|| {
        TransferError::corrupt(&scaler_path, "scaler width does not match feature names")
    })?;

    info!(
        dir = %dir.display(),
        generated_at = %config.generated_at,
        trees = forest.params.n_trees,
        "model artifact loaded"
    );
    Ok(ModelArtifact {
        forest,
        pipeline,
        clubs: ClubRegistry::from_snapshot(config.club_registry),
    })
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T, pretty: bool) -> Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(std::io::Error::other)?;
    let tmp = tmp_path(path);
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = fs::read_to_string(path).map_err(|e| TransferError::corrupt(path, e))?;
    serde_json::from_str(&raw).map_err(|e| TransferError::corrupt(path, e))
}

/// Tree links are checked on the raw JSON so a damaged file cannot reach the classifier.
fn read_forest(path: &Path, n_features: usize) -> Result<RandomForest> {
    let value: serde_json::Value = read_json(path)?;
    forest::validate_model_json(&value, n_features)
        .map_err(|reason| TransferError::corrupt(path, reason))?;
    serde_json::from_value(value).map_err(|e| TransferError::corrupt(path, e))
}

fn tmp_path(path: &Path) -> PathBuf {
    path.with_extension("json.tmp")
}
