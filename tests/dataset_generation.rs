use std::path::PathBuf;

use transfer_predictor::dataset;
use transfer_predictor::features::{FeatureColumn, FittedPipeline, UNSEEN_CATEGORY_CODE};
use transfer_predictor::records::Position;
use transfer_predictor::synthetic::{self, LABEL_THRESHOLD};

fn temp_path(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "transfer_predictor_{}_{}",
        name,
        std::process::id()
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir.join("transfer_data.sqlite")
}

#[test]
fn default_seed_gives_500_rows_with_mixed_labels() {
    let rows = synthetic::generate(500, 42);
    assert_eq!(rows.len(), 500);
    assert_eq!(dataset::column_names().len(), 14);

    let rate = synthetic::transfer_rate(&rows);
    assert!(rate > 0.0 && rate < 1.0, "rate {rate}");
}

#[test]
fn same_seed_same_rows() {
    assert_eq!(synthetic::generate(200, 9), synthetic::generate(200, 9));
    assert_ne!(synthetic::generate(200, 9), synthetic::generate(200, 10));
}

#[test]
fn labels_follow_probability() {
    for row in synthetic::generate(500, 42) {
        assert!((0.0..=1.0).contains(&row.transfer_probability));
        assert_eq!(
            row.transfer_happened,
            row.transfer_probability > LABEL_THRESHOLD
        );
    }
}

#[test]
fn pipeline_keeps_canonical_order() {
    let rows = synthetic::generate(100, 3);
    let pipeline = FittedPipeline::fit(&rows).unwrap();
    assert_eq!(pipeline.width(), 12);
    let expected: Vec<String> = FeatureColumn::ALL.iter().map(|c| c.name().to_string()).collect();
    assert_eq!(pipeline.feature_names(), expected);
    assert_eq!(pipeline.transform(&rows[0].features).unwrap().len(), 12);
}

#[test]
fn unseen_position_encodes_to_fallback() {
    let mut rows = synthetic::generate(200, 5);
    rows.retain(|r| r.features.player.position != Position::Goalkeeper);
    let pipeline = FittedPipeline::fit(&rows).unwrap();
    assert_eq!(pipeline.encoder().encode("Goalkeeper"), UNSEEN_CATEGORY_CODE);
}

#[test]
fn sqlite_dataset_round_trip() {
    let path = temp_path("dataset");
    let rows = synthetic::generate(120, 42);
    dataset::save_dataset(&path, &rows).unwrap();
    let loaded = dataset::load_dataset(&path).unwrap();
    assert_eq!(loaded, rows);
    std::fs::remove_file(&path).ok();
}

#[test]
fn missing_dataset_is_an_error() {
    let path = std::env::temp_dir().join("transfer_predictor_no_such_dataset.sqlite");
    assert!(dataset::load_dataset(&path).is_err());
}
