use anyhow::Result;
use tracing::warn;

use transfer_predictor::artifact::{self, ModelArtifact};
use transfer_predictor::clubs::ClubRegistry;
use transfer_predictor::config::Settings;
use transfer_predictor::predict::PredictionService;
use transfer_predictor::records::{PlayerRecord, Position};
use transfer_predictor::training::{self, TrainingParams};
use transfer_predictor::{dataset, logging, synthetic};

fn main() -> Result<()> {
    logging::init();
    let settings = Settings::from_env();

    let rows = match dataset::load_dataset(&settings.dataset_path) {
        Ok(rows) if !rows.is_empty() => rows,
        Ok(_) | Err(_) => {
            warn!(
                path = %settings.dataset_path.display(),
                "dataset missing or empty, generating a new one"
            );
            let rows = synthetic::generate(settings.samples, settings.seed);
            dataset::save_dataset(&settings.dataset_path, &rows)?;
            rows
        }
    };

    let params = TrainingParams {
        split_seed: settings.seed,
        ..TrainingParams::default()
    };
    let outcome = training::train(&rows, &params)?;
    let report = &outcome.report;

    println!("Training complete");
    println!("Samples: train={} test={}", report.train_samples, report.test_samples);
    println!("Accuracy: {:.3}", report.accuracy);
    println!("Confusion matrix (rows actual, cols predicted):");
    println!("  no transfer  {:>4} {:>4}", report.confusion[0][0], report.confusion[0][1]);
    println!("  transfer     {:>4} {:>4}", report.confusion[1][0], report.confusion[1][1]);
    for (label, m) in [("no transfer", &report.negative), ("transfer", &report.positive)] {
        println!(
            "  {label:<12} precision={:.2} recall={:.2} f1={:.2} support={}",
            m.precision, m.recall, m.f1, m.support
        );
    }
    println!("Top features:");
    for (name, importance) in report.top_features(5) {
        println!("  {name:<30} {importance:.4}");
    }

    let artifact = ModelArtifact::from_training(outcome, ClubRegistry::big_six());
    artifact::save(&artifact, &settings.model_dir)?;
    println!("Artifact: {}", settings.model_dir.display());

    let service = PredictionService::new(artifact);
    let target = PlayerRecord {
        age: 26,
        market_value: 45_000_000,
        goals: 18,
        assists: 8,
        minutes_played: 1800,
        position: Position::Attacker,
        contract_years_left: 1,
        wants_move: true,
        position_need: 3,
    };
    let prediction = service.predict_one(&target, "Arsenal")?;
    println!(
        "Sample (26y attacker, 45M) -> {}: p={:.3} {} confidence={:?} market_fit={:?}",
        prediction.club,
        prediction.probability,
        if prediction.likely { "Likely" } else { "Unlikely" },
        prediction.confidence,
        prediction.market_fit
    );
    Ok(())
}
