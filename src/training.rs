use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::info;

use crate::error::{Result, TransferError};
use crate::features::{FeatureColumn, FittedPipeline};
use crate::forest::{ForestParams, RandomForest};
use crate::records::TrainingRow;

#[derive(Debug, Clone)]
pub struct TrainingParams {
    pub test_fraction: f64,
    pub split_seed: u64,
    pub forest: ForestParams,
    pub columns: Vec<FeatureColumn>,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            split_seed: 42,
            forest: ForestParams::default(),
            columns: FeatureColumn::ALL.to_vec(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Rows are actual class, columns predicted class; index 0 = no transfer.
pub type ConfusionMatrix = [[usize; 2]; 2];

#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub train_samples: usize,
    pub test_samples: usize,
    pub accuracy: f64,
    pub confusion: ConfusionMatrix,
    pub negative: ClassMetrics,
    pub positive: ClassMetrics,
    /// Sorted by importance, descending.
    pub feature_importances: Vec<(String, f64)>,
}

impl TrainingReport {
    pub fn top_features(&self, n: usize) -> &[(String, f64)] {
        &self.feature_importances[..n.min(self.feature_importances.len())]
    }
}

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub pipeline: FittedPipeline,
    pub forest: RandomForest,
    pub report: TrainingReport,
}

impl TrainingOutcome {
    pub fn accuracy(&self) -> f64 {
        self.report.accuracy
    }
}

pub fn train(rows: &[TrainingRow], params: &TrainingParams) -> Result<TrainingOutcome> {
    if rows.is_empty() {
        return Err(TransferError::Training(
            "no rows carry a transfer_happened label".to_string(),
        ));
    }

    let (train_idx, test_idx) = stratified_split(rows, params.test_fraction, params.split_seed)?;
    let train_rows: Vec<TrainingRow> = train_idx.iter().map(|&i| rows[i].clone()).collect();
    let test_rows: Vec<TrainingRow> = test_idx.iter().map(|&i| rows[i].clone()).collect();
    info!(
        train = train_rows.len(),
        test = test_rows.len(),
        "stratified split ready"
    );

    // Scaling statistics come from the training split only.
    let pipeline = FittedPipeline::fit_columns(&train_rows, &params.columns)?;
    let x_train = pipeline.transform_rows(&train_rows)?;
    let y_train: Vec<bool> = train_rows.iter().map(|r| r.transfer_happened).collect();
    let forest = RandomForest::fit(&x_train, &y_train, params.forest)?;

    let x_test = pipeline.transform_rows(&test_rows)?;
    let actual: Vec<bool> = test_rows.iter().map(|r| r.transfer_happened).collect();
    let predicted: Vec<bool> = forest
        .predict_proba_rows(&x_test)?
        .into_iter()
        .map(|p| p > 0.5)
        .collect();

    let confusion = confusion_matrix(&actual, &predicted);
    let accuracy = if actual.is_empty() {
        0.0
    } else {
        (confusion[0][0] + confusion[1][1]) as f64 / actual.len() as f64
    };

    let importances = forest.permutation_importance(&x_test, &actual, params.forest.seed)?;
    let mut feature_importances: Vec<(String, f64)> =
        pipeline.feature_names().into_iter().zip(importances).collect();
    feature_importances.sort_by(|a, b| b.1.total_cmp(&a.1));

    let report = TrainingReport {
        train_samples: train_rows.len(),
        test_samples: test_rows.len(),
        accuracy,
        confusion,
        negative: class_metrics(&confusion, 0),
        positive: class_metrics(&confusion, 1),
        feature_importances,
    };
    info!(
        accuracy = %format!("{:.3}", report.accuracy),
        trees = forest.params.n_trees,
        "model trained"
    );
    for (name, importance) in report.top_features(5) {
        info!(feature = %name, importance = %format!("{importance:.4}"), "feature importance");
    }

    Ok(TrainingOutcome {
        pipeline,
        forest,
        report,
    })
}

/// Splits row indices per class so both sides keep the class ratio.
pub fn stratified_split(
    rows: &[TrainingRow],
    test_fraction: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>)> {
    let mut negatives: Vec<usize> = Vec::new();
    let mut positives: Vec<usize> = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        if row.transfer_happened {
            positives.push(i);
        } else {
            negatives.push(i);
        }
    }
    if negatives.is_empty() || positives.is_empty() {
        return Err(TransferError::Training(format!(
            "need both classes, got {} positive and {} negative rows",
            positives.len(),
            negatives.len()
        )));
    }
    if negatives.len() < 2 || positives.len() < 2 {
        return Err(TransferError::Training(
            "each class needs at least two rows for a stratified split".to_string(),
        ));
    }

    let fraction = test_fraction.clamp(0.0, 1.0);
    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(rows.len());
    let mut test = Vec::new();
    for mut class in [negatives, positives] {
        class.shuffle(&mut rng);
        let n_test = ((class.len() as f64) * fraction).ceil() as usize;
        let n_test = n_test.clamp(1, class.len() - 1);
        test.extend_from_slice(&class[..n_test]);
        train.extend_from_slice(&class[n_test..]);
    }
    train.sort_unstable();
    test.sort_unstable();
    Ok((train, test))
}

pub fn confusion_matrix(actual: &[bool], predicted: &[bool]) -> ConfusionMatrix {
    let mut m = [[0usize; 2]; 2];
    for (a, p) in actual.iter().zip(predicted) {
        m[*a as usize][*p as usize] += 1;
    }
    m
}

fn class_metrics(m: &ConfusionMatrix, class: usize) -> ClassMetrics {
    let other = 1 - class;
    let tp = m[class][class] as f64;
    let fp = m[other][class] as f64;
    let fn_ = m[class][other] as f64;
    let precision = if tp + fp > 0.0 { tp / (tp + fp) } else { 0.0 };
    let recall = if tp + fn_ > 0.0 { tp / (tp + fn_) } else { 0.0 };
    let f1 = if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    };
    ClassMetrics {
        precision,
        recall,
        f1,
        support: m[class][0] + m[class][1],
    }
}
