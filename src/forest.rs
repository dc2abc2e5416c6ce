use std::fmt;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier, RandomForestClassifierParameters,
};
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::error::{Result, TransferError};

type Classifier = RandomForestClassifier<f64, u32, DenseMatrix<f64>, Vec<u32>>;

const PERMUTATION_REPEATS: u64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: u16,
    pub max_depth: u16,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 10,
            min_samples_split: 5,
            min_samples_leaf: 2,
            seed: 42,
        }
    }
}

/// Gini random forest over a binary label, backed by smartcore.
#[derive(Clone, Serialize, Deserialize)]
pub struct RandomForest {
    pub params: ForestParams,
    pub n_features: usize,
    classifier: Arc<Classifier>,
}

impl fmt::Debug for RandomForest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomForest")
            .field("params", &self.params)
            .field("n_features", &self.n_features)
            .finish_non_exhaustive()
    }
}

impl RandomForest {
    pub fn fit(x: &[Vec<f64>], y: &[bool], params: ForestParams) -> Result<Self> {
        if x.is_empty() || x.len() != y.len() {
            return Err(TransferError::Training(format!(
                "cannot fit forest on {} rows with {} labels",
                x.len(),
                y.len()
            )));
        }
        let n_features = x[0].len();
        if n_features == 0 || x.iter().any(|row| row.len() != n_features) {
            return Err(TransferError::Training(
                "feature rows have inconsistent or zero width".to_string(),
            ));
        }
        if params.n_trees == 0 {
            return Err(TransferError::Training("forest needs at least one tree".to_string()));
        }
        if !y.iter().any(|v| *v) || y.iter().all(|v| *v) {
            return Err(TransferError::Training(
                "forest needs both classes in its training rows".to_string(),
            ));
        }

        let mtry = ((n_features as f64).sqrt().floor() as usize).max(1);
        let smart_params = RandomForestClassifierParameters::default()
            .with_n_trees(params.n_trees.into())
            .with_max_depth(params.max_depth.into())
            .with_min_samples_split(params.min_samples_split)
            .with_min_samples_leaf(params.min_samples_leaf)
            .with_m(mtry)
            .with_seed(params.seed);

        let matrix = to_matrix(x).map_err(TransferError::Training)?;
        let labels: Vec<u32> = y.iter().map(|v| u32::from(*v)).collect();
        let classifier = Classifier::fit(&matrix, &labels, smart_params)
            .map_err(|e| TransferError::Training(format!("forest fit failed: {e}")))?;

        Ok(Self {
            params,
            n_features,
            classifier: Arc::new(classifier),
        })
    }

    /// Positive-class probability per row.
    pub fn predict_proba_rows(&self, x: &[Vec<f64>]) -> Result<Vec<f64>> {
        if x.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(row) = x.iter().find(|row| row.len() != self.n_features) {
            return Err(TransferError::Prediction(format!(
                "forest expects {} features, got {}",
                self.n_features,
                row.len()
            )));
        }
        let matrix = to_matrix(x).map_err(TransferError::Prediction)?;
        let proba = self
            .classifier
            .predict_proba(&matrix)
            .map_err(|e| TransferError::Prediction(format!("forest predict failed: {e}")))?;
        let (rows, cols) = proba.shape();
        if rows != x.len() || cols != 2 {
            return Err(TransferError::Prediction(format!(
                "expected {}x2 class probabilities, got {rows}x{cols}",
                x.len()
            )));
        }
        Ok((0..rows)
            .map(|i| (*proba.get((i, 1))).clamp(0.0, 1.0))
            .collect())
    }

    pub fn predict_proba(&self, x: &[f64]) -> Result<f64> {
        let probs = self.predict_proba_rows(&[x.to_vec()])?;
        probs
            .first()
            .copied()
            .ok_or_else(|| TransferError::Prediction("no probability returned".to_string()))
    }

    pub fn predict(&self, x: &[f64]) -> Result<bool> {
        Ok(self.predict_proba(x)? > 0.5)
    }

    /// Permutation importance on held-out rows: mean increase in Brier score when one column is
    /// shuffled, normalised to sum to 1. Each feature uses its own seeded RNG.
    pub fn permutation_importance(
        &self,
        x: &[Vec<f64>],
        y: &[bool],
        seed: u64,
    ) -> Result<Vec<f64>> {
        if x.is_empty() || x.len() != y.len() {
            return Ok(vec![1.0 / self.n_features as f64; self.n_features]);
        }
        let baseline = brier(&self.predict_proba_rows(x)?, y);

        let raw = (0..self.n_features)
            .into_par_iter()
            .map(|feature| -> Result<f64> {
                let mut total = 0.0;
                for repeat in 0..PERMUTATION_REPEATS {
                    let stream = seed
                        .wrapping_add((feature as u64).wrapping_mul(PERMUTATION_REPEATS))
                        .wrapping_add(repeat);
                    let mut rng = StdRng::seed_from_u64(stream);
                    let mut column: Vec<f64> = x.iter().map(|row| row[feature]).collect();
                    column.shuffle(&mut rng);
                    let shuffled: Vec<Vec<f64>> = x
                        .iter()
                        .zip(&column)
                        .map(|(row, v)| {
                            let mut row = row.clone();
                            row[feature] = *v;
                            row
                        })
                        .collect();
                    let score = brier(&self.predict_proba_rows(&shuffled)?, y);
                    total += (score - baseline).max(0.0);
                }
                Ok(total / PERMUTATION_REPEATS as f64)
            })
            .collect::<Result<Vec<f64>>>()?;

        let sum: f64 = raw.iter().sum();
        if sum <= 0.0 {
            return Ok(vec![1.0 / self.n_features as f64; self.n_features]);
        }
        Ok(raw.into_iter().map(|v| v / sum).collect())
    }
}

/// Checks every serialized tree before it is handed to the classifier: child links must point
/// forward and stay in bounds, and split features must exist. Returns the number of trees seen.
pub fn validate_model_json(
    value: &Value,
    n_features: usize,
) -> std::result::Result<usize, String> {
    let mut trees = 0usize;
    visit_trees(value, n_features, &mut trees)?;
    if trees == 0 {
        return Err("model contains no trees".to_string());
    }
    Ok(trees)
}

fn visit_trees(
    value: &Value,
    n_features: usize,
    trees: &mut usize,
) -> std::result::Result<(), String> {
    match value {
        Value::Object(map) => {
            if let Some(Value::Array(nodes)) = map.get("nodes") {
                validate_nodes(nodes, n_features, *trees)?;
                *trees += 1;
            }
            for (key, child) in map {
                if key != "nodes" {
                    visit_trees(child, n_features, trees)?;
                }
            }
            Ok(())
        }
        Value::Array(items) => items
            .iter()
            .try_for_each(|item| visit_trees(item, n_features, trees)),
        _ => Ok(()),
    }
}

fn validate_nodes(
    nodes: &[Value],
    n_features: usize,
    tree: usize,
) -> std::result::Result<(), String> {
    if nodes.is_empty() {
        return Err(format!("tree {tree} has no nodes"));
    }
    for (idx, node) in nodes.iter().enumerate() {
        let child = |key: &str| node.get(key).and_then(Value::as_u64).map(|c| c as usize);
        match (child("true_child"), child("false_child")) {
            (None, None) => {}
            (Some(t), Some(f)) => {
                for c in [t, f] {
                    if c <= idx || c >= nodes.len() {
                        return Err(format!(
                            "tree {tree} node {idx} links to node {c} of {}",
                            nodes.len()
                        ));
                    }
                }
                let feature = node
                    .get("split_feature")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| format!("tree {tree} node {idx} has no split feature"))?;
                if feature as usize >= n_features {
                    return Err(format!(
                        "tree {tree} node {idx} splits on feature {feature} of {n_features}"
                    ));
                }
            }
            _ => return Err(format!("tree {tree} node {idx} has a single child")),
        }
    }
    Ok(())
}

fn to_matrix(x: &[Vec<f64>]) -> std::result::Result<DenseMatrix<f64>, String> {
    DenseMatrix::from_2d_vec(&x.to_vec()).map_err(|e| format!("matrix error: {e}"))
}

fn brier(probs: &[f64], y: &[bool]) -> f64 {
    if probs.is_empty() {
        return 0.0;
    }
    let sum: f64 = probs
        .iter()
        .zip(y)
        .map(|(p, t)| (p - f64::from(u8::from(*t))).powi(2))
        .sum();
    sum / probs.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn threshold_data() -> (Vec<Vec<f64>>, Vec<bool>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..200 {
            let signal = i as f64 / 200.0;
            let noise = ((i * 37) % 17) as f64 / 17.0;
            x.push(vec![signal, noise]);
            y.push(signal > 0.5);
        }
        (x, y)
    }

    #[test]
    fn learns_a_threshold() {
        let (x, y) = threshold_data();
        let params = ForestParams {
            n_trees: 20,
            ..Default::default()
        };
        let forest = RandomForest::fit(&x, &y, params).unwrap();
        assert!(forest.predict(&[0.9, 0.3]).unwrap());
        assert!(!forest.predict(&[0.1, 0.3]).unwrap());
        let p = forest.predict_proba(&[0.95, 0.5]).unwrap();
        assert!((0.0..=1.0).contains(&p));

        let importances = forest.permutation_importance(&x, &y, 7).unwrap();
        assert!(importances[0] > importances[1]);
        let total: f64 = importances.iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn fitting_is_deterministic() {
        let (x, y) = threshold_data();
        let params = ForestParams {
            n_trees: 10,
            ..Default::default()
        };
        let a = RandomForest::fit(&x, &y, params).unwrap();
        let b = RandomForest::fit(&x, &y, params).unwrap();
        assert_eq!(
            a.predict_proba_rows(&x).unwrap(),
            b.predict_proba_rows(&x).unwrap()
        );
    }

    #[test]
    fn wrong_width_is_a_prediction_error() {
        let (x, y) = threshold_data();
        let forest = RandomForest::fit(
            &x,
            &y,
            ForestParams {
                n_trees: 3,
                ..Default::default()
            },
        )
        .unwrap();
        assert!(matches!(
            forest.predict_proba(&[0.5]),
            Err(TransferError::Prediction(_))
        ));
    }

    #[test]
    fn rejects_empty_or_single_class_input() {
        assert!(RandomForest::fit(&[], &[], ForestParams::default()).is_err());
        let x = vec![vec![1.0], vec![2.0]];
        assert!(RandomForest::fit(&x, &[true, true], ForestParams::default()).is_err());
    }

    #[test]
    fn serialized_trees_are_validated() {
        let leaf = json!({"split_feature": 0, "true_child": null, "false_child": null});
        let ok = json!({"trees": [{"nodes": [
            {"split_feature": 1, "true_child": 1, "false_child": 2},
            leaf.clone(),
            leaf.clone()
        ]}]});
        assert_eq!(validate_model_json(&ok, 2), Ok(1));

        let cycle = json!({"trees": [{"nodes": [
            {"split_feature": 1, "true_child": 0, "false_child": 0},
            leaf.clone()
        ]}]});
        assert!(validate_model_json(&cycle, 2).is_err());

        let bad_feature = json!({"trees": [{"nodes": [
            {"split_feature": 5, "true_child": 1, "false_child": 2},
            leaf.clone(),
            leaf.clone()
        ]}]});
        assert!(validate_model_json(&bad_feature, 2).is_err());

        assert!(validate_model_json(&json!({"trees": []}), 2).is_err());
    }

    #[test]
    fn fitted_forest_passes_validation() {
        let (x, y) = threshold_data();
        let forest = RandomForest::fit(
            &x,
            &y,
            ForestParams {
                n_trees: 4,
                ..Default::default()
            },
        )
        .unwrap();
        let value = serde_json::to_value(&forest).unwrap();
        assert_eq!(validate_model_json(&value, 2), Ok(4));
    }
}
