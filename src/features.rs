use std::fmt;
use std::str::FromStr;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use smartcore::api::{Transformer, UnsupervisedEstimator};
use smartcore::linalg::basic::arrays::Array;
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::preprocessing::numerical::{
    StandardScaler as NumericScaler, StandardScalerParameters,
};
use tracing::debug;

use crate::error::{Result, TransferError};
use crate::records::{TrainingRow, TransferFeatures};

/// Code assigned to categories never seen while fitting.
pub const UNSEEN_CATEGORY_CODE: f64 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureColumn {
    Age,
    MarketValue,
    Goals,
    Assists,
    MinutesPlayed,
    #[serde(rename = "position_code")]
    Position,
    ClubBudget,
    ClubLeaguePosition,
    ClubContinentalCompetition,
    ContractYearsLeft,
    WantsMove,
    PositionNeed,
}

impl FeatureColumn {
    /// Canonical column order. Every fitted pipeline lists its columns in this relative order.
    pub const ALL: [FeatureColumn; 12] = [
        FeatureColumn::Age,
        FeatureColumn::MarketValue,
        FeatureColumn::Goals,
        FeatureColumn::Assists,
        FeatureColumn::MinutesPlayed,
        FeatureColumn::Position,
        FeatureColumn::ClubBudget,
        FeatureColumn::ClubLeaguePosition,
        FeatureColumn::ClubContinentalCompetition,
        FeatureColumn::ContractYearsLeft,
        FeatureColumn::WantsMove,
        FeatureColumn::PositionNeed,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            FeatureColumn::Age => "age",
            FeatureColumn::MarketValue => "market_value",
            FeatureColumn::Goals => "goals",
            FeatureColumn::Assists => "assists",
            FeatureColumn::MinutesPlayed => "minutes_played",
            FeatureColumn::Position => "position_code",
            FeatureColumn::ClubBudget => "club_budget",
            FeatureColumn::ClubLeaguePosition => "club_league_position",
            FeatureColumn::ClubContinentalCompetition => "club_continental_competition",
            FeatureColumn::ContractYearsLeft => "contract_years_left",
            FeatureColumn::WantsMove => "wants_move",
            FeatureColumn::PositionNeed => "position_need",
        }
    }

    fn canonical_index(&self) -> usize {
        FeatureColumn::ALL
            .iter()
            .position(|c| c == self)
            .unwrap_or(usize::MAX)
    }

    fn raw_value(&self, row: &TransferFeatures, encoder: &CategoryEncoder) -> f64 {
        let p = &row.player;
        match self {
            FeatureColumn::Age => p.age as f64,
            FeatureColumn::MarketValue => p.market_value as f64,
            FeatureColumn::Goals => p.goals as f64,
            FeatureColumn::Assists => p.assists as f64,
            FeatureColumn::MinutesPlayed => p.minutes_played as f64,
            FeatureColumn::Position => encoder.encode(p.position.as_str()),
            FeatureColumn::ClubBudget => row.club_budget as f64,
            FeatureColumn::ClubLeaguePosition => row.club_league_position as f64,
            FeatureColumn::ClubContinentalCompetition => flag(row.club_continental_competition),
            FeatureColumn::ContractYearsLeft => p.contract_years_left as f64,
            FeatureColumn::WantsMove => flag(p.wants_move),
            FeatureColumn::PositionNeed => p.position_need as f64,
        }
    }
}

impl fmt::Display for FeatureColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FeatureColumn {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        FeatureColumn::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| format!("unknown feature column '{s}'"))
    }
}

/// Label encoder: sorted class list, code = index.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryEncoder {
    pub classes: Vec<String>,
}

impl CategoryEncoder {
    pub fn fit<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut classes: Vec<String> = values.into_iter().map(str::to_string).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    pub fn encode(&self, value: &str) -> f64 {
        match self.classes.iter().position(|c| c == value) {
            Some(idx) => idx as f64,
            None => {
                debug!(category = value, "unseen category, using fallback code");
                UNSEEN_CATEGORY_CODE
            }
        }
    }
}

/// Per-column standardization fitted on training rows; wraps smartcore's numerical scaler.
#[derive(Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    width: usize,
    inner: Arc<NumericScaler<f64>>,
}

impl fmt::Debug for StandardScaler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StandardScaler")
            .field("width", &self.width)
            .finish_non_exhaustive()
    }
}

impl StandardScaler {
    pub fn fit(matrix: &[Vec<f64>], width: usize) -> Result<Self> {
        if matrix.is_empty() || matrix.iter().any(|row| row.len() != width) {
            return Err(TransferError::Training(format!(
                "cannot fit scaler on {} rows of width {width}",
                matrix.len()
            )));
        }
        let dense = DenseMatrix::from_2d_vec(&matrix.to_vec())
            .map_err(|e| TransferError::Training(format!("matrix error: {e}")))?;
        let inner = NumericScaler::fit(&dense, StandardScalerParameters::default())
            .map_err(|e| TransferError::Training(format!("scaler fit failed: {e}")))?;
        Ok(Self {
            width,
            inner: Arc::new(inner),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn transform_rows(&self, raw: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        if raw.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(row) = raw.iter().find(|row| row.len() != self.width) {
            return Err(TransferError::Prediction(format!(
                "scaler expects {} columns, got {}",
                self.width,
                row.len()
            )));
        }
        let dense = DenseMatrix::from_2d_vec(&raw.to_vec())
            .map_err(|e| TransferError::Prediction(format!("matrix error: {e}")))?;
        let scaled = self
            .inner
            .transform(&dense)
            .map_err(|e| TransferError::Prediction(format!("scaler transform failed: {e}")))?;
        let (rows, cols) = scaled.shape();
        if rows != raw.len() || cols != self.width {
            return Err(TransferError::Prediction(format!(
                "scaler returned {rows}x{cols}, expected {}x{}",
                raw.len(),
                self.width
            )));
        }
        Ok((0..rows)
            .map(|i| {
                (0..cols)
                    .map(|j| {
                        let v = *scaled.get((i, j));
                        // Constant training columns have no spread to scale by.
                        if v.is_finite() { v } else { 0.0 }
                    })
                    .collect()
            })
            .collect())
    }
}

/// Column order, categorical encoder and scaler fitted on one training split.
///
/// The same value must be used for every transform of the model it was fitted with; it is never
/// refitted at inference time.
#[derive(Debug, Clone)]
pub struct FittedPipeline {
    columns: Vec<FeatureColumn>,
    encoder: CategoryEncoder,
    scaler: StandardScaler,
}

impl FittedPipeline {
    pub fn fit(rows: &[TrainingRow]) -> Result<Self> {
        Self::fit_columns(rows, &FeatureColumn::ALL)
    }

    pub fn fit_columns(rows: &[TrainingRow], columns: &[FeatureColumn]) -> Result<Self> {
        let columns = canonical_columns(columns);
        let encoder =
            CategoryEncoder::fit(rows.iter().map(|r| r.features.player.position.as_str()));
        let raw: Vec<Vec<f64>> = rows
            .iter()
            .map(|r| raw_vector(&columns, &encoder, &r.features))
            .collect();
        let scaler = StandardScaler::fit(&raw, columns.len())?;
        Ok(Self {
            columns,
            encoder,
            scaler,
        })
    }

    /// Rebuilds a pipeline from persisted parts. Returns `None` if the scaler cannot serve the
    /// listed columns.
    pub fn from_parts(
        columns: Vec<FeatureColumn>,
        encoder: CategoryEncoder,
        scaler: StandardScaler,
    ) -> Option<Self> {
        if scaler.width() != columns.len() {
            return None;
        }
        scaler.transform_rows(&[vec![0.0; columns.len()]]).ok()?;
        Some(Self {
            columns,
            encoder,
            scaler,
        })
    }

    /// Encoded, unscaled values in column order.
    pub fn raw_values(&self, row: &TransferFeatures) -> Vec<f64> {
        raw_vector(&self.columns, &self.encoder, row)
    }

    pub fn transform(&self, row: &TransferFeatures) -> Result<Vec<f64>> {
        let mut out = self.scaler.transform_rows(&[self.raw_values(row)])?;
        out.pop()
            .ok_or_else(|| TransferError::Prediction("scaler returned no rows".to_string()))
    }

    pub fn transform_rows(&self, rows: &[TrainingRow]) -> Result<Vec<Vec<f64>>> {
        let raw: Vec<Vec<f64>> = rows.iter().map(|r| self.raw_values(&r.features)).collect();
        self.scaler.transform_rows(&raw)
    }

    pub fn columns(&self) -> &[FeatureColumn] {
        &self.columns
    }

    pub fn feature_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name().to_string()).collect()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn encoder(&self) -> &CategoryEncoder {
        &self.encoder
    }

    pub fn scaler(&self) -> &StandardScaler {
        &self.scaler
    }
}

fn canonical_columns(requested: &[FeatureColumn]) -> Vec<FeatureColumn> {
    let mut columns = requested.to_vec();
    columns.sort_by_key(FeatureColumn::canonical_index);
    columns.dedup();
    columns
}

fn raw_vector(
    columns: &[FeatureColumn],
    encoder: &CategoryEncoder,
    row: &TransferFeatures,
) -> Vec<f64> {
    columns.iter().map(|c| c.raw_value(row, encoder)).collect()
}

fn flag(v: bool) -> f64 {
    if v { 1.0 } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthetic;

    fn column_stats(matrix: &[Vec<f64>], col: usize) -> (f64, f64) {
        let n = matrix.len() as f64;
        let mean = matrix.iter().map(|r| r[col]).sum::<f64>() / n;
        let var = matrix.iter().map(|r| (r[col] - mean).powi(2)).sum::<f64>() / n;
        (mean, var)
    }

    #[test]
    fn encoder_sorts_classes_and_falls_back() {
        let enc = CategoryEncoder::fit(["Midfielder", "Attacker", "Defender", "Attacker"]);
        assert_eq!(enc.classes, vec!["Attacker", "Defender", "Midfielder"]);
        assert_eq!(enc.encode("Defender"), 1.0);
        assert_eq!(enc.encode("Goalkeeper"), UNSEEN_CATEGORY_CODE);
    }

    #[test]
    fn scaler_centres_columns() {
        let scaler =
            StandardScaler::fit(&[vec![1.0, 10.0], vec![3.0, 30.0], vec![5.0, 50.0]], 2).unwrap();
        let out = scaler.transform_rows(&[vec![3.0, 30.0], vec![5.0, 50.0]]).unwrap();
        assert!(out[0].iter().all(|v| v.abs() < 1e-12));
        assert!(out[1].iter().all(|v| *v > 0.0));
        assert!((out[1][0] - out[1][1]).abs() < 1e-12);
    }

    #[test]
    fn scaler_rejects_wrong_width() {
        let scaler = StandardScaler::fit(&[vec![1.0, 2.0], vec![2.0, 4.0]], 2).unwrap();
        assert!(matches!(
            scaler.transform_rows(&[vec![1.0]]),
            Err(TransferError::Prediction(_))
        ));
        assert!(StandardScaler::fit(&[], 2).is_err());
    }

    #[test]
    fn subset_is_reordered_canonically() {
        let rows = synthetic::generate(50, 1);
        let pipeline = FittedPipeline::fit_columns(
            &rows,
            &[
                FeatureColumn::WantsMove,
                FeatureColumn::Age,
                FeatureColumn::ClubBudget,
                FeatureColumn::Age,
            ],
        )
        .unwrap();
        assert_eq!(pipeline.feature_names(), vec!["age", "club_budget", "wants_move"]);
        assert_eq!(pipeline.transform(&rows[0].features).unwrap().len(), 3);
    }

    #[test]
    fn training_columns_are_standardized() {
        let rows = synthetic::generate(300, 5);
        let pipeline = FittedPipeline::fit(&rows).unwrap();
        let matrix = pipeline.transform_rows(&rows).unwrap();
        for col in 0..pipeline.width() {
            let (mean, var) = column_stats(&matrix, col);
            assert!(mean.abs() < 1e-9, "column {col} mean {mean}");
            assert!((var - 1.0).abs() < 0.01, "column {col} var {var}");
        }
    }

    #[test]
    fn novel_rows_reuse_fitted_statistics() {
        let fit_rows = synthetic::generate(200, 3);
        let novel = synthetic::generate(20, 99);
        let pipeline = FittedPipeline::fit(&fit_rows).unwrap();

        let raw_fit: Vec<Vec<f64>> = fit_rows
            .iter()
            .map(|r| pipeline.raw_values(&r.features))
            .collect();
        let scaled_fit = pipeline.transform_rows(&fit_rows).unwrap();
        for col in 0..pipeline.width() {
            let (mean, _) = column_stats(&raw_fit, col);
            // Recover the fitted scale from two fit rows with different raw values.
            let (a, b) = (0..raw_fit.len())
                .flat_map(|i| (0..raw_fit.len()).map(move |j| (i, j)))
                .find(|&(i, j)| (raw_fit[i][col] - raw_fit[j][col]).abs() > 1e-9)
                .unwrap();
            let scale =
                (raw_fit[a][col] - raw_fit[b][col]) / (scaled_fit[a][col] - scaled_fit[b][col]);

            for row in &novel {
                let raw = pipeline.raw_values(&row.features)[col];
                let z = pipeline.transform(&row.features).unwrap()[col];
                let expected = (raw - mean) / scale;
                assert!(
                    (z - expected).abs() < 1e-6 * expected.abs().max(1.0),
                    "column {col}: {z} vs {expected}"
                );
            }
        }
    }

    #[test]
    fn column_names_parse_back() {
        for c in FeatureColumn::ALL {
            assert_eq!(c.name().parse::<FeatureColumn>(), Ok(c));
        }
        assert_eq!(FeatureColumn::Position.name(), "position_code");
    }
}
