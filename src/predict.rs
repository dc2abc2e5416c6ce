use std::borrow::Cow;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::artifact::{self, ModelArtifact};
use crate::clubs::{ClubProfile, ClubRegistry};
use crate::config::Settings;
use crate::error::Result;
use crate::records::{PlayerRecord, Position, TransferFeatures};
use crate::synthetic;
use crate::training::{self, TrainingParams};

pub const HIGH_CONFIDENCE_UPPER: f64 = 0.7;
pub const HIGH_CONFIDENCE_LOWER: f64 = 0.3;

/// How far a probability sits from the decision boundary. Only two buckets exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    High,
    Medium,
}

impl Confidence {
    pub fn from_probability(p: f64) -> Self {
        if p > HIGH_CONFIDENCE_UPPER || p < HIGH_CONFIDENCE_LOWER {
            Confidence::High
        } else {
            Confidence::Medium
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketFit {
    Excellent,
    Good,
    Expensive,
}

impl MarketFit {
    pub fn assess(market_value: u64, budget: u64) -> Self {
        let value = market_value as f64;
        let budget = budget as f64;
        if value <= budget * 0.3 {
            MarketFit::Excellent
        } else if value <= budget * 0.5 {
            MarketFit::Good
        } else {
            MarketFit::Expensive
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitSummary {
    Excellent,
    Good,
    Limited,
}

impl FitSummary {
    pub fn from_best(best: Option<f64>) -> Self {
        match best {
            Some(p) if p > 0.7 => FitSummary::Excellent,
            Some(p) if p > 0.5 => FitSummary::Good,
            _ => FitSummary::Limited,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClubResolution {
    /// Unknown clubs use the generic fallback profile, or are dropped from comparisons.
    #[default]
    Lenient,
    /// Unknown clubs are rejected with `UnknownClub`.
    Strict,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferPrediction {
    pub club: String,
    pub probability: f64,
    pub likely: bool,
    pub confidence: Confidence,
    pub position_priority: u8,
    pub market_fit: MarketFit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiClubComparison {
    pub ranked: Vec<TransferPrediction>,
    pub best_fit: Option<String>,
    pub summary: FitSummary,
}

impl MultiClubComparison {
    pub fn best(&self) -> Option<&TransferPrediction> {
        self.ranked.first()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClubAnalysis {
    pub club: String,
    pub budget: u64,
    pub continental_competition: bool,
    pub league_position: u32,
    pub position_priorities: Vec<(Position, u8)>,
    /// Positions with priority 2 or higher, most urgent first.
    pub priority_positions: Vec<Position>,
    /// Positions with priority exactly 1.
    pub medium_priority_positions: Vec<Position>,
    pub recommendations: Vec<String>,
}

pub const BALANCED_SQUAD_NOTE: &str = "Squad well balanced - focus on quality upgrades";

fn recommendations(high: &[Position], medium: &[Position]) -> Vec<String> {
    let mut out = Vec::new();
    if !high.is_empty() {
        out.push(format!("High priority: {}", join_positions(high)));
    }
    if !medium.is_empty() {
        out.push(format!("Medium priority: {}", join_positions(medium)));
    }
    if out.is_empty() {
        out.push(BALANCED_SQUAD_NOTE.to_string());
    }
    out
}

fn join_positions(positions: &[Position]) -> String {
    positions
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Serves predictions from one loaded artifact. Read-only after construction.
#[derive(Debug, Clone)]
pub struct PredictionService {
    artifact: ModelArtifact,
    resolution: ClubResolution,
}

impl PredictionService {
    pub fn new(artifact: ModelArtifact) -> Self {
        Self {
            artifact,
            resolution: ClubResolution::Lenient,
        }
    }

    pub fn load(dir: &Path) -> Result<Self> {
        artifact::load(dir).map(Self::new)
    }

    /// Loads the artifact under `settings.model_dir`, training and saving one from synthetic rows
    /// if absent.
    pub fn load_or_train(settings: &Settings) -> Result<Self> {
        if artifact::artifact_exists(&settings.model_dir) {
            return Self::load(&settings.model_dir);
        }
        info!(dir = %settings.model_dir.display(), "no model artifact, training a fresh one");
        let rows = synthetic::generate(settings.samples, settings.seed);
        let outcome = training::train(&rows, &TrainingParams::default())?;
        let artifact = ModelArtifact::from_training(outcome, ClubRegistry::big_six());
        artifact::save(&artifact, &settings.model_dir)?;
        Ok(Self::new(artifact))
    }

    pub fn with_resolution(mut self, resolution: ClubResolution) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn resolution(&self) -> ClubResolution {
        self.resolution
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    pub fn clubs(&self) -> &ClubRegistry {
        &self.artifact.clubs
    }

    pub fn predict_one(
        &self,
        player: &PlayerRecord,
        club_name: &str,
    ) -> Result<TransferPrediction> {
        let club = match self.artifact.clubs.lookup(club_name) {
            Ok(club) => Cow::Borrowed(club),
            Err(err) if self.resolution == ClubResolution::Strict => return Err(err),
            Err(_) => {
                debug!(club = club_name, "unknown club, using fallback profile");
                Cow::Owned(ClubRegistry::fallback_profile(club_name))
            }
        };
        self.score(player, &club)
    }

    pub fn predict_many<S: AsRef<str>>(
        &self,
        player: &PlayerRecord,
        club_names: &[S],
    ) -> Result<MultiClubComparison> {
        let mut ranked = Vec::with_capacity(club_names.len());
        for name in club_names {
            let name = name.as_ref();
            match self.artifact.clubs.lookup(name) {
                Ok(club) => ranked.push(self.score(player, club)?),
                Err(err) if self.resolution == ClubResolution::Strict => return Err(err),
                Err(_) => debug!(club = name, "skipping unknown club"),
            }
        }

        // Stable sort: equal probabilities keep their input order.
        ranked.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        let best_fit = ranked.first().map(|p| p.club.clone());
        let summary = FitSummary::from_best(ranked.first().map(|p| p.probability));
        Ok(MultiClubComparison {
            ranked,
            best_fit,
            summary,
        })
    }

    /// Compares against every club in the registry.
    pub fn predict_all(&self, player: &PlayerRecord) -> Result<MultiClubComparison> {
        self.predict_many(player, &self.artifact.clubs.names())
    }

    /// Always strict: there is nothing to analyse for an unknown club.
    pub fn club_analysis(&self, club_name: &str) -> Result<ClubAnalysis> {
        let club = self.artifact.clubs.lookup(club_name)?;
        let mut priorities: Vec<(Position, u8)> = club
            .position_priorities
            .iter()
            .map(|(p, v)| (*p, *v))
            .collect();
        priorities.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        let priority_positions: Vec<Position> = priorities
            .iter()
            .filter(|(_, v)| *v >= 2)
            .map(|(p, _)| *p)
            .collect();
        let medium_priority_positions: Vec<Position> = priorities
            .iter()
            .filter(|(_, v)| *v == 1)
            .map(|(p, _)| *p)
            .collect();
        let recommendations = recommendations(&priority_positions, &medium_priority_positions);
        Ok(ClubAnalysis {
            club: club.name.clone(),
            budget: club.budget,
            continental_competition: club.continental_competition,
            league_position: club.league_position,
            position_priorities: priorities,
            priority_positions,
            medium_priority_positions,
            recommendations,
        })
    }

    fn score(&self, player: &PlayerRecord, club: &ClubProfile) -> Result<TransferPrediction> {
        let row = TransferFeatures::for_club(player, club);
        let x = self.artifact.pipeline.transform(&row)?;
        let probability = self.artifact.forest.predict_proba(&x)?;
        Ok(TransferPrediction {
            club: club.name.clone(),
            probability,
            likely: probability > 0.5,
            confidence: Confidence::from_probability(probability),
            position_priority: club.priority_for(player.position),
            market_fit: MarketFit::assess(player.market_value, club.budget),
        })
    }
}
