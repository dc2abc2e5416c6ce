use serde::{Deserialize, Deserializer, Serialize};

use crate::clubs::ClubRegistry;
use crate::error::{Result, TransferError};
use crate::predict::{
    ClubAnalysis, Confidence, FitSummary, MarketFit, MultiClubComparison, PredictionService,
    TransferPrediction,
};
use crate::records::{PlayerRecord, Position};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRequest {
    #[serde(default = "default_player_name")]
    pub name: String,
    pub age: u32,
    pub position: Position,
    pub market_value: u64,
    #[serde(default)]
    pub goals: u32,
    #[serde(default)]
    pub assists: u32,
    #[serde(default = "default_minutes")]
    pub minutes_played: u32,
    #[serde(default = "default_contract_years")]
    pub contract_years_left: u32,
    // Accepts `true`/`false` as well as the 0/1 integers older clients send.
    #[serde(default, deserialize_with = "flag_from_bool_or_int")]
    pub player_wants_move: bool,
    #[serde(default = "default_position_need")]
    pub position_need: u8,
}

pub const MAX_POSITION_NEED: u8 = 3;

impl PlayerRequest {
    /// Fails with `InvalidRequest` when `position_need` is outside 0..=3.
    pub fn to_record(&self) -> Result<PlayerRecord> {
        if self.position_need > MAX_POSITION_NEED {
            return Err(TransferError::InvalidRequest(format!(
                "position_need must be at most {MAX_POSITION_NEED}, got {}",
                self.position_need
            )));
        }
        Ok(PlayerRecord {
            age: self.age,
            market_value: self.market_value,
            goals: self.goals,
            assists: self.assists,
            minutes_played: self.minutes_played,
            position: self.position,
            contract_years_left: self.contract_years_left,
            wants_move: self.player_wants_move,
            position_need: self.position_need,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub player: PlayerRequest,
    pub target_club: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiClubRequest {
    pub player: PlayerRequest,
    #[serde(default = "default_clubs")]
    pub clubs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub player_name: String,
    pub target_club: String,
    pub transfer_probability: f64,
    pub prediction: String,
    pub confidence: Confidence,
    pub market_fit: MarketFit,
    pub position_priority: u8,
}

impl PredictionResponse {
    pub fn from_prediction(player_name: &str, prediction: &TransferPrediction) -> Self {
        Self {
            player_name: player_name.to_string(),
            target_club: prediction.club.clone(),
            transfer_probability: prediction.probability,
            prediction: if prediction.likely {
                "Likely".to_string()
            } else {
                "Unlikely".to_string()
            },
            confidence: prediction.confidence,
            market_fit: prediction.market_fit,
            position_priority: prediction.position_priority,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiClubResponse {
    pub player_name: String,
    pub predictions: Vec<PredictionResponse>,
    pub best_fit: Option<String>,
    pub summary: FitSummary,
}

impl MultiClubResponse {
    pub fn from_comparison(player_name: &str, comparison: &MultiClubComparison) -> Self {
        Self {
            player_name: player_name.to_string(),
            predictions: comparison
                .ranked
                .iter()
                .map(|p| PredictionResponse::from_prediction(player_name, p))
                .collect(),
            best_fit: comparison.best_fit.clone(),
            summary: comparison.summary,
        }
    }
}

pub type ClubAnalysisResponse = ClubAnalysis;

pub fn handle_prediction(
    service: &PredictionService,
    request: &PredictionRequest,
) -> Result<PredictionResponse> {
    let prediction = service.predict_one(&request.player.to_record()?, &request.target_club)?;
    Ok(PredictionResponse::from_prediction(
        &request.player.name,
        &prediction,
    ))
}

pub fn handle_multi_club(
    service: &PredictionService,
    request: &MultiClubRequest,
) -> Result<MultiClubResponse> {
    let comparison = service.predict_many(&request.player.to_record()?, &request.clubs)?;
    Ok(MultiClubResponse::from_comparison(
        &request.player.name,
        &comparison,
    ))
}

pub fn handle_club_analysis(
    service: &PredictionService,
    club_name: &str,
) -> Result<ClubAnalysisResponse> {
    service.club_analysis(club_name)
}

fn default_player_name() -> String {
    "Unknown Player".to_string()
}

fn default_minutes() -> u32 {
    1800
}

fn default_contract_years() -> u32 {
    2
}

fn default_position_need() -> u8 {
    1
}

fn default_clubs() -> Vec<String> {
    ClubRegistry::big_six().names()
}

fn flag_from_bool_or_int<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }
    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Int(i) => i != 0,
    })
}
