use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::clubs::ClubProfile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Position {
    Goalkeeper,
    Defender,
    Midfielder,
    Attacker,
}

impl Position {
    pub const ALL: [Position; 4] = [
        Position::Goalkeeper,
        Position::Defender,
        Position::Midfielder,
        Position::Attacker,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Goalkeeper => "Goalkeeper",
            Position::Defender => "Defender",
            Position::Midfielder => "Midfielder",
            Position::Attacker => "Attacker",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Position {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Position::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown position '{s}'"))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub age: u32,
    pub market_value: u64,
    pub goals: u32,
    pub assists: u32,
    pub minutes_played: u32,
    pub position: Position,
    pub contract_years_left: u32,
    pub wants_move: bool,
    // 0 = no need, 3 = urgent need
    pub position_need: u8,
}

/// One player/club pairing with the label omitted; the shape the feature pipeline consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferFeatures {
    pub player: PlayerRecord,
    pub club_budget: u64,
    pub club_league_position: u32,
    pub club_continental_competition: bool,
}

impl TransferFeatures {
    pub fn for_club(player: &PlayerRecord, club: &ClubProfile) -> Self {
        Self {
            player: player.clone(),
            club_budget: club.budget,
            club_league_position: club.league_position,
            club_continental_competition: club.continental_competition,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRow {
    pub features: TransferFeatures,
    pub transfer_happened: bool,
    // Kept for dataset inspection only; never fed to the pipeline.
    pub transfer_probability: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_parses_case_insensitively() {
        assert_eq!("attacker".parse::<Position>(), Ok(Position::Attacker));
        assert_eq!(" Goalkeeper ".parse::<Position>(), Ok(Position::Goalkeeper));
        assert!("Winger".parse::<Position>().is_err());
    }
}
