use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TransferError};
use crate::records::Position;

pub const FALLBACK_BUDGET: u64 = 100_000_000;
pub const FALLBACK_LEAGUE_POSITION: u32 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClubProfile {
    pub name: String,
    pub budget: u64,
    pub continental_competition: bool,
    pub league_position: u32,
    pub position_priorities: BTreeMap<Position, u8>,
}

impl ClubProfile {
    pub fn priority_for(&self, position: Position) -> u8 {
        self.position_priorities.get(&position).copied().unwrap_or(1)
    }
}

/// Club record as it appears in `model_config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClubSnapshot {
    pub budget: u64,
    pub continental_competition: bool,
    pub league_position: u32,
    #[serde(default)]
    pub position_priorities: BTreeMap<Position, u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClubRegistry {
    clubs: Vec<ClubProfile>,
}

impl ClubRegistry {
    pub fn big_six() -> Self {
        let clubs = vec![
            club("Manchester City", 180_000_000, true, 1, [2, 1, 2, 0]),
            club("Arsenal", 150_000_000, true, 2, [3, 2, 1, 1]),
            club("Liverpool", 140_000_000, true, 3, [2, 3, 2, 0]),
            club("Chelsea", 200_000_000, false, 6, [3, 2, 2, 1]),
            club("Manchester United", 160_000_000, false, 8, [3, 2, 3, 0]),
            club("Tottenham", 120_000_000, false, 5, [2, 1, 3, 1]),
        ];
        Self { clubs }
    }

    pub fn from_profiles(clubs: Vec<ClubProfile>) -> Self {
        Self { clubs }
    }

    pub fn lookup(&self, name: &str) -> Result<&ClubProfile> {
        let wanted = normalize_name(name);
        self.clubs
            .iter()
            .find(|c| normalize_name(&c.name) == wanted)
            .ok_or_else(|| TransferError::UnknownClub(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_ok()
    }

    pub fn names(&self) -> Vec<String> {
        self.clubs.iter().map(|c| c.name.clone()).collect()
    }

    pub fn profiles(&self) -> &[ClubProfile] {
        &self.clubs
    }

    pub fn len(&self) -> usize {
        self.clubs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clubs.is_empty()
    }

    pub fn position_priorities(&self, name: &str) -> BTreeMap<Position, u8> {
        self.lookup(name)
            .map(|c| c.position_priorities.clone())
            .unwrap_or_else(|_| default_priorities())
    }

    /// Generic club used when a single-club request names an unsupported club.
    pub fn fallback_profile(name: &str) -> ClubProfile {
        ClubProfile {
            name: name.to_string(),
            budget: FALLBACK_BUDGET,
            continental_competition: false,
            league_position: FALLBACK_LEAGUE_POSITION,
            position_priorities: default_priorities(),
        }
    }

    pub fn snapshot(&self) -> BTreeMap<String, ClubSnapshot> {
        self.clubs
            .iter()
            .map(|c| {
                (
                    c.name.clone(),
                    ClubSnapshot {
                        budget: c.budget,
                        continental_competition: c.continental_competition,
                        league_position: c.league_position,
                        position_priorities: c.position_priorities.clone(),
                    },
                )
            })
            .collect()
    }

    pub fn from_snapshot(snapshot: BTreeMap<String, ClubSnapshot>) -> Self {
        // Keep the built-in table order for known names; anything else goes to the back.
        let order = Self::big_six().names();
        let mut clubs: Vec<ClubProfile> = snapshot
            .into_iter()
            .map(|(name, s)| ClubProfile {
                position_priorities: if s.position_priorities.is_empty() {
                    default_priorities()
                } else {
                    s.position_priorities
                },
                name,
                budget: s.budget,
                continental_competition: s.continental_competition,
                league_position: s.league_position,
            })
            .collect();
        clubs.sort_by_key(|c| order.iter().position(|n| *n == c.name).unwrap_or(usize::MAX));
        Self { clubs }
    }
}

impl Default for ClubRegistry {
    fn default() -> Self {
        Self::big_six()
    }
}

pub fn default_priorities() -> BTreeMap<Position, u8> {
    BTreeMap::from([
        (Position::Attacker, 2),
        (Position::Midfielder, 2),
        (Position::Defender, 2),
        (Position::Goalkeeper, 1),
    ])
}

pub fn normalize_name(input: &str) -> String {
    let lower = input.trim().to_ascii_lowercase();
    let mut out = String::with_capacity(lower.len());
    let mut prev_us = false;
    for ch in lower.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch);
            prev_us = false;
        } else if !prev_us && !out.is_empty() {
            out.push('_');
            prev_us = true;
        }
    }
    while out.ends_with('_') {
        out.pop();
    }
    out
}

// Priorities are given as [attacker, midfielder, defender, goalkeeper].
fn club(
    name: &str,
    budget: u64,
    continental_competition: bool,
    league_position: u32,
    priorities: [u8; 4],
) -> ClubProfile {
    let [att, mid, def, gk] = priorities;
    ClubProfile {
        name: name.to_string(),
        budget,
        continental_competition,
        league_position,
        position_priorities: BTreeMap::from([
            (Position::Attacker, att),
            (Position::Midfielder, mid),
            (Position::Defender, def),
            (Position::Goalkeeper, gk),
        ]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case_and_spacing() {
        let registry = ClubRegistry::big_six();
        assert_eq!(registry.len(), 6);
        let club = registry.lookup("  manchester   united ").unwrap();
        assert_eq!(club.name, "Manchester United");
        assert_eq!(club.budget, 160_000_000);
    }

    #[test]
    fn unknown_club_signals_not_found() {
        let registry = ClubRegistry::big_six();
        let err = registry.lookup("Unknown FC").unwrap_err();
        assert!(matches!(err, TransferError::UnknownClub(name) if name == "Unknown FC"));
    }

    #[test]
    fn priorities_fall_back_for_unknown_names() {
        let registry = ClubRegistry::big_six();
        let p = registry.position_priorities("Leeds");
        assert_eq!(p[&Position::Attacker], 2);
        assert_eq!(p[&Position::Goalkeeper], 1);
        assert_eq!(registry.position_priorities("Arsenal")[&Position::Attacker], 3);
    }

    #[test]
    fn snapshot_round_trip_keeps_table_order() {
        let registry = ClubRegistry::big_six();
        let restored = ClubRegistry::from_snapshot(registry.snapshot());
        assert_eq!(restored, registry);
    }
}
