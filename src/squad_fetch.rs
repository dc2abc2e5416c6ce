use std::collections::BTreeMap;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use crate::clubs::ClubRegistry;
use crate::http_client::api_get;
use crate::records::Position;

pub const PREMIER_LEAGUE_ID: u32 = 39;

/// API-Football team ids for the supported clubs.
pub const BIG_SIX_TEAM_IDS: [(&str, u32); 6] = [
    ("Manchester City", 50),
    ("Arsenal", 42),
    ("Liverpool", 40),
    ("Chelsea", 49),
    ("Manchester United", 33),
    ("Tottenham", 47),
];

// Senior squad depth a club wants per position.
const TARGET_DEPTH: [(Position, u32); 4] = [
    (Position::Goalkeeper, 3),
    (Position::Defender, 8),
    (Position::Midfielder, 8),
    (Position::Attacker, 6),
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SquadPlayer {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub age: Option<u32>,
    #[serde(default)]
    pub number: Option<u32>,
    #[serde(default)]
    pub position: Option<String>,
}

impl SquadPlayer {
    pub fn position(&self) -> Option<Position> {
        self.position.as_deref().and_then(position_from_label)
    }
}

#[derive(Debug, Deserialize)]
struct SquadEnvelope {
    #[serde(default)]
    response: Vec<SquadEntry>,
}

#[derive(Debug, Deserialize)]
struct SquadEntry {
    #[serde(default)]
    players: Vec<SquadPlayer>,
}

pub fn parse_squad_json(raw: &str) -> Result<Vec<SquadPlayer>> {
    let envelope: SquadEnvelope = serde_json::from_str(raw).context("parse squad response")?;
    Ok(envelope
        .response
        .into_iter()
        .next()
        .map(|entry| entry.players)
        .unwrap_or_default())
}

pub fn position_from_label(label: &str) -> Option<Position> {
    match label.trim().to_ascii_lowercase().as_str() {
        "goalkeeper" | "gk" => Some(Position::Goalkeeper),
        "defender" | "def" => Some(Position::Defender),
        "midfielder" | "mid" => Some(Position::Midfielder),
        "attacker" | "forward" | "fw" => Some(Position::Attacker),
        _ => None,
    }
}

/// Priority per position from how far the squad is below its target depth, clamped to 0..=3.
pub fn position_needs_from_squad(players: &[SquadPlayer]) -> BTreeMap<Position, u8> {
    let mut counts: BTreeMap<Position, u32> = BTreeMap::new();
    for p in players {
        if let Some(pos) = p.position() {
            *counts.entry(pos).or_default() += 1;
        }
    }
    TARGET_DEPTH
        .iter()
        .map(|(pos, target)| {
            let have = counts.get(pos).copied().unwrap_or(0);
            let short = target.saturating_sub(have).min(3);
            (*pos, short as u8)
        })
        .collect()
}

pub fn team_id(club_name: &str) -> Option<u32> {
    let wanted = crate::clubs::normalize_name(club_name);
    BIG_SIX_TEAM_IDS
        .iter()
        .find(|(name, _)| crate::clubs::normalize_name(name) == wanted)
        .map(|(_, id)| *id)
}

/// Current squad for one team. Any failure yields an empty squad.
pub fn fetch_squad(api_key: &str, team_id: u32) -> Vec<SquadPlayer> {
    match try_fetch_squad(api_key, team_id) {
        Ok(players) => players,
        Err(err) => {
            warn!(team_id, error = %err, "squad fetch failed");
            Vec::new()
        }
    }
}

fn try_fetch_squad(api_key: &str, team_id: u32) -> Result<Vec<SquadPlayer>> {
    let body = api_get("players/squads", &[("team", team_id.to_string())], api_key)?;
    parse_squad_json(&body)
}

/// One player's Premier League line for a season.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSeasonStats {
    pub id: u64,
    pub name: String,
    pub age: Option<u32>,
    pub team: Option<String>,
    pub position: Option<Position>,
    pub appearances: u32,
    pub minutes: u32,
    pub goals: u32,
    pub assists: u32,
}

#[derive(Debug, Deserialize)]
struct StatsEnvelope {
    #[serde(default)]
    response: Vec<StatsEntry>,
}

#[derive(Debug, Deserialize)]
struct StatsEntry {
    player: StatsPlayer,
    #[serde(default)]
    statistics: Vec<StatsLine>,
}

#[derive(Debug, Deserialize)]
struct StatsPlayer {
    id: u64,
    name: String,
    #[serde(default)]
    age: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct StatsLine {
    #[serde(default)]
    team: Option<NamedRef>,
    #[serde(default)]
    games: GamesBlock,
    #[serde(default)]
    goals: GoalsBlock,
}

#[derive(Debug, Deserialize)]
struct NamedRef {
    #[serde(default)]
    name: Option<String>,
}

// Field spelling follows the feed ("appearences").
#[derive(Debug, Default, Deserialize)]
struct GamesBlock {
    #[serde(default)]
    appearences: Option<u32>,
    #[serde(default)]
    minutes: Option<u32>,
    #[serde(default)]
    position: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GoalsBlock {
    #[serde(default)]
    total: Option<u32>,
    #[serde(default)]
    assists: Option<u32>,
}

/// First entry of a `/players` response; `None` when the feed has no record for the player.
pub fn parse_player_stats_json(raw: &str) -> Result<Option<PlayerSeasonStats>> {
    let envelope: StatsEnvelope =
        serde_json::from_str(raw).context("parse player stats response")?;
    let Some(entry) = envelope.response.into_iter().next() else {
        return Ok(None);
    };
    let line = entry.statistics.into_iter().next().unwrap_or_default();
    Ok(Some(PlayerSeasonStats {
        id: entry.player.id,
        name: entry.player.name,
        age: entry.player.age,
        team: line.team.and_then(|t| t.name),
        position: line.games.position.as_deref().and_then(position_from_label),
        appearances: line.games.appearences.unwrap_or(0),
        minutes: line.games.minutes.unwrap_or(0),
        goals: line.goals.total.unwrap_or(0),
        assists: line.goals.assists.unwrap_or(0),
    }))
}

/// Season stats for one player in the Premier League. Any failure yields `None`.
pub fn fetch_player_stats(
    api_key: &str,
    player_id: u64,
    season: u32,
) -> Option<PlayerSeasonStats> {
    let query = [
        ("id", player_id.to_string()),
        ("season", season.to_string()),
        ("league", PREMIER_LEAGUE_ID.to_string()),
    ];
    match api_get("players", &query, api_key).and_then(|body| parse_player_stats_json(&body)) {
        Ok(stats) => stats,
        Err(err) => {
            warn!(player_id, season, error = %err, "player stats fetch failed");
            None
        }
    }
}

/// Live position needs for every registry club; clubs without a squad keep their static table.
pub fn live_position_needs(
    api_key: Option<&str>,
    registry: &ClubRegistry,
) -> BTreeMap<String, BTreeMap<Position, u8>> {
    let mut out = BTreeMap::new();
    for club in registry.profiles() {
        let squad = match (api_key, team_id(&club.name)) {
            (Some(key), Some(id)) => fetch_squad(key, id),
            _ => Vec::new(),
        };
        let needs = if squad.is_empty() {
            club.position_priorities.clone()
        } else {
            info!(club = %club.name, players = squad.len(), "derived needs from live squad");
            position_needs_from_squad(&squad)
        };
        out.insert(club.name.clone(), needs);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SQUAD_JSON: &str = r#"{
        "get": "players/squads",
        "response": [{
            "team": {"id": 42, "name": "Arsenal"},
            "players": [
                {"id": 1, "name": "A Keeper", "age": 29, "number": 1, "position": "Goalkeeper"},
                {"id": 2, "name": "B Back", "age": 24, "number": 4, "position": "Defender"},
                {"id": 3, "name": "C Mid", "age": 25, "number": 8, "position": "Midfielder"},
                {"id": 4, "name": "D Nine", "age": 22, "number": 9, "position": "Attacker"},
                {"id": 5, "name": "E Unknown", "position": null}
            ]
        }]
    }"#;

    #[test]
    fn parses_squad_envelope() {
        let players = parse_squad_json(SQUAD_JSON).unwrap();
        assert_eq!(players.len(), 5);
        assert_eq!(players[0].position(), Some(Position::Goalkeeper));
        assert_eq!(players[4].position(), None);
    }

    #[test]
    fn empty_response_is_empty_squad() {
        let players = parse_squad_json(r#"{"response": []}"#).unwrap();
        assert!(players.is_empty());
    }

    #[test]
    fn thin_squad_has_urgent_needs() {
        let players = parse_squad_json(SQUAD_JSON).unwrap();
        let needs = position_needs_from_squad(&players);
        assert_eq!(needs[&Position::Goalkeeper], 2);
        assert_eq!(needs[&Position::Defender], 3);
        assert_eq!(needs[&Position::Attacker], 3);
    }

    #[test]
    fn offline_needs_fall_back_to_registry() {
        let registry = ClubRegistry::big_six();
        let needs = live_position_needs(None, &registry);
        assert_eq!(needs.len(), 6);
        assert_eq!(needs["Arsenal"], registry.position_priorities("Arsenal"));
    }

    #[test]
    fn empty_stats_response_is_none() {
        assert_eq!(parse_player_stats_json(r#"{"response": []}"#).unwrap(), None);
    }

    #[test]
    fn stats_without_lines_default_to_zero() {
        let raw = r#"{"response": [
            {"player": {"id": 7, "name": "No Minutes"}, "statistics": []}
        ]}"#;
        let stats = parse_player_stats_json(raw).unwrap().unwrap();
        assert_eq!(stats.id, 7);
        assert_eq!((stats.appearances, stats.minutes, stats.goals), (0, 0, 0));
        assert_eq!(stats.position, None);
    }

    #[test]
    fn team_ids_resolve_by_name() {
        assert_eq!(team_id("arsenal"), Some(42));
        assert_eq!(team_id("Unknown FC"), None);
    }
}
