use transfer_predictor::records::Position;
use transfer_predictor::squad_fetch::{
    BIG_SIX_TEAM_IDS, parse_player_stats_json, parse_squad_json, position_from_label,
    position_needs_from_squad,
};

static SQUAD_JSON: &str = include_str!("fixtures/squad_arsenal.json");
static PLAYER_STATS_JSON: &str = include_str!("fixtures/player_stats_saka.json");

#[test]
fn fixture_squad_parses() {
    let squad = parse_squad_json(SQUAD_JSON).unwrap();
    assert_eq!(squad.len(), 12);
    assert!(squad.iter().any(|p| p.name == "B. Saka"));
    assert!(squad.iter().all(|p| p.position().is_some()));
}

#[test]
fn needs_reflect_squad_depth() {
    let squad = parse_squad_json(SQUAD_JSON).unwrap();
    let needs = position_needs_from_squad(&squad);
    // 1 keeper, 5 defenders, 3 midfielders, 3 attackers against targets 3/8/8/6.
    assert_eq!(needs[&Position::Goalkeeper], 2);
    assert_eq!(needs[&Position::Defender], 3);
    assert_eq!(needs[&Position::Midfielder], 3);
    assert_eq!(needs[&Position::Attacker], 3);
    assert!(needs.values().all(|v| *v <= 3));
}

#[test]
fn labels_map_to_positions() {
    assert_eq!(position_from_label("Goalkeeper"), Some(Position::Goalkeeper));
    assert_eq!(position_from_label("defender"), Some(Position::Defender));
    assert_eq!(position_from_label(" Midfielder "), Some(Position::Midfielder));
    assert_eq!(position_from_label("Attacker"), Some(Position::Attacker));
    assert_eq!(position_from_label("Coach"), None);
}

#[test]
fn every_big_six_club_has_a_team_id() {
    assert_eq!(BIG_SIX_TEAM_IDS.len(), 6);
    assert!(BIG_SIX_TEAM_IDS.iter().any(|(name, id)| *name == "Arsenal" && *id == 42));
}

#[test]
fn garbage_body_is_an_error() {
    assert!(parse_squad_json("<html>rate limited</html>").is_err());
}

#[test]
fn fixture_player_stats_parse() {
    let stats = parse_player_stats_json(PLAYER_STATS_JSON).unwrap().unwrap();
    assert_eq!(stats.id, 1460);
    assert_eq!(stats.name, "B. Saka");
    assert_eq!(stats.age, Some(23));
    assert_eq!(stats.team.as_deref(), Some("Arsenal"));
    assert_eq!(stats.position, Some(Position::Attacker));
    assert_eq!(stats.appearances, 25);
    assert_eq!(stats.minutes, 1966);
    assert_eq!(stats.goals, 6);
    assert_eq!(stats.assists, 10);
}

#[test]
fn player_stats_garbage_is_an_error() {
    assert!(parse_player_stats_json("not json").is_err());
}
