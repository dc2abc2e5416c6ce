use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::records::{PlayerRecord, Position, TrainingRow, TransferFeatures};

pub const DEFAULT_SAMPLES: usize = 500;
pub const DEFAULT_SEED: u64 = 42;
pub const LABEL_THRESHOLD: f64 = 0.6;

const MILLION: u64 = 1_000_000;
const NOISE_STD: f64 = 0.1;

/// Generates a labeled synthetic season. Identical `(count, seed)` pairs give identical rows.
pub fn generate(count: usize, seed: u64) -> Vec<TrainingRow> {
    let mut rng = StdRng::seed_from_u64(seed);
    let rows = generate_with(count, &mut rng);
    info!(
        rows = rows.len(),
        seed,
        transfer_rate = transfer_rate(&rows),
        "generated synthetic transfer dataset"
    );
    rows
}

pub fn generate_with<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<TrainingRow> {
    (0..count).map(|_| synthetic_row(rng)).collect()
}

pub fn transfer_rate(rows: &[TrainingRow]) -> f64 {
    if rows.is_empty() {
        return 0.0;
    }
    let positives = rows.iter().filter(|r| r.transfer_happened).count();
    positives as f64 / rows.len() as f64
}

fn synthetic_row<R: Rng + ?Sized>(rng: &mut R) -> TrainingRow {
    let age = rng.gen_range(18..35);
    let market_value = rng.gen_range(5..100) * MILLION;
    let goals = if rng.gen_bool(0.6) {
        rng.gen_range(0..30)
    } else {
        0
    };
    let assists = rng.gen_range(0..20);
    let minutes_played = rng.gen_range(500..3500);
    let position = Position::ALL[rng.gen_range(0..Position::ALL.len())];

    // Club context is drawn independently of the real registry.
    let club_budget = rng.gen_range(50..200) * MILLION;
    let club_league_position = rng.gen_range(1..20);
    let club_continental_competition = rng.gen_bool(0.3);

    let contract_years_left = rng.gen_range(0..5);
    let wants_move = rng.gen_bool(0.3);
    let position_need = rng.gen_range(0..4);

    let features = TransferFeatures {
        player: PlayerRecord {
            age,
            market_value,
            goals,
            assists,
            minutes_played,
            position,
            contract_years_left,
            wants_move,
            position_need,
        },
        club_budget,
        club_league_position,
        club_continental_competition,
    };

    let noise = NOISE_STD * standard_normal(rng);
    let transfer_probability = (transfer_score(&features) + noise).clamp(0.0, 1.0);
    TrainingRow {
        features,
        transfer_happened: transfer_probability > LABEL_THRESHOLD,
        transfer_probability,
    }
}

/// Hand-coded transfer likelihood before noise.
pub fn transfer_score(row: &TransferFeatures) -> f64 {
    let p = &row.player;
    let mut score = 0.1;

    if (22..=28).contains(&p.age) {
        score += 0.3;
    } else if p.age > 30 {
        score -= 0.2;
    }

    let value = p.market_value as f64;
    let budget = row.club_budget as f64;
    if value <= budget * 0.3 {
        score += 0.4;
    } else if value > budget * 0.5 {
        score -= 0.3;
    }

    if p.goals > 15 || p.assists > 10 {
        score += 0.2;
    }
    score += 0.15 * p.position_need as f64;
    if p.contract_years_left <= 1 {
        score += 0.25;
    }
    if p.wants_move {
        score += 0.2;
    }
    if row.club_continental_competition {
        score += 0.1;
    }
    score
}

// Box-Muller; the lower bound keeps ln() finite.
fn standard_normal<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.r#gen();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}
