use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

use transfer_predictor::artifact::ModelArtifact;
use transfer_predictor::clubs::ClubRegistry;
use transfer_predictor::forest::ForestParams;
use transfer_predictor::predict::PredictionService;
use transfer_predictor::records::{PlayerRecord, Position};
use transfer_predictor::squad_fetch::{parse_squad_json, position_needs_from_squad};
use transfer_predictor::synthetic;
use transfer_predictor::training::{self, TrainingParams};

fn sample_player() -> PlayerRecord {
    PlayerRecord {
        age: 26,
        market_value: 45_000_000,
        goals: 18,
        assists: 8,
        minutes_played: 1800,
        position: Position::Attacker,
        contract_years_left: 1,
        wants_move: true,
        position_need: 3,
    }
}

fn small_params() -> TrainingParams {
    TrainingParams {
        forest: ForestParams {
            n_trees: 20,
            ..ForestParams::default()
        },
        ..TrainingParams::default()
    }
}

fn bench_generate(c: &mut Criterion) {
    c.bench_function("generate_500", |b| {
        b.iter(|| {
            let rows = synthetic::generate(black_box(500), 42);
            black_box(rows.len());
        })
    });
}

fn bench_train(c: &mut Criterion) {
    let rows = synthetic::generate(500, 42);
    let params = small_params();
    let mut group = c.benchmark_group("train");
    group.sample_size(10);
    group.bench_function("train_500_rows_20_trees", |b| {
        b.iter(|| {
            let outcome = training::train(black_box(&rows), &params).unwrap();
            black_box(outcome.accuracy());
        })
    });
    group.finish();
}

fn bench_predict(c: &mut Criterion) {
    let rows = synthetic::generate(500, 42);
    let outcome = training::train(&rows, &TrainingParams::default()).unwrap();
    let service =
        PredictionService::new(ModelArtifact::from_training(outcome, ClubRegistry::big_six()));
    let player = sample_player();

    c.bench_function("predict_one", |b| {
        b.iter(|| {
            let p = service.predict_one(black_box(&player), "Arsenal").unwrap();
            black_box(p.probability);
        })
    });
    c.bench_function("predict_all", |b| {
        b.iter(|| {
            let cmp = service.predict_all(black_box(&player)).unwrap();
            black_box(cmp.ranked.len());
        })
    });
}

fn bench_squad_parse(c: &mut Criterion) {
    c.bench_function("squad_parse_needs", |b| {
        b.iter(|| {
            let squad = parse_squad_json(black_box(SQUAD_JSON)).unwrap();
            black_box(position_needs_from_squad(&squad));
        })
    });
}

criterion_group!(
    perf,
    bench_generate,
    bench_train,
    bench_predict,
    bench_squad_parse
);
criterion_main!(perf);

static SQUAD_JSON: &str = include_str!("../tests/fixtures/squad_arsenal.json");
