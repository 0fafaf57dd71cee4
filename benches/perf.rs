use criterion::{Criterion, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

use teg_stats::config::LeagueConfig;
use teg_stats::cumulative::{add_cumulative_scores, join_round_info};
use teg_stats::model::{ScoreRow, TransformedRow};
use teg_stats::transform::transform;
use teg_stats::views::{AggregationLevel, aggregate_data};

const PLAYERS: [&str; 7] = ["AB", "JB", "DM", "GW", "HM", "SN", "JP"];

fn sample_history(editions: u32) -> Vec<TransformedRow> {
    let mut rng = StdRng::seed_from_u64(17);
    let mut scores = Vec::new();
    for teg in 1..=editions {
        for round in 1..=4 {
            for pl in PLAYERS {
                for hole in 1..=18 {
                    let par = rng.gen_range(3..=5);
                    scores.push(ScoreRow {
                        teg_num: teg,
                        round,
                        hole,
                        par,
                        si: hole,
                        pl: pl.to_string(),
                        score: par + rng.gen_range(-1..=4),
                    });
                }
            }
        }
    }
    transform(&scores, &[], &LeagueConfig::default())
        .expect("generated scores are valid")
        .rows
}

fn bench_cumulative(c: &mut Criterion) {
    let rows = sample_history(20);
    c.bench_function("add_cumulative_scores_20_editions", |b| {
        b.iter(|| add_cumulative_scores(join_round_info(black_box(rows.clone()), &[])))
    });
}

fn bench_rollups(c: &mut Criterion) {
    let rows = sample_history(20);
    c.bench_function("aggregate_front_back_20_editions", |b| {
        b.iter(|| aggregate_data(black_box(&rows), AggregationLevel::FrontBack))
    });
}

criterion_group!(benches, bench_cumulative, bench_rollups);
criterion_main!(benches);
