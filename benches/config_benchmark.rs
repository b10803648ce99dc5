//! Load, validate and resolve an Ape-X agent document

use apex_config::config::AgentConfig;
use apex_config::json::equivalent;
use apex_config::worker::{SampleBatch, Transition};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ndarray::Array1;
use serde_json::Value;

const APEX_AGENT: &str = include_str!("../configs/apex_agent.json");

fn bench_parse(c: &mut Criterion) {
    c.bench_function("parse apex agent", |b| {
        b.iter(|| AgentConfig::from_json_str(black_box(APEX_AGENT)).unwrap())
    });
}

fn bench_validate(c: &mut Criterion) {
    let config = AgentConfig::from_json_str(APEX_AGENT).unwrap();
    c.bench_function("validate apex agent", |b| b.iter(|| black_box(&config).validation_report()));
}

fn bench_round_trip(c: &mut Criterion) {
    let original: Value = serde_json::from_str(APEX_AGENT).unwrap();
    let config = AgentConfig::from_value(original.clone()).unwrap();
    c.bench_function("round trip apex agent", |b| {
        b.iter(|| {
            let emitted = black_box(&config).to_value().unwrap();
            equivalent(&original, &emitted)
        })
    });
    c.bench_function("resolve defaults", |b| b.iter(|| black_box(config.clone()).with_defaults()));
}

fn bench_n_step(c: &mut Criterion) {
    let batch: SampleBatch = (0..100)
        .map(|i| Transition {
            state: Array1::from_elem(84, i as f32),
            action: i % 4,
            reward: (i % 7) as f32 - 3.0,
            next_state: Array1::from_elem(84, i as f32 + 1.0),
            terminal: i % 50 == 49,
        })
        .collect();
    c.bench_function("n-step adjust 100 transitions", |b| {
        b.iter(|| {
            let mut batch = batch.clone();
            batch.clip_rewards();
            batch.n_step_adjust(3, 0.99);
            batch
        })
    });
}

criterion_group!(benches, bench_parse, bench_validate, bench_round_trip, bench_n_step);
criterion_main!(benches);
