//! Attack tree benchmark: shortest-path and all-path trees for a deep target.

mod common;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dadm_riskgraph::{attack::AttackPathEngine, config::AttackPathConfig, RiskMode};

fn bench_attack_tree(c: &mut Criterion) {
    let (scales, graph) = common::propagated(20, 8);
    let engine = AttackPathEngine::new(&graph, &scales, AttackPathConfig::default());
    let targets = vec!["m8_0".to_string(), "m8_7".to_string()];

    c.bench_function("attack_tree_shortest_paths", |b| {
        b.iter(|| black_box(engine.build_tree(&targets, RiskMode::Current, false, false).unwrap()))
    });
    c.bench_function("attack_tree_all_paths", |b| {
        b.iter(|| black_box(engine.build_tree(&targets, RiskMode::Current, true, false).unwrap()))
    });
}

criterion_group!(benches, bench_attack_tree);
criterion_main!(benches);
