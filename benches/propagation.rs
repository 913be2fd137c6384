//! Propagation benchmark: full risk run over layered models of growing size.

mod common;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dadm_riskgraph::RiskEngine;

fn bench_build(c: &mut Criterion) {
    let doc = common::layered(50, 10);
    c.bench_function("build_graph_500_threats", |b| b.iter(|| black_box(doc.build().unwrap())));
}

fn bench_propagate(c: &mut Criterion) {
    let engine = RiskEngine::new(Default::default());
    let mut group = c.benchmark_group("propagate");
    for (width, depth) in [(10, 5), (50, 10), (100, 20)] {
        let (scales, graph) = common::layered(width, depth).build().unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(width * depth), &graph, |b, graph| {
            b.iter(|| {
                let mut g = graph.clone();
                black_box(engine.run(&mut g, &scales).unwrap())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_propagate);
criterion_main!(benches);
