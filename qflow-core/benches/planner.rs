//! Planner and analytics benchmarks over a dense layered graph.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use qflow_core::analysis::{self, BottleneckThresholds};
use qflow_core::graph::{DependencyGraph, IndicatorNode, NodeMetadata};
use qflow_core::plan;

/// `width` nodes per layer, each depending on every node of the previous
/// layer.
fn layered(layers: usize, width: usize) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for layer in 0..layers {
        let deps: Vec<String> = if layer == 0 {
            Vec::new()
        } else {
            (0..width).map(|n| format!("l{}_{n}", layer - 1)).collect()
        };
        for n in 0..width {
            graph
                .add_node(IndicatorNode::new(
                    format!("l{layer}_{n}"),
                    deps.clone(),
                    NodeMetadata {
                        estimated_processing_time: 1.0,
                        ..NodeMetadata::default()
                    },
                ))
                .expect("generated ids are unique");
        }
    }
    graph
}

fn bench_analyze(c: &mut Criterion) {
    let graph = layered(20, 10);
    let thresholds = BottleneckThresholds::default();

    c.bench_function("analyze_layered_20x10", |b| {
        b.iter(|| analysis::analyze(black_box(&graph), &thresholds).unwrap())
    });
}

fn bench_create_plan(c: &mut Criterion) {
    let graph = layered(20, 10);
    let requested: Vec<String> = (0..10).map(|n| format!("l19_{n}")).collect();

    c.bench_function("create_plan_layered_20x10", |b| {
        b.iter(|| plan::create_plan(black_box(&graph), black_box(&requested)).unwrap())
    });
}

criterion_group!(benches, bench_analyze, bench_create_plan);
criterion_main!(benches);
