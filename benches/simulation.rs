//! Pipeline construction and simulation benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sumbits_sim::PopcountPipeline;
use sumbits_tree::{Netlist, PopcountTree, ResetKind};

fn benchmark_tree_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_build");

    for width in [17usize, 64, 256, 1024] {
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            b.iter(|| {
                let tree = PopcountTree::build(black_box(width)).unwrap();
                black_box(tree.depth())
            });
        });
    }

    group.finish();
}

fn benchmark_pipeline_advance(c: &mut Criterion) {
    let mut group = c.benchmark_group("pipeline_advance");

    for width in [17usize, 32, 64] {
        group.throughput(Throughput::Elements(100));
        group.bench_with_input(BenchmarkId::from_parameter(width), &width, |b, &width| {
            let mut pipeline = PopcountPipeline::new(width).unwrap();
            pipeline.advance_value(true, 0).unwrap();
            let mask = if width == 64 { u64::MAX } else { (1u64 << width) - 1 };

            b.iter(|| {
                let mut value = 0x9e37_79b9_7f4a_7c15u64;
                for _ in 0..100 {
                    value = value.rotate_left(7) ^ 0x5bd1_e995;
                    black_box(pipeline.advance_value(false, value & mask).unwrap());
                }
            });
        });
    }

    group.finish();
}

fn benchmark_netlist_export(c: &mut Criterion) {
    let tree = PopcountTree::build(1024).unwrap();
    c.bench_function("netlist_json_1024", |b| {
        b.iter(|| {
            let netlist = Netlist::from_tree(&tree, "sumbits", ResetKind::Asynchronous);
            black_box(netlist.to_json_pretty().unwrap().len())
        });
    });
}

criterion_group!(
    benches,
    benchmark_tree_build,
    benchmark_pipeline_advance,
    benchmark_netlist_export
);
criterion_main!(benches);
