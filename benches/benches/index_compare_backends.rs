// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use strata_index::{
    Aabb2D, AdaptiveIndex, Index, IndexStrategy, StrategyThresholds, TreeIndex,
};

fn gen_grid_rects(n: usize, cell: f64) -> Vec<Aabb2D<f64>> {
    let mut out = Vec::with_capacity(n * n);
    for y in 0..n {
        for x in 0..n {
            let x0 = x as f64 * cell;
            let y0 = y as f64 * cell;
            // Pieces leave a 1 mm joint, like a tiled layer.
            out.push(Aabb2D::<f64>::from_xywh(x0, y0, cell - 1.0, cell - 1.0));
        }
    }
    out
}

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }
}

fn gen_random_rects(count: usize, extent: f64, min_side: f64, max_side: f64) -> Vec<Aabb2D<f64>> {
    let mut out = Vec::with_capacity(count);
    let mut rng = Rng::new(0xCAFE_F00D_DEAD_BEEF);
    for _ in 0..count {
        let w = min_side + rng.next_f64() * (max_side - min_side);
        let h = min_side + rng.next_f64() * (max_side - min_side);
        let x0 = rng.next_f64() * (extent - w).max(1.0);
        let y0 = rng.next_f64() * (extent - h).max(1.0);
        out.push(Aabb2D::<f64>::from_xywh(x0, y0, w, h));
    }
    out
}

fn auto() -> AdaptiveIndex<f64, u32> {
    AdaptiveIndex::with_strategy(IndexStrategy::Auto, StrategyThresholds::default())
}

macro_rules! build_query {
    ($group:expr, $name:expr, $rects:expr, $make:expr, $probe:expr) => {
        $group.bench_function($name, |b| {
            b.iter_batched(
                $make,
                |mut idx| {
                    for (i, r) in $rects.iter().copied().enumerate() {
                        let _ = idx.insert(r, i as u32);
                    }
                    let _ = idx.commit();
                    let hits: usize = idx.query_rect($probe).count();
                    black_box(hits);
                },
                BatchSize::SmallInput,
            )
        });
    };
}

/// Build and query around the auto-switch band, where scenes of this editor live.
fn bench_small_scenes(c: &mut Criterion) {
    let mut group = c.benchmark_group("small_scenes");
    let probe = Aabb2D::<f64>::from_xywh(20.0, 20.0, 60.0, 60.0);
    for &n in &[4usize, 8, 12] {
        let rects = gen_grid_rects(n, 25.0);
        group.throughput(Throughput::Elements((n * n) as u64));
        build_query!(group, format!("linear_n{}", n * n), rects, Index::<f64, u32>::new, probe);
        build_query!(group, format!("tree_n{}", n * n), rects, TreeIndex::<f64, u32>::new, probe);
        build_query!(group, format!("adaptive_n{}", n * n), rects, auto, probe);
    }
    group.finish();
}

fn bench_large_scenes(c: &mut Criterion) {
    let mut group = c.benchmark_group("large_scenes");
    let probe = Aabb2D::<f64>::from_xywh(800.0, 800.0, 400.0, 400.0);
    let rects = gen_random_rects(4096, 2000.0, 5.0, 40.0);
    group.throughput(Throughput::Elements(rects.len() as u64));
    build_query!(group, "linear_random", rects, Index::<f64, u32>::new, probe);
    build_query!(group, "tree_random", rects, TreeIndex::<f64, u32>::new, probe);
    build_query!(group, "adaptive_random", rects, auto, probe);
    group.finish();
}

/// One drag tick: move one piece, commit, probe its neighbourhood.
fn bench_drag_ticks(c: &mut Criterion) {
    let mut group = c.benchmark_group("drag_ticks");
    let rects = gen_grid_rects(16, 25.0);
    for (name, strategy) in [
        ("linear", IndexStrategy::ForceLinear),
        ("tree", IndexStrategy::ForceTree),
    ] {
        group.bench_function(format!("{name}_move_commit_probe"), |b| {
            b.iter_batched(
                || {
                    let mut idx: AdaptiveIndex<f64, u32> =
                        AdaptiveIndex::with_strategy(strategy, StrategyThresholds::default());
                    let keys: Vec<_> = rects
                        .iter()
                        .copied()
                        .enumerate()
                        .map(|(i, r)| idx.insert(r, i as u32))
                        .collect();
                    let _ = idx.commit();
                    (idx, keys[0])
                },
                |(mut idx, key)| {
                    for step in 0..64 {
                        let x = step as f64 * 3.0;
                        let aabb = Aabb2D::<f64>::from_xywh(x, 0.0, 24.0, 24.0);
                        idx.update(key, aabb);
                        let _ = idx.commit();
                        let probe = Aabb2D::<f64>::from_xywh(x - 3.0, -3.0, 30.0, 30.0);
                        black_box(idx.query_rect(probe).count());
                    }
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

fn bench_bulk_tree(c: &mut Criterion) {
    let mut group = c.benchmark_group("tree_bulk");
    let rects = gen_random_rects(4096, 2000.0, 5.0, 40.0);
    let entries: Vec<_> = rects
        .iter()
        .copied()
        .enumerate()
        .map(|(i, r)| (r, i as u32))
        .collect();
    group.bench_function("bulk_load_query", |b| {
        b.iter(|| {
            let idx = TreeIndex::<f64, u32>::with_rtree_bulk(&entries);
            let hits = idx
                .query_rect(Aabb2D::<f64>::from_xywh(800.0, 800.0, 400.0, 400.0))
                .count();
            black_box(hits);
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_small_scenes,
    bench_large_scenes,
    bench_drag_ticks,
    bench_bulk_tree,
);
criterion_main!(benches);
