// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

#![cfg(feature = "compare_rstar")]

use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};
use strata_index::{Aabb2D, TreeIndex};

use rstar::primitives::Rectangle;
use rstar::{AABB, RTree};

/// A tiled layer: `n` x `n` square pieces with a 1 mm joint.
fn tiled_layer(n: usize, pitch: f64) -> Vec<Aabb2D<f64>> {
    (0..n * n)
        .map(|i| {
            let x0 = (i % n) as f64 * pitch;
            let y0 = (i / n) as f64 * pitch;
            Aabb2D::<f64>::from_xywh(x0, y0, pitch - 1.0, pitch - 1.0)
        })
        .collect()
}

fn to_rstar(v: &[Aabb2D<f64>]) -> Vec<Rectangle<[f64; 2]>> {
    v.iter()
        .map(|r| Rectangle::from_corners([r.min_x, r.min_y], [r.max_x, r.max_y]))
        .collect()
}

/// Support probes: one per piece, slightly inflated, as the exact snapshot does.
fn support_probes(v: &[Aabb2D<f64>]) -> Vec<Aabb2D<f64>> {
    v.iter()
        .step_by(7)
        .map(|r| Aabb2D::new(r.min_x - 1.0, r.min_y - 1.0, r.max_x + 1.0, r.max_y + 1.0))
        .collect()
}

fn bench_build_and_probe(c: &mut Criterion) {
    let mut group = c.benchmark_group("rtree_external_compare_f64");
    for &n in &[32usize, 64] {
        let rects = tiled_layer(n, 20.0);
        let probes = support_probes(&rects);
        group.throughput(Throughput::Elements((n * n) as u64));

        group.bench_function(format!("strata_incremental_n{}", n * n), |b| {
            b.iter_batched(
                TreeIndex::<f64, u32>::new,
                |mut idx| {
                    for (i, r) in rects.iter().copied().enumerate() {
                        let _ = idx.insert(r, i as u32);
                    }
                    let _ = idx.commit();
                    let hits: usize = probes.iter().map(|p| idx.query_rect(*p).count()).sum();
                    black_box(hits);
                },
                BatchSize::SmallInput,
            )
        });

        let entries: Vec<_> = rects
            .iter()
            .copied()
            .enumerate()
            .map(|(i, r)| (r, i as u32))
            .collect();
        group.bench_function(format!("strata_bulk_n{}", n * n), |b| {
            b.iter(|| {
                let idx = TreeIndex::<f64, u32>::with_rtree_bulk(&entries);
                let hits: usize = probes.iter().map(|p| idx.query_rect(*p).count()).sum();
                black_box(hits);
            })
        });

        group.bench_function(format!("rstar_bulk_n{}", n * n), |b| {
            b.iter_batched(
                || to_rstar(&rects),
                |rectangles| {
                    let tree = RTree::bulk_load(rectangles);
                    let hits: usize = probes
                        .iter()
                        .map(|p| {
                            let env = AABB::from_corners([p.min_x, p.min_y], [p.max_x, p.max_y]);
                            tree.locate_in_envelope_intersecting(&env).count()
                        })
                        .sum();
                    black_box(hits);
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_build_and_probe);
criterion_main!(benches);
