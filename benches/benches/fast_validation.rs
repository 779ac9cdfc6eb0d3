// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use kurbo::{Rect, Vec2};
use strata_engine::{
    Editor, EngineConfig, IndexConfig, LayerId, ManualClock, MaterialId, NewPiece, Rotation,
    StrategyConfig,
};
use std::sync::Arc;

/// A base layer tiled with `n` x `n` pieces and a middle layer on every other tile.
fn tiled_editor(n: usize, strategy: StrategyConfig) -> Editor {
    let config = EngineConfig {
        scene_width: 2000.0,
        scene_height: 2000.0,
        index: IndexConfig {
            strategy,
            ..IndexConfig::default()
        },
        ..EngineConfig::default()
    };
    let mut editor = Editor::new(config, Arc::new(ManualClock::default())).unwrap();
    let pitch = 40.0;
    for i in 0..n * n {
        let x = (i % n) as f64 * pitch;
        let y = (i / n) as f64 * pitch;
        for (layer, inset) in [(LayerId::Base, 0.0), (LayerId::Middle, 5.0)] {
            if layer == LayerId::Middle && i % 2 == 1 {
                continue;
            }
            editor
                .insert_piece(NewPiece {
                    layer,
                    rect: Rect::new(x, y, x + pitch - 4.0, y + pitch - 4.0)
                        .inflate(-inset, -inset),
                    rotation: Rotation::R0,
                    material: MaterialId(0),
                })
                .unwrap();
        }
    }
    editor
}

fn bench_drag_ticks(c: &mut Criterion) {
    let mut group = c.benchmark_group("drag_ticks");
    for (name, strategy) in [
        ("linear", StrategyConfig::Linear),
        ("tree", StrategyConfig::Tree),
        ("auto", StrategyConfig::Auto),
    ] {
        for &n in &[6usize, 16] {
            group.bench_function(format!("{name}_n{}", n * n), |b| {
                b.iter_batched(
                    || {
                        let mut editor = tiled_editor(n, strategy);
                        let first = editor.scene().pieces_on(LayerId::Middle).next().unwrap().id;
                        editor.select(first).unwrap();
                        editor.begin_drag().unwrap();
                        editor
                    },
                    |mut editor| {
                        for step in 0..32 {
                            let d = f64::from(step) * 1.25;
                            black_box(editor.update_drag(Vec2::new(d, d)).unwrap());
                        }
                        editor.cancel_gesture();
                    },
                    BatchSize::SmallInput,
                )
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_drag_ticks);
criterion_main!(benches);
