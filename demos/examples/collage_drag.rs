// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Edge collage during a drag.
//!
//! Drags a piece toward a neighbour one tick at a time and prints each
//! snapped candidate. Near contact the candidate is pulled flush; dragging
//! back out never re-snaps.
//!
//! Run:
//! - `RUST_LOG=strata_engine=trace cargo run -p strata_demos --example collage_drag`

use kurbo::{Rect, Vec2};
use strata_engine::{Editor, EngineConfig, LayerId, MaterialId, NewPiece, Rotation};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let (mut editor, _driver) =
        Editor::with_test_driver(EngineConfig::default()).expect("default config is valid");
    let piece = |x: f64| NewPiece {
        layer: LayerId::Base,
        rect: Rect::new(x, 0.0, x + 50.0, 50.0),
        rotation: Rotation::R0,
        material: MaterialId(0),
    };
    editor.insert_piece(piece(100.0)).expect("free spot");
    let moving = editor.insert_piece(piece(0.0)).expect("free spot");

    editor.select(moving).expect("piece exists");
    editor.begin_drag().expect("selection is not empty");
    for dx in [40.0, 48.0, 49.4, 49.8, 49.2, 47.0] {
        let feedback = editor.update_drag(Vec2::new(dx, 0.0)).expect("drag in progress");
        let c = feedback.candidates[0].aabb;
        println!(
            "dx {dx:>5.1} -> x0 {:>6.2}  collaged {:?}  problems {}",
            c.x0,
            feedback.collaged,
            feedback.problems.len()
        );
    }
    println!("{:?}", editor.end_drag().expect("drag in progress"));
}
