// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Exact support checks on a tokio runtime.
//!
//! Places a piece across a hole in its support, pumps the exact jobs through
//! an `ExactRunner`, and prints the ghost state before and after. Then fills
//! the hole and shows the dependent recheck clearing the ghost.
//!
//! Run:
//! - `RUST_LOG=strata_engine=debug cargo run -p strata_demos --example ghost_session`

use std::sync::Arc;

use kurbo::Rect;
use strata_engine::{
    Editor, EngineConfig, ExactRunner, LayerId, MaterialId, NewPiece, PieceId, RectilinearOracle,
    Rotation, SystemClock,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn place(editor: &mut Editor, layer: LayerId, rect: Rect) -> PieceId {
    editor
        .insert_piece(NewPiece {
            layer,
            rect,
            rotation: Rotation::R0,
            material: MaterialId(0),
        })
        .expect("placement is legal")
}

async fn pump(editor: &mut Editor, runner: &mut ExactRunner) {
    runner.submit_all(editor.take_exact_jobs());
    while let Some(outcome) = runner.next().await {
        let _ = editor.apply_exact_outcome(outcome);
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut editor = Editor::new(EngineConfig::default(), Arc::new(SystemClock))
        .expect("default config is valid");
    let mut runner =
        ExactRunner::from_current(Arc::new(RectilinearOracle)).expect("inside a tokio runtime");

    place(&mut editor, LayerId::Base, Rect::new(100.0, 100.0, 150.0, 150.0));
    place(&mut editor, LayerId::Base, Rect::new(200.0, 100.0, 250.0, 150.0));
    let bridge = place(&mut editor, LayerId::Middle, Rect::new(150.0, 100.0, 200.0, 150.0));
    println!("before exact: {:?}", editor.ghost_state(bridge));

    pump(&mut editor, &mut runner).await;
    println!("after exact:  {:?}", editor.ghost_state(bridge));
    for problem in editor.problems(bridge) {
        println!("  {} {:?}", problem.code, problem.measure);
    }

    place(&mut editor, LayerId::Base, Rect::new(150.0, 100.0, 200.0, 150.0));
    println!("hole filled:  {:?}", editor.ghost_state(bridge));

    let debounce = editor.config().idle_debounce_ms;
    tokio::time::sleep(std::time::Duration::from_millis(debounce.unsigned_abs() + 10)).await;
    editor.poll_idle();
    pump(&mut editor, &mut runner).await;
    println!("rechecked:    {:?}", editor.exact_outcome(bridge).map(|o| &o.verdict));
}
