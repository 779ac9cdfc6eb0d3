// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Legacy document import.
//!
//! Loads a version 1 document, whose pieces carry an integer `level`, and
//! prints the migrated layer table as version 2 JSON.
//!
//! Run:
//! - `cargo run -p strata_demos --example scene_document`

use strata_engine::{Editor, EngineConfig, LayerId};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const LEGACY: &str = r#"{
  "version": 1,
  "width": 600,
  "height": 400,
  "pieces": [
    { "id": 1, "level": 0, "x": 0,   "y": 0, "width": 200, "height": 100 },
    { "id": 2, "level": 0, "x": 204, "y": 0, "width": 200, "height": 100 },
    { "id": 3, "level": 1, "x": 150, "y": 20, "width": 100, "height": 60, "rotation": 180 },
    { "id": 4, "level": 3, "x": 170, "y": 30, "width": 20, "height": 20 }
  ]
}"#;

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .init();

    let (mut editor, _driver) =
        Editor::with_test_driver(EngineConfig::default()).expect("default config is valid");
    editor.load_json(LEGACY).expect("legacy document parses");

    for layer in LayerId::ALL {
        let ids: Vec<String> = editor
            .scene()
            .pieces_on(layer)
            .map(|p| p.id.to_string())
            .collect();
        println!("{layer:>6}: {}", ids.join(" "));
    }
    let report = editor.report();
    println!("{} finding(s), blocking: {}", report.problems.len(), report.has_block);
    println!("{}", editor.export_json().expect("scene serializes"));
}
