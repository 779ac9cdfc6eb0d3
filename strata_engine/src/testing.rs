// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared fixtures for unit tests.

use kurbo::Rect;

use crate::config::EngineConfig;
use crate::scene::{Command, NewPiece, Scene, reduce};
use crate::scene_index::SceneIndex;
use crate::types::{LayerId, MaterialId, Rotation};

/// Default config, a 1000 x 1000 scene holding `pieces` (ids from 1), and its index.
pub(crate) fn scene_with(pieces: &[(LayerId, Rect)]) -> (EngineConfig, Scene, SceneIndex) {
    let config = EngineConfig::default();
    let mut scene = Scene::new(config.scene_width, config.scene_height);
    for &(layer, rect) in pieces {
        scene = reduce(
            &scene,
            Command::Insert(NewPiece {
                layer,
                rect,
                rotation: Rotation::R0,
                material: MaterialId(0),
            }),
        )
        .expect("fixture insert")
        .scene;
    }
    let index = SceneIndex::from_scene(&config.index, &scene);
    (config, scene, index)
}
