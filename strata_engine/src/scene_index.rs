// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-layer spatial index over committed piece footprints.
//!
//! Each layer owns one [`AdaptiveIndex`]. Staged edits become visible to
//! queries only after [`SceneIndex::commit`], which commits every layer in one
//! step.

use std::collections::HashMap;

use kurbo::Rect;
use strata_index::{ActiveBackend, AdaptiveIndex, CommitDelta, Key};

use crate::config::IndexConfig;
use crate::error::invariant_violation;
use crate::geometry::{aabb_to_rect, rect_to_aabb};
use crate::scene::{GeometryChange, Scene};
use crate::types::{LayerId, PieceId};

/// Which layers a range query covers.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LayerFilter {
    /// One layer.
    Only(LayerId),
    /// Every layer.
    All,
}

/// Per-layer commit report.
#[derive(Clone, Debug, Default)]
pub struct SceneDelta {
    /// One delta per layer, bottom first.
    pub layers: [CommitDelta<f64, PieceId>; 3],
}

impl SceneDelta {
    /// Union of every changed footprint on `layer`.
    pub fn region(&self, layer: LayerId) -> Option<Rect> {
        self.layers[layer.index()].union().map(aabb_to_rect)
    }

    /// Whether nothing changed on any layer.
    pub fn is_empty(&self) -> bool {
        self.layers.iter().all(CommitDelta::is_empty)
    }
}

/// Layered index of committed footprints.
#[derive(Debug)]
pub struct SceneIndex {
    layers: [AdaptiveIndex<f64, PieceId>; 3],
    keys: HashMap<PieceId, (LayerId, Key)>,
}

impl SceneIndex {
    /// Empty index with the given strategy and thresholds on every layer.
    pub fn new(config: &IndexConfig) -> Self {
        let strategy = config.strategy.into();
        let thresholds = config.thresholds();
        Self {
            layers: [(); 3].map(|()| AdaptiveIndex::with_strategy(strategy, thresholds)),
            keys: HashMap::new(),
        }
    }

    /// Index holding every piece of `scene`, committed.
    pub fn from_scene(config: &IndexConfig, scene: &Scene) -> Self {
        let mut index = Self::new(config);
        for piece in scene.pieces() {
            index.insert(piece.id, piece.layer, piece.aabb());
        }
        let _ = index.commit();
        index
    }

    /// Stage a new entry.
    pub fn insert(&mut self, id: PieceId, layer: LayerId, aabb: Rect) {
        if let Some(&(old_layer, _)) = self.keys.get(&id) {
            if old_layer != layer {
                invariant_violation!("piece {id} indexed on {old_layer} re-inserted on {layer}");
            }
            self.update(id, aabb);
            return;
        }
        let key = self.layers[layer.index()].insert(rect_to_aabb(aabb), id);
        self.keys.insert(id, (layer, key));
    }

    /// Stage removal of an entry.
    pub fn remove(&mut self, id: PieceId) {
        if let Some((layer, key)) = self.keys.remove(&id) {
            self.layers[layer.index()].remove(key);
        }
    }

    /// Stage a new footprint for an entry.
    pub fn update(&mut self, id: PieceId, aabb: Rect) {
        if let Some(&(layer, key)) = self.keys.get(&id) {
            self.layers[layer.index()].update(key, rect_to_aabb(aabb));
        }
    }

    /// Stage the changes of one reducer transition.
    pub fn stage(&mut self, changes: &[GeometryChange]) {
        for change in changes {
            match change.after {
                Some(after) if change.before.is_none() => {
                    self.insert(change.id, change.layer, after);
                }
                Some(after) => self.update(change.id, after),
                None => self.remove(change.id),
            }
        }
    }

    /// Apply staged edits on every layer.
    pub fn commit(&mut self) -> SceneDelta {
        let mut delta = SceneDelta::default();
        for (layer, index) in LayerId::ALL.into_iter().zip(&mut self.layers) {
            let before = index.backend().active();
            delta.layers[layer.index()] = index.commit();
            let after = index.backend().active();
            if before != after {
                tracing::debug!(%layer, ?after, items = index.len(), "index strategy switched");
            }
        }
        delta
    }

    /// Committed ids on the filtered layers whose footprint touches or intersects `rect`.
    pub fn query_range(&self, filter: LayerFilter, rect: Rect) -> Vec<PieceId> {
        let aabb = rect_to_aabb(rect);
        match filter {
            LayerFilter::Only(layer) => self.layers[layer.index()]
                .query_rect(aabb)
                .map(|(_, id)| id)
                .collect(),
            LayerFilter::All => self
                .layers
                .iter()
                .flat_map(|index| index.query_rect(aabb).map(|(_, id)| id))
                .collect(),
        }
    }

    /// Committed footprint of `id`.
    pub fn footprint(&self, id: PieceId) -> Option<Rect> {
        let &(layer, key) = self.keys.get(&id)?;
        self.layers[layer.index()].get(key).map(|(a, _)| aabb_to_rect(a))
    }

    /// Committed entries on `layer`.
    pub fn layer_len(&self, layer: LayerId) -> usize {
        self.layers[layer.index()].len()
    }

    /// Committed entries on every layer.
    pub fn len(&self) -> usize {
        self.layers.iter().map(|index| index.len()).sum()
    }

    /// Whether no entries are committed.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Backend serving queries on `layer`.
    pub fn active_backend(&self, layer: LayerId) -> ActiveBackend {
        self.layers[layer.index()].backend().active()
    }

    /// Verify that committed entries match `scene` exactly.
    pub fn matches(&self, scene: &Scene) -> bool {
        self.len() == scene.len()
            && scene
                .pieces()
                .all(|p| self.footprint(p.id) == Some(p.aabb()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StrategyConfig;

    fn rect(x: f64, y: f64) -> Rect {
        Rect::new(x, y, x + 10.0, y + 10.0)
    }

    #[test]
    fn queries_see_committed_state_only() {
        let mut idx = SceneIndex::new(&IndexConfig::default());
        idx.insert(PieceId(1), LayerId::Base, rect(0.0, 0.0));
        assert!(idx.query_range(LayerFilter::All, rect(0.0, 0.0)).is_empty());
        let delta = idx.commit();
        assert_eq!(delta.region(LayerId::Base), Some(rect(0.0, 0.0)));
        assert_eq!(idx.query_range(LayerFilter::All, rect(5.0, 5.0)), [PieceId(1)]);
    }

    #[test]
    fn layer_filter_restricts_results() {
        let mut idx = SceneIndex::new(&IndexConfig::default());
        idx.insert(PieceId(1), LayerId::Base, rect(0.0, 0.0));
        idx.insert(PieceId(2), LayerId::Middle, rect(0.0, 0.0));
        let _ = idx.commit();
        assert_eq!(
            idx.query_range(LayerFilter::Only(LayerId::Middle), rect(0.0, 0.0)),
            [PieceId(2)]
        );
        let mut all = idx.query_range(LayerFilter::All, rect(0.0, 0.0));
        all.sort();
        assert_eq!(all, [PieceId(1), PieceId(2)]);
    }

    #[test]
    fn forced_tree_strategy_is_applied_per_layer() {
        let config = IndexConfig {
            strategy: StrategyConfig::Tree,
            ..IndexConfig::default()
        };
        let idx = SceneIndex::new(&config);
        for layer in LayerId::ALL {
            assert_eq!(idx.active_backend(layer), ActiveBackend::Tree);
        }
    }
}
