// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Synchronous per-tick validation of candidate footprints.
//!
//! Checks run in priority order: bounds, minimum size, same-layer overlap,
//! spacing, approximate support. The first three block and stop the run; the
//! last two only warn. Neighbours come from the committed [`SceneIndex`] plus
//! the other candidates of the same gesture, never from the candidate's own
//! committed footprint.

use kurbo::Rect;

use crate::config::EngineConfig;
use crate::geometry::{EPSILON, contains_rect, inside_scene, overlaps, rect_gap, union_bounds};
use crate::problem::{Problem, ProblemCode};
use crate::scene::Scene;
use crate::scene_index::{LayerFilter, SceneIndex};
use crate::types::{LayerId, PieceId};

/// A proposed footprint.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Candidate {
    /// Piece being moved, or `None` for a piece not yet inserted.
    pub id: Option<PieceId>,
    /// Layer the footprint lives on.
    pub layer: LayerId,
    /// Proposed footprint.
    pub aabb: Rect,
}

/// Read-only view used by the checks.
#[derive(Copy, Clone, Debug)]
pub struct FastValidator<'a> {
    config: &'a EngineConfig,
    scene: &'a Scene,
    index: &'a SceneIndex,
}

impl<'a> FastValidator<'a> {
    /// Validator over a committed scene and its index.
    pub fn new(config: &'a EngineConfig, scene: &'a Scene, index: &'a SceneIndex) -> Self {
        Self {
            config,
            scene,
            index,
        }
    }

    /// Validate `candidate` against the committed scene and the other `peers`.
    ///
    /// Committed footprints of the candidate and of every peer are ignored;
    /// peers take part with their proposed footprints instead.
    pub fn validate(&self, candidate: &Candidate, peers: &[Candidate]) -> Vec<Problem> {
        let subject: Vec<PieceId> = candidate.id.into_iter().collect();
        let a = candidate.aabb;

        if !inside_scene(a, self.scene.width(), self.scene.height()) {
            return vec![Problem::new(ProblemCode::OutsideScene, subject)];
        }
        if a.width() < self.config.min_size - EPSILON || a.height() < self.config.min_size - EPSILON
        {
            return vec![Problem::new(ProblemCode::MinSizeViolation, subject)];
        }

        let excluded = |id: PieceId| {
            candidate.id == Some(id) || peers.iter().any(|p| p.id == Some(id))
        };
        let same_layer_peers = peers
            .iter()
            .filter(|p| p.layer == candidate.layer && p.id != candidate.id);

        let probe = a.inflate(self.config.warn_gap, self.config.warn_gap);
        let neighbours: Vec<(Option<PieceId>, Rect)> = self
            .index
            .query_range(LayerFilter::Only(candidate.layer), probe)
            .into_iter()
            .filter(|id| !excluded(*id))
            .filter_map(|id| self.scene.piece(id).map(|p| (Some(id), p.aabb())))
            .chain(same_layer_peers.map(|p| (p.id, p.aabb)))
            .collect();

        let overlapping: Vec<Problem> = neighbours
            .iter()
            .filter(|(_, r)| overlaps(a, *r))
            .map(|(id, _)| Problem::new(ProblemCode::OverlapSameLayer, with_other(&subject, *id)))
            .collect();
        if !overlapping.is_empty() {
            return overlapping;
        }

        let mut problems = Vec::new();
        for (id, r) in &neighbours {
            let gap = rect_gap(a, *r);
            if gap > EPSILON && gap < self.config.warn_gap - EPSILON {
                problems.push(
                    Problem::new(ProblemCode::SpacingTooSmall, with_other(&subject, *id))
                        .with_measure(gap),
                );
            }
        }

        if !self.supported_fast(candidate.layer, a) {
            problems.push(Problem::new(ProblemCode::UnsupportedAbove, subject));
        }
        tracing::trace!(
            id = ?candidate.id,
            layer = %candidate.layer,
            problems = problems.len(),
            "fast validation"
        );
        problems
    }

    /// Approximate support: `aabb` lies inside the bounding box of the
    /// footprints beneath that touch it. Base-layer footprints are always supported.
    pub fn supported_fast(&self, layer: LayerId, aabb: Rect) -> bool {
        let Some(below) = layer.below() else {
            return true;
        };
        let support = union_bounds(
            self.index
                .query_range(LayerFilter::Only(below), aabb)
                .into_iter()
                .filter_map(|id| self.scene.piece(id).map(|p| p.aabb())),
        );
        support.is_some_and(|s| contains_rect(s, aabb))
    }

    /// Findings for a committed piece in place, or `None` if it does not exist.
    pub fn validate_committed(&self, id: PieceId) -> Option<Vec<Problem>> {
        let piece = self.scene.piece(id)?;
        Some(self.validate(
            &Candidate {
                id: Some(id),
                layer: piece.layer,
                aabb: piece.aabb(),
            },
            &[],
        ))
    }
}

fn with_other(subject: &[PieceId], other: Option<PieceId>) -> Vec<PieceId> {
    subject.iter().copied().chain(other).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{Command, NewPiece, reduce};
    use crate::types::{MaterialId, Rotation, Severity};

    fn build(pieces: &[(LayerId, Rect)]) -> (EngineConfig, Scene, SceneIndex) {
        let config = EngineConfig {
            scene_width: 500.0,
            scene_height: 500.0,
            ..EngineConfig::default()
        };
        let mut scene = Scene::new(500.0, 500.0);
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
            .unwrap()
            .scene;
        }
        let index = SceneIndex::from_scene(&config.index, &scene);
        (config, scene, index)
    }

    fn cand(layer: LayerId, aabb: Rect) -> Candidate {
        Candidate {
            id: None,
            layer,
            aabb,
        }
    }

    fn codes(problems: &[Problem]) -> Vec<ProblemCode> {
        problems.iter().map(|p| p.code).collect()
    }

    #[test]
    fn bounds_block_and_short_circuit() {
        let (config, scene, index) = build(&[]);
        let v = FastValidator::new(&config, &scene, &index);
        let p = v.validate(&cand(LayerId::Base, Rect::new(-1.0, 0.0, 2.0, 3.0)), &[]);
        assert_eq!(codes(&p), [ProblemCode::OutsideScene]);
        assert_eq!(p[0].severity, Severity::Block);
    }

    #[test]
    fn min_size_blocks() {
        let (config, scene, index) = build(&[]);
        let v = FastValidator::new(&config, &scene, &index);
        let p = v.validate(&cand(LayerId::Base, Rect::new(0.0, 0.0, 4.9, 50.0)), &[]);
        assert_eq!(codes(&p), [ProblemCode::MinSizeViolation]);
    }

    #[test]
    fn overlap_blocks_only_on_same_layer() {
        let (config, scene, index) = build(&[(LayerId::Base, Rect::new(0.0, 0.0, 50.0, 50.0))]);
        let v = FastValidator::new(&config, &scene, &index);
        let p = v.validate(&cand(LayerId::Base, Rect::new(40.0, 0.0, 90.0, 50.0)), &[]);
        assert_eq!(codes(&p), [ProblemCode::OverlapSameLayer]);
        assert_eq!(p[0].pieces, [PieceId(1)]);
        let p = v.validate(&cand(LayerId::Middle, Rect::new(10.0, 10.0, 40.0, 40.0)), &[]);
        assert!(p.is_empty(), "cross-layer overlap is allowed: {p:?}");
    }

    #[test]
    fn spacing_warns_but_flush_contact_does_not() {
        let (config, scene, index) = build(&[(LayerId::Base, Rect::new(0.0, 0.0, 50.0, 50.0))]);
        let v = FastValidator::new(&config, &scene, &index);
        let p = v.validate(&cand(LayerId::Base, Rect::new(52.0, 0.0, 80.0, 50.0)), &[]);
        assert_eq!(codes(&p), [ProblemCode::SpacingTooSmall]);
        assert_eq!(p[0].severity, Severity::Warn);
        assert_eq!(p[0].measure, Some(2.0));
        let p = v.validate(&cand(LayerId::Base, Rect::new(50.0, 0.0, 80.0, 50.0)), &[]);
        assert!(p.is_empty());
        let p = v.validate(&cand(LayerId::Base, Rect::new(53.0, 0.0, 80.0, 50.0)), &[]);
        assert!(p.is_empty(), "gap equal to warn_gap is fine");
    }

    #[test]
    fn peers_replace_their_committed_footprint() {
        let (config, scene, index) = build(&[
            (LayerId::Base, Rect::new(0.0, 0.0, 50.0, 50.0)),
            (LayerId::Base, Rect::new(100.0, 0.0, 150.0, 50.0)),
        ]);
        let v = FastValidator::new(&config, &scene, &index);
        let moving = Candidate {
            id: Some(PieceId(2)),
            layer: LayerId::Base,
            aabb: Rect::new(200.0, 0.0, 250.0, 50.0),
        };
        // Piece 1 moves into piece 2's old spot; piece 2 moves away in the same gesture.
        let first = Candidate {
            id: Some(PieceId(1)),
            layer: LayerId::Base,
            aabb: Rect::new(100.0, 0.0, 150.0, 50.0),
        };
        assert!(v.validate(&first, &[moving]).is_empty());
        let clash = Candidate {
            aabb: Rect::new(180.0, 0.0, 230.0, 50.0),
            ..first
        };
        assert_eq!(codes(&v.validate(&clash, &[moving])), [ProblemCode::OverlapSameLayer]);
    }

    #[test]
    fn support_uses_bounding_box_of_touching_supports() {
        let (config, scene, index) = build(&[
            (LayerId::Base, Rect::new(100.0, 100.0, 150.0, 150.0)),
            (LayerId::Base, Rect::new(200.0, 100.0, 250.0, 150.0)),
        ]);
        let v = FastValidator::new(&config, &scene, &index);
        let bridge = cand(LayerId::Middle, Rect::new(150.0, 100.0, 200.0, 150.0));
        assert!(v.validate(&bridge, &[]).is_empty());
        let hanging = cand(LayerId::Middle, Rect::new(230.0, 100.0, 280.0, 150.0));
        assert_eq!(codes(&v.validate(&hanging, &[])), [ProblemCode::UnsupportedAbove]);
        let floating = cand(LayerId::Top, Rect::new(0.0, 0.0, 20.0, 20.0));
        assert!(!v.supported_fast(floating.layer, floating.aabb));
    }
}
