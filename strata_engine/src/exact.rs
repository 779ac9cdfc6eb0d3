// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Exact support validation.
//!
//! An [`ExactJob`] is a self-contained snapshot: the piece's footprint polygon
//! and the footprints on the layer beneath that touch it. [`evaluate`] subtracts
//! every support from the footprint through the oracle; any remaining area
//! means the piece overhangs. Outcomes come back tagged with the piece id, the
//! geometry revision, the commit sequence the snapshot was taken at, and the
//! snapshot time. [`ExactTracker`] orders them by commit sequence; the time only
//! drives freshness.

use std::collections::HashMap;

use crate::config::Millis;
use crate::geometry::{EPSILON, Polygon, piece_polygon};
use crate::oracle::{BooleanOp, ExactGeometryOracle, total_area};
use crate::scene::Scene;
use crate::scene_index::{LayerFilter, SceneIndex};
use crate::types::{LayerId, PieceId};

/// Snapshot of everything needed to check one piece.
#[derive(Clone, Debug, PartialEq)]
pub struct ExactJob {
    /// Subject.
    pub piece: PieceId,
    /// Subject's layer.
    pub layer: LayerId,
    /// Geometry revision at snapshot time.
    pub revision: u64,
    /// Editor commit sequence at snapshot time.
    pub seq: u64,
    /// Subject footprint.
    pub polygon: Polygon,
    /// Footprints beneath that touch the subject.
    pub supports: Vec<Polygon>,
    /// Snapshot time.
    pub requested_at: Millis,
}

impl ExactJob {
    /// Snapshot piece `id` of `scene` after commit `seq`, or `None` if it does not exist.
    pub fn snapshot(
        scene: &Scene,
        index: &SceneIndex,
        id: PieceId,
        seq: u64,
        now: Millis,
    ) -> Option<Self> {
        let piece = scene.piece(id)?;
        let supports = match piece.layer.below() {
            Some(below) => index
                .query_range(LayerFilter::Only(below), piece.aabb())
                .into_iter()
                .filter_map(|s| scene.piece(s).map(piece_polygon))
                .collect(),
            None => Vec::new(),
        };
        Some(Self {
            piece: id,
            layer: piece.layer,
            revision: piece.revision,
            seq,
            polygon: piece_polygon(piece),
            supports,
            requested_at: now,
        })
    }
}

/// Result of an exact check.
#[derive(Clone, Debug, PartialEq)]
pub enum Verdict {
    /// Fully carried by the layer beneath.
    Supported,
    /// Part of the footprint overhangs.
    Unsupported {
        /// Area not covered by any support.
        uncovered_area: f64,
    },
    /// The oracle could not answer.
    Unknown(String),
}

/// Tagged result of one [`ExactJob`].
#[derive(Clone, Debug, PartialEq)]
pub struct ExactOutcome {
    /// Subject.
    pub piece: PieceId,
    /// Revision the job was computed for.
    pub revision: u64,
    /// Commit sequence of the job's snapshot.
    pub seq: u64,
    /// Snapshot time of the job.
    pub requested_at: Millis,
    /// Answer.
    pub verdict: Verdict,
}

impl ExactOutcome {
    /// An unanswered outcome for `job`.
    pub fn unknown(job: &ExactJob, reason: impl Into<String>) -> Self {
        Self {
            piece: job.piece,
            revision: job.revision,
            seq: job.seq,
            requested_at: job.requested_at,
            verdict: Verdict::Unknown(reason.into()),
        }
    }

    /// Whether the result is still authoritative at `now`.
    pub fn is_fresh(&self, now: Millis, window: Millis) -> bool {
        now.saturating_sub(self.requested_at) < window
    }
}

/// Evaluate `job` through `oracle` as successive differences.
pub async fn evaluate(job: &ExactJob, oracle: &dyn ExactGeometryOracle) -> ExactOutcome {
    let verdict = match job.layer {
        LayerId::Base => Verdict::Supported,
        _ => match remaining(job, oracle).await {
            Ok(area) if area > EPSILON => Verdict::Unsupported {
                uncovered_area: area,
            },
            Ok(_) => Verdict::Supported,
            Err(e) => {
                tracing::warn!(piece = %job.piece, error = %e, "exact oracle failed");
                Verdict::Unknown(e.to_string())
            }
        },
    };
    ExactOutcome {
        piece: job.piece,
        revision: job.revision,
        seq: job.seq,
        requested_at: job.requested_at,
        verdict,
    }
}

async fn remaining(
    job: &ExactJob,
    oracle: &dyn ExactGeometryOracle,
) -> Result<f64, crate::error::OracleError> {
    let mut rest = vec![job.polygon.clone()];
    for support in &job.supports {
        let mut next = Vec::with_capacity(rest.len());
        for part in &rest {
            next.extend(oracle.boolean_op(part, support, BooleanOp::Difference).await?);
        }
        rest = next;
        if rest.is_empty() {
            break;
        }
    }
    Ok(total_area(&rest))
}

/// Why an outcome was not stored.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Discard {
    /// The piece no longer exists.
    Deleted,
    /// The piece's geometry changed since the snapshot.
    Superseded,
    /// A newer outcome, or a newer invalidation, is already recorded.
    Older,
    /// The oracle could not answer; committed state is kept.
    Unknown,
}

/// Latest applicable exact outcome per piece.
///
/// Staleness is decided on commit sequence numbers, never on wall time: two
/// commits can land in the same millisecond.
#[derive(Clone, Debug, Default)]
pub struct ExactTracker {
    results: HashMap<PieceId, ExactOutcome>,
    invalidated: HashMap<PieceId, u64>,
    floor: u64,
}

impl ExactTracker {
    /// Empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty tracker refusing every outcome snapshotted before commit `seq`.
    pub fn since(seq: u64) -> Self {
        Self {
            floor: seq,
            ..Self::default()
        }
    }

    /// Store `outcome` if it still applies to `scene`.
    ///
    /// The piece must exist at the same revision, and the outcome's snapshot
    /// must not predate the last invalidation of the piece or the stored outcome.
    pub fn apply(&mut self, outcome: ExactOutcome, scene: &Scene) -> Result<(), Discard> {
        let id = outcome.piece;
        let Some(piece) = scene.piece(id) else {
            return Err(Discard::Deleted);
        };
        if piece.revision != outcome.revision {
            return Err(Discard::Superseded);
        }
        let invalidated = self.invalidated.get(&id).copied().unwrap_or(0);
        if outcome.seq < self.floor.max(invalidated) {
            return Err(Discard::Older);
        }
        if self.results.get(&id).is_some_and(|r| {
            (outcome.seq, outcome.requested_at) <= (r.seq, r.requested_at)
        }) {
            return Err(Discard::Older);
        }
        if matches!(outcome.verdict, Verdict::Unknown(_)) {
            return Err(Discard::Unknown);
        }
        self.results.insert(id, outcome);
        Ok(())
    }

    /// Drop the stored outcome for `id`; outcomes snapshotted before commit
    /// `seq` are refused from now on.
    pub fn invalidate(&mut self, id: PieceId, seq: u64) {
        self.results.remove(&id);
        self.invalidated.insert(id, seq);
    }

    /// Forget everything about a deleted piece.
    pub fn forget(&mut self, id: PieceId) {
        self.results.remove(&id);
        self.invalidated.remove(&id);
    }

    /// Stored outcome regardless of age.
    pub fn latest(&self, id: PieceId) -> Option<&ExactOutcome> {
        self.results.get(&id)
    }

    /// Stored outcome if it is fresh at `now`.
    pub fn fresh(&self, id: PieceId, now: Millis, window: Millis) -> Option<&ExactOutcome> {
        self.results.get(&id).filter(|r| r.is_fresh(now, window))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::error::OracleError;
    use crate::oracle::RectilinearOracle;
    use crate::scene::{Command, NewPiece, reduce};
    use crate::types::{MaterialId, Rotation};
    use async_trait::async_trait;
    use kurbo::Rect;

    fn scene_with(pieces: &[(LayerId, Rect)]) -> (Scene, SceneIndex) {
        let mut scene = Scene::new(1000.0, 1000.0);
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
        let index = SceneIndex::from_scene(&EngineConfig::default().index, &scene);
        (scene, index)
    }

    struct Down;

    #[async_trait]
    impl ExactGeometryOracle for Down {
        async fn boolean_op(
            &self,
            _: &Polygon,
            _: &Polygon,
            _: BooleanOp,
        ) -> Result<Vec<Polygon>, OracleError> {
            Err(OracleError::Unavailable("offline".into()))
        }
    }

    #[tokio::test]
    async fn bridge_over_gap_is_unsupported() {
        let (scene, index) = scene_with(&[
            (LayerId::Base, Rect::new(100.0, 0.0, 150.0, 50.0)),
            (LayerId::Base, Rect::new(200.0, 0.0, 250.0, 50.0)),
            (LayerId::Middle, Rect::new(140.0, 0.0, 210.0, 50.0)),
        ]);
        let job = ExactJob::snapshot(&scene, &index, PieceId(3), 3, 10).unwrap();
        assert_eq!(job.supports.len(), 2);
        let out = evaluate(&job, &RectilinearOracle).await;
        assert_eq!(
            out.verdict,
            Verdict::Unsupported {
                uncovered_area: 50.0 * 50.0
            }
        );
        assert_eq!((out.seq, out.requested_at), (3, 10));
    }

    #[tokio::test]
    async fn base_and_covered_pieces_are_supported() {
        let (scene, index) = scene_with(&[
            (LayerId::Base, Rect::new(0.0, 0.0, 100.0, 100.0)),
            (LayerId::Middle, Rect::new(10.0, 10.0, 60.0, 60.0)),
        ]);
        for id in [PieceId(1), PieceId(2)] {
            let job = ExactJob::snapshot(&scene, &index, id, 0, 0).unwrap();
            assert_eq!(
                evaluate(&job, &RectilinearOracle).await.verdict,
                Verdict::Supported
            );
        }
    }

    #[tokio::test]
    async fn oracle_failure_is_unknown_and_not_stored() {
        let (scene, index) = scene_with(&[
            (LayerId::Base, Rect::new(0.0, 0.0, 100.0, 100.0)),
            (LayerId::Middle, Rect::new(10.0, 10.0, 60.0, 60.0)),
        ]);
        let job = ExactJob::snapshot(&scene, &index, PieceId(2), 0, 0).unwrap();
        let out = evaluate(&job, &Down).await;
        assert!(matches!(out.verdict, Verdict::Unknown(_)));
        let mut tracker = ExactTracker::new();
        assert_eq!(tracker.apply(out, &scene), Err(Discard::Unknown));
        assert!(tracker.latest(PieceId(2)).is_none());
    }

    #[test]
    fn tracker_is_last_write_wins_per_revision() {
        let (scene, _) = scene_with(&[(LayerId::Middle, Rect::new(0.0, 0.0, 10.0, 10.0))]);
        let mut tracker = ExactTracker::new();
        let at = |seq, t, verdict| ExactOutcome {
            piece: PieceId(1),
            revision: 1,
            seq,
            requested_at: t,
            verdict,
        };
        assert_eq!(tracker.apply(at(2, 20, Verdict::Supported), &scene), Ok(()));
        assert_eq!(
            tracker.apply(
                at(2, 10, Verdict::Unsupported { uncovered_area: 1.0 }),
                &scene
            ),
            Err(Discard::Older)
        );
        assert_eq!(
            tracker.apply(
                ExactOutcome {
                    revision: 0,
                    ..at(2, 30, Verdict::Supported)
                },
                &scene
            ),
            Err(Discard::Superseded)
        );
        tracker.invalidate(PieceId(1), 4);
        assert!(tracker.latest(PieceId(1)).is_none());
        assert_eq!(
            tracker.apply(at(3, 35, Verdict::Supported), &scene),
            Err(Discard::Older)
        );
        assert_eq!(tracker.apply(at(4, 40, Verdict::Supported), &scene), Ok(()));
        assert_eq!(
            tracker.apply(
                ExactOutcome {
                    piece: PieceId(7),
                    ..at(5, 50, Verdict::Supported)
                },
                &scene
            ),
            Err(Discard::Deleted)
        );
    }

    #[test]
    fn invalidation_in_the_same_millisecond_still_refuses_older_snapshot() {
        let (scene, _) = scene_with(&[(LayerId::Middle, Rect::new(0.0, 0.0, 10.0, 10.0))]);
        let mut tracker = ExactTracker::new();
        let stale = ExactOutcome {
            piece: PieceId(1),
            revision: 1,
            seq: 6,
            requested_at: 100,
            verdict: Verdict::Unsupported {
                uncovered_area: 25.0,
            },
        };
        tracker.invalidate(PieceId(1), 7);
        assert_eq!(tracker.apply(stale.clone(), &scene), Err(Discard::Older));
        let current = ExactOutcome {
            seq: 7,
            verdict: Verdict::Supported,
            ..stale
        };
        assert_eq!(tracker.apply(current, &scene), Ok(()));
    }

    #[test]
    fn tracker_since_refuses_earlier_commits() {
        let (scene, _) = scene_with(&[(LayerId::Middle, Rect::new(0.0, 0.0, 10.0, 10.0))]);
        let mut tracker = ExactTracker::since(3);
        let out = |seq| ExactOutcome {
            piece: PieceId(1),
            revision: 1,
            seq,
            requested_at: 0,
            verdict: Verdict::Supported,
        };
        assert_eq!(tracker.apply(out(2), &scene), Err(Discard::Older));
        assert_eq!(tracker.apply(out(3), &scene), Ok(()));
    }

    #[test]
    fn freshness_window_is_exclusive() {
        let out = ExactOutcome {
            piece: PieceId(1),
            revision: 1,
            seq: 0,
            requested_at: 10_000 - 4_999,
            verdict: Verdict::Supported,
        };
        assert!(out.is_fresh(10_000, 5_000));
        let stale = ExactOutcome {
            requested_at: 10_000 - 5_001,
            ..out
        };
        assert!(!stale.is_fresh(10_000, 5_000));
    }
}
