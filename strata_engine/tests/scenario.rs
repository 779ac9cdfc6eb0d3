// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end editor sessions driven by a [`TestDriver`].

use std::sync::Arc;

use async_trait::async_trait;
use kurbo::{Point, Rect, Vec2};
use strata_engine::geometry::Polygon;
use strata_engine::{
    BooleanOp, CommitOutcome, Discard, Editor, EngineConfig, EngineError, ExactGeometryOracle,
    LayerId, MaterialId, NewPiece, OracleError, PieceId, ProblemCode, RectilinearOracle,
    ResizeHandle, Rotation, Severity, TestDriver, Verdict, evaluate,
};

fn session() -> (Editor, TestDriver) {
    Editor::with_test_driver(EngineConfig::default()).unwrap()
}

fn add(editor: &mut Editor, layer: LayerId, rect: Rect, rotation: Rotation) -> PieceId {
    editor
        .insert_piece(NewPiece {
            layer,
            rect,
            rotation,
            material: MaterialId(0),
        })
        .unwrap()
}

/// Two base pieces with a 50 mm hole between them, and a middle piece over the hole.
fn bridge(editor: &mut Editor) -> PieceId {
    add(editor, LayerId::Base, Rect::new(100.0, 100.0, 150.0, 150.0), Rotation::R0);
    add(editor, LayerId::Base, Rect::new(200.0, 100.0, 250.0, 150.0), Rotation::R0);
    add(editor, LayerId::Middle, Rect::new(150.0, 100.0, 200.0, 150.0), Rotation::R0)
}

#[tokio::test]
async fn bridge_over_hole_is_ghost_only_after_exact() {
    let (mut editor, driver) = session();
    let top = bridge(&mut editor);

    // The fast tier sees the piece inside the bounding box of its supports.
    assert!(editor.problems(top).is_empty());
    assert!(!editor.ghost_state(top).unwrap().is_ghost);

    driver.pump(&mut editor).await;
    let state = editor.ghost_state(top).unwrap();
    assert!(state.is_ghost);
    assert!(state.fresh);
    assert_eq!(state.severity, Some(Severity::Warn));
    let problems = editor.problems(top);
    assert_eq!(problems.len(), 1);
    assert_eq!(problems[0].code, ProblemCode::UnsupportedAbove);
    assert_eq!(problems[0].measure, Some(2500.0));
    assert!(!editor.report().has_block);
}

#[tokio::test]
async fn exact_result_expires_after_freshness_window() {
    let (mut editor, driver) = session();
    let top = bridge(&mut editor);
    driver.pump(&mut editor).await;

    driver.advance(4_999);
    assert!(editor.ghost_state(top).unwrap().is_ghost);

    driver.advance(2);
    let state = editor.ghost_state(top).unwrap();
    assert!(!state.is_ghost);
    assert!(!state.fresh);
    assert!(editor.problems(top).is_empty());
}

#[tokio::test]
async fn filling_the_hole_rechecks_the_piece_above() {
    let (mut editor, driver) = session();
    let top = bridge(&mut editor);
    driver.pump(&mut editor).await;
    assert!(editor.ghost_state(top).unwrap().is_ghost);

    add(&mut editor, LayerId::Base, Rect::new(150.0, 100.0, 200.0, 150.0), Rotation::R0);
    // The stale verdict is dropped as soon as the support changes.
    assert!(!editor.ghost_state(top).unwrap().is_ghost);

    driver.settle(&mut editor).await;
    let outcome = editor.exact_outcome(top).unwrap();
    assert_eq!(outcome.verdict, Verdict::Supported);
    assert!(!editor.ghost_state(top).unwrap().is_ghost);
}

#[tokio::test]
async fn support_change_in_the_same_millisecond_refuses_older_verdict() {
    let (mut editor, driver) = session();
    let base = add(&mut editor, LayerId::Base, Rect::new(0.0, 0.0, 50.0, 50.0), Rotation::R0);
    let top = add(&mut editor, LayerId::Middle, Rect::new(20.0, 0.0, 80.0, 50.0), Rotation::R0);
    let job = editor
        .take_exact_jobs()
        .into_iter()
        .find(|j| j.piece == top)
        .unwrap();

    // The clock does not move: the support grows under the snapshot.
    editor.begin_resize(base, ResizeHandle::East).unwrap();
    editor.update_resize(Point::new(100.0, 0.0)).unwrap();
    assert!(editor.end_resize().unwrap().is_committed());

    let old = evaluate(&job, &RectilinearOracle).await;
    assert_eq!(
        old.verdict,
        Verdict::Unsupported {
            uncovered_area: 1500.0
        }
    );
    assert_eq!(editor.apply_exact_outcome(old), Err(Discard::Older));
    assert!(!editor.ghost_state(top).unwrap().is_ghost);

    driver.settle(&mut editor).await;
    assert_eq!(editor.exact_outcome(top).unwrap().verdict, Verdict::Supported);
    assert!(!editor.ghost_state(top).unwrap().is_ghost);
}

#[tokio::test]
async fn rotated_piece_in_notch_is_caught_by_exact_tier() {
    let (mut editor, driver) = session();
    // An L-shaped support with a notch at the lower right.
    add(&mut editor, LayerId::Base, Rect::new(0.0, 0.0, 100.0, 50.0), Rotation::R0);
    add(&mut editor, LayerId::Base, Rect::new(0.0, 50.0, 55.0, 100.0), Rotation::R0);
    // Stored 60 x 30; a quarter turn stands it up as 55..85 x 40..100.
    let top = add(&mut editor, LayerId::Middle, Rect::new(40.0, 55.0, 100.0, 85.0), Rotation::R90);
    assert_eq!(
        editor.scene().piece(top).unwrap().aabb(),
        Rect::new(55.0, 40.0, 85.0, 100.0)
    );
    assert!(editor.problems(top).is_empty());

    driver.pump(&mut editor).await;
    let problems = editor.problems(top);
    assert_eq!(problems[0].code, ProblemCode::UnsupportedAbove);
    assert_eq!(problems[0].measure, Some(1500.0));
}

#[derive(Debug)]
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
async fn oracle_failure_keeps_optimistic_state() {
    let (mut editor, driver) = session();
    let driver = driver.with_oracle(Arc::new(Down));
    let top = bridge(&mut editor);
    assert_eq!(driver.pump(&mut editor).await, 2);
    assert!(editor.exact_outcome(top).is_none());
    assert!(!editor.ghost_state(top).unwrap().is_ghost);
}

#[test]
fn rejected_rotation_leaves_scene_untouched() {
    let (mut editor, _) = session();
    let long = add(&mut editor, LayerId::Base, Rect::new(0.0, 40.0, 100.0, 60.0), Rotation::R0);
    add(&mut editor, LayerId::Base, Rect::new(40.0, 0.0, 60.0, 30.0), Rotation::R0);
    let before = editor.scene().clone();

    let err = editor.rotate_piece(long, Rotation::R90).unwrap_err();
    let EngineError::Rejected { problems } = err else {
        panic!("expected a rejection, got {err:?}");
    };
    assert_eq!(problems[0].code, ProblemCode::OverlapSameLayer);
    assert_eq!(editor.scene(), &before);
    assert!(editor.index().matches(editor.scene()));
}

#[test]
fn group_resize_previews_without_touching_scene() {
    let (mut editor, _) = session();
    let a = add(&mut editor, LayerId::Base, Rect::new(0.0, 0.0, 20.0, 20.0), Rotation::R0);
    let b = add(&mut editor, LayerId::Base, Rect::new(30.0, 0.0, 50.0, 20.0), Rotation::R0);
    editor.select(a).unwrap();
    editor.select(b).unwrap();
    let before = editor.scene().clone();

    editor.begin_group_resize(ResizeHandle::SouthEast).unwrap();
    let feedback = editor.update_group_resize(Point::new(100.0, 10.0)).unwrap();
    assert!(!feedback.has_block());
    let preview = editor.group_preview().unwrap();
    assert_eq!(preview.scale, 2.0);
    for item in &preview.items {
        let [m11, m12, m21, m22, _, _] = item.transform.as_coeffs();
        assert_eq!(m11, m22);
        assert_eq!((m12, m21), (0.0, 0.0));
    }
    assert_eq!(editor.scene(), &before);

    let outcome = editor.end_group_resize().unwrap();
    assert!(outcome.is_committed());
    assert_eq!(editor.scene().piece(a).unwrap().rect, Rect::new(0.0, 0.0, 40.0, 40.0));
    assert_eq!(editor.scene().piece(b).unwrap().rect, Rect::new(60.0, 0.0, 100.0, 40.0));
}

#[test]
fn group_shrink_below_min_size_previews_what_commits() {
    let (mut editor, _) = session();
    let a = add(&mut editor, LayerId::Base, Rect::new(100.0, 100.0, 110.0, 110.0), Rotation::R0);
    let b = add(&mut editor, LayerId::Base, Rect::new(120.0, 100.0, 130.0, 110.0), Rotation::R0);
    editor.select(a).unwrap();
    editor.select(b).unwrap();

    editor.begin_group_resize(ResizeHandle::SouthEast).unwrap();
    // Scale 0.3 would make 3 mm pieces; both are held at the 5 mm minimum.
    let feedback = editor.update_group_resize(Point::new(109.0, 103.0)).unwrap();
    assert!(!feedback.has_block());
    for c in &feedback.candidates {
        assert!((c.aabb.width() - 5.0).abs() < 1e-9);
        assert!((c.aabb.height() - 5.0).abs() < 1e-9);
    }
    // The members end up 1 mm apart; the pair is reported once.
    assert_eq!(feedback.problems.len(), 1);
    assert_eq!(feedback.problems[0].code, ProblemCode::SpacingTooSmall);
    assert_eq!(editor.ghost_state(a).unwrap().severity, Some(Severity::Warn));

    let previewed = feedback.candidates.clone();
    let CommitOutcome::Committed { warnings, .. } = editor.end_group_resize().unwrap() else {
        panic!("a clean preview must commit");
    };
    assert_eq!(warnings, feedback.problems);
    for c in previewed {
        let id = c.id.unwrap();
        assert_eq!(editor.scene().piece(id).unwrap().aabb(), c.aabb);
    }
}

#[test]
fn cancelled_gesture_commits_nothing() {
    let (mut editor, _) = session();
    let a = add(&mut editor, LayerId::Base, Rect::new(0.0, 0.0, 20.0, 20.0), Rotation::R0);
    editor.select(a).unwrap();
    editor.begin_drag().unwrap();
    editor.update_drag(Vec2::new(300.0, 300.0)).unwrap();
    assert!(editor.cancel_gesture());
    assert_eq!(editor.scene().piece(a).unwrap().rect, Rect::new(0.0, 0.0, 20.0, 20.0));
    assert!(matches!(editor.end_drag(), Err(EngineError::NoGesture)));
}

#[test]
fn drag_collages_flush_with_neighbour() {
    let (mut editor, _) = session();
    add(&mut editor, LayerId::Base, Rect::new(100.0, 0.0, 150.0, 50.0), Rotation::R0);
    let a = add(&mut editor, LayerId::Base, Rect::new(0.0, 0.0, 50.0, 50.0), Rotation::R0);
    editor.select(a).unwrap();
    editor.begin_drag().unwrap();
    // Approach: gaps 10, then 0.5.
    editor.update_drag(Vec2::new(40.0, 0.0)).unwrap();
    let fb = editor.update_drag(Vec2::new(49.5, 0.0)).unwrap();
    assert_eq!(fb.candidates[0].aabb, Rect::new(50.0, 0.0, 100.0, 50.0));
    assert!(fb.problems.is_empty());
    let CommitOutcome::Committed { changed, .. } = editor.end_drag().unwrap() else {
        panic!("flush drag must commit");
    };
    assert_eq!(changed, [a]);
}

#[test]
fn document_round_trip_through_editor() {
    let (mut editor, _) = session();
    bridge(&mut editor);
    let json = editor.export_json().unwrap();

    let (mut other, _) = session();
    other.load_json(&json).unwrap();
    assert_eq!(other.scene(), editor.scene());
    assert!(other.index().matches(other.scene()));
    assert_eq!(other.take_exact_jobs().len(), 1);
}

#[test]
fn legacy_document_loads_onto_fixed_layers() {
    let (mut editor, _) = session();
    editor
        .load_json(
            r#"{ "version": 1, "width": 800, "height": 600, "pieces": [
                { "id": 1, "level": 0, "x": 0, "y": 0, "width": 100, "height": 100 },
                { "id": 2, "level": 1, "x": 10, "y": 10, "width": 50, "height": 50 }
            ] }"#,
        )
        .unwrap();
    assert_eq!(editor.scene().piece(PieceId(2)).unwrap().layer, LayerId::Middle);
    assert_eq!(editor.scene().next_id(), PieceId(3));
    assert!(matches!(
        editor.load_json(r#"{ "version": 7 }"#),
        Err(EngineError::Document(_))
    ));
}
