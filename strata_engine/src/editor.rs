// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The editor facade: gestures, selection, commits, and validation queries.
//!
//! [`Editor`] owns the committed [`Scene`], its [`SceneIndex`], and the ghost
//! and exact-result bookkeeping. Gestures only ever produce candidates; the
//! `end_*` calls (and insert, delete, rotate) are the sole commit points. A
//! commit either applies in full or, when a candidate has a blocking finding,
//! is rejected and the committed geometry is left as it was.
//!
//! Exact validation is pumped by the caller: [`Editor::take_exact_jobs`] hands
//! out snapshots, something evaluates them (an [`ExactRunner`] or a
//! [`TestDriver`]), and [`Editor::apply_exact_outcome`] feeds the answers back.
//!
//! [`ExactRunner`]: crate::runner::ExactRunner
//! [`TestDriver`]: crate::driver::TestDriver

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use kurbo::{Point, Rect, Vec2};

use crate::clock::{Clock, ManualClock};
use crate::config::{EngineConfig, Millis};
use crate::document::SceneDocument;
use crate::driver::TestDriver;
use crate::error::EngineError;
use crate::exact::{Discard, ExactJob, ExactOutcome, ExactTracker};
use crate::fast::{Candidate, FastValidator};
use crate::geometry::{clamp_to_scene_bounds, rotated_aabb, stored_rect_for, union_bounds};
use crate::ghost::{GhostMachine, GhostState, exact_problem};
use crate::group::{GroupPreview, preview_group_resize, scaled_rects};
use crate::problem::{Problem, ProblemCode, ValidationReport, dedup_pairwise};
use crate::scene::{Command, GeometryChange, NewPiece, Scene, Transition, reduce};
use crate::scene_index::{LayerFilter, SceneDelta, SceneIndex};
use crate::snap::{CollageMemory, Guide, Side, SnapEngine, SnapMode};
use crate::types::{LayerFlags, LayerId, PieceId, ResizeHandle, Rotation};

/// Result of ending a gesture.
#[derive(Clone, Debug, PartialEq)]
pub enum CommitOutcome {
    /// The candidates were committed.
    Committed {
        /// Pieces whose geometry changed.
        changed: Vec<PieceId>,
        /// Non-blocking findings of the committed candidates.
        warnings: Vec<Problem>,
    },
    /// A blocking finding rolled the gesture back.
    Rejected {
        /// The blocking findings.
        problems: Vec<Problem>,
    },
}

impl CommitOutcome {
    /// Whether the gesture was committed.
    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

/// What one gesture update produced.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GestureFeedback {
    /// Snapped candidate footprints, one per gesture member.
    pub candidates: Vec<Candidate>,
    /// Fast findings over every candidate.
    pub problems: Vec<Problem>,
    /// Alignment guides at the snapped position.
    pub guides: Vec<Guide>,
    /// Neighbour edges the candidate was pulled flush with.
    pub collaged: Vec<(PieceId, Side)>,
}

impl GestureFeedback {
    /// Whether any finding blocks.
    pub fn has_block(&self) -> bool {
        self.problems.iter().any(Problem::is_blocking)
    }
}

#[derive(Clone, Debug)]
enum Gesture {
    Drag {
        layer: LayerId,
        origin: Rect,
        members: Vec<(PieceId, Rect)>,
        feedback: Option<GestureFeedback>,
    },
    Resize {
        id: PieceId,
        layer: LayerId,
        handle: ResizeHandle,
        start: Rect,
        feedback: Option<GestureFeedback>,
    },
    GroupResize {
        layer: LayerId,
        handle: ResizeHandle,
        members: Vec<(PieceId, Rect)>,
        preview: Option<(GroupPreview, GestureFeedback)>,
    },
}

/// Interactive placement editor over a layered scene.
#[derive(Debug)]
pub struct Editor {
    config: EngineConfig,
    clock: Arc<dyn Clock>,
    scene: Scene,
    index: SceneIndex,
    ghosts: GhostMachine,
    tracker: ExactTracker,
    committed: HashMap<PieceId, Vec<Problem>>,
    selection: Vec<PieceId>,
    active_layer: LayerId,
    gesture: Option<Gesture>,
    memory: CollageMemory,
    immediate: BTreeSet<PieceId>,
    idle: BTreeSet<PieceId>,
    last_mutation_at: Millis,
    commit_seq: u64,
}

impl Editor {
    /// Empty editor with a scene of the configured size.
    pub fn new(config: EngineConfig, clock: Arc<dyn Clock>) -> Result<Self, EngineError> {
        let scene = Scene::new(config.scene_width, config.scene_height);
        Self::with_scene(config, clock, scene)
    }

    /// Editor over an existing scene. Every non-base piece is queued for exact validation.
    pub fn with_scene(
        config: EngineConfig,
        clock: Arc<dyn Clock>,
        scene: Scene,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let index = SceneIndex::from_scene(&config.index, &scene);
        let now = clock.now_ms();
        let mut editor = Self {
            config,
            clock,
            scene,
            index,
            ghosts: GhostMachine::new(),
            tracker: ExactTracker::new(),
            committed: HashMap::new(),
            selection: Vec::new(),
            active_layer: LayerId::Base,
            gesture: None,
            memory: CollageMemory::default(),
            immediate: BTreeSet::new(),
            idle: BTreeSet::new(),
            last_mutation_at: now,
            commit_seq: 0,
        };
        editor.reload();
        Ok(editor)
    }

    /// Editor driven by a [`ManualClock`], plus the driver that owns that clock.
    pub fn with_test_driver(config: EngineConfig) -> Result<(Self, TestDriver), EngineError> {
        let clock = ManualClock::starting_at(0);
        let editor = Self::new(config, Arc::new(clock.clone()))?;
        Ok((editor, TestDriver::new(clock)))
    }

    fn reload(&mut self) {
        // Outcomes for the previous scene may still be in flight; ids can repeat.
        self.commit_seq += 1;
        self.ghosts = GhostMachine::new();
        self.tracker = ExactTracker::since(self.commit_seq);
        self.committed.clear();
        self.selection.clear();
        self.gesture = None;
        self.immediate.clear();
        self.idle.clear();
        let ids: Vec<PieceId> = self.scene.pieces().map(|p| p.id).collect();
        for id in ids {
            self.refresh_committed(id);
            if self.scene.piece(id).is_some_and(|p| p.layer != LayerId::Base) {
                self.immediate.insert(id);
            }
        }
    }

    /// Replace the scene with a JSON document of any supported version.
    pub fn load_json(&mut self, json: &str) -> Result<(), EngineError> {
        let scene = SceneDocument::from_json_str(json)?.into_scene()?;
        tracing::debug!(pieces = scene.len(), "scene loaded");
        self.index = SceneIndex::from_scene(&self.config.index, &scene);
        self.scene = scene;
        self.last_mutation_at = self.clock.now_ms();
        self.reload();
        Ok(())
    }

    /// The committed scene as current-version JSON.
    pub fn export_json(&self) -> Result<String, EngineError> {
        Ok(SceneDocument::from_scene(&self.scene).to_json_string()?)
    }

    /// Committed scene.
    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Index over the committed scene.
    pub fn index(&self) -> &SceneIndex {
        &self.index
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Current time on the editor's clock.
    pub fn now(&self) -> Millis {
        self.clock.now_ms()
    }

    /// Whether a gesture is in progress.
    pub fn in_gesture(&self) -> bool {
        self.gesture.is_some()
    }

    // --- selection and layers ---

    /// Selected pieces, in selection order. They all live on the active layer.
    pub fn selection(&self) -> &[PieceId] {
        &self.selection
    }

    /// Layer new selections are confined to.
    pub fn active_layer(&self) -> LayerId {
        self.active_layer
    }

    /// Add `id` to the selection. Selecting a piece on another layer makes
    /// that layer active and starts a fresh selection.
    pub fn select(&mut self, id: PieceId) -> Result<(), EngineError> {
        self.ensure_idle()?;
        let layer = self.piece_layer(id)?;
        if layer != self.active_layer {
            self.set_active_layer(layer)?;
        }
        if !self.selection.contains(&id) {
            self.selection.push(id);
        }
        Ok(())
    }

    /// Remove `id` from the selection.
    pub fn deselect(&mut self, id: PieceId) -> Result<(), EngineError> {
        self.ensure_idle()?;
        self.selection.retain(|s| *s != id);
        Ok(())
    }

    /// Empty the selection.
    pub fn clear_selection(&mut self) -> Result<(), EngineError> {
        self.ensure_idle()?;
        self.selection.clear();
        Ok(())
    }

    /// Switch the active layer; the selection is cleared when it changes.
    pub fn set_active_layer(&mut self, layer: LayerId) -> Result<(), EngineError> {
        self.ensure_idle()?;
        if layer != self.active_layer {
            self.active_layer = layer;
            self.selection.clear();
        }
        Ok(())
    }

    /// Replace a layer's visibility and lock flags.
    pub fn set_layer_flags(
        &mut self,
        layer: LayerId,
        flags: LayerFlags,
    ) -> Result<(), EngineError> {
        self.ensure_idle()?;
        self.commit(Command::SetLayerFlags(layer, flags))?;
        Ok(())
    }

    // --- single-shot edits ---

    /// Insert a piece. Blocking findings reject it.
    pub fn insert_piece(&mut self, new: NewPiece) -> Result<PieceId, EngineError> {
        self.ensure_idle()?;
        if self.scene.layer(new.layer).is_locked() {
            return Err(EngineError::LayerLocked(new.layer));
        }
        let candidate = Candidate {
            id: None,
            layer: new.layer,
            aabb: rotated_aabb(new.rect.abs(), new.rotation),
        };
        self.reject_blocking(&[candidate])?;
        let id = self.scene.next_id();
        self.commit(Command::Insert(new))?;
        Ok(id)
    }

    /// Delete a piece.
    pub fn delete_piece(&mut self, id: PieceId) -> Result<(), EngineError> {
        self.ensure_idle()?;
        self.commit(Command::Delete(id))?;
        Ok(())
    }

    /// Rotate a piece about its centre. Blocking findings reject it.
    pub fn rotate_piece(&mut self, id: PieceId, rotation: Rotation) -> Result<(), EngineError> {
        self.ensure_idle()?;
        let piece = self.scene.piece(id).ok_or(EngineError::UnknownPiece(id))?;
        let candidate = Candidate {
            id: Some(id),
            layer: piece.layer,
            aabb: rotated_aabb(piece.rect, rotation),
        };
        self.reject_blocking(&[candidate])?;
        self.commit(Command::Rotate(id, rotation))?;
        Ok(())
    }

    // --- drag ---

    /// Start dragging the selection.
    pub fn begin_drag(&mut self) -> Result<(), EngineError> {
        self.ensure_idle()?;
        let (layer, members) = self.selected_footprints()?;
        let origin =
            union_bounds(members.iter().map(|(_, r)| *r)).ok_or(EngineError::EmptySelection)?;
        self.memory.reset();
        self.gesture = Some(Gesture::Drag {
            layer,
            origin,
            members,
            feedback: None,
        });
        Ok(())
    }

    /// Move the dragged group by `delta` from where the drag began.
    ///
    /// The group bounding box is clamped to the scene and snapped as one
    /// rectangle, ignoring every member.
    pub fn update_drag(&mut self, delta: Vec2) -> Result<GestureFeedback, EngineError> {
        let Some(Gesture::Drag {
            layer,
            origin,
            members,
            ..
        }) = &self.gesture
        else {
            return Err(EngineError::NoGesture);
        };
        let (layer, origin) = (*layer, *origin);
        let ids: Vec<PieceId> = members.iter().map(|(id, _)| *id).collect();

        let moved = clamp_to_scene_bounds(origin + delta, self.scene.width(), self.scene.height());
        let snapped = SnapEngine::new(&self.config, &self.scene, &self.index).snap(
            moved,
            layer,
            SnapMode::Translate,
            &ids,
            &mut self.memory,
        );
        let offset = snapped.rect.origin() - origin.origin();
        let candidates: Vec<Candidate> = members
            .iter()
            .map(|&(id, r)| Candidate {
                id: Some(id),
                layer,
                aabb: r + offset,
            })
            .collect();
        let feedback = GestureFeedback {
            problems: self.transient(&candidates),
            candidates,
            guides: snapped.guides,
            collaged: snapped.collaged,
        };
        if let Some(Gesture::Drag { feedback: slot, .. }) = &mut self.gesture {
            *slot = Some(feedback.clone());
        }
        Ok(feedback)
    }

    /// Commit the drag, or roll it back on a blocking finding.
    pub fn end_drag(&mut self) -> Result<CommitOutcome, EngineError> {
        match self.gesture.take() {
            Some(Gesture::Drag { feedback, .. }) => {
                self.finish(feedback.map(|f| f.candidates).unwrap_or_default())
            }
            other => {
                self.gesture = other;
                Err(EngineError::NoGesture)
            }
        }
    }

    // --- resize ---

    /// Start resizing one piece by `handle`.
    pub fn begin_resize(&mut self, id: PieceId, handle: ResizeHandle) -> Result<(), EngineError> {
        self.ensure_idle()?;
        let piece = self.scene.piece(id).ok_or(EngineError::UnknownPiece(id))?;
        let layer = piece.layer;
        if self.scene.layer(layer).is_locked() {
            return Err(EngineError::LayerLocked(layer));
        }
        let start = piece.aabb();
        self.memory.reset();
        self.gesture = Some(Gesture::Resize {
            id,
            layer,
            handle,
            start,
            feedback: None,
        });
        Ok(())
    }

    /// Drag the resize handle to `pointer`.
    pub fn update_resize(&mut self, pointer: Point) -> Result<GestureFeedback, EngineError> {
        let Some(Gesture::Resize {
            id,
            layer,
            handle,
            start,
            ..
        }) = &self.gesture
        else {
            return Err(EngineError::NoGesture);
        };
        let (id, layer, handle, start) = (*id, *layer, *handle, *start);

        let resized = resize_to(start, handle, pointer);
        let snapped = SnapEngine::new(&self.config, &self.scene, &self.index).snap(
            resized,
            layer,
            SnapMode::Resize(handle),
            &[id],
            &mut self.memory,
        );
        let candidates = vec![Candidate {
            id: Some(id),
            layer,
            aabb: snapped.rect,
        }];
        let feedback = GestureFeedback {
            problems: self.transient(&candidates),
            candidates,
            guides: snapped.guides,
            collaged: snapped.collaged,
        };
        if let Some(Gesture::Resize { feedback: slot, .. }) = &mut self.gesture {
            *slot = Some(feedback.clone());
        }
        Ok(feedback)
    }

    /// Commit the resize, or roll it back on a blocking finding.
    pub fn end_resize(&mut self) -> Result<CommitOutcome, EngineError> {
        match self.gesture.take() {
            Some(Gesture::Resize { feedback, .. }) => {
                self.finish(feedback.map(|f| f.candidates).unwrap_or_default())
            }
            other => {
                self.gesture = other;
                Err(EngineError::NoGesture)
            }
        }
    }

    // --- group resize ---

    /// Start an isotropic resize of the selection by `handle`.
    pub fn begin_group_resize(&mut self, handle: ResizeHandle) -> Result<(), EngineError> {
        self.ensure_idle()?;
        let (layer, members) = self.selected_footprints()?;
        self.gesture = Some(Gesture::GroupResize {
            layer,
            handle,
            members,
            preview: None,
        });
        Ok(())
    }

    /// Preview the group scaled by dragging the handle to `pointer`.
    ///
    /// The candidates are the footprints [`Editor::end_group_resize`] would
    /// commit, sizes clamped to the minimum included. The committed scene is
    /// not touched until then.
    pub fn update_group_resize(&mut self, pointer: Point) -> Result<GestureFeedback, EngineError> {
        let Some(Gesture::GroupResize {
            layer,
            handle,
            members,
            ..
        }) = &self.gesture
        else {
            return Err(EngineError::NoGesture);
        };
        let layer = *layer;
        let next =
            preview_group_resize(members, *handle, pointer).ok_or(EngineError::EmptySelection)?;
        let candidates: Vec<Candidate> = scaled_rects(&self.scene, &next, self.config.min_size)
            .into_iter()
            .filter_map(|(id, rect)| {
                let rotation = self.scene.piece(id)?.rotation;
                Some(Candidate {
                    id: Some(id),
                    layer,
                    aabb: rotated_aabb(rect, rotation),
                })
            })
            .collect();
        let feedback = GestureFeedback {
            problems: self.transient(&candidates),
            candidates,
            guides: Vec::new(),
            collaged: Vec::new(),
        };
        if let Some(Gesture::GroupResize { preview, .. }) = &mut self.gesture {
            *preview = Some((next, feedback.clone()));
        }
        Ok(feedback)
    }

    /// The latest group resize preview, if a group resize is in progress and
    /// has been updated.
    pub fn group_preview(&self) -> Option<&GroupPreview> {
        match &self.gesture {
            Some(Gesture::GroupResize {
                preview: Some((preview, _)),
                ..
            }) => Some(preview),
            _ => None,
        }
    }

    /// Commit the previewed scale, or roll it back on a blocking finding.
    pub fn end_group_resize(&mut self) -> Result<CommitOutcome, EngineError> {
        match self.gesture.take() {
            Some(Gesture::GroupResize { preview, .. }) => {
                self.finish(preview.map(|(_, f)| f.candidates).unwrap_or_default())
            }
            other => {
                self.gesture = other;
                Err(EngineError::NoGesture)
            }
        }
    }

    /// Abandon the current gesture. Returns whether one was in progress.
    pub fn cancel_gesture(&mut self) -> bool {
        self.ghosts.clear_transient();
        self.gesture.take().is_some()
    }

    // --- validation surface ---

    /// Current findings for a committed piece.
    ///
    /// Support comes only from a fresh exact result; without one the piece
    /// counts as supported.
    pub fn problems(&self, id: PieceId) -> Vec<Problem> {
        let now = self.clock.now_ms();
        let mut problems: Vec<Problem> = self
            .committed
            .get(&id)
            .into_iter()
            .flatten()
            .filter(|p| p.code != ProblemCode::UnsupportedAbove)
            .cloned()
            .collect();
        problems.extend(exact_problem(id, &self.tracker, now, self.config.freshness_window_ms));
        problems
    }

    /// Findings across the whole scene. Pairwise findings are listed once.
    pub fn report(&self) -> ValidationReport {
        ValidationReport::from_problems(dedup_pairwise(
            self.scene.pieces().flat_map(|p| self.problems(p.id)),
        ))
    }

    /// Ghost view of a committed piece.
    pub fn ghost_state(&self, id: PieceId) -> Option<GhostState> {
        self.scene.contains(id).then(|| {
            self.ghosts.state(
                id,
                &self.tracker,
                self.clock.now_ms(),
                self.config.freshness_window_ms,
            )
        })
    }

    /// Latest stored exact outcome for `id`, regardless of age.
    pub fn exact_outcome(&self, id: PieceId) -> Option<&ExactOutcome> {
        self.tracker.latest(id)
    }

    // --- exact pump ---

    /// Snapshots of every piece waiting for an exact check.
    pub fn take_exact_jobs(&mut self) -> Vec<ExactJob> {
        let now = self.clock.now_ms();
        let ids = core::mem::take(&mut self.immediate);
        let jobs: Vec<ExactJob> = ids
            .into_iter()
            .filter_map(|id| {
                ExactJob::snapshot(&self.scene, &self.index, id, self.commit_seq, now)
            })
            .collect();
        if !jobs.is_empty() {
            tracing::debug!(jobs = jobs.len(), "exact jobs scheduled");
        }
        jobs
    }

    /// Feed back an exact outcome. Outcomes for deleted or edited pieces are discarded.
    pub fn apply_exact_outcome(&mut self, outcome: ExactOutcome) -> Result<(), Discard> {
        let piece = outcome.piece;
        let result = self.tracker.apply(outcome, &self.scene);
        if let Err(reason) = result {
            tracing::warn!(%piece, ?reason, "exact outcome discarded");
        }
        result
    }

    /// Release the pieces waiting on idle once the debounce has elapsed since the
    /// last commit. Returns whether any were released.
    pub fn poll_idle(&mut self) -> bool {
        let now = self.clock.now_ms();
        if self.idle.is_empty() || now - self.last_mutation_at < self.config.idle_debounce_ms {
            return false;
        }
        tracing::debug!(pieces = self.idle.len(), "idle recheck");
        let idle = core::mem::take(&mut self.idle);
        self.immediate.extend(idle);
        true
    }

    /// Whether exact checks are waiting, immediately or on idle.
    pub fn has_pending_exact(&self) -> bool {
        !self.immediate.is_empty() || !self.idle.is_empty()
    }

    // --- internals ---

    fn ensure_idle(&self) -> Result<(), EngineError> {
        if self.gesture.is_some() {
            Err(EngineError::GestureInProgress)
        } else {
            Ok(())
        }
    }

    fn piece_layer(&self, id: PieceId) -> Result<LayerId, EngineError> {
        self.scene
            .piece(id)
            .map(|p| p.layer)
            .ok_or(EngineError::UnknownPiece(id))
    }

    fn selected_footprints(&self) -> Result<(LayerId, Vec<(PieceId, Rect)>), EngineError> {
        if self.selection.is_empty() {
            return Err(EngineError::EmptySelection);
        }
        if self.scene.layer(self.active_layer).is_locked() {
            return Err(EngineError::LayerLocked(self.active_layer));
        }
        let members = self
            .selection
            .iter()
            .map(|&id| {
                let piece = self.scene.piece(id).ok_or(EngineError::UnknownPiece(id))?;
                Ok((id, piece.aabb()))
            })
            .collect::<Result<Vec<_>, EngineError>>()?;
        Ok((self.active_layer, members))
    }

    fn validate(&self, candidates: &[Candidate]) -> Vec<(Candidate, Vec<Problem>)> {
        let validator = FastValidator::new(&self.config, &self.scene, &self.index);
        candidates
            .iter()
            .map(|c| (*c, validator.validate(c, candidates)))
            .collect()
    }

    fn transient(&mut self, candidates: &[Candidate]) -> Vec<Problem> {
        let mut all = Vec::new();
        for (candidate, problems) in self.validate(candidates) {
            if let Some(id) = candidate.id {
                self.ghosts.set_transient(id, &problems);
            }
            all.extend(problems);
        }
        dedup_pairwise(all)
    }

    fn reject_blocking(&self, candidates: &[Candidate]) -> Result<Vec<Problem>, EngineError> {
        let problems = dedup_pairwise(self.validate(candidates).into_iter().flat_map(|(_, p)| p));
        let blocking: Vec<Problem> = problems
            .iter()
            .filter(|p| p.is_blocking())
            .cloned()
            .collect();
        if blocking.is_empty() {
            Ok(problems)
        } else {
            tracing::warn!(problems = blocking.len(), "commit rejected");
            Err(EngineError::Rejected { problems: blocking })
        }
    }

    fn finish(&mut self, candidates: Vec<Candidate>) -> Result<CommitOutcome, EngineError> {
        self.ghosts.clear_transient();
        let warnings = match self.reject_blocking(&candidates) {
            Ok(warnings) => warnings,
            Err(EngineError::Rejected { problems }) => {
                return Ok(CommitOutcome::Rejected { problems });
            }
            Err(e) => return Err(e),
        };
        let updates: Vec<(PieceId, Rect)> = candidates
            .iter()
            .filter_map(|c| {
                let id = c.id?;
                let piece = self.scene.piece(id)?;
                Some((id, stored_rect_for(c.aabb, piece.rotation)))
            })
            .collect();
        let changes = if updates.is_empty() {
            Vec::new()
        } else {
            self.commit(Command::SetGeometry(updates))?
        };
        Ok(CommitOutcome::Committed {
            changed: changes.iter().map(|c| c.id).collect(),
            warnings,
        })
    }

    fn commit(&mut self, command: Command) -> Result<Vec<GeometryChange>, EngineError> {
        let Transition { scene, changes } = reduce(&self.scene, command)?;
        self.scene = scene;
        self.index.stage(&changes);
        let delta = self.index.commit();
        if !changes.is_empty() {
            self.last_mutation_at = self.clock.now_ms();
            self.commit_seq += 1;
            self.reconcile(&changes, &delta, self.commit_seq);
            tracing::debug!(changes = changes.len(), pieces = self.scene.len(), "commit");
        }
        Ok(changes)
    }

    fn reconcile(&mut self, changes: &[GeometryChange], delta: &SceneDelta, seq: u64) {
        let changed: HashSet<PieceId> = changes.iter().map(|c| c.id).collect();
        let mut refresh = BTreeSet::new();
        for change in changes {
            let id = change.id;
            if change.after.is_none() {
                self.ghosts.forget(id);
                self.tracker.forget(id);
                self.committed.remove(&id);
                self.selection.retain(|s| *s != id);
                self.immediate.remove(&id);
                self.idle.remove(&id);
            } else {
                self.tracker.invalidate(id, seq);
                self.immediate.insert(id);
                refresh.insert(id);
            }
        }
        for layer in LayerId::ALL {
            let Some(region) = delta.region(layer) else {
                continue;
            };
            let gap = self.config.warn_gap;
            refresh.extend(
                self.index
                    .query_range(LayerFilter::Only(layer), region.inflate(gap, gap)),
            );
            if let Some(above) = layer.above() {
                for id in self.index.query_range(LayerFilter::Only(above), region) {
                    if !changed.contains(&id) {
                        self.tracker.invalidate(id, seq);
                        self.idle.insert(id);
                        tracing::debug!(piece = %id, "dependent queued for idle recheck");
                    }
                }
            }
        }
        for id in refresh {
            self.refresh_committed(id);
        }
    }

    fn refresh_committed(&mut self, id: PieceId) {
        let problems = FastValidator::new(&self.config, &self.scene, &self.index)
            .validate_committed(id)
            .unwrap_or_default();
        self.ghosts.set_committed(id, &problems);
        self.committed.insert(id, problems);
    }
}

/// `start` with the handle's edges moved to `pointer`, never inverted.
fn resize_to(start: Rect, handle: ResizeHandle, pointer: Point) -> Rect {
    let mut r = start;
    if handle.moves_left() {
        r.x0 = pointer.x.min(r.x1);
    }
    if handle.moves_right() {
        r.x1 = pointer.x.max(r.x0);
    }
    if handle.moves_top() {
        r.y0 = pointer.y.min(r.y1);
    }
    if handle.moves_bottom() {
        r.y1 = pointer.y.max(r.y0);
    }
    r
}
