// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Immutable scene snapshots and the command reducer.
//!
//! A [`Scene`] is never mutated in place. [`reduce`] takes the current snapshot
//! and a [`Command`] and returns a [`Transition`]: the whole next snapshot plus
//! the list of footprints that changed. Pieces are shared between snapshots
//! behind [`Arc`], so a transition costs one map clone plus the changed pieces.

use std::collections::BTreeMap;
use std::sync::Arc;

use kurbo::Rect;

use crate::error::{EngineError, invariant_violation};
use crate::geometry::piece_aabb;
use crate::types::{LayerFlags, LayerId, MaterialId, Piece, PieceId, Rotation};

/// One fixed layer: flags plus painter-ordered membership.
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    /// Identity.
    pub id: LayerId,
    /// Visibility and lock flags.
    pub flags: LayerFlags,
    /// Members, back to front.
    pub members: Vec<PieceId>,
}

impl Layer {
    fn new(id: LayerId) -> Self {
        Self {
            id,
            flags: LayerFlags::default(),
            members: Vec::new(),
        }
    }

    /// Whether geometry commands are rejected.
    pub fn is_locked(&self) -> bool {
        self.flags.contains(LayerFlags::LOCKED)
    }
}

/// Committed scene snapshot.
#[derive(Clone, Debug, PartialEq)]
pub struct Scene {
    width: f64,
    height: f64,
    pieces: BTreeMap<PieceId, Arc<Piece>>,
    layers: [Layer; 3],
    next_id: u64,
}

impl Scene {
    /// Empty scene of the given size.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            pieces: BTreeMap::new(),
            layers: LayerId::ALL.map(Layer::new),
            next_id: 1,
        }
    }

    /// Scene width in millimetres.
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Scene height in millimetres.
    pub fn height(&self) -> f64 {
        self.height
    }

    /// Committed piece by id.
    pub fn piece(&self, id: PieceId) -> Option<&Piece> {
        self.pieces.get(&id).map(AsRef::as_ref)
    }

    /// Whether `id` is committed.
    pub fn contains(&self, id: PieceId) -> bool {
        self.pieces.contains_key(&id)
    }

    /// Every committed piece, by id.
    pub fn pieces(&self) -> impl Iterator<Item = &Piece> + '_ {
        self.pieces.values().map(AsRef::as_ref)
    }

    /// Number of committed pieces.
    pub fn len(&self) -> usize {
        self.pieces.len()
    }

    /// Whether the scene has no pieces.
    pub fn is_empty(&self) -> bool {
        self.pieces.is_empty()
    }

    /// Layer record.
    pub fn layer(&self, id: LayerId) -> &Layer {
        &self.layers[id.index()]
    }

    /// Pieces on `layer`, back to front.
    pub fn pieces_on(&self, layer: LayerId) -> impl Iterator<Item = &Piece> + '_ {
        self.layer(layer)
            .members
            .iter()
            .filter_map(|id| self.piece(*id))
    }

    /// Id the next inserted piece will receive.
    pub fn next_id(&self) -> PieceId {
        PieceId(self.next_id)
    }

    /// Rebuild a scene from imported parts. Layers are taken from each piece.
    ///
    /// This is the only path that assigns a layer to an existing piece id; it is
    /// used by document import and legacy migration.
    pub(crate) fn from_parts(
        width: f64,
        height: f64,
        pieces: Vec<Piece>,
        flags: [LayerFlags; 3],
        order: [Vec<PieceId>; 3],
    ) -> Self {
        let mut scene = Self::new(width, height);
        for (layer, f) in scene.layers.iter_mut().zip(flags) {
            layer.flags = f;
        }
        for piece in pieces {
            scene.next_id = scene.next_id.max(piece.id.0 + 1);
            scene.pieces.insert(piece.id, Arc::new(piece));
        }
        for (layer, ids) in LayerId::ALL.into_iter().zip(order) {
            let members = &mut scene.layers[layer.index()].members;
            for id in ids {
                let on_layer = scene.pieces.get(&id).is_some_and(|p| p.layer == layer);
                if on_layer && !members.contains(&id) {
                    members.push(id);
                }
            }
        }
        // Pieces missing from their layer's order go on top, by id.
        for piece in scene.pieces.values() {
            let members = &mut scene.layers[piece.layer.index()].members;
            if !members.contains(&piece.id) {
                members.push(piece.id);
            }
        }
        scene
    }
}

/// Geometry for a new piece.
#[derive(Clone, Debug, PartialEq)]
pub struct NewPiece {
    /// Owning layer.
    pub layer: LayerId,
    /// Stored, unrotated rectangle.
    pub rect: Rect,
    /// Rotation.
    pub rotation: Rotation,
    /// Material.
    pub material: MaterialId,
}

/// A state change request for [`reduce`].
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Add a piece on top of its layer.
    Insert(NewPiece),
    /// Remove a piece.
    Delete(PieceId),
    /// Replace stored rectangles of one or more pieces.
    SetGeometry(Vec<(PieceId, Rect)>),
    /// Change a piece's rotation, keeping its stored rectangle.
    Rotate(PieceId, Rotation),
    /// Replace a layer's flags.
    SetLayerFlags(LayerId, LayerFlags),
}

/// Footprint change of one piece.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GeometryChange {
    /// Affected piece.
    pub id: PieceId,
    /// Its layer.
    pub layer: LayerId,
    /// Footprint before, `None` when inserted.
    pub before: Option<Rect>,
    /// Footprint after, `None` when deleted.
    pub after: Option<Rect>,
}

impl GeometryChange {
    /// Union of the before and after footprints.
    pub fn region(&self) -> Option<Rect> {
        match (self.before, self.after) {
            (Some(a), Some(b)) => Some(a.union(b)),
            (a, b) => a.or(b),
        }
    }
}

/// Result of a successful [`reduce`].
#[derive(Clone, Debug)]
pub struct Transition {
    /// Next snapshot.
    pub scene: Scene,
    /// Footprints that changed, in command order.
    pub changes: Vec<GeometryChange>,
}

/// Apply `command` to `scene`, producing the next snapshot.
///
/// Geometry commands on a locked layer fail with [`EngineError::LayerLocked`].
/// Multi-piece commands are all-or-nothing.
pub fn reduce(scene: &Scene, command: Command) -> Result<Transition, EngineError> {
    let mut next = scene.clone();
    let mut changes = Vec::new();
    match command {
        Command::Insert(new) => {
            if next.layer(new.layer).is_locked() {
                return Err(EngineError::LayerLocked(new.layer));
            }
            let id = PieceId(next.next_id);
            next.next_id += 1;
            let piece = Piece {
                id,
                layer: new.layer,
                rect: new.rect.abs(),
                rotation: new.rotation,
                material: new.material,
                revision: 1,
            };
            changes.push(GeometryChange {
                id,
                layer: new.layer,
                before: None,
                after: Some(piece_aabb(&piece)),
            });
            next.layers[new.layer.index()].members.push(id);
            next.pieces.insert(id, Arc::new(piece));
        }
        Command::Delete(id) => {
            let piece = next.pieces.get(&id).ok_or(EngineError::UnknownPiece(id))?;
            let layer = piece.layer;
            if next.layer(layer).is_locked() {
                return Err(EngineError::LayerLocked(layer));
            }
            changes.push(GeometryChange {
                id,
                layer,
                before: Some(piece_aabb(piece)),
                after: None,
            });
            next.pieces.remove(&id);
            next.layers[layer.index()].members.retain(|m| *m != id);
        }
        Command::SetGeometry(updates) => {
            for (id, rect) in updates {
                let piece = next.pieces.get_mut(&id).ok_or(EngineError::UnknownPiece(id))?;
                if scene.layer(piece.layer).is_locked() {
                    return Err(EngineError::LayerLocked(piece.layer));
                }
                let rect = rect.abs();
                if piece.rect == rect {
                    continue;
                }
                let before = piece_aabb(piece);
                let p = Arc::make_mut(piece);
                p.rect = rect;
                p.revision += 1;
                changes.push(GeometryChange {
                    id,
                    layer: p.layer,
                    before: Some(before),
                    after: Some(piece_aabb(p)),
                });
            }
        }
        Command::Rotate(id, rotation) => {
            let piece = next.pieces.get_mut(&id).ok_or(EngineError::UnknownPiece(id))?;
            if scene.layer(piece.layer).is_locked() {
                return Err(EngineError::LayerLocked(piece.layer));
            }
            if piece.rotation != rotation {
                let before = piece_aabb(piece);
                let p = Arc::make_mut(piece);
                p.rotation = rotation;
                p.revision += 1;
                changes.push(GeometryChange {
                    id,
                    layer: p.layer,
                    before: Some(before),
                    after: Some(piece_aabb(p)),
                });
            }
        }
        Command::SetLayerFlags(layer, flags) => {
            next.layers[layer.index()].flags = flags;
        }
    }
    check_layers(scene, &next);
    Ok(Transition {
        scene: next,
        changes,
    })
}

fn check_layers(before: &Scene, after: &Scene) {
    for piece in after.pieces() {
        if let Some(old) = before.piece(piece.id)
            && old.layer != piece.layer
        {
            invariant_violation!(
                "piece {} moved from layer {} to {} outside migration",
                piece.id,
                old.layer,
                piece.layer
            );
        }
    }
}
