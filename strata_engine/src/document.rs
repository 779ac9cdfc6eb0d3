// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene document import and export.
//!
//! The current format (version 2) stores the fixed layer table with each
//! layer's flags and painter-ordered members, plus every piece with its layer.
//! Version 1 documents carried an integer `level` per piece and no layer
//! table; they are migrated once on import, which is the only place a piece's
//! layer is assigned after creation.

use std::collections::HashSet;

use kurbo::Rect;
use serde::{Deserialize, Serialize};

use crate::error::DocumentError;
use crate::scene::Scene;
use crate::types::{LayerFlags, LayerId, MaterialId, Piece, PieceId, Rotation};

/// Format written by [`SceneDocument::from_scene`].
pub const CURRENT_VERSION: u64 = 2;

/// One layer in the layer table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayerRecord {
    /// Layer identity.
    pub id: LayerId,
    /// Stable name.
    pub name: String,
    /// Painter's-order position.
    pub order: usize,
    /// Whether the layer is drawn.
    pub visible: bool,
    /// Whether the layer rejects edits.
    pub locked: bool,
    /// Members, back to front.
    pub members: Vec<PieceId>,
}

/// One piece.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PieceRecord {
    /// Identity.
    pub id: PieceId,
    /// Owning layer.
    pub layer: LayerId,
    /// Stored rectangle left edge.
    pub x: f64,
    /// Stored rectangle top edge.
    pub y: f64,
    /// Stored width.
    pub width: f64,
    /// Stored height.
    pub height: f64,
    /// Rotation in degrees.
    #[serde(default)]
    pub rotation: Rotation,
    /// Material.
    #[serde(default)]
    pub material: MaterialId,
}

/// Version 2 scene document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneDocument {
    /// Format version.
    pub version: u64,
    /// Scene width.
    pub width: f64,
    /// Scene height.
    pub height: f64,
    /// Fixed layer table, bottom first.
    pub layers: Vec<LayerRecord>,
    /// Every piece.
    pub pieces: Vec<PieceRecord>,
}

#[derive(Deserialize)]
struct LegacyPiece {
    id: PieceId,
    #[serde(default)]
    level: i64,
    x: f64,
    y: f64,
    width: f64,
    height: f64,
    #[serde(default)]
    rotation: Rotation,
    #[serde(default)]
    material: MaterialId,
}

#[derive(Deserialize)]
struct LegacyDocument {
    width: f64,
    height: f64,
    pieces: Vec<LegacyPiece>,
}

#[derive(Deserialize)]
struct VersionProbe {
    version: Option<u64>,
}

/// Layer for a legacy `level`: 0 and below is the base, 2 and above is the top.
pub fn layer_for_level(level: i64) -> LayerId {
    match level {
        i64::MIN..=0 => LayerId::Base,
        1 => LayerId::Middle,
        _ => LayerId::Top,
    }
}

impl SceneDocument {
    /// Capture `scene`.
    pub fn from_scene(scene: &Scene) -> Self {
        let layers = LayerId::ALL
            .into_iter()
            .map(|id| {
                let layer = scene.layer(id);
                LayerRecord {
                    id,
                    name: id.name().to_owned(),
                    order: id.index(),
                    visible: layer.flags.contains(LayerFlags::VISIBLE),
                    locked: layer.flags.contains(LayerFlags::LOCKED),
                    members: layer.members.clone(),
                }
            })
            .collect();
        let pieces = scene
            .pieces()
            .map(|p| PieceRecord {
                id: p.id,
                layer: p.layer,
                x: p.rect.x0,
                y: p.rect.y0,
                width: p.rect.width(),
                height: p.rect.height(),
                rotation: p.rotation,
                material: p.material,
            })
            .collect();
        Self {
            version: CURRENT_VERSION,
            width: scene.width(),
            height: scene.height(),
            layers,
            pieces,
        }
    }

    /// Pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, DocumentError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse JSON of any supported version, migrating version 1.
    pub fn from_json_str(s: &str) -> Result<Self, DocumentError> {
        let probe: VersionProbe = serde_json::from_str(s)?;
        match probe.version {
            Some(1) => {
                let legacy: LegacyDocument = serde_json::from_str(s)?;
                tracing::debug!(pieces = legacy.pieces.len(), "migrating version 1 document");
                Ok(migrate(legacy))
            }
            Some(CURRENT_VERSION) => Ok(serde_json::from_str(s)?),
            Some(v) => Err(DocumentError::UnknownVersion(v)),
            None => Err(DocumentError::MissingVersion),
        }
    }

    /// Validate and build the scene.
    pub fn into_scene(self) -> Result<Scene, DocumentError> {
        let mut seen = HashSet::new();
        let mut pieces = Vec::with_capacity(self.pieces.len());
        for r in self.pieces {
            if !seen.insert(r.id) {
                return Err(DocumentError::DuplicatePiece(r.id));
            }
            let sizes_ok = [r.x, r.y, r.width, r.height].iter().all(|v| v.is_finite())
                && r.width > 0.0
                && r.height > 0.0;
            if !sizes_ok {
                return Err(DocumentError::InvalidGeometry(r.id));
            }
            pieces.push(Piece {
                id: r.id,
                layer: r.layer,
                rect: Rect::new(r.x, r.y, r.x + r.width, r.y + r.height),
                rotation: r.rotation,
                material: r.material,
                revision: 1,
            });
        }
        let mut flags = [LayerFlags::default(); 3];
        let mut order: [Vec<PieceId>; 3] = Default::default();
        for record in self.layers {
            for id in &record.members {
                match pieces.iter().find(|p| p.id == *id) {
                    Some(p) if p.layer == record.id => {}
                    _ => return Err(DocumentError::LayerMismatch(*id)),
                }
            }
            let mut f = LayerFlags::empty();
            f.set(LayerFlags::VISIBLE, record.visible);
            f.set(LayerFlags::LOCKED, record.locked);
            flags[record.id.index()] = f;
            order[record.id.index()] = record.members;
        }
        Ok(Scene::from_parts(self.width, self.height, pieces, flags, order))
    }
}

fn migrate(legacy: LegacyDocument) -> SceneDocument {
    let mut doc = SceneDocument {
        version: CURRENT_VERSION,
        width: legacy.width,
        height: legacy.height,
        layers: Vec::new(),
        pieces: Vec::with_capacity(legacy.pieces.len()),
    };
    let mut members: [Vec<PieceId>; 3] = Default::default();
    for p in legacy.pieces {
        let layer = layer_for_level(p.level);
        members[layer.index()].push(p.id);
        doc.pieces.push(PieceRecord {
            id: p.id,
            layer,
            x: p.x,
            y: p.y,
            width: p.width,
            height: p.height,
            rotation: p.rotation,
            material: p.material,
        });
    }
    doc.layers = LayerId::ALL
        .into_iter()
        .zip(members)
        .map(|(id, members)| LayerRecord {
            id,
            name: id.name().to_owned(),
            order: id.index(),
            visible: true,
            locked: false,
            members,
        })
        .collect();
    doc
}

/// Parse a scene from JSON of any supported version.
pub fn scene_from_json(s: &str) -> Result<Scene, DocumentError> {
    SceneDocument::from_json_str(s)?.into_scene()
}

/// Serialize a scene as current-version JSON.
pub fn scene_to_json(scene: &Scene) -> Result<String, DocumentError> {
    SceneDocument::from_scene(scene).to_json_string()
}
