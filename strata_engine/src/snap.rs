// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Snapping: grid, edge collage, and alignment guides.
//!
//! Grid snap runs first and never rounds a footprint that fits the scene out of
//! it. Edge collage then pulls a candidate edge flush with a
//! facing neighbour edge when the gap is below the collage threshold, subject
//! to two rules:
//!
//! - Approach only: if a gap to that neighbour edge was seen earlier in the
//!   gesture, the new gap must be smaller. Moving away never snaps.
//! - Overlap veto: a pull that would newly overlap a third piece is skipped.
//!
//! The smallest qualifying gap wins on each axis. Alignment guides are
//! reported last and never move the candidate.

use std::collections::HashMap;

use kurbo::{Rect, Vec2};

use crate::config::EngineConfig;
use crate::geometry::{EPSILON, overlaps};
use crate::scene::Scene;
use crate::scene_index::{LayerFilter, SceneIndex};
use crate::types::{LayerId, PieceId, ResizeHandle};

/// How the candidate may change while snapping.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SnapMode {
    /// The whole rectangle moves; size is fixed.
    Translate,
    /// Only the edges under the handle move.
    Resize(ResizeHandle),
}

impl SnapMode {
    fn allows(self, side: Side) -> bool {
        match self {
            Self::Translate => true,
            Self::Resize(h) => match side {
                Side::Left => h.moves_left(),
                Side::Right => h.moves_right(),
                Side::Top => h.moves_top(),
                Side::Bottom => h.moves_bottom(),
            },
        }
    }
}

/// Side of the candidate that faces a neighbour.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Side {
    /// Candidate's left edge faces the neighbour's right edge.
    Left,
    /// Candidate's right edge faces the neighbour's left edge.
    Right,
    /// Candidate's top edge faces the neighbour's bottom edge.
    Top,
    /// Candidate's bottom edge faces the neighbour's top edge.
    Bottom,
}

impl Side {
    fn is_horizontal(self) -> bool {
        matches!(self, Self::Left | Self::Right)
    }
}

/// Raw gaps seen during the current gesture, per neighbour edge.
#[derive(Clone, Debug, Default)]
pub struct CollageMemory {
    gaps: HashMap<(PieceId, Side), f64>,
}

impl CollageMemory {
    /// Forget everything; call when a gesture begins.
    pub fn reset(&mut self) {
        self.gaps.clear();
    }

    /// Last raw gap to `neighbour` on `side`.
    pub fn gap(&self, neighbour: PieceId, side: Side) -> Option<f64> {
        self.gaps.get(&(neighbour, side)).copied()
    }

    /// Record a raw gap.
    pub fn record(&mut self, neighbour: PieceId, side: Side, gap: f64) {
        self.gaps.insert((neighbour, side), gap);
    }
}

/// Orientation of a guide line.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GuideAxis {
    /// A line of constant x.
    Vertical,
    /// A line of constant y.
    Horizontal,
}

/// An alignment guide.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Guide {
    /// Orientation.
    pub axis: GuideAxis,
    /// Coordinate of the line.
    pub position: f64,
    /// Neighbour the line belongs to.
    pub neighbour: PieceId,
}

/// Snapped candidate plus what happened to it.
#[derive(Clone, Debug, PartialEq)]
pub struct SnapResult {
    /// Snapped footprint.
    pub rect: Rect,
    /// Neighbour edges the candidate was pulled flush with.
    pub collaged: Vec<(PieceId, Side)>,
    /// Alignment guides at the snapped position.
    pub guides: Vec<Guide>,
}

#[derive(Copy, Clone, Debug)]
struct Facing {
    id: PieceId,
    side: Side,
    gap: f64,
}

/// Snapping against a committed scene.
#[derive(Copy, Clone, Debug)]
pub struct SnapEngine<'a> {
    config: &'a EngineConfig,
    scene: &'a Scene,
    index: &'a SceneIndex,
}

impl<'a> SnapEngine<'a> {
    /// Snap engine over a committed scene and its index.
    pub fn new(config: &'a EngineConfig, scene: &'a Scene, index: &'a SceneIndex) -> Self {
        Self {
            config,
            scene,
            index,
        }
    }

    /// Snap `rect` on `layer`, ignoring the pieces in `exclude`.
    pub fn snap(
        &self,
        rect: Rect,
        layer: LayerId,
        mode: SnapMode,
        exclude: &[PieceId],
        memory: &mut CollageMemory,
    ) -> SnapResult {
        let mut rect = rect;
        if self.config.grid_enabled {
            let bounds = Rect::new(0.0, 0.0, self.scene.width(), self.scene.height());
            rect = grid_snap(rect, self.config.grid_size, mode, bounds);
        }
        let (rect, collaged) = self.collage(rect, layer, mode, exclude, memory);
        let guides = self.guides(rect, layer, exclude);
        SnapResult {
            rect,
            collaged,
            guides,
        }
    }

    fn neighbours(
        &self,
        probe: Rect,
        layer: LayerId,
        exclude: &[PieceId],
    ) -> Vec<(PieceId, Rect)> {
        self.index
            .query_range(LayerFilter::Only(layer), probe)
            .into_iter()
            .filter(|id| !exclude.contains(id))
            .filter_map(|id| self.scene.piece(id).map(|p| (id, p.aabb())))
            .collect()
    }

    fn collage(
        &self,
        rect: Rect,
        layer: LayerId,
        mode: SnapMode,
        exclude: &[PieceId],
        memory: &mut CollageMemory,
    ) -> (Rect, Vec<(PieceId, Side)>) {
        let threshold = self.config.collage_threshold;
        let neighbours = self.neighbours(rect.inflate(threshold, threshold), layer, exclude);

        let mut facing = Vec::new();
        for &(id, n) in &neighbours {
            if rect.y1.min(n.y1) - rect.y0.max(n.y0) > EPSILON {
                facing.extend(
                    [(Side::Right, n.x0 - rect.x1), (Side::Left, rect.x0 - n.x1)]
                        .map(|(side, gap)| Facing { id, side, gap }),
                );
            }
            if rect.x1.min(n.x1) - rect.x0.max(n.x0) > EPSILON {
                facing.extend(
                    [(Side::Bottom, n.y0 - rect.y1), (Side::Top, rect.y0 - n.y1)]
                        .map(|(side, gap)| Facing { id, side, gap }),
                );
            }
        }

        let mut qualifying: Vec<Facing> = facing
            .iter()
            .copied()
            .filter(|f| {
                f.gap > EPSILON
                    && f.gap < threshold
                    && mode.allows(f.side)
                    && memory.gap(f.id, f.side).is_none_or(|prev| f.gap < prev)
            })
            .collect();
        qualifying.sort_by(|a, b| a.gap.total_cmp(&b.gap));

        let mut out = rect;
        let mut collaged = Vec::new();
        for horizontal in [true, false] {
            let pick = qualifying
                .iter()
                .filter(|f| f.side.is_horizontal() == horizontal)
                .find_map(|f| {
                    let moved = pull(out, f.side, f.gap, mode);
                    let vetoed = neighbours
                        .iter()
                        .any(|&(id, n)| id != f.id && overlaps(moved, n) && !overlaps(out, n));
                    if vetoed {
                        tracing::trace!(neighbour = %f.id, side = ?f.side, "collage vetoed");
                        None
                    } else {
                        Some((moved, f))
                    }
                });
            if let Some((moved, f)) = pick {
                out = moved;
                collaged.push((f.id, f.side));
            }
        }

        for f in &facing {
            if f.gap > -EPSILON {
                memory.record(f.id, f.side, f.gap);
            }
        }
        (out, collaged)
    }

    fn guides(&self, rect: Rect, layer: LayerId, exclude: &[PieceId]) -> Vec<Guide> {
        let tol = self.config.guide_tolerance;
        let scene = Rect::new(0.0, 0.0, self.scene.width(), self.scene.height());
        let mut guides: Vec<Guide> = Vec::new();
        let cx = [rect.x0, rect.center().x, rect.x1];
        let cy = [rect.y0, rect.center().y, rect.y1];
        for (id, n) in self.neighbours(scene.inflate(tol, tol), layer, exclude) {
            for (axis, mine, theirs) in [
                (GuideAxis::Vertical, cx, [n.x0, n.center().x, n.x1]),
                (GuideAxis::Horizontal, cy, [n.y0, n.center().y, n.y1]),
            ] {
                for t in theirs {
                    let aligned = mine.iter().any(|m| (m - t).abs() <= tol);
                    let known = guides
                        .iter()
                        .any(|g| g.axis == axis && (g.position - t).abs() <= EPSILON);
                    if aligned && !known {
                        guides.push(Guide {
                            axis,
                            position: t,
                            neighbour: id,
                        });
                    }
                }
            }
        }
        guides.sort_by(|a, b| a.position.total_cmp(&b.position));
        guides
    }
}

fn pull(rect: Rect, side: Side, gap: f64, mode: SnapMode) -> Rect {
    match mode {
        SnapMode::Translate => {
            let d = match side {
                Side::Left => Vec2::new(-gap, 0.0),
                Side::Right => Vec2::new(gap, 0.0),
                Side::Top => Vec2::new(0.0, -gap),
                Side::Bottom => Vec2::new(0.0, gap),
            };
            rect + d
        }
        SnapMode::Resize(_) => {
            let mut r = rect;
            match side {
                Side::Left => r.x0 -= gap,
                Side::Right => r.x1 += gap,
                Side::Top => r.y0 -= gap,
                Side::Bottom => r.y1 += gap,
            }
            r
        }
    }
}

/// Round to the grid: the origin when translating, the moving edges when resizing.
///
/// A coordinate whose nearest grid line would push the footprint past the far
/// side of `bounds` takes the last grid line that keeps it inside instead. When
/// no such line exists the coordinate is left as it was.
pub fn grid_snap(rect: Rect, grid: f64, mode: SnapMode, bounds: Rect) -> Rect {
    let round = |v: f64| (v / grid).round() * grid;
    // Grid line for a leading edge `v` of a span `extent` long that must end by `limit`.
    let fit = |v: f64, extent: f64, limit: f64| {
        let snapped = round(v);
        if snapped + extent <= limit + EPSILON {
            return snapped;
        }
        let inside = ((limit - extent) / grid).floor() * grid;
        if inside >= 0.0 { inside } else { v }
    };
    match mode {
        SnapMode::Translate => {
            let x = fit(rect.x0, rect.width(), bounds.x1);
            let y = fit(rect.y0, rect.height(), bounds.y1);
            Rect::new(x, y, x + rect.width(), y + rect.height())
        }
        SnapMode::Resize(h) => {
            let mut r = rect;
            if h.moves_left() {
                r.x0 = round(r.x0).min(r.x1);
            }
            if h.moves_right() {
                r.x1 = fit(r.x1, 0.0, bounds.x1).max(r.x0);
            }
            if h.moves_top() {
                r.y0 = round(r.y0).min(r.y1);
            }
            if h.moves_bottom() {
                r.y1 = fit(r.y1, 0.0, bounds.y1).max(r.y0);
            }
            r
        }
    }
}
