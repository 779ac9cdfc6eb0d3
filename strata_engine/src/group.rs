// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Isotropic group resize preview.
//!
//! The preview is a pure function of the group's committed footprints, the
//! handle, and the pointer. It never touches the scene; only
//! [`scaled_rects`] turns a preview into geometry for a commit.

use kurbo::{Affine, Point, Rect, Size};

use crate::geometry::{EPSILON, union_bounds};
use crate::scene::Scene;
use crate::types::{PieceId, ResizeHandle};

/// Smallest scale a preview will produce.
pub const MIN_SCALE: f64 = 0.01;

/// Preview of one member.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PreviewItem {
    /// Member piece.
    pub id: PieceId,
    /// Maps the member's local frame (origin at its footprint's top-left) to the scene.
    pub transform: Affine,
    /// Previewed footprint.
    pub preview: Rect,
}

/// Preview of a whole group.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupPreview {
    /// Committed group bounding box.
    pub bbox: Rect,
    /// Fixed point of the scale.
    pub pivot: Point,
    /// Uniform scale factor.
    pub scale: f64,
    /// Per-member previews.
    pub items: Vec<PreviewItem>,
}

/// Fixed point for `handle`: the opposite corner, or the midpoint of the opposite edge.
pub fn pivot_for(bbox: Rect, handle: ResizeHandle) -> Point {
    let x = if handle.moves_right() {
        bbox.x0
    } else if handle.moves_left() {
        bbox.x1
    } else {
        bbox.center().x
    };
    let y = if handle.moves_bottom() {
        bbox.y0
    } else if handle.moves_top() {
        bbox.y1
    } else {
        bbox.center().y
    };
    Point::new(x, y)
}

/// Uniform scale implied by dragging `handle` of `bbox` to `pointer`.
///
/// The larger of the per-axis ratios wins, floored at [`MIN_SCALE`].
pub fn scale_factor(bbox: Rect, handle: ResizeHandle, pointer: Point) -> f64 {
    let pivot = pivot_for(bbox, handle);
    let mut ratios = Vec::with_capacity(2);
    if bbox.width() > EPSILON {
        if handle.moves_right() {
            ratios.push((pointer.x - pivot.x) / bbox.width());
        } else if handle.moves_left() {
            ratios.push((pivot.x - pointer.x) / bbox.width());
        }
    }
    if bbox.height() > EPSILON {
        if handle.moves_bottom() {
            ratios.push((pointer.y - pivot.y) / bbox.height());
        } else if handle.moves_top() {
            ratios.push((pivot.y - pointer.y) / bbox.height());
        }
    }
    ratios
        .into_iter()
        .reduce(f64::max)
        .unwrap_or(1.0)
        .max(MIN_SCALE)
}

/// Preview scaling `members` (id and committed footprint) by dragging `handle` to `pointer`.
///
/// Returns `None` for an empty group.
pub fn preview_group_resize(
    members: &[(PieceId, Rect)],
    handle: ResizeHandle,
    pointer: Point,
) -> Option<GroupPreview> {
    let bbox = union_bounds(members.iter().map(|(_, r)| *r))?;
    let pivot = pivot_for(bbox, handle);
    let scale = scale_factor(bbox, handle, pointer);
    let about = |p: Point| pivot + (p - pivot) * scale;
    let items = members
        .iter()
        .map(|&(id, r)| {
            let preview = Rect::from_points(about(r.origin()), about(Point::new(r.x1, r.y1)));
            PreviewItem {
                id,
                transform: Affine::new([scale, 0.0, 0.0, scale, preview.x0, preview.y0]),
                preview,
            }
        })
        .collect();
    Some(GroupPreview {
        bbox,
        pivot,
        scale,
        items,
    })
}

/// Stored rectangles for committing `preview`.
///
/// Each member keeps its rotation; its centre is scaled about the pivot and
/// its stored size is scaled and clamped to `min_size`.
pub fn scaled_rects(scene: &Scene, preview: &GroupPreview, min_size: f64) -> Vec<(PieceId, Rect)> {
    preview
        .items
        .iter()
        .filter_map(|item| {
            let piece = scene.piece(item.id)?;
            let centre = preview.pivot + (piece.rect.center() - preview.pivot) * preview.scale;
            let size = Size::new(
                (piece.rect.width() * preview.scale).max(min_size),
                (piece.rect.height() * preview.scale).max(min_size),
            );
            Some((item.id, Rect::from_center_size(centre, size)))
        })
        .collect()
}
