// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry kernel: rotation-aware bounding boxes, clamping, gaps, and polygons.
//!
//! Everything here is a pure function of its inputs.

use kurbo::{Point, Rect, Size};
use strata_index::Aabb2D;

use crate::types::{Piece, Rotation};

/// Comparison tolerance in millimetres.
pub const EPSILON: f64 = 1e-6;

/// Axis-aligned footprint of `rect` after a quarter-turn rotation about its centre.
///
/// Half turns leave the box unchanged. Quarter turns keep the centre and swap
/// width and height.
pub fn rotated_aabb(rect: Rect, rotation: Rotation) -> Rect {
    if rotation.swaps_axes() {
        Rect::from_center_size(rect.center(), Size::new(rect.height(), rect.width()))
    } else {
        rect
    }
}

/// Footprint of a piece on the scene.
pub fn piece_aabb(piece: &Piece) -> Rect {
    rotated_aabb(piece.rect, piece.rotation)
}

/// Stored (unrotated) rectangle whose rotated footprint is `aabb`.
pub fn stored_rect_for(aabb: Rect, rotation: Rotation) -> Rect {
    // A quarter turn is its own inverse on boxes.
    rotated_aabb(aabb, rotation)
}

/// Move `aabb` inside `[0, scene_w] x [0, scene_h]` without changing its size.
///
/// Boxes larger than the scene are pinned to the left/top edge.
pub fn clamp_to_scene_bounds(aabb: Rect, scene_w: f64, scene_h: f64) -> Rect {
    let w = aabb.width();
    let h = aabb.height();
    let x = aabb.x0.max(0.0).min((scene_w - w).max(0.0));
    let y = aabb.y0.max(0.0).min((scene_h - h).max(0.0));
    Rect::new(x, y, x + w, y + h)
}

/// Whether `rect` lies inside the scene, within [`EPSILON`].
pub fn inside_scene(rect: Rect, scene_w: f64, scene_h: f64) -> bool {
    rect.x0 >= -EPSILON
        && rect.y0 >= -EPSILON
        && rect.x1 <= scene_w + EPSILON
        && rect.y1 <= scene_h + EPSILON
}

/// The four edge coordinates of a rectangle.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Edges {
    /// Minimum x.
    pub left: f64,
    /// Maximum x.
    pub right: f64,
    /// Minimum y.
    pub top: f64,
    /// Maximum y.
    pub bottom: f64,
}

/// Edge coordinates of `rect`.
pub fn edges(rect: Rect) -> Edges {
    let r = rect.abs();
    Edges {
        left: r.x0,
        right: r.x1,
        top: r.y0,
        bottom: r.y1,
    }
}

/// Centre of `rect`.
pub fn center(rect: Rect) -> Point {
    rect.center()
}

/// Area of the intersection of `a` and `b`; zero when they only touch.
pub fn overlap_area(a: Rect, b: Rect) -> f64 {
    let w = a.x1.min(b.x1) - a.x0.max(b.x0);
    let h = a.y1.min(b.y1) - a.y0.max(b.y0);
    if w > 0.0 && h > 0.0 { w * h } else { 0.0 }
}

/// Whether `a` and `b` share positive area, beyond [`EPSILON`] on both axes.
pub fn overlaps(a: Rect, b: Rect) -> bool {
    a.x1.min(b.x1) - a.x0.max(b.x0) > EPSILON && a.y1.min(b.y1) - a.y0.max(b.y0) > EPSILON
}

/// Euclidean distance between two rectangles; zero when touching or overlapping.
pub fn rect_gap(a: Rect, b: Rect) -> f64 {
    let dx = (a.x0 - b.x1).max(b.x0 - a.x1).max(0.0);
    let dy = (a.y0 - b.y1).max(b.y0 - a.y1).max(0.0);
    dx.hypot(dy)
}

/// Whether `outer` contains `inner`, within [`EPSILON`].
pub fn contains_rect(outer: Rect, inner: Rect) -> bool {
    inner.x0 >= outer.x0 - EPSILON
        && inner.y0 >= outer.y0 - EPSILON
        && inner.x1 <= outer.x1 + EPSILON
        && inner.y1 <= outer.y1 + EPSILON
}

/// Bounding box of every rectangle in `rects`, or `None` if empty.
pub fn union_bounds(rects: impl IntoIterator<Item = Rect>) -> Option<Rect> {
    rects.into_iter().reduce(|acc, r| acc.union(r))
}

/// Convert to the index's box type.
pub fn rect_to_aabb(r: Rect) -> Aabb2D<f64> {
    Aabb2D::new(r.x0, r.y0, r.x1, r.y1)
}

/// Convert from the index's box type.
pub fn aabb_to_rect(a: Aabb2D<f64>) -> Rect {
    Rect::new(a.min_x, a.min_y, a.max_x, a.max_y)
}

/// A simple polygon as a closed ring of points (the closing edge is implicit).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Polygon(pub Vec<Point>);

impl Polygon {
    /// Unsigned area by the shoelace formula.
    pub fn area(&self) -> f64 {
        let pts = &self.0;
        if pts.len() < 3 {
            return 0.0;
        }
        let mut twice = 0.0;
        for (i, p) in pts.iter().enumerate() {
            let q = pts[(i + 1) % pts.len()];
            twice += p.x * q.y - q.x * p.y;
        }
        (twice * 0.5).abs()
    }

    /// Whether every edge is horizontal or vertical.
    pub fn is_rectilinear(&self) -> bool {
        let pts = &self.0;
        (0..pts.len()).all(|i| {
            let p = pts[i];
            let q = pts[(i + 1) % pts.len()];
            (p.x - q.x).abs() <= EPSILON || (p.y - q.y).abs() <= EPSILON
        })
    }

    /// Bounding box, or `None` for an empty ring.
    pub fn bounds(&self) -> Option<Rect> {
        union_bounds(self.0.iter().map(|p| Rect::from_points(*p, *p)))
    }

    /// Even-odd point containment; points on the boundary are unspecified.
    pub fn contains(&self, pt: Point) -> bool {
        let pts = &self.0;
        let mut inside = false;
        let mut j = pts.len().wrapping_sub(1);
        for i in 0..pts.len() {
            let (a, b) = (pts[i], pts[j]);
            if (a.y > pt.y) != (b.y > pt.y) && pt.x < (b.x - a.x) * (pt.y - a.y) / (b.y - a.y) + a.x
            {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

/// Clockwise ring of a rectangle's corners, starting at the top-left.
pub fn rect_polygon(rect: Rect) -> Polygon {
    let r = rect.abs();
    Polygon(vec![
        Point::new(r.x0, r.y0),
        Point::new(r.x1, r.y0),
        Point::new(r.x1, r.y1),
        Point::new(r.x0, r.y1),
    ])
}

/// True footprint of a piece as a polygon.
pub fn piece_polygon(piece: &Piece) -> Polygon {
    rect_polygon(piece_aabb(piece))
}
