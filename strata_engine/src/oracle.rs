// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Exact-geometry oracle interface and a rectilinear reference implementation.

use async_trait::async_trait;
use kurbo::{Point, Rect};

use crate::error::OracleError;
use crate::geometry::{EPSILON, Polygon, rect_polygon};

/// Boolean operation on two polygons.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BooleanOp {
    /// Points in either.
    Union,
    /// Points in both.
    Intersect,
    /// Points in the first but not the second.
    Difference,
    /// Points in exactly one.
    Xor,
}

impl BooleanOp {
    fn apply(self, a: bool, b: bool) -> bool {
        match self {
            Self::Union => a || b,
            Self::Intersect => a && b,
            Self::Difference => a && !b,
            Self::Xor => a != b,
        }
    }
}

/// Exact boolean geometry, reachable only asynchronously.
///
/// The result is a set of polygons whose union is the exact answer.
#[async_trait]
pub trait ExactGeometryOracle: Send + Sync {
    /// Compute `a op b`.
    async fn boolean_op(
        &self,
        a: &Polygon,
        b: &Polygon,
        op: BooleanOp,
    ) -> Result<Vec<Polygon>, OracleError>;
}

/// Exact oracle for polygons whose edges are all horizontal or vertical.
///
/// Both inputs are cut along every distinct x and y coordinate; each cell of
/// the resulting grid is wholly inside or outside each input, so the boolean
/// is evaluated once per cell. Cells are merged into maximal horizontal runs,
/// and runs with the same span in consecutive rows are merged into rectangles.
#[derive(Copy, Clone, Debug, Default)]
pub struct RectilinearOracle;

impl RectilinearOracle {
    /// Synchronous evaluation.
    pub fn compute(a: &Polygon, b: &Polygon, op: BooleanOp) -> Result<Vec<Polygon>, OracleError> {
        for p in [a, b] {
            if !p.is_rectilinear() {
                return Err(OracleError::Unsupported(format!(
                    "polygon with {} vertices has a slanted edge",
                    p.0.len()
                )));
            }
            if p.0.iter().any(|pt| !(pt.x.is_finite() && pt.y.is_finite())) {
                return Err(OracleError::Unsupported("non-finite coordinate".into()));
            }
        }
        let xs = compress(a.0.iter().chain(&b.0).map(|p| p.x));
        let ys = compress(a.0.iter().chain(&b.0).map(|p| p.y));

        // Open runs from the previous row: (x0, x1, y0).
        let mut open: Vec<(f64, f64, f64)> = Vec::new();
        let mut out = Vec::new();
        for row in ys.windows(2) {
            let (y0, y1) = (row[0], row[1]);
            let cy = 0.5 * (y0 + y1);
            let mut runs: Vec<(f64, f64)> = Vec::new();
            for col in xs.windows(2) {
                let pt = Point::new(0.5 * (col[0] + col[1]), cy);
                if op.apply(a.contains(pt), b.contains(pt)) {
                    match runs.last_mut() {
                        Some(last) if (last.1 - col[0]).abs() <= EPSILON => last.1 = col[1],
                        _ => runs.push((col[0], col[1])),
                    }
                }
            }
            let mut next_open = Vec::with_capacity(runs.len());
            for (x0, x1) in runs {
                if let Some(pos) = open.iter().position(|o| o.0 == x0 && o.1 == x1) {
                    let (_, _, start) = open.swap_remove(pos);
                    next_open.push((x0, x1, start));
                } else {
                    next_open.push((x0, x1, y0));
                }
            }
            for (x0, x1, start) in open.drain(..) {
                out.push(rect_polygon(Rect::new(x0, start, x1, y0)));
            }
            open = next_open;
        }
        if let Some(&last_y) = ys.last() {
            for (x0, x1, start) in open {
                out.push(rect_polygon(Rect::new(x0, start, x1, last_y)));
            }
        }
        Ok(out)
    }
}

#[async_trait]
impl ExactGeometryOracle for RectilinearOracle {
    async fn boolean_op(
        &self,
        a: &Polygon,
        b: &Polygon,
        op: BooleanOp,
    ) -> Result<Vec<Polygon>, OracleError> {
        Self::compute(a, b, op)
    }
}

fn compress(values: impl Iterator<Item = f64>) -> Vec<f64> {
    let mut v: Vec<f64> = values.collect();
    v.sort_by(f64::total_cmp);
    v.dedup_by(|a, b| (*a - *b).abs() <= EPSILON);
    v
}

/// Total area of a polygon set.
pub fn total_area(polygons: &[Polygon]) -> f64 {
    polygons.iter().map(Polygon::area).sum()
}
