// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Primitive geometry types and scalar helpers.

use core::cmp::Ordering;
use core::fmt::Debug;

/// Axis-aligned bounding box in 2D.
///
/// Boxes are closed: two boxes that share only an edge or a corner intersect.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Aabb2D<T> {
    /// Minimum x (left)
    pub min_x: T,
    /// Minimum y (top)
    pub min_y: T,
    /// Maximum x (right)
    pub max_x: T,
    /// Maximum y (bottom)
    pub max_y: T,
}

impl<T> Aabb2D<T> {
    /// Create a new AABB from min/max corners.
    pub const fn new(min_x: T, min_y: T, max_x: T, max_y: T) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }
}

impl<T: Copy + PartialOrd> Aabb2D<T> {
    /// Whether this AABB contains the point (edges inclusive).
    pub fn contains_point(&self, x: T, y: T) -> bool {
        le(self.min_x, x) && le(self.min_y, y) && le(x, self.max_x) && le(y, self.max_y)
    }

    /// Whether `other` lies entirely inside this AABB (edges inclusive).
    pub fn contains(&self, other: &Self) -> bool {
        le(self.min_x, other.min_x)
            && le(self.min_y, other.min_y)
            && le(other.max_x, self.max_x)
            && le(other.max_y, self.max_y)
    }

    /// The intersection of two AABBs. May be inverted when they are disjoint.
    pub fn intersect(&self, other: &Self) -> Self {
        Self {
            min_x: max_t(self.min_x, other.min_x),
            min_y: max_t(self.min_y, other.min_y),
            max_x: min_t(self.max_x, other.max_x),
            max_y: min_t(self.max_y, other.max_y),
        }
    }

    /// Whether the two AABBs share at least one point.
    pub fn intersects(&self, other: &Self) -> bool {
        !self.intersect(other).is_empty()
    }

    /// Smallest AABB enclosing both inputs.
    pub fn union(&self, other: &Self) -> Self {
        union_aabb(*self, *other)
    }

    /// Return true if the AABB is inverted (no extent on some axis). Assumes no NaN.
    ///
    /// Degenerate boxes (zero width or height) are not empty.
    pub fn is_empty(&self) -> bool {
        lt(self.max_x, self.min_x) || lt(self.max_y, self.min_y)
    }
}

impl<T: Scalar> Aabb2D<T> {
    /// Create an AABB from origin and size.
    pub fn from_xywh(x: T, y: T, w: T, h: T) -> Self {
        Self::new(x, y, T::add(x, w), T::add(y, h))
    }

    /// Width, clamped at zero for inverted boxes.
    pub fn width(&self) -> T {
        T::max_zero(T::sub(self.max_x, self.min_x))
    }

    /// Height, clamped at zero for inverted boxes.
    pub fn height(&self) -> T {
        T::max_zero(T::sub(self.max_y, self.min_y))
    }
}

/// Numeric scalar abstraction for 2D AABBs used by backends.
///
/// Provides the operations needed for split metrics and centroid ordering, and an
/// associated widened accumulator type for area (`f64`→`f64`, `i64`→`i128`).
pub trait Scalar: Copy + PartialOrd + Debug {
    /// Widened accumulator type suitable for area/cost computations.
    type Acc: Copy
        + PartialOrd
        + core::ops::Add<Output = Self::Acc>
        + core::ops::Sub<Output = Self::Acc>
        + core::ops::Mul<Output = Self::Acc>
        + Debug;

    /// Add two scalar values.
    fn add(a: Self, b: Self) -> Self;

    /// Subtract two scalar values: a - b.
    fn sub(a: Self, b: Self) -> Self;

    /// Zero value for the scalar type.
    fn zero() -> Self;

    /// Max of the scalar value and zero.
    fn max_zero(v: Self) -> Self;

    /// Midpoint between a and b (used for centroid ordering).
    fn mid(a: Self, b: Self) -> Self;

    /// Convert a scalar to the accumulator type.
    fn widen(v: Self) -> Self::Acc;

    /// Convert a `usize` to the accumulator type (for split weighting).
    fn acc_from_usize(n: usize) -> Self::Acc;
}

impl Scalar for f64 {
    type Acc = Self;

    #[inline]
    fn add(a: Self, b: Self) -> Self {
        a + b
    }

    #[inline]
    fn sub(a: Self, b: Self) -> Self {
        a - b
    }

    #[inline]
    fn zero() -> Self {
        0.0
    }

    #[inline]
    fn max_zero(v: Self) -> Self {
        if v > 0.0 { v } else { 0.0 }
    }

    #[inline]
    fn mid(a: Self, b: Self) -> Self {
        0.5 * (a + b)
    }

    #[inline]
    fn widen(v: Self) -> Self::Acc {
        v
    }

    #[inline]
    #[allow(
        clippy::cast_precision_loss,
        reason = "Split weights are item counts far below 2^52."
    )]
    fn acc_from_usize(n: usize) -> Self::Acc {
        n as Self::Acc
    }
}

impl Scalar for i64 {
    type Acc = i128;

    #[inline]
    fn add(a: Self, b: Self) -> Self {
        a.saturating_add(b)
    }

    #[inline]
    fn sub(a: Self, b: Self) -> Self {
        a.saturating_sub(b)
    }

    #[inline]
    fn zero() -> Self {
        0
    }

    #[inline]
    fn max_zero(v: Self) -> Self {
        v.max(0)
    }

    #[inline]
    fn mid(a: Self, b: Self) -> Self {
        // Overflow-free average.
        (a & b) + ((a ^ b) >> 1)
    }

    #[inline]
    fn widen(v: Self) -> Self::Acc {
        i128::from(v)
    }

    #[inline]
    #[allow(
        clippy::cast_possible_wrap,
        reason = "Split weights are item counts far below i128::MAX."
    )]
    fn acc_from_usize(n: usize) -> Self::Acc {
        n as i128
    }
}

/// Area of an AABB in the scalar's widened accumulator type.
#[inline]
pub fn area<T: Scalar>(a: &Aabb2D<T>) -> T::Acc {
    T::widen(a.width()) * T::widen(a.height())
}

/// Helper alias for the widened accumulator type associated with a scalar `T`.
pub type ScalarAcc<T> = <T as Scalar>::Acc;

pub(crate) fn min_t<T: PartialOrd + Copy>(a: T, b: T) -> T {
    match a.partial_cmp(&b) {
        Some(Ordering::Greater) => b,
        _ => a,
    }
}

pub(crate) fn max_t<T: PartialOrd + Copy>(a: T, b: T) -> T {
    match a.partial_cmp(&b) {
        Some(Ordering::Less) => b,
        _ => a,
    }
}

pub(crate) fn le<T: PartialOrd>(a: T, b: T) -> bool {
    matches!(a.partial_cmp(&b), Some(Ordering::Less | Ordering::Equal))
}

pub(crate) fn lt<T: PartialOrd>(a: T, b: T) -> bool {
    matches!(a.partial_cmp(&b), Some(Ordering::Less))
}

pub(crate) fn union_aabb<T: PartialOrd + Copy>(a: Aabb2D<T>, b: Aabb2D<T>) -> Aabb2D<T> {
    Aabb2D {
        min_x: min_t(a.min_x, b.min_x),
        min_y: min_t(a.min_y, b.min_y),
        max_x: max_t(a.max_x, b.max_x),
        max_y: max_t(a.max_y, b.max_y),
    }
}
