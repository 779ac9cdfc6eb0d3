// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend trait for spatial indexing implementations.

use alloc::vec::Vec;
use core::fmt::Debug;

use crate::types::Aabb2D;

/// Spatial backend abstraction used by [`IndexGeneric`](crate::IndexGeneric).
///
/// Backends only see slot numbers; payloads and generations stay in the index.
/// Every backend must answer the same query with the same set of slots
/// (order is unspecified), so swapping backends never changes results.
pub trait Backend<T: Copy + PartialOrd + Debug> {
    /// Insert a new slot into the spatial structure.
    fn insert(&mut self, slot: usize, aabb: Aabb2D<T>);

    /// Update an existing slot's AABB.
    fn update(&mut self, slot: usize, aabb: Aabb2D<T>);

    /// Remove a slot from the spatial structure.
    fn remove(&mut self, slot: usize);

    /// Clear all spatial structures.
    fn clear(&mut self);

    /// Number of live slots tracked by the backend.
    fn len(&self) -> usize;

    /// Whether the backend tracks no slots.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Called once at the end of every commit, after all slot changes were applied.
    ///
    /// Backends that defer maintenance (rebuilds, strategy switches) do it here.
    fn finish_commit(&mut self) {}

    /// Append slots whose AABB contains the point to `out`.
    fn query_point(&self, x: T, y: T, out: &mut Vec<usize>);

    /// Append slots whose AABB intersects the rectangle to `out`.
    fn query_rect(&self, rect: Aabb2D<T>, out: &mut Vec<usize>);
}
