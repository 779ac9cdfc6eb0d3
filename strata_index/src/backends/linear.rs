// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Linear-scan backend: a slot table scanned in full on every query.
//!
//! Zero maintenance cost, O(n) queries. It is the correctness baseline the
//! tree backend is checked against.

use alloc::vec::Vec;
use core::fmt::Debug;

use crate::backend::Backend;
use crate::types::Aabb2D;

/// Slot table with linear scans.
#[derive(Clone)]
pub struct LinearScan<T: Copy + PartialOrd + Debug> {
    slots: Vec<Option<Aabb2D<T>>>,
    live: usize,
}

impl<T: Copy + PartialOrd + Debug> Default for LinearScan<T> {
    fn default() -> Self {
        Self {
            slots: Vec::new(),
            live: 0,
        }
    }
}

impl<T: Copy + PartialOrd + Debug> LinearScan<T> {
    /// Build a scan table from `(slot, aabb)` pairs.
    pub fn from_pairs(pairs: &[(usize, Aabb2D<T>)]) -> Self {
        let mut out = Self::default();
        for &(slot, aabb) in pairs {
            out.insert(slot, aabb);
        }
        out
    }

    /// Iterate live `(slot, aabb)` pairs in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, Aabb2D<T>)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.map(|a| (i, a)))
    }
}

impl<T: Copy + PartialOrd + Debug> Debug for LinearScan<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LinearScan")
            .field("total_slots", &self.slots.len())
            .field("alive", &self.live)
            .finish_non_exhaustive()
    }
}

impl<T: Copy + PartialOrd + Debug> Backend<T> for LinearScan<T> {
    fn insert(&mut self, slot: usize, aabb: Aabb2D<T>) {
        if self.slots.len() <= slot {
            self.slots.resize_with(slot + 1, || None);
        }
        if self.slots[slot].replace(aabb).is_none() {
            self.live += 1;
        }
    }

    fn update(&mut self, slot: usize, aabb: Aabb2D<T>) {
        match self.slots.get_mut(slot) {
            Some(Some(existing)) => *existing = aabb,
            _ => self.insert(slot, aabb),
        }
    }

    fn remove(&mut self, slot: usize) {
        if let Some(s) = self.slots.get_mut(slot)
            && s.take().is_some()
        {
            self.live -= 1;
        }
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.live = 0;
    }

    fn len(&self) -> usize {
        self.live
    }

    fn query_point(&self, x: T, y: T, out: &mut Vec<usize>) {
        out.extend(
            self.iter()
                .filter(|(_, a)| a.contains_point(x, y))
                .map(|(i, _)| i),
        );
    }

    fn query_rect(&self, rect: Aabb2D<T>, out: &mut Vec<usize>) {
        out.extend(
            self.iter()
                .filter(|(_, a)| a.intersects(&rect))
                .map(|(i, _)| i),
        );
    }
}
