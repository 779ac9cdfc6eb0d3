// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Adaptive backend: a linear scan for small sets, an R-tree for large ones.
//!
//! Slot changes are applied to the active backend immediately and mirrored in a
//! flat slot table. At the end of each commit the backend consults
//! [`select_strategy`] and, when the answer changes, bulk-builds the other
//! backend from the mirror. Results never depend on which backend is active.

use alloc::vec::Vec;
use core::fmt::Debug;

use crate::backend::Backend;
use crate::backends::linear::LinearScan;
use crate::backends::rtree::RTree;
use crate::strategy::{ActiveBackend, IndexStrategy, StrategyThresholds, select_strategy};
use crate::types::{Aabb2D, Scalar};

enum Active<T: Scalar> {
    Linear(LinearScan<T>),
    Tree(RTree<T>),
}

/// Backend that switches between [`LinearScan`] and [`RTree`] by item count.
pub struct Adaptive<T: Scalar> {
    strategy: IndexStrategy,
    thresholds: StrategyThresholds,
    active: Active<T>,
    mirror: LinearScan<T>,
    switches: u32,
}

impl<T: Scalar> Default for Adaptive<T> {
    fn default() -> Self {
        Self::new(IndexStrategy::Auto, StrategyThresholds::default())
    }
}

impl<T: Scalar> Adaptive<T> {
    /// Create an empty adaptive backend.
    pub fn new(strategy: IndexStrategy, thresholds: StrategyThresholds) -> Self {
        let mut out = Self {
            strategy,
            thresholds,
            active: Active::Linear(LinearScan::default()),
            mirror: LinearScan::default(),
            switches: 0,
        };
        out.reselect();
        out
    }

    /// Backend currently answering queries.
    pub fn active(&self) -> ActiveBackend {
        match self.active {
            Active::Linear(_) => ActiveBackend::Linear,
            Active::Tree(_) => ActiveBackend::Tree,
        }
    }

    /// Configured strategy.
    pub fn strategy(&self) -> IndexStrategy {
        self.strategy
    }

    /// Change the strategy; takes effect immediately.
    pub fn set_strategy(&mut self, strategy: IndexStrategy) {
        self.strategy = strategy;
        self.reselect();
    }

    /// How many times the active backend has been swapped.
    pub fn switch_count(&self) -> u32 {
        self.switches
    }

    /// Rebuild the active backend from scratch.
    pub fn rebuild(&mut self) {
        match &mut self.active {
            Active::Linear(_) => {}
            Active::Tree(tree) => tree.rebuild(),
        }
    }

    fn reselect(&mut self) {
        let want = select_strategy(
            self.mirror.len(),
            self.active(),
            self.strategy,
            self.thresholds,
        );
        if want == self.active() {
            return;
        }
        let pairs: Vec<(usize, Aabb2D<T>)> = self.mirror.iter().collect();
        self.active = match want {
            ActiveBackend::Linear => Active::Linear(self.mirror.clone()),
            ActiveBackend::Tree => Active::Tree(RTree::bulk_load(&pairs)),
        };
        if self.switches < u32::MAX {
            self.switches += 1;
        }
    }

    fn backend_mut(&mut self) -> &mut dyn Backend<T> {
        match &mut self.active {
            Active::Linear(b) => b,
            Active::Tree(b) => b,
        }
    }

    fn backend(&self) -> &dyn Backend<T> {
        match &self.active {
            Active::Linear(b) => b,
            Active::Tree(b) => b,
        }
    }
}

impl<T: Scalar> Backend<T> for Adaptive<T> {
    fn insert(&mut self, slot: usize, aabb: Aabb2D<T>) {
        self.mirror.insert(slot, aabb);
        self.backend_mut().insert(slot, aabb);
    }

    fn update(&mut self, slot: usize, aabb: Aabb2D<T>) {
        self.mirror.update(slot, aabb);
        self.backend_mut().update(slot, aabb);
    }

    fn remove(&mut self, slot: usize) {
        self.mirror.remove(slot);
        self.backend_mut().remove(slot);
    }

    fn clear(&mut self) {
        self.mirror.clear();
        self.backend_mut().clear();
        self.reselect();
    }

    fn len(&self) -> usize {
        self.mirror.len()
    }

    fn finish_commit(&mut self) {
        self.backend_mut().finish_commit();
        self.reselect();
    }

    fn query_point(&self, x: T, y: T, out: &mut Vec<usize>) {
        self.backend().query_point(x, y, out);
    }

    fn query_rect(&self, rect: Aabb2D<T>, out: &mut Vec<usize>) {
        self.backend().query_rect(rect, out);
    }
}

impl<T: Scalar> Debug for Adaptive<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut s = f.debug_struct("Adaptive");
        s.field("strategy", &self.strategy)
            .field("thresholds", &self.thresholds)
            .field("switches", &self.switches);
        match &self.active {
            Active::Linear(b) => s.field("active", b),
            Active::Tree(b) => s.field("active", b),
        };
        s.finish_non_exhaustive()
    }
}
