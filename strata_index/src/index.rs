// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Public `Index` API and generic implementation over a pluggable backend.
//!
//! Mutations are staged: [`IndexGeneric::insert`], [`IndexGeneric::update`] and
//! [`IndexGeneric::remove`] only mark entries, and queries keep answering from
//! the last committed state until [`IndexGeneric::commit`] pushes every staged
//! change into the backend at once. Readers therefore never observe a
//! half-applied batch.

use alloc::vec::Vec;
use core::fmt::Debug;

use crate::backend::Backend;
use crate::backends::adaptive::Adaptive;
use crate::backends::linear::LinearScan;
use crate::backends::rtree::RTree;
use crate::delta::CommitDelta;
use crate::strategy::{IndexStrategy, StrategyThresholds};
use crate::types::{Aabb2D, Scalar};

/// Generational handle for entries.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Key(u32, u32);

impl Key {
    #[allow(
        clippy::cast_possible_truncation,
        reason = "Index keys are 32-bit; an index never holds 2^32 slots."
    )]
    const fn new(idx: usize, generation: u32) -> Self {
        Self(idx as u32, generation)
    }

    const fn idx(self) -> usize {
        self.0 as usize
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Pending {
    Insert,
    Update,
    Remove,
}

#[derive(Clone, Debug)]
struct Slot<T, P> {
    generation: u32,
    payload: P,
    /// Box the backend currently holds; `None` until the first commit.
    committed: Option<Aabb2D<T>>,
    /// Box staged for the next commit.
    staged: Aabb2D<T>,
    pending: Option<Pending>,
}

/// A generic AABB index parameterized by a spatial backend.
#[derive(Debug)]
pub struct IndexGeneric<T: Copy + PartialOrd + Debug, P: Copy + Debug, B: Backend<T>> {
    slots: Vec<Option<Slot<T, P>>>,
    generations: Vec<u32>,
    free_list: Vec<usize>,
    dirty: Vec<usize>,
    backend: B,
}

impl<T, P, B> Default for IndexGeneric<T, P, B>
where
    T: Copy + PartialOrd + Debug,
    P: Copy + Debug,
    B: Backend<T> + Default,
{
    fn default() -> Self {
        Self::with_backend(B::default())
    }
}

impl<T, P, B> IndexGeneric<T, P, B>
where
    T: Copy + PartialOrd + Debug,
    P: Copy + Debug,
    B: Backend<T> + Default,
{
    /// Create an empty index using the backend's default constructor.
    pub fn new() -> Self {
        Self::default()
    }
}

impl<T, P, B> IndexGeneric<T, P, B>
where
    T: Copy + PartialOrd + Debug,
    P: Copy + Debug,
    B: Backend<T>,
{
    /// Create an empty index around an explicit backend instance.
    pub fn with_backend(backend: B) -> Self {
        Self {
            slots: Vec::new(),
            generations: Vec::new(),
            free_list: Vec::new(),
            dirty: Vec::new(),
            backend,
        }
    }

    /// Reserve space for at least `n` more entries.
    pub fn reserve(&mut self, n: usize) {
        self.slots.reserve(n);
        self.generations.reserve(n);
    }

    /// Number of committed entries visible to queries.
    pub fn len(&self) -> usize {
        self.backend.len()
    }

    /// Whether no committed entries are visible to queries.
    pub fn is_empty(&self) -> bool {
        self.backend.is_empty()
    }

    /// Whether staged changes are waiting for [`commit`](Self::commit).
    pub fn has_pending(&self) -> bool {
        !self.dirty.is_empty()
    }

    /// Shared access to the backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Exclusive access to the backend, for backend-specific maintenance.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Stage a new AABB with payload. Returns a stable handle `Key`.
    pub fn insert(&mut self, aabb: Aabb2D<T>, payload: P) -> Key {
        let slot = Slot {
            generation: 0,
            payload,
            committed: None,
            staged: aabb,
            pending: Some(Pending::Insert),
        };
        let idx = if let Some(idx) = self.free_list.pop() {
            self.generations[idx] = self.generations[idx].saturating_add(1);
            idx
        } else {
            self.slots.push(None);
            self.generations.push(1);
            self.slots.len() - 1
        };
        let generation = self.generations[idx];
        self.slots[idx] = Some(Slot { generation, ..slot });
        self.dirty.push(idx);
        Key::new(idx, generation)
    }

    /// Stage a new AABB for an existing entry.
    pub fn update(&mut self, key: Key, aabb: Aabb2D<T>) {
        let Some(slot) = self.slot_mut(key) else {
            return;
        };
        slot.staged = aabb;
        let newly_dirty = slot.pending.is_none();
        slot.pending = match slot.pending {
            Some(Pending::Insert) => Some(Pending::Insert),
            Some(Pending::Remove) => Some(Pending::Remove),
            _ => Some(Pending::Update),
        };
        if newly_dirty {
            self.dirty.push(key.idx());
        }
    }

    /// Stage removal of an existing entry.
    ///
    /// An entry inserted and removed within the same batch never reaches the backend.
    pub fn remove(&mut self, key: Key) {
        let Some(slot) = self.slot_mut(key) else {
            return;
        };
        let pending = slot.pending;
        match pending {
            Some(Pending::Insert) => {
                self.slots[key.idx()] = None;
                self.free_list.push(key.idx());
            }
            None => {
                slot.pending = Some(Pending::Remove);
                self.dirty.push(key.idx());
            }
            Some(_) => slot.pending = Some(Pending::Remove),
        }
    }

    /// Clear the index immediately (staged changes are dropped, nothing is reported).
    pub fn clear(&mut self) {
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            if slot.take().is_some() {
                self.free_list.push(idx);
            }
        }
        self.dirty.clear();
        self.backend.clear();
        self.backend.finish_commit();
    }

    /// Committed box and payload for `key`, if it is live and committed.
    pub fn get(&self, key: Key) -> Option<(Aabb2D<T>, P)> {
        let slot = self.slot(key)?;
        slot.committed.map(|a| (a, slot.payload))
    }

    /// Apply staged changes to the backend and report what changed.
    pub fn commit(&mut self) -> CommitDelta<T, P> {
        let mut delta = CommitDelta::default();
        let mut dirty = core::mem::take(&mut self.dirty);
        dirty.sort_unstable();
        dirty.dedup();
        for idx in dirty {
            let Some(slot) = self.slots[idx].as_mut() else {
                continue;
            };
            match slot.pending.take() {
                Some(Pending::Insert) => {
                    self.backend.insert(idx, slot.staged);
                    slot.committed = Some(slot.staged);
                    delta.inserted.push((slot.payload, slot.staged));
                }
                Some(Pending::Update) => {
                    if slot.committed != Some(slot.staged) {
                        self.backend.update(idx, slot.staged);
                        if let Some(old) = slot.committed.replace(slot.staged) {
                            delta.moved.push((slot.payload, old, slot.staged));
                        }
                    }
                }
                Some(Pending::Remove) => {
                    self.backend.remove(idx);
                    if let Some(old) = slot.committed {
                        delta.removed.push((slot.payload, old));
                    }
                    self.slots[idx] = None;
                    self.free_list.push(idx);
                }
                None => {}
            }
        }
        self.backend.finish_commit();
        delta
    }

    /// Query for committed entries whose AABB contains the point.
    pub fn query_point(&self, x: T, y: T) -> impl Iterator<Item = (Key, P)> + '_ {
        let mut hits = Vec::new();
        self.backend.query_point(x, y, &mut hits);
        self.resolve(hits)
    }

    /// Query for committed entries whose AABB intersects the given rectangle.
    ///
    /// Rectangles that merely touch `rect` are included.
    pub fn query_rect(&self, rect: Aabb2D<T>) -> impl Iterator<Item = (Key, P)> + '_ {
        let mut hits = Vec::new();
        self.backend.query_rect(rect, &mut hits);
        self.resolve(hits)
    }

    fn resolve(&self, hits: Vec<usize>) -> impl Iterator<Item = (Key, P)> + '_ {
        hits.into_iter().filter_map(move |i| {
            let slot = self.slots.get(i)?.as_ref()?;
            Some((Key::new(i, slot.generation), slot.payload))
        })
    }

    fn slot(&self, key: Key) -> Option<&Slot<T, P>> {
        self.slots
            .get(key.idx())?
            .as_ref()
            .filter(|s| s.generation == key.1)
    }

    fn slot_mut(&mut self, key: Key) -> Option<&mut Slot<T, P>> {
        self.slots
            .get_mut(key.idx())?
            .as_mut()
            .filter(|s| s.generation == key.1)
    }
}

/// Index backed by a linear scan.
pub type Index<T, P> = IndexGeneric<T, P, LinearScan<T>>;

/// Index backed by an R-tree.
pub type TreeIndex<T, P> = IndexGeneric<T, P, RTree<T>>;

/// Index that switches between linear scan and R-tree by item count.
pub type AdaptiveIndex<T, P> = IndexGeneric<T, P, Adaptive<T>>;

impl<T: Scalar, P: Copy + Debug> IndexGeneric<T, P, Adaptive<T>> {
    /// Create an adaptive index with an explicit strategy and hysteresis band.
    pub fn with_strategy(strategy: IndexStrategy, thresholds: StrategyThresholds) -> Self {
        Self::with_backend(Adaptive::new(strategy, thresholds))
    }
}

impl<T: Scalar, P: Copy + Debug> IndexGeneric<T, P, RTree<T>> {
    /// Build a committed R-tree index in bulk from entries.
    pub fn with_rtree_bulk(entries: &[(Aabb2D<T>, P)]) -> Self {
        let mut idx = Self::with_backend(RTree::default());
        let mut pairs = Vec::with_capacity(entries.len());
        for (i, &(aabb, payload)) in entries.iter().enumerate() {
            idx.slots.push(Some(Slot {
                generation: 1,
                payload,
                committed: Some(aabb),
                staged: aabb,
                pending: None,
            }));
            idx.generations.push(1);
            pairs.push((i, aabb));
        }
        idx.backend = RTree::bulk_load(&pairs);
        idx
    }
}
