// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! R-tree backend generic over scalar `T: Scalar`.
//!
//! Nodes live in an arena. Inserts descend by least enlargement and split
//! overflowing nodes with an SAH-like split; removals prune empty nodes and
//! tighten bounds along the path. Pruned nodes stay in the arena as detached
//! garbage until [`RTree::rebuild`] packs the tree again with an STR bulk load,
//! which [`Backend::finish_commit`] does automatically once garbage outweighs
//! the reachable nodes.

use alloc::vec;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt::Debug;

use crate::backend::Backend;
use crate::types::{Aabb2D, Scalar, ScalarAcc, area, union_aabb};

const DEFAULT_MAX_CHILDREN: usize = 8;
const DEFAULT_MIN_CHILDREN: usize = 4;

/// R-tree backend with SAH-like splits and STR bulk loading.
pub struct RTree<T: Scalar> {
    max_children: usize,
    min_children: usize,
    root: Option<usize>,
    nodes: Vec<Node<T>>,
    slots: Vec<Option<Aabb2D<T>>>,
    live: usize,
    detached: usize,
}

#[derive(Clone, Debug)]
struct Node<T> {
    bbox: Aabb2D<T>,
    kind: NodeKind<T>,
}

#[derive(Clone, Debug)]
enum NodeKind<T> {
    Leaf(Vec<(usize, Aabb2D<T>)>),
    Branch(Vec<usize>),
}

impl<T> NodeKind<T> {
    fn len(&self) -> usize {
        match self {
            Self::Leaf(items) => items.len(),
            Self::Branch(children) => children.len(),
        }
    }
}

#[derive(Copy, Clone)]
enum Axis {
    X,
    Y,
}

fn centroid<T: Scalar>(axis: Axis, b: &Aabb2D<T>) -> T {
    match axis {
        Axis::X => T::mid(b.min_x, b.max_x),
        Axis::Y => T::mid(b.min_y, b.max_y),
    }
}

fn cmp_scalar<T: Scalar>(a: T, b: T) -> Ordering {
    a.partial_cmp(&b).unwrap_or(Ordering::Equal)
}

fn bounds_of<T: Scalar, E>(entries: &[E], bbox_of: impl Fn(&E) -> Aabb2D<T>) -> Option<Aabb2D<T>> {
    let mut it = entries.iter().map(bbox_of);
    let first = it.next()?;
    Some(it.fold(first, union_aabb))
}

impl<T: Scalar> Default for RTree<T> {
    fn default() -> Self {
        Self::with_fanout(DEFAULT_MAX_CHILDREN, DEFAULT_MIN_CHILDREN)
    }
}

impl<T: Scalar> RTree<T> {
    /// Create an empty tree with the given node capacity.
    ///
    /// `min_children` is clamped so that an overflowing node can always be split in two.
    pub fn with_fanout(max_children: usize, min_children: usize) -> Self {
        let max_children = max_children.max(2);
        let min_children = min_children.clamp(1, (max_children + 1) / 2);
        Self {
            max_children,
            min_children,
            root: None,
            nodes: Vec::new(),
            slots: Vec::new(),
            live: 0,
            detached: 0,
        }
    }

    /// Build a packed tree from `(slot, aabb)` pairs.
    pub fn bulk_load(pairs: &[(usize, Aabb2D<T>)]) -> Self {
        let mut tree = Self::default();
        for &(slot, aabb) in pairs {
            if tree.slots.len() <= slot {
                tree.slots.resize_with(slot + 1, || None);
            }
            if tree.slots[slot].replace(aabb).is_none() {
                tree.live += 1;
            }
        }
        tree.rebuild();
        tree
    }

    /// Repack every live slot with an STR bulk load, dropping detached nodes.
    pub fn rebuild(&mut self) {
        let items: Vec<(usize, Aabb2D<T>)> = self
            .slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.map(|a| (i, a)))
            .collect();
        self.nodes.clear();
        self.detached = 0;
        self.root = None;
        if items.is_empty() {
            return;
        }

        let mut level: Vec<usize> = Vec::new();
        for group in str_pack(items, self.max_children, |e| e.1) {
            level.push(self.push_leaf(group));
        }
        while level.len() > 1 {
            let groups = {
                let nodes = &self.nodes;
                str_pack(level, self.max_children, |&i| nodes[i].bbox)
            };
            level = groups
                .into_iter()
                .map(|group| self.push_branch(group))
                .collect();
        }
        self.root = level.first().copied();
    }

    /// Number of levels from the root down to the leaves (0 when empty).
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut cursor = self.root;
        while let Some(i) = cursor {
            height += 1;
            cursor = match &self.nodes[i].kind {
                NodeKind::Branch(children) => children.first().copied(),
                NodeKind::Leaf(_) => None,
            };
        }
        height
    }

    fn reachable_nodes(&self) -> usize {
        self.nodes.len().saturating_sub(self.detached)
    }

    fn push_leaf(&mut self, items: Vec<(usize, Aabb2D<T>)>) -> usize {
        let bbox = bounds_of(&items, |e| e.1).unwrap_or(Aabb2D::new(
            T::zero(),
            T::zero(),
            T::zero(),
            T::zero(),
        ));
        self.nodes.push(Node {
            bbox,
            kind: NodeKind::Leaf(items),
        });
        self.nodes.len() - 1
    }

    fn push_branch(&mut self, children: Vec<usize>) -> usize {
        let bbox = {
            let nodes = &self.nodes;
            bounds_of(&children, |&c| nodes[c].bbox)
        }
        .unwrap_or(Aabb2D::new(T::zero(), T::zero(), T::zero(), T::zero()));
        self.nodes.push(Node {
            bbox,
            kind: NodeKind::Branch(children),
        });
        self.nodes.len() - 1
    }

    fn refresh_bbox(&mut self, node: usize) {
        let bbox = match &self.nodes[node].kind {
            NodeKind::Leaf(items) => bounds_of(items, |e| e.1),
            NodeKind::Branch(children) => bounds_of(children, |&c| self.nodes[c].bbox),
        };
        if let Some(bbox) = bbox {
            self.nodes[node].bbox = bbox;
        }
    }

    fn choose_child(&self, children: &[usize], aabb: &Aabb2D<T>) -> usize {
        let mut best = 0;
        let mut best_cost: Option<(ScalarAcc<T>, ScalarAcc<T>)> = None;
        for (i, &c) in children.iter().enumerate() {
            let cb = self.nodes[c].bbox;
            let before = area(&cb);
            let growth = area(&union_aabb(cb, *aabb)) - before;
            let better = match best_cost {
                None => true,
                Some((g, a)) => growth < g || (growth == g && before < a),
            };
            if better {
                best_cost = Some((growth, before));
                best = i;
            }
        }
        best
    }

    /// Insert below `node`; returns a new sibling when `node` had to split.
    fn insert_at(&mut self, node: usize, slot: usize, aabb: Aabb2D<T>) -> Option<usize> {
        let branch_children = match &mut self.nodes[node].kind {
            NodeKind::Leaf(items) => {
                items.push((slot, aabb));
                None
            }
            NodeKind::Branch(children) => Some(children.clone()),
        };
        self.nodes[node].bbox = union_aabb(self.nodes[node].bbox, aabb);

        if let Some(children) = branch_children {
            let pick = self.choose_child(&children, &aabb);
            if let Some(sibling) = self.insert_at(children[pick], slot, aabb)
                && let NodeKind::Branch(children) = &mut self.nodes[node].kind
            {
                children.insert(pick + 1, sibling);
            }
        }

        if self.nodes[node].kind.len() > self.max_children {
            Some(self.split(node))
        } else {
            None
        }
    }

    fn split(&mut self, node: usize) -> usize {
        let min = self.min_children;
        let kind = core::mem::replace(&mut self.nodes[node].kind, NodeKind::Branch(Vec::new()));
        match kind {
            NodeKind::Leaf(items) => {
                let (left, right) = sah_split(items, min, |e| e.1);
                self.nodes[node].kind = NodeKind::Leaf(left);
                self.refresh_bbox(node);
                self.push_leaf(right)
            }
            NodeKind::Branch(children) => {
                let (left, right) = {
                    let nodes = &self.nodes;
                    sah_split(children, min, |&c| nodes[c].bbox)
                };
                self.nodes[node].kind = NodeKind::Branch(left);
                self.refresh_bbox(node);
                self.push_branch(right)
            }
        }
    }

    /// Remove `slot` below `node`. Returns true when the slot was found.
    fn remove_at(&mut self, node: usize, slot: usize, old: &Aabb2D<T>) -> bool {
        if !self.nodes[node].bbox.intersects(old) {
            return false;
        }
        let children = match &mut self.nodes[node].kind {
            NodeKind::Leaf(items) => {
                let Some(pos) = items.iter().position(|(s, _)| *s == slot) else {
                    return false;
                };
                items.swap_remove(pos);
                self.refresh_bbox(node);
                return true;
            }
            NodeKind::Branch(children) => children.clone(),
        };
        for (i, child) in children.into_iter().enumerate() {
            if self.remove_at(child, slot, old) {
                if self.nodes[child].kind.len() == 0 {
                    if let NodeKind::Branch(children) = &mut self.nodes[node].kind {
                        children.remove(i);
                    }
                    self.detached += 1;
                }
                self.refresh_bbox(node);
                return true;
            }
        }
        false
    }

    /// Replace `slot`'s box inside its current leaf when the leaf already covers `new`.
    fn update_in_place(
        &mut self,
        node: usize,
        slot: usize,
        old: &Aabb2D<T>,
        new: Aabb2D<T>,
    ) -> bool {
        if !self.nodes[node].bbox.intersects(old) {
            return false;
        }
        let node_bbox = self.nodes[node].bbox;
        let children = match &mut self.nodes[node].kind {
            NodeKind::Leaf(items) => {
                if !node_bbox.contains(&new) {
                    return false;
                }
                let Some(entry) = items.iter_mut().find(|(s, _)| *s == slot) else {
                    return false;
                };
                entry.1 = new;
                self.refresh_bbox(node);
                return true;
            }
            NodeKind::Branch(children) => children.clone(),
        };
        for child in children {
            if self.update_in_place(child, slot, old, new) {
                self.refresh_bbox(node);
                return true;
            }
        }
        false
    }

    fn collapse_root(&mut self) {
        while let Some(root) = self.root {
            match &self.nodes[root].kind {
                NodeKind::Branch(children) if children.len() == 1 => {
                    self.root = Some(children[0]);
                    self.detached += 1;
                }
                kind if kind.len() == 0 => {
                    self.root = None;
                    self.detached += 1;
                }
                _ => break,
            }
        }
    }
}

/// Sort-tile-recursive grouping of `entries` into runs of at most `max`.
fn str_pack<T: Scalar, E: Copy>(
    mut entries: Vec<E>,
    max: usize,
    bbox_of: impl Fn(&E) -> Aabb2D<T>,
) -> Vec<Vec<E>> {
    let n = entries.len();
    let groups = n.div_ceil(max);
    let mut columns = 1_usize;
    while columns * columns < groups {
        columns += 1;
    }
    entries.sort_by(|a, b| {
        cmp_scalar(
            centroid(Axis::X, &bbox_of(a)),
            centroid(Axis::X, &bbox_of(b)),
        )
    });
    let column_len = n.div_ceil(columns).max(1);
    let mut out = Vec::with_capacity(groups + columns);
    for column in entries.chunks_mut(column_len) {
        column.sort_by(|a, b| {
            cmp_scalar(
                centroid(Axis::Y, &bbox_of(a)),
                centroid(Axis::Y, &bbox_of(b)),
            )
        });
        out.extend(column.chunks(max).map(<[E]>::to_vec));
    }
    out
}

/// SAH-like split: along each axis, sort by centroid and pick the cut `k` minimizing
/// `area(left_k) * k + area(right_k) * (n - k)`, with both halves holding at least `min`.
fn sah_split<T: Scalar, E: Copy>(
    entries: Vec<E>,
    min: usize,
    bbox_of: impl Fn(&E) -> Aabb2D<T>,
) -> (Vec<E>, Vec<E>) {
    let n = entries.len();
    if n < 2 {
        return (entries, Vec::new());
    }
    let min = min.clamp(1, n / 2);
    let mut best: Option<(ScalarAcc<T>, Vec<E>, usize)> = None;
    for axis in [Axis::X, Axis::Y] {
        let mut sorted = entries.clone();
        sorted.sort_by(|a, b| cmp_scalar(centroid(axis, &bbox_of(a)), centroid(axis, &bbox_of(b))));
        let boxes: Vec<Aabb2D<T>> = sorted.iter().map(&bbox_of).collect();

        let mut prefix = Vec::with_capacity(n);
        for (i, b) in boxes.iter().enumerate() {
            prefix.push(if i == 0 { *b } else { union_aabb(prefix[i - 1], *b) });
        }
        let mut suffix = vec![boxes[n - 1]; n];
        for i in (0..n - 1).rev() {
            suffix[i] = union_aabb(boxes[i], suffix[i + 1]);
        }

        for k in min..=(n - min) {
            let cost = area(&prefix[k - 1]) * T::acc_from_usize(k)
                + area(&suffix[k]) * T::acc_from_usize(n - k);
            if best.as_ref().is_none_or(|(c, _, _)| cost < *c) {
                best = Some((cost, sorted.clone(), k));
            }
        }
    }
    match best {
        Some((_, mut sorted, k)) => {
            let right = sorted.split_off(k);
            (sorted, right)
        }
        None => {
            let mut left = entries;
            let right = left.split_off(n / 2);
            (left, right)
        }
    }
}

impl<T: Scalar> Backend<T> for RTree<T> {
    fn insert(&mut self, slot: usize, aabb: Aabb2D<T>) {
        if self.slots.get(slot).is_some_and(Option::is_some) {
            self.update(slot, aabb);
            return;
        }
        if self.slots.len() <= slot {
            self.slots.resize_with(slot + 1, || None);
        }
        self.slots[slot] = Some(aabb);
        self.live += 1;

        match self.root {
            None => {
                let leaf = self.push_leaf(vec![(slot, aabb)]);
                self.root = Some(leaf);
            }
            Some(root) => {
                if let Some(sibling) = self.insert_at(root, slot, aabb) {
                    let new_root = self.push_branch(vec![root, sibling]);
                    self.root = Some(new_root);
                }
            }
        }
    }

    fn update(&mut self, slot: usize, aabb: Aabb2D<T>) {
        let Some(old) = self.slots.get(slot).copied().flatten() else {
            self.insert(slot, aabb);
            return;
        };
        if let Some(root) = self.root
            && self.update_in_place(root, slot, &old, aabb)
        {
            self.slots[slot] = Some(aabb);
            return;
        }
        self.remove(slot);
        self.insert(slot, aabb);
    }

    fn remove(&mut self, slot: usize) {
        let Some(old) = self.slots.get_mut(slot).and_then(Option::take) else {
            return;
        };
        self.live -= 1;
        if let Some(root) = self.root {
            let _ = self.remove_at(root, slot, &old);
        }
        self.collapse_root();
    }

    fn clear(&mut self) {
        self.root = None;
        self.nodes.clear();
        self.slots.clear();
        self.live = 0;
        self.detached = 0;
    }

    fn len(&self) -> usize {
        self.live
    }

    fn finish_commit(&mut self) {
        if self.detached > self.reachable_nodes() {
            self.rebuild();
        }
    }

    fn query_point(&self, x: T, y: T, out: &mut Vec<usize>) {
        self.query_rect(Aabb2D::new(x, y, x, y), out);
    }

    fn query_rect(&self, rect: Aabb2D<T>, out: &mut Vec<usize>) {
        let Some(root) = self.root else {
            return;
        };
        let mut stack = vec![root];
        while let Some(i) = stack.pop() {
            let node = &self.nodes[i];
            if !node.bbox.intersects(&rect) {
                continue;
            }
            match &node.kind {
                NodeKind::Leaf(items) => out.extend(
                    items
                        .iter()
                        .filter(|(_, b)| b.intersects(&rect))
                        .map(|(s, _)| *s),
                ),
                NodeKind::Branch(children) => stack.extend(children.iter().copied()),
            }
        }
    }
}

impl<T: Scalar> Debug for RTree<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RTree")
            .field("max_children", &self.max_children)
            .field("min_children", &self.min_children)
            .field("arena_nodes", &self.nodes.len())
            .field("detached", &self.detached)
            .field("alive", &self.live)
            .field("height", &self.height())
            .finish_non_exhaustive()
    }
}

/// R-tree with f64 coordinates.
pub type RTreeF64 = RTree<f64>;

/// R-tree with i64 coordinates and i128 metrics.
pub type RTreeI64 = RTree<i64>;

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(mut v: Vec<usize>) -> Vec<usize> {
        v.sort_unstable();
        v
    }

    fn query(t: &RTree<i64>, r: Aabb2D<i64>) -> Vec<usize> {
        let mut out = Vec::new();
        t.query_rect(r, &mut out);
        sorted(out)
    }

    #[test]
    fn splits_grow_height_and_keep_all_items() {
        let mut t = RTree::<i64>::default();
        for i in 0..100_i64 {
            #[allow(clippy::cast_sign_loss, reason = "test loop index is non-negative")]
            t.insert(i as usize, Aabb2D::new(i * 10, 0, i * 10 + 5, 5));
        }
        assert!(t.height() >= 2, "100 items cannot fit one leaf");
        assert_eq!(t.len(), 100);
        assert_eq!(query(&t, Aabb2D::new(-1000, -1000, 10_000, 10_000)).len(), 100);
        assert_eq!(query(&t, Aabb2D::new(6, 1, 8, 2)), Vec::<usize>::new());
        assert_eq!(query(&t, Aabb2D::new(15, 1, 20, 2)), vec![1, 2]);
    }

    #[test]
    fn update_in_place_keeps_arena_size() {
        let mut t = RTree::<i64>::default();
        t.insert(0, Aabb2D::new(0, 0, 10, 10));
        t.insert(1, Aabb2D::new(12, 0, 22, 10));
        let arena_before = t.nodes.len();
        t.update(0, Aabb2D::new(2, 2, 8, 8));
        assert_eq!(t.nodes.len(), arena_before, "shrinking inside the leaf needs no new nodes");
        assert_eq!(query(&t, Aabb2D::new(1, 1, 1, 1)), Vec::<usize>::new());
        assert_eq!(query(&t, Aabb2D::new(5, 5, 5, 5)), vec![0]);
    }

    #[test]
    fn far_update_relocates_item() {
        let mut t = RTree::<i64>::default();
        t.insert(0, Aabb2D::new(0, 0, 10, 10));
        t.insert(1, Aabb2D::new(12, 0, 22, 10));
        t.update(0, Aabb2D::new(100, 100, 110, 110));
        assert!(query(&t, Aabb2D::new(5, 5, 5, 5)).is_empty());
        assert_eq!(query(&t, Aabb2D::new(105, 105, 105, 105)), vec![0]);
        assert_eq!(query(&t, Aabb2D::new(15, 5, 15, 5)), vec![1]);
    }

    #[test]
    fn removing_everything_empties_tree_and_rebuild_drops_garbage() {
        let mut t = RTree::<i64>::default();
        for i in 0..40_usize {
            #[allow(clippy::cast_possible_wrap, reason = "small test values")]
            let x = i as i64 * 3;
            t.insert(i, Aabb2D::new(x, x, x + 2, x + 2));
        }
        for i in 0..40 {
            t.remove(i);
        }
        assert!(t.is_empty());
        assert!(t.root.is_none(), "empty tree has no root");
        t.finish_commit();
        assert_eq!(t.nodes.len(), 0, "rebuild packs away detached nodes");
    }

    #[test]
    fn bulk_load_matches_incremental() {
        let pairs: Vec<(usize, Aabb2D<i64>)> = (0..57_i64)
            .map(|i| {
                #[allow(clippy::cast_sign_loss, reason = "test index is non-negative")]
                let slot = i as usize;
                (slot, Aabb2D::new((i % 8) * 7, (i / 8) * 7, (i % 8) * 7 + 5, (i / 8) * 7 + 5))
            })
            .collect();
        let packed = RTree::bulk_load(&pairs);
        let mut incremental = RTree::<i64>::default();
        for &(s, a) in &pairs {
            incremental.insert(s, a);
        }
        for q in [
            Aabb2D::new(0, 0, 20, 20),
            Aabb2D::new(12, 12, 12, 12),
            Aabb2D::new(30, -5, 60, 100),
        ] {
            assert_eq!(query(&packed, q), query(&incremental, q), "query {q:?}");
        }
    }
}
