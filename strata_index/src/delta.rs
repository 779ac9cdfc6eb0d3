// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-commit change report returned by [`IndexGeneric::commit`](crate::IndexGeneric::commit).

use alloc::vec::Vec;

use crate::types::{Aabb2D, union_aabb};

/// What a single commit changed, with the payload of every affected entry.
#[derive(Clone, Debug, PartialEq)]
pub struct CommitDelta<T, P> {
    /// Entries that became visible: `(payload, aabb)`.
    pub inserted: Vec<(P, Aabb2D<T>)>,
    /// Entries that stopped being visible: `(payload, last committed aabb)`.
    pub removed: Vec<(P, Aabb2D<T>)>,
    /// Entries whose box changed: `(payload, old, new)`.
    pub moved: Vec<(P, Aabb2D<T>, Aabb2D<T>)>,
}

impl<T, P> Default for CommitDelta<T, P> {
    fn default() -> Self {
        Self {
            inserted: Vec::new(),
            removed: Vec::new(),
            moved: Vec::new(),
        }
    }
}

impl<T: Copy + PartialOrd, P: Copy> CommitDelta<T, P> {
    /// True if the commit changed nothing.
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.removed.is_empty() && self.moved.is_empty()
    }

    /// Number of affected entries.
    pub fn len(&self) -> usize {
        self.inserted.len() + self.removed.len() + self.moved.len()
    }

    /// Union of every old and new box touched by the commit. `None` if empty.
    pub fn union(&self) -> Option<Aabb2D<T>> {
        let mut it = self
            .inserted
            .iter()
            .map(|(_, a)| *a)
            .chain(self.removed.iter().map(|(_, a)| *a))
            .chain(self.moved.iter().flat_map(|(_, a, b)| [*a, *b]));
        let first = it.next()?;
        Some(it.fold(first, union_aabb))
    }

    /// Payloads of every affected entry, in report order.
    pub fn payloads(&self) -> impl Iterator<Item = P> + '_ {
        self.inserted
            .iter()
            .map(|(p, _)| *p)
            .chain(self.removed.iter().map(|(p, _)| *p))
            .chain(self.moved.iter().map(|(p, _, _)| *p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_covers_old_and_new_positions() {
        let delta = CommitDelta {
            inserted: alloc::vec![(1_u8, Aabb2D::new(0_i64, 0, 1, 1))],
            removed: Vec::new(),
            moved: alloc::vec![(2, Aabb2D::new(10, 10, 11, 11), Aabb2D::new(20, 5, 21, 6))],
        };
        assert_eq!(delta.union(), Some(Aabb2D::new(0, 0, 21, 11)));
        assert_eq!(delta.payloads().collect::<Vec<_>>(), [1, 2]);
        assert_eq!(delta.len(), 2);
    }

    #[test]
    fn empty_delta_has_no_union() {
        let delta = CommitDelta::<f64, u32>::default();
        assert!(delta.is_empty());
        assert_eq!(delta.union(), None);
    }
}
