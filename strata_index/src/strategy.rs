// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend strategy selection by item count.
//!
//! [`select_strategy`] is a pure function: given the live item count, the
//! currently active backend, and the configured [`IndexStrategy`], it returns
//! the backend that should be active after the next commit. In
//! [`IndexStrategy::Auto`] the thresholds form a hysteresis band so that a
//! count oscillating around one value does not rebuild the tree every commit.

/// Requested spatial strategy.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum IndexStrategy {
    /// Pick the backend from the item count using [`StrategyThresholds`].
    #[default]
    Auto,
    /// Always use the linear scan.
    ForceLinear,
    /// Always use the R-tree.
    ForceTree,
}

/// Backend actually serving queries.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum ActiveBackend {
    /// [`LinearScan`](crate::LinearScan).
    #[default]
    Linear,
    /// [`RTree`](crate::RTree).
    Tree,
}

/// Hysteresis band for [`IndexStrategy::Auto`].
///
/// The tree is switched on once the count reaches `tree_on` and switched off
/// once the count drops below `tree_off`. `tree_off <= tree_on` is expected; a
/// larger `tree_off` is treated as equal to `tree_on`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct StrategyThresholds {
    /// Item count at which the tree becomes active.
    pub tree_on: usize,
    /// Item count below which the linear scan becomes active again.
    pub tree_off: usize,
}

impl Default for StrategyThresholds {
    fn default() -> Self {
        Self {
            tree_on: 64,
            tree_off: 32,
        }
    }
}

/// Decide which backend serves `item_count` items.
pub fn select_strategy(
    item_count: usize,
    current: ActiveBackend,
    strategy: IndexStrategy,
    thresholds: StrategyThresholds,
) -> ActiveBackend {
    match strategy {
        IndexStrategy::ForceLinear => ActiveBackend::Linear,
        IndexStrategy::ForceTree => ActiveBackend::Tree,
        IndexStrategy::Auto => {
            let off = thresholds.tree_off.min(thresholds.tree_on);
            if item_count >= thresholds.tree_on {
                ActiveBackend::Tree
            } else if item_count < off {
                ActiveBackend::Linear
            } else {
                current
            }
        }
    }
}
