// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Strata Index: a generic 2D AABB index with committed range queries.
//!
//! - Insert, update, and remove axis-aligned bounding boxes (AABBs) with user payloads.
//! - Query by point or intersecting rectangle. Touching boxes count as intersecting.
//! - Batch updates with [`IndexGeneric::commit`] and receive a [`CommitDelta`]
//!   naming every inserted, removed, and moved payload.
//!
//! It is generic over the scalar type `T` and does not depend on any geometry crate.
//! Higher layers compute world-space AABBs and feed them here.
//!
//! Backends are pluggable via the [`Backend`] trait. [`LinearScan`] is the
//! baseline, [`RTree`] handles large irregular sets, and [`Adaptive`] picks
//! between them by item count using [`select_strategy`].
//!
//! # Example
//!
//! ```rust
//! use strata_index::{Aabb2D, AdaptiveIndex, IndexStrategy, StrategyThresholds};
//!
//! let mut idx: AdaptiveIndex<f64, u32> =
//!     AdaptiveIndex::with_strategy(IndexStrategy::Auto, StrategyThresholds::default());
//! let k1 = idx.insert(Aabb2D::from_xywh(0.0, 0.0, 10.0, 10.0), 1);
//! let _k2 = idx.insert(Aabb2D::from_xywh(10.0, 0.0, 10.0, 10.0), 2);
//! let _ = idx.commit();
//!
//! // The two boxes share an edge, so a probe on that edge finds both.
//! let hits: Vec<u32> = idx.query_point(10.0, 5.0).map(|(_, p)| p).collect();
//! assert_eq!(hits.len(), 2);
//!
//! idx.update(k1, Aabb2D::from_xywh(100.0, 0.0, 10.0, 10.0));
//! let delta = idx.commit();
//! assert_eq!(delta.moved.len(), 1);
//! ```
//!
//! ### Float semantics
//!
//! This crate assumes no NaNs for floating-point coordinates.

#![no_std]

extern crate alloc;

pub mod backend;
pub mod backends;
pub mod delta;
pub mod index;
pub mod strategy;
pub mod types;

pub use backend::Backend;
pub use backends::adaptive::Adaptive;
pub use backends::linear::LinearScan;
pub use backends::rtree::{RTree, RTreeF64, RTreeI64};
pub use delta::CommitDelta;
pub use index::{AdaptiveIndex, Index, IndexGeneric, Key, TreeIndex};
pub use strategy::{ActiveBackend, IndexStrategy, StrategyThresholds, select_strategy};
pub use types::{Aabb2D, Scalar};
