// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend implementations for different spatial strategies.
//!
//! - `linear`: slot table with linear scans; the reference for correctness.
//! - `rtree`: generic R-tree (`T: Scalar`) with SAH-like splits and STR bulk loading
//!   (aliases: `RTreeF64`, `RTreeI64`).
//! - `adaptive`: swaps between the two by live item count, with hysteresis.
//!
//! SAH note
//! --------
//! For a split point `k` along a sorted axis the R-tree minimizes:
//!
//! `cost(k) = area(LB_k) * k + area(RB_k) * (n - k)`
//!
//! where `LB_k` and `RB_k` are the bounding boxes of the first `k` and remaining `n - k` items.
//! Prefix/suffix boxes make each axis O(n). Accumulators are widened
//! (`f64`→`f64`, `i64`→`i128`) for robust comparisons.

pub mod adaptive;
pub mod linear;
pub mod rtree;
