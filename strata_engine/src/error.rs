// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.
//!
//! Blocking validation findings surface as [`EngineError::Rejected`]; warnings
//! never produce an error. Oracle failures are folded into an unknown exact
//! verdict by the caller and never reach the editor surface as errors.

use thiserror::Error;

use crate::problem::Problem;
use crate::types::{LayerId, PieceId};

/// Errors returned by the editor surface and the scene reducer.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The piece does not exist in the committed scene.
    #[error("unknown piece {0}")]
    UnknownPiece(PieceId),

    /// The target layer is locked against geometry edits.
    #[error("layer {0} is locked")]
    LayerLocked(LayerId),

    /// An update or end call arrived without a matching begin.
    #[error("no gesture in progress")]
    NoGesture,

    /// A begin call arrived while another gesture is active.
    #[error("a gesture is already in progress")]
    GestureInProgress,

    /// The gesture needs at least one selected piece.
    #[error("selection is empty")]
    EmptySelection,

    /// Blocking problems rejected the commit; committed geometry is unchanged.
    #[error("commit rejected with {} blocking problem(s)", problems.len())]
    Rejected {
        /// The blocking findings.
        problems: Vec<Problem>,
    },

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Scene document import failed.
    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// Failures of an [`ExactGeometryOracle`](crate::oracle::ExactGeometryOracle).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    /// The oracle cannot be reached.
    #[error("oracle unavailable: {0}")]
    Unavailable(String),

    /// The input is outside what the oracle can evaluate.
    #[error("unsupported input: {0}")]
    Unsupported(String),

    /// The oracle was reached but the operation failed.
    #[error("oracle failed: {0}")]
    Failed(String),
}

/// Scene document import failures.
#[derive(Error, Debug)]
pub enum DocumentError {
    /// Malformed JSON or a field of the wrong shape.
    #[error("invalid scene document: {0}")]
    Json(#[from] serde_json::Error),

    /// The `version` field names a format this build does not read.
    #[error("unsupported document version {0}")]
    UnknownVersion(u64),

    /// The `version` field is missing.
    #[error("document has no version")]
    MissingVersion,

    /// Two pieces share one id.
    #[error("duplicate piece id {0}")]
    DuplicatePiece(PieceId),

    /// A layer table entry or member list disagrees with the pieces.
    #[error("layer table mismatch for piece {0}")]
    LayerMismatch(PieceId),

    /// A piece has a non-positive or non-finite size.
    #[error("piece {0} has invalid geometry")]
    InvalidGeometry(PieceId),
}

/// Inconsistent [`EngineConfig`](crate::config::EngineConfig) values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A value that must be positive and finite is not.
    #[error("`{field}` must be positive and finite, got {value}")]
    NotPositive {
        /// Field name.
        field: &'static str,
        /// Offending value.
        value: f64,
    },

    /// `tree_off` exceeds `tree_on`.
    #[error("`index.tree_off` ({tree_off}) must not exceed `index.tree_on` ({tree_on})")]
    ThresholdOrder {
        /// Switch-on count.
        tree_on: usize,
        /// Switch-off count.
        tree_off: usize,
    },

    /// Malformed JSON.
    #[error("invalid config: {0}")]
    Json(String),
}

/// Rotation that is not a multiple of 90 degrees.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("rotation {0} is not a multiple of 90 degrees")]
pub struct InvalidRotation(pub i64);

/// Report a broken internal invariant.
///
/// Panics in debug builds. Release builds log at error level and carry on.
macro_rules! invariant_violation {
    ($($arg:tt)+) => {{
        if cfg!(debug_assertions) {
            panic!($($arg)+);
        } else {
            tracing::error!(target: "strata_engine::invariant", $($arg)+);
        }
    }};
}

pub(crate) use invariant_violation;
