// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Validation findings.

use core::fmt;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::{PieceId, Severity};

/// Kind of finding.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProblemCode {
    /// The footprint leaves the scene.
    OutsideScene,
    /// Width or height below the minimum.
    MinSizeViolation,
    /// Positive-area overlap with a piece on the same layer.
    OverlapSameLayer,
    /// A same-layer neighbour is closer than the warning gap.
    SpacingTooSmall,
    /// The layer beneath does not fully carry the piece.
    UnsupportedAbove,
}

impl ProblemCode {
    /// Stable wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OutsideScene => "outside_scene",
            Self::MinSizeViolation => "min_size_violation",
            Self::OverlapSameLayer => "overlap_same_layer",
            Self::SpacingTooSmall => "spacing_too_small",
            Self::UnsupportedAbove => "unsupported_above",
        }
    }

    /// Severity this code always carries.
    pub const fn severity(self) -> Severity {
        match self {
            Self::OutsideScene | Self::MinSizeViolation | Self::OverlapSameLayer => Severity::Block,
            Self::SpacingTooSmall | Self::UnsupportedAbove => Severity::Warn,
        }
    }
}

impl fmt::Display for ProblemCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validation finding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    /// What was found.
    pub code: ProblemCode,
    /// Whether it blocks the commit.
    pub severity: Severity,
    /// Implicated pieces; the subject first when it has an id.
    pub pieces: Vec<PieceId>,
    /// Measured gap for spacing findings, or uncovered area for exact support findings.
    pub measure: Option<f64>,
}

impl Problem {
    /// Finding with the code's default severity.
    pub fn new(code: ProblemCode, pieces: Vec<PieceId>) -> Self {
        Self {
            code,
            severity: code.severity(),
            pieces,
            measure: None,
        }
    }

    /// Attach a measurement.
    #[must_use]
    pub fn with_measure(mut self, measure: f64) -> Self {
        self.measure = Some(measure);
        self
    }

    /// Whether this finding fails the gesture.
    pub fn is_blocking(&self) -> bool {
        self.severity == Severity::Block
    }
}

/// Highest severity in `problems`.
pub fn max_severity<'a>(problems: impl IntoIterator<Item = &'a Problem>) -> Option<Severity> {
    problems.into_iter().map(|p| p.severity).max()
}

/// `problems` with each finding listed once, in first-seen order.
///
/// A pairwise finding is raised from both sides; the two copies share a code
/// and a piece set and differ only in which piece comes first.
pub fn dedup_pairwise(problems: impl IntoIterator<Item = Problem>) -> Vec<Problem> {
    let mut seen = HashSet::new();
    problems
        .into_iter()
        .filter(|p| {
            let mut key = p.pieces.clone();
            key.sort_unstable();
            seen.insert((p.code, key))
        })
        .collect()
}

/// Scene-wide findings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Every current finding.
    pub problems: Vec<Problem>,
    /// Whether any finding blocks.
    pub has_block: bool,
}

impl ValidationReport {
    /// Collect findings and derive the blocking flag.
    pub fn from_problems(problems: Vec<Problem>) -> Self {
        let has_block = problems.iter().any(Problem::is_blocking);
        Self {
            problems,
            has_block,
        }
    }

    /// Findings implicating `id`.
    pub fn for_piece(&self, id: PieceId) -> impl Iterator<Item = &Problem> + '_ {
        self.problems.iter().filter(move |p| p.pieces.contains(&id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_flags_blocking() {
        let warn = Problem::new(ProblemCode::SpacingTooSmall, vec![PieceId(1), PieceId(2)])
            .with_measure(2.0);
        let report = ValidationReport::from_problems(vec![warn.clone()]);
        assert!(!report.has_block);
        let block = Problem::new(ProblemCode::OverlapSameLayer, vec![PieceId(3)]);
        let report = ValidationReport::from_problems(vec![warn, block]);
        assert!(report.has_block);
        assert_eq!(report.for_piece(PieceId(2)).count(), 1);
        assert_eq!(max_severity(&report.problems), Some(Severity::Block));
    }

    #[test]
    fn pairwise_findings_collapse_to_one() {
        let ab = Problem::new(ProblemCode::SpacingTooSmall, vec![PieceId(1), PieceId(2)]);
        let ba = Problem::new(ProblemCode::SpacingTooSmall, vec![PieceId(2), PieceId(1)]);
        let overlap = Problem::new(ProblemCode::OverlapSameLayer, vec![PieceId(1), PieceId(2)]);
        let out = dedup_pairwise([ab.clone(), ba, overlap.clone()]);
        assert_eq!(out, [ab, overlap]);
    }

    #[test]
    fn codes_use_snake_case_on_the_wire() {
        let json = serde_json::to_string(&ProblemCode::UnsupportedAbove).unwrap();
        assert_eq!(json, "\"unsupported_above\"");
        assert_eq!(ProblemCode::UnsupportedAbove.to_string(), "unsupported_above");
    }
}
