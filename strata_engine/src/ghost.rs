// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-piece ghost state: reconciles fast and exact findings for display.
//!
//! During a gesture a piece with fast findings is a transient ghost. Outside a
//! gesture the committed severity combines the fast findings of the committed
//! geometry, minus approximate support, with the exact verdict while it is
//! fresh. A missing or stale exact verdict counts as supported. Ghost state is
//! display only and never locks a piece.

use std::collections::HashMap;

use crate::config::Millis;
use crate::exact::{ExactTracker, Verdict};
use crate::problem::{Problem, ProblemCode, max_severity};
use crate::types::{PieceId, Severity};

/// Display phase of one piece.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum GhostPhase {
    /// Nothing to show.
    Clear,
    /// In a gesture with fast findings.
    Transient(Severity),
    /// Committed geometry with findings.
    Committed(Severity),
}

/// Ghost view of one piece.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct GhostState {
    /// Whether the piece is drawn as a ghost.
    pub is_ghost: bool,
    /// Worst current finding.
    pub severity: Option<Severity>,
    /// Whether a fresh exact verdict contributed.
    pub fresh: bool,
}

impl GhostPhase {
    /// Severity carried by the phase.
    pub fn severity(self) -> Option<Severity> {
        match self {
            Self::Clear => None,
            Self::Transient(s) | Self::Committed(s) => Some(s),
        }
    }
}

/// Ghost bookkeeping for every piece.
#[derive(Clone, Debug, Default)]
pub struct GhostMachine {
    transient: HashMap<PieceId, Option<Severity>>,
    committed: HashMap<PieceId, Option<Severity>>,
}

impl GhostMachine {
    /// Empty machine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the fast findings of a piece's in-gesture candidate.
    pub fn set_transient(&mut self, id: PieceId, problems: &[Problem]) {
        self.transient.insert(id, max_severity(problems));
    }

    /// Drop every transient state; called at gesture end and cancel.
    pub fn clear_transient(&mut self) {
        self.transient.clear();
    }

    /// Record the fast findings of a piece's committed geometry.
    ///
    /// Approximate support findings are ignored here; the exact tier owns support.
    pub fn set_committed(&mut self, id: PieceId, problems: &[Problem]) {
        let sev = max_severity(
            problems
                .iter()
                .filter(|p| p.code != ProblemCode::UnsupportedAbove),
        );
        self.committed.insert(id, sev);
    }

    /// Forget a deleted piece.
    pub fn forget(&mut self, id: PieceId) {
        self.transient.remove(&id);
        self.committed.remove(&id);
    }

    /// Current phase of `id`.
    pub fn phase(
        &self,
        id: PieceId,
        tracker: &ExactTracker,
        now: Millis,
        window: Millis,
    ) -> GhostPhase {
        if let Some(sev) = self.transient.get(&id) {
            return sev.map_or(GhostPhase::Clear, GhostPhase::Transient);
        }
        let fast = self.committed.get(&id).copied().flatten();
        let exact = exact_problem(id, tracker, now, window).map(|p| p.severity);
        fast.max(exact)
            .map_or(GhostPhase::Clear, GhostPhase::Committed)
    }

    /// Ghost view of `id`.
    pub fn state(
        &self,
        id: PieceId,
        tracker: &ExactTracker,
        now: Millis,
        window: Millis,
    ) -> GhostState {
        let severity = self.phase(id, tracker, now, window).severity();
        GhostState {
            is_ghost: severity.is_some(),
            severity,
            fresh: tracker.fresh(id, now, window).is_some(),
        }
    }
}

/// Support finding from a fresh exact verdict, if it says unsupported.
pub fn exact_problem(
    id: PieceId,
    tracker: &ExactTracker,
    now: Millis,
    window: Millis,
) -> Option<Problem> {
    match tracker.fresh(id, now, window)?.verdict {
        Verdict::Unsupported { uncovered_area } => {
            Some(
                Problem::new(ProblemCode::UnsupportedAbove, vec![id])
                    .with_measure(uncovered_area),
            )
        }
        Verdict::Supported | Verdict::Unknown(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exact::ExactOutcome;
    use crate::testing::scene_with;
    use crate::types::LayerId;
    use kurbo::Rect;

    const WINDOW: Millis = 5_000;

    fn unsupported(at: Millis) -> ExactOutcome {
        ExactOutcome {
            piece: PieceId(1),
            revision: 1,
            seq: 0,
            requested_at: at,
            verdict: Verdict::Unsupported {
                uncovered_area: 10.0,
            },
        }
    }

    #[test]
    fn transient_overrides_committed_until_cleared() {
        let mut ghosts = GhostMachine::new();
        let tracker = ExactTracker::new();
        let id = PieceId(1);
        ghosts.set_committed(id, &[]);
        ghosts.set_transient(id, &[Problem::new(ProblemCode::OverlapSameLayer, vec![id])]);
        assert_eq!(ghosts.phase(id, &tracker, 0, WINDOW), GhostPhase::Transient(Severity::Block));
        ghosts.clear_transient();
        assert_eq!(ghosts.phase(id, &tracker, 0, WINDOW), GhostPhase::Clear);
    }

    #[test]
    fn committed_ignores_fast_support_but_honours_spacing() {
        let mut ghosts = GhostMachine::new();
        let tracker = ExactTracker::new();
        let id = PieceId(1);
        ghosts.set_committed(id, &[Problem::new(ProblemCode::UnsupportedAbove, vec![id])]);
        assert_eq!(ghosts.phase(id, &tracker, 0, WINDOW), GhostPhase::Clear);
        ghosts.set_committed(id, &[Problem::new(ProblemCode::SpacingTooSmall, vec![id])]);
        assert_eq!(ghosts.phase(id, &tracker, 0, WINDOW), GhostPhase::Committed(Severity::Warn));
    }

    #[test]
    fn exact_verdict_expires_after_window() {
        let (_, scene, _) = scene_with(&[(LayerId::Middle, Rect::new(0.0, 0.0, 10.0, 10.0))]);
        let mut tracker = ExactTracker::new();
        tracker.apply(unsupported(1_000), &scene).unwrap();
        let mut ghosts = GhostMachine::new();
        ghosts.set_committed(PieceId(1), &[]);

        let now = 1_000 + 4_999;
        let s = ghosts.state(PieceId(1), &tracker, now, WINDOW);
        assert_eq!(
            s,
            GhostState {
                is_ghost: true,
                severity: Some(Severity::Warn),
                fresh: true
            }
        );
        let now = 1_000 + 5_001;
        let s = ghosts.state(PieceId(1), &tracker, now, WINDOW);
        assert_eq!(
            s,
            GhostState {
                is_ghost: false,
                severity: None,
                fresh: false
            }
        );
    }
}
