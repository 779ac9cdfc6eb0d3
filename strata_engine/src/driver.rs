// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Deterministic driver for tests and scripted sessions.
//!
//! A [`TestDriver`] owns the [`ManualClock`] its editor reads, and evaluates
//! exact jobs in the calling task instead of on a runtime, so a test decides
//! exactly when time passes and when outcomes land.

use std::sync::Arc;

use crate::clock::{Clock, ManualClock};
use crate::config::Millis;
use crate::editor::Editor;
use crate::exact::evaluate;
use crate::oracle::{ExactGeometryOracle, RectilinearOracle};

/// Clock and exact-job pump for an [`Editor`] built by [`Editor::with_test_driver`].
pub struct TestDriver {
    clock: ManualClock,
    oracle: Arc<dyn ExactGeometryOracle>,
}

impl core::fmt::Debug for TestDriver {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TestDriver")
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl TestDriver {
    /// Driver over `clock`, evaluating with [`RectilinearOracle`].
    pub fn new(clock: ManualClock) -> Self {
        Self {
            clock,
            oracle: Arc::new(RectilinearOracle),
        }
    }

    /// Evaluate with `oracle` instead.
    #[must_use]
    pub fn with_oracle(mut self, oracle: Arc<dyn ExactGeometryOracle>) -> Self {
        self.oracle = oracle;
        self
    }

    /// The shared clock.
    pub fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// Current time.
    pub fn now(&self) -> Millis {
        self.clock.now_ms()
    }

    /// Move time forward by `ms`.
    pub fn advance(&self, ms: Millis) {
        self.clock.advance(ms);
    }

    /// Evaluate every queued exact job and feed the outcomes back.
    ///
    /// Returns how many outcomes were stored.
    pub async fn pump(&self, editor: &mut Editor) -> usize {
        let mut stored = 0;
        for job in editor.take_exact_jobs() {
            let outcome = evaluate(&job, self.oracle.as_ref()).await;
            if editor.apply_exact_outcome(outcome).is_ok() {
                stored += 1;
            }
        }
        stored
    }

    /// Pump, wait out the idle debounce, release idle rechecks, and pump again.
    pub async fn settle(&self, editor: &mut Editor) -> usize {
        let mut stored = self.pump(editor).await;
        if editor.has_pending_exact() {
            self.advance(editor.config().idle_debounce_ms);
            editor.poll_idle();
            stored += self.pump(editor).await;
        }
        stored
    }
}
