// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Background evaluation of exact jobs on a tokio runtime.
//!
//! Each submitted job runs on its own task in a [`JoinSet`]; outcomes are read
//! by the control path only. A task that panics or is aborted still yields an
//! outcome, with an unknown verdict, so [`ExactRunner::next`] always drains.
//! There is no cancellation: outcomes for deleted or edited pieces are
//! discarded by [`ExactTracker`](crate::exact::ExactTracker) when they arrive.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::{Id, JoinSet};

use crate::exact::{ExactJob, ExactOutcome, Verdict, evaluate};
use crate::oracle::ExactGeometryOracle;

/// Spawns exact jobs and collects their outcomes.
pub struct ExactRunner {
    oracle: Arc<dyn ExactGeometryOracle>,
    handle: Handle,
    tasks: JoinSet<ExactOutcome>,
    // Enough of each job to answer for it if its task dies.
    headers: HashMap<Id, ExactOutcome>,
}

impl core::fmt::Debug for ExactRunner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ExactRunner")
            .field("in_flight", &self.tasks.len())
            .finish_non_exhaustive()
    }
}

impl ExactRunner {
    /// Runner spawning onto `handle`.
    pub fn new(oracle: Arc<dyn ExactGeometryOracle>, handle: Handle) -> Self {
        Self {
            oracle,
            handle,
            tasks: JoinSet::new(),
            headers: HashMap::new(),
        }
    }

    /// Runner spawning onto the runtime the caller is running in, if any.
    pub fn from_current(oracle: Arc<dyn ExactGeometryOracle>) -> Option<Self> {
        Handle::try_current().ok().map(|h| Self::new(oracle, h))
    }

    /// Start evaluating `job`.
    pub fn submit(&mut self, job: ExactJob) {
        let oracle = Arc::clone(&self.oracle);
        let header = ExactOutcome::unknown(&job, "evaluation task failed");
        tracing::debug!(piece = %job.piece, revision = job.revision, "exact job submitted");
        let task = self.tasks.spawn_on(
            async move { evaluate(&job, oracle.as_ref()).await },
            &self.handle,
        );
        self.headers.insert(task.id(), header);
    }

    /// Start evaluating every job in `jobs`.
    pub fn submit_all(&mut self, jobs: impl IntoIterator<Item = ExactJob>) {
        for job in jobs {
            self.submit(job);
        }
    }

    /// Jobs submitted whose outcome has not been received yet.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for the next outcome; `None` once nothing is in flight.
    ///
    /// A task that failed yields an unknown verdict for its piece.
    pub async fn next(&mut self) -> Option<ExactOutcome> {
        loop {
            match self.tasks.join_next_with_id().await? {
                Ok((id, outcome)) => {
                    self.headers.remove(&id);
                    return Some(outcome);
                }
                Err(err) => {
                    let Some(header) = self.headers.remove(&err.id()) else {
                        continue;
                    };
                    tracing::warn!(
                        piece = %header.piece,
                        error = %err,
                        "exact evaluation task failed"
                    );
                    return Some(ExactOutcome {
                        verdict: Verdict::Unknown(err.to_string()),
                        ..header
                    });
                }
            }
        }
    }
}
