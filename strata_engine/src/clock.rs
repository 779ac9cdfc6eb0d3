// Copyright 2025 the Strata Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Time sources.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::Millis;

/// Millisecond clock used for freshness and idle debounce.
pub trait Clock: Send + Sync + core::fmt::Debug {
    /// Current time in milliseconds.
    fn now_ms(&self) -> Millis;
}

/// Wall clock (Unix milliseconds).
#[derive(Copy, Clone, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> Millis {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to. Clones share one time.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    now: Arc<Mutex<Millis>>,
}

impl ManualClock {
    /// Clock starting at `start`.
    pub fn starting_at(start: Millis) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Move forward by `ms`.
    pub fn advance(&self, ms: Millis) {
        *self.now.lock() += ms;
    }

    /// Jump to `ms`.
    pub fn set(&self, ms: Millis) {
        *self.now.lock() = ms;
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> Millis {
        *self.now.lock()
    }
}
