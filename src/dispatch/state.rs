//! Adaptive admission state for the dispatch queue.
//!
//! Failures tighten admission and stretch the backoff; successes restore
//! admission one slot at a time and shrink the backoff back toward its base.
//! Invariant: `1 <= concurrency_limit <= max_concurrency`.

use std::time::Duration;

use crate::config::QueueConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueState {
    /// Current admission ceiling
    pub concurrency_limit: usize,
    /// Ceiling the limit recovers toward
    pub max_concurrency: usize,
    /// Backoff applied before the next retry
    pub delay: Duration,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Attempts per task, first attempt included
    pub max_retries: u32,
    /// Tasks currently holding a slot
    pub active: usize,
}

impl QueueState {
    pub fn new(config: &QueueConfig) -> Self {
        let concurrency = config.concurrency.max(1);
        let base_delay = config.base_delay();
        Self {
            concurrency_limit: concurrency,
            max_concurrency: concurrency,
            delay: base_delay,
            base_delay,
            max_delay: config.max_delay().max(base_delay),
            max_retries: config.max_retries.max(1),
            active: 0,
        }
    }

    pub fn has_capacity(&self) -> bool {
        self.active < self.concurrency_limit
    }

    /// Register a failed attempt and return the delay to wait before retrying.
    pub fn record_failure(&mut self) -> Duration {
        if self.concurrency_limit > 1 {
            self.concurrency_limit -= 1;
        }
        self.delay = self.delay.saturating_mul(2).min(self.max_delay);
        self.delay
    }

    /// Register a successful attempt. Below the ceiling the limit grows by
    /// one and the backoff halves; at the ceiling nothing changes.
    pub fn record_success(&mut self) {
        if self.concurrency_limit < self.max_concurrency {
            self.concurrency_limit += 1;
            self.delay = (self.delay / 2).max(self.base_delay);
        }
    }

    /// Reset both the limit and its ceiling.
    pub fn set_concurrency(&mut self, concurrency: usize) {
        let concurrency = concurrency.max(1);
        self.concurrency_limit = concurrency;
        self.max_concurrency = concurrency;
    }

    /// Set the base backoff; the current backoff restarts from it.
    pub fn set_delay(&mut self, delay: Duration) {
        self.base_delay = delay;
        self.delay = delay;
        self.max_delay = self.max_delay.max(delay);
    }

    pub fn set_max_retries(&mut self, max_retries: u32) {
        self.max_retries = max_retries.max(1);
    }
}
