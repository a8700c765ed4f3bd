/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::fmt;
use std::time::Duration;

use slog::{Logger, warn};
use tokio_util::sync::CancellationToken;

/// Linear backoff: retry `i` (counting from 0) waits `initial_delay + i * step`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    initial_delay: Duration,
    step: Duration,
    max_attempts: usize,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::new(Duration::from_secs(1), Duration::from_secs(2), 3)
    }
}

impl RetryPolicy {
    pub const fn new(initial_delay: Duration, step: Duration, max_attempts: usize) -> Self {
        RetryPolicy {
            initial_delay,
            step,
            max_attempts,
        }
    }

    /// A policy that tries exactly once.
    pub const fn no_retry() -> Self {
        RetryPolicy::new(Duration::ZERO, Duration::ZERO, 0)
    }

    #[inline]
    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    #[inline]
    pub fn step(&self) -> Duration {
        self.step
    }

    /// Number of additional attempts after the first one.
    #[inline]
    pub fn max_attempts(&self) -> usize {
        self.max_attempts
    }

    pub fn set_initial_delay(&mut self, delay: Duration) {
        self.initial_delay = delay;
    }

    pub fn set_step(&mut self, step: Duration) {
        self.step = step;
    }

    pub fn set_max_attempts(&mut self, max: usize) {
        self.max_attempts = max;
    }

    pub fn delay_for(&self, retry_index: usize) -> Duration {
        let factor = u32::try_from(retry_index).unwrap_or(u32::MAX);
        self.initial_delay
            .saturating_add(self.step.saturating_mul(factor))
    }

    /// Run `action` until it succeeds, attempts run out or `cancel` fires.
    ///
    /// The action receives the 0-based attempt index. The first attempt is
    /// always made. On failure the last error is returned as is.
    pub async fn run<T, E, F, Fut>(
        &self,
        cancel: &CancellationToken,
        logger: &Logger,
        mut action: F,
    ) -> Result<T, E>
    where
        E: fmt::Display,
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0usize;
        loop {
            let e = match action(attempt).await {
                Ok(v) => return Ok(v),
                Err(e) => e,
            };
            if attempt >= self.max_attempts || cancel.is_cancelled() {
                return Err(e);
            }

            let delay = self.delay_for(attempt);
            warn!(logger, "attempt {} failed: {e}", attempt + 1;
                "retry_in_ms" => delay.as_millis() as u64);
            tokio::select! {
                biased;

                _ = cancel.cancelled() => return Err(e),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}
