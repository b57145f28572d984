// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Reconnect delay calculation.
//!
//! `delay = 2^attempt * base + uniform(0, jitter)`. The jitter spreads
//! reconnecting clients apart when a collector restart drops all of them at
//! once.

use std::time::Duration;

use rand::Rng;

/// Base delay in milliseconds for the first retry.
pub const DEFAULT_BASE_MS: u64 = 1_000;

/// Upper bound (exclusive) of the random jitter in milliseconds.
pub const DEFAULT_JITTER_CEILING_MS: u64 = 10_000;

/// Exponential backoff with additive jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub base_ms: u64,
    pub jitter_ceiling_ms: u64,
}

impl Backoff {
    pub fn new(base_ms: u64, jitter_ceiling_ms: u64) -> Self {
        Backoff { base_ms, jitter_ceiling_ms }
    }

    /// Returns the wait before reconnect attempt number `attempt`.
    ///
    /// Never zero: a zero base is treated as one millisecond.
    pub fn delay(&self, attempt: u32) -> Duration {
        let jitter = if self.jitter_ceiling_ms > 0 {
            rand::rng().random_range(0..self.jitter_ceiling_ms)
        } else {
            0
        };
        Duration::from_millis(self.delay_ms_with_jitter(attempt, jitter))
    }

    /// Deterministic part of [`Backoff::delay`] with an explicit jitter value.
    pub fn delay_ms_with_jitter(&self, attempt: u32, jitter_ms: u64) -> u64 {
        let factor = 2u64.checked_pow(attempt).unwrap_or(u64::MAX);
        self.base_ms.max(1).saturating_mul(factor).saturating_add(jitter_ms)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::new(DEFAULT_BASE_MS, DEFAULT_JITTER_CEILING_MS)
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
