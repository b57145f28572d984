// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test doubles for core module tests.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use crate::clock::ClockSource;
use crate::session::IdGenerator;

/// Generates `id-1`, `id-2`, ... for predictable assertions.
pub struct CountingIds {
    next: AtomicU32,
}

impl CountingIds {
    pub fn new() -> Self {
        CountingIds { next: AtomicU32::new(1) }
    }
}

impl IdGenerator for CountingIds {
    fn generate(&self) -> String {
        format!("id-{}", self.next.fetch_add(1, Ordering::SeqCst))
    }
}

/// Mock clock for testing with controllable time.
pub struct ManualClock {
    time_ms: AtomicU64,
}

impl ManualClock {
    pub fn new(initial_ms: u64) -> Self {
        ManualClock { time_ms: AtomicU64::new(initial_ms) }
    }

    pub fn advance(&self, ms: u64) {
        self.time_ms.fetch_add(ms, Ordering::SeqCst);
    }
}

impl ClockSource for ManualClock {
    fn now_ms(&self) -> u64 {
        self.time_ms.load(Ordering::SeqCst)
    }
}
