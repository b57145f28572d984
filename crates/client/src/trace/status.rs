// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Trace status visible to both the driver task and trace handles.
//!
//! Uses atomic fields for lock-free reads; only the session id, which changes
//! rarely, sits behind a mutex.

use std::sync::atomic::{AtomicU32, AtomicU8, AtomicUsize, Ordering};
use std::sync::Mutex;

use tl_core::{ChannelState, Tracer};

/// State values for the atomic state field.
pub const STATE_DISCONNECTED: u8 = 0;
pub const STATE_CONNECTING: u8 = 1;
pub const STATE_OPEN: u8 = 2;
pub const STATE_CLOSING: u8 = 3;
pub const STATE_TERMINATED: u8 = 4;

fn encode(state: ChannelState) -> u8 {
    match state {
        ChannelState::Disconnected => STATE_DISCONNECTED,
        ChannelState::Connecting => STATE_CONNECTING,
        ChannelState::Open => STATE_OPEN,
        ChannelState::Closing => STATE_CLOSING,
        ChannelState::Terminated => STATE_TERMINATED,
    }
}

fn decode(value: u8) -> ChannelState {
    match value {
        STATE_CONNECTING => ChannelState::Connecting,
        STATE_OPEN => ChannelState::Open,
        STATE_CLOSING => ChannelState::Closing,
        STATE_TERMINATED => ChannelState::Terminated,
        _ => ChannelState::Disconnected,
    }
}

/// Snapshot of the driver's tracer, published after every step.
pub struct SharedStatus {
    state: AtomicU8,
    attempts: AtomicU32,
    buffered: AtomicUsize,
    session_id: Mutex<String>,
}

impl SharedStatus {
    pub fn new(session_id: &str) -> Self {
        Self {
            state: AtomicU8::new(STATE_DISCONNECTED),
            attempts: AtomicU32::new(0),
            buffered: AtomicUsize::new(0),
            session_id: Mutex::new(session_id.to_string()),
        }
    }

    /// Copies the observable parts of the tracer.
    pub fn publish(&self, tracer: &Tracer) {
        self.state.store(encode(tracer.channel_state()), Ordering::Release);
        self.attempts.store(tracer.attempts(), Ordering::Release);
        self.buffered.store(tracer.buffer().len(), Ordering::Release);

        let mut session_id = self.session_id.lock().unwrap_or_else(|e| e.into_inner());
        if *session_id != tracer.session_id() {
            *session_id = tracer.session_id().to_string();
        }
    }

    pub fn state(&self) -> ChannelState {
        decode(self.state.load(Ordering::Acquire))
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::Acquire)
    }

    /// Number of events awaiting acknowledgment.
    pub fn buffered(&self) -> usize {
        self.buffered.load(Ordering::Acquire)
    }

    pub fn session_id(&self) -> String {
        self.session_id.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ChannelState::Open
    }

    pub fn is_closed(&self) -> bool {
        self.state() == ChannelState::Terminated
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
