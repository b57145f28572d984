// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Connection lifecycle state machine.
//!
//! The channel does no I/O. Each input (a connect request, a transport
//! notification, a timer firing) mutates its state and appends [`Effect`]s
//! that the runtime executes: opening and closing the transport, sending
//! messages, arming and cancelling timers, and notifying the close callback.
//!
//! ```text
//!  Disconnected ──connect──► Connecting ──open──► Open
//!       ▲                        │                 │
//!       │ close (code != 3001)   │                 │ close()
//!       └────────────────────────┴─────────────────┤
//!       │                                          ▼
//!  reconnect timer                              Closing
//!       │  attempts >= max                         │ close event
//!       └──────────────────────► Terminated ◄──────┘
//! ```
//!
//! Every connection attempt gets a fresh generation number. Transport events
//! carrying an older generation belong to a connection that was replaced and
//! are ignored, so replacing a connection never schedules a retry.

use std::fmt;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::backoff::Backoff;
use crate::event::Event;
use crate::protocol::{ClientMessage, CONFERENCE_LEAVE_CODE, NORMAL_CLOSURE_CODE};

/// Default reconnect ceiling; roughly 8.5 to 11.5 minutes of retrying.
pub const MAX_RECONNECT_ATTEMPTS: u32 = 8;

/// Default keep-alive interval.
pub const DEFAULT_KEEP_ALIVE_INTERVAL: Duration = Duration::from_millis(30_000);

/// Lifecycle state of the delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// No connection; a reconnect may be pending.
    Disconnected,
    /// Transport open requested, not yet confirmed.
    Connecting,
    /// Transport open; events are sent immediately.
    Open,
    /// Intentional close requested, waiting for the transport to confirm.
    Closing,
    /// No further reconnects will be attempted.
    Terminated,
}

impl fmt::Display for ChannelState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ChannelState::Disconnected => "disconnected",
            ChannelState::Connecting => "connecting",
            ChannelState::Open => "open",
            ChannelState::Closing => "closing",
            ChannelState::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

/// Close notification delivered to the close callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseInfo {
    pub code: u16,
    pub reason: String,
}

/// Parameters for opening a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRequest {
    /// Full URL including the `statsSessionId` query parameter.
    pub url: String,
    /// Sub-protocol token, e.g. `3.1_STANDARD`.
    pub protocol: String,
}

/// Side effect requested by the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Open a new transport; report its events with `generation`.
    Open { generation: u64, request: ConnectRequest },
    /// Transmit a message on the open transport.
    Send(ClientMessage),
    /// Close the current transport.
    Close { code: u16, reason: String },
    /// Start emitting keep-alives at this interval.
    StartKeepAlive(Duration),
    StopKeepAlive,
    /// Arm the reconnect timer, replacing any armed one.
    ScheduleReconnect(Duration),
    CancelReconnect,
    /// Invoke the close callback.
    NotifyClosed(CloseInfo),
}

/// Tunables for the delivery channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelConfig {
    pub max_reconnect_attempts: u32,
    /// Zero disables keep-alives.
    pub keep_alive_interval: Duration,
    pub backoff: Backoff,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        ChannelConfig {
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
            keep_alive_interval: DEFAULT_KEEP_ALIVE_INTERVAL,
            backoff: Backoff::default(),
        }
    }
}

/// Connection lifecycle and reconnect bookkeeping.
#[derive(Debug)]
pub struct DeliveryChannel {
    config: ChannelConfig,
    state: ChannelState,
    /// Reconnect attempts since the last confirmed resumption.
    attempts: u32,
    reconnect_pending: bool,
    keep_alive_running: bool,
    generation: u64,
    /// Continuation flag of the last public connect, reused by retries.
    is_continuation: bool,
}

impl DeliveryChannel {
    pub fn new(config: ChannelConfig) -> Self {
        DeliveryChannel {
            config,
            state: ChannelState::Disconnected,
            attempts: 0,
            reconnect_pending: false,
            keep_alive_running: false,
            generation: 0,
            is_continuation: false,
        }
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_continuation(&self) -> bool {
        self.is_continuation
    }

    pub fn is_reconnect_pending(&self) -> bool {
        self.reconnect_pending
    }

    pub fn is_keep_alive_running(&self) -> bool {
        self.keep_alive_running
    }

    pub fn is_open(&self) -> bool {
        self.state == ChannelState::Open
    }

    /// True once no connection exists and none will be attempted.
    pub fn is_closed(&self) -> bool {
        self.state == ChannelState::Terminated
    }

    /// Starts a fresh reconnect cycle for a caller-initiated connect.
    ///
    /// Resets the attempt count, cancels any armed retry and revives a
    /// terminated channel.
    pub fn restart(&mut self, is_continuation: bool, effects: &mut Vec<Effect>) {
        self.is_continuation = is_continuation;
        self.attempts = 0;
        self.cancel_reconnect(effects);
        if self.state == ChannelState::Terminated {
            self.state = ChannelState::Disconnected;
        }
    }

    /// Requests a new transport, closing the current one first.
    pub fn open(&mut self, request: ConnectRequest, effects: &mut Vec<Effect>) {
        if matches!(
            self.state,
            ChannelState::Connecting | ChannelState::Open | ChannelState::Closing
        ) {
            debug!(generation = self.generation, "replacing existing connection");
            if self.state == ChannelState::Closing {
                // The leave in progress completes now; its echo arrives stale.
                effects.push(Effect::NotifyClosed(CloseInfo {
                    code: CONFERENCE_LEAVE_CODE,
                    reason: String::new(),
                }));
            }
            self.stop_keep_alive(effects);
            effects.push(Effect::Close {
                code: NORMAL_CLOSURE_CODE,
                reason: "reconnecting".to_string(),
            });
        }

        self.generation += 1;
        self.state = ChannelState::Connecting;
        info!(generation = self.generation, url = %request.url, "connecting");
        effects.push(Effect::Open { generation: self.generation, request });
    }

    /// Handles the transport reporting that it is open.
    ///
    /// Returns false if the notification was stale or unexpected.
    pub fn on_open(&mut self, generation: u64, effects: &mut Vec<Effect>) -> bool {
        if generation != self.generation || self.state != ChannelState::Connecting {
            debug!(generation, state = %self.state, "ignoring open notification");
            return false;
        }

        info!(generation, "connection open");
        self.state = ChannelState::Open;
        self.cancel_reconnect(effects);
        if !self.config.keep_alive_interval.is_zero() {
            self.keep_alive_running = true;
            effects.push(Effect::StartKeepAlive(self.config.keep_alive_interval));
        }
        true
    }

    /// Handles the transport reporting that it closed.
    ///
    /// Returns false if the notification was stale.
    pub fn on_close(
        &mut self,
        generation: u64,
        code: u16,
        reason: &str,
        effects: &mut Vec<Effect>,
    ) -> bool {
        if generation != self.generation
            || matches!(self.state, ChannelState::Disconnected | ChannelState::Terminated)
        {
            debug!(generation, code, "ignoring stale close notification");
            return false;
        }

        self.stop_keep_alive(effects);
        effects.push(Effect::NotifyClosed(CloseInfo { code, reason: reason.to_string() }));

        if code == CONFERENCE_LEAVE_CODE || self.state == ChannelState::Closing {
            info!(code, "connection closed intentionally");
            self.terminate(effects);
            return true;
        }

        let delay = self.config.backoff.delay(self.attempts);
        info!(code, reason, attempts = self.attempts, ?delay, "connection lost, scheduling reconnect");
        self.state = ChannelState::Disconnected;
        self.reconnect_pending = true;
        effects.push(Effect::ScheduleReconnect(delay));
        true
    }

    /// Handles the reconnect timer firing.
    ///
    /// Returns true if the caller should reconnect now.
    pub fn on_reconnect_timer(&mut self) -> bool {
        if !self.reconnect_pending || self.state != ChannelState::Disconnected {
            return false;
        }

        self.reconnect_pending = false;
        self.attempts += 1;
        if self.attempts < self.config.max_reconnect_attempts {
            debug!(attempt = self.attempts, "reconnect timer fired");
            return true;
        }

        warn!(attempts = self.attempts, "reconnect attempts exhausted, giving up");
        self.state = ChannelState::Terminated;
        false
    }

    /// Intentionally closes the channel. No reconnect follows.
    pub fn close(&mut self, effects: &mut Vec<Effect>) {
        match self.state {
            ChannelState::Connecting | ChannelState::Open => {
                info!(generation = self.generation, "closing connection");
                self.stop_keep_alive(effects);
                self.cancel_reconnect(effects);
                self.state = ChannelState::Closing;
                effects.push(Effect::Close { code: CONFERENCE_LEAVE_CODE, reason: String::new() });
            }
            ChannelState::Disconnected => self.terminate(effects),
            ChannelState::Closing | ChannelState::Terminated => {}
        }
    }

    /// The collector confirmed it resumed this session: retries are no
    /// longer needed and the attempt count starts over.
    pub fn resume(&mut self, effects: &mut Vec<Effect>) {
        self.cancel_reconnect(effects);
        self.attempts = 0;
    }

    /// Queues an immediate best-effort send if the transport is open.
    pub fn transmit(&self, event: &Event, effects: &mut Vec<Effect>) -> bool {
        if self.state != ChannelState::Open {
            return false;
        }
        effects.push(Effect::Send(event.to_wire()));
        true
    }

    fn terminate(&mut self, effects: &mut Vec<Effect>) {
        self.stop_keep_alive(effects);
        self.cancel_reconnect(effects);
        self.state = ChannelState::Terminated;
    }

    fn cancel_reconnect(&mut self, effects: &mut Vec<Effect>) {
        if self.reconnect_pending {
            self.reconnect_pending = false;
            effects.push(Effect::CancelReconnect);
        }
    }

    fn stop_keep_alive(&mut self, effects: &mut Vec<Effect>) {
        if self.keep_alive_running {
            self.keep_alive_running = false;
            effects.push(Effect::StopKeepAlive);
        }
    }
}

#[cfg(test)]
#[path = "delivery_tests.rs"]
mod tests;
