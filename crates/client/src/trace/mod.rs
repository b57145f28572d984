// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The trace handle.
//!
//! A [`Trace`] is a cheap, clonable handle to a background driver task. All
//! event methods return immediately; the driver stamps, buffers and sends
//! events in the order the calls were made.

mod driver;
mod status;
#[cfg(test)]
pub(crate) mod test_helpers;
mod transport;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

use tl_core::backoff::{DEFAULT_BASE_MS, DEFAULT_JITTER_CEILING_MS};
use tl_core::buffer::DEFAULT_CAPACITY;
use tl_core::delivery::{DEFAULT_KEEP_ALIVE_INTERVAL, MAX_RECONNECT_ATTEMPTS};
use tl_core::{
    Backoff, ChannelState, ClockSource, CloseInfo, IdGenerator, SystemClock, Tracer, TracerConfig,
    UuidGenerator,
};

use crate::error::Result;
use crate::scrub::{requires_isolated_scrub, IpScrubber, NoopScrubber, Scrubber};
use driver::{Command, Driver};

pub use status::SharedStatus;
pub use transport::{
    ConnectionEvents, Transport, TransportError, TransportEvent, TransportResult,
    WebSocketTransport,
};

/// Invoked with the code and reason every time a connection closes.
pub type CloseCallback = Arc<dyn Fn(CloseInfo) + Send + Sync>;

/// Options for starting a trace.
#[derive(Clone)]
pub struct TraceOptions {
    /// Collector base URL, `ws://` or `wss://`.
    pub endpoint: String,
    pub meeting_id: String,
    pub use_legacy_protocol: bool,
    /// Mask IP addresses in stats entries.
    pub obfuscate: bool,
    /// Zero disables keep-alives.
    pub keep_alive_interval: Duration,
    pub buffer_capacity: usize,
    pub max_reconnect_attempts: u32,
    pub base_delay_ms: u64,
    pub jitter_ceiling_ms: u64,
    pub on_close: Option<CloseCallback>,
}

impl TraceOptions {
    pub fn new(endpoint: impl Into<String>, meeting_id: impl Into<String>) -> Self {
        TraceOptions {
            endpoint: endpoint.into(),
            meeting_id: meeting_id.into(),
            use_legacy_protocol: false,
            obfuscate: true,
            keep_alive_interval: DEFAULT_KEEP_ALIVE_INTERVAL,
            buffer_capacity: DEFAULT_CAPACITY,
            max_reconnect_attempts: MAX_RECONNECT_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_MS,
            jitter_ceiling_ms: DEFAULT_JITTER_CEILING_MS,
            on_close: None,
        }
    }

    /// Sets the close callback.
    pub fn on_close(mut self, callback: impl Fn(CloseInfo) + Send + Sync + 'static) -> Self {
        self.on_close = Some(Arc::new(callback));
        self
    }

    fn tracer_config(&self) -> TracerConfig {
        TracerConfig {
            endpoint: self.endpoint.clone(),
            meeting_id: self.meeting_id.clone(),
            use_legacy_protocol: self.use_legacy_protocol,
            keep_alive_interval: self.keep_alive_interval,
            buffer_capacity: self.buffer_capacity,
            max_reconnect_attempts: self.max_reconnect_attempts,
            backoff: Backoff::new(self.base_delay_ms, self.jitter_ceiling_ms),
        }
    }
}

impl fmt::Debug for TraceOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TraceOptions")
            .field("endpoint", &self.endpoint)
            .field("meeting_id", &self.meeting_id)
            .field("use_legacy_protocol", &self.use_legacy_protocol)
            .field("obfuscate", &self.obfuscate)
            .field("keep_alive_interval", &self.keep_alive_interval)
            .field("buffer_capacity", &self.buffer_capacity)
            .field("max_reconnect_attempts", &self.max_reconnect_attempts)
            .field("base_delay_ms", &self.base_delay_ms)
            .field("jitter_ceiling_ms", &self.jitter_ceiling_ms)
            .field("on_close", &self.on_close.as_ref().map(|_| "<callback>"))
            .finish()
    }
}

/// Handle to a running trace.
#[derive(Clone)]
pub struct Trace {
    commands: mpsc::UnboundedSender<Command>,
    status: Arc<SharedStatus>,
    scrubber: Arc<dyn Scrubber>,
}

impl Trace {
    /// Starts a trace over WebSocket. Must be called within a tokio runtime.
    ///
    /// The trace stays disconnected until [`Trace::connect`] is called; events
    /// recorded before that are buffered.
    pub fn start(options: TraceOptions) -> Result<Self> {
        Self::with_parts(
            options,
            WebSocketTransport::new(),
            Arc::new(SystemClock),
            Arc::new(UuidGenerator),
        )
    }

    /// Starts a trace with a custom transport, clock and id source.
    pub fn with_parts<T: Transport + 'static>(
        options: TraceOptions,
        transport: T,
        clock: Arc<dyn ClockSource>,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self> {
        let tracer = Tracer::new(options.tracer_config(), clock, ids)?;
        let status = Arc::new(SharedStatus::new(tracer.session_id()));
        let scrubber: Arc<dyn Scrubber> =
            if options.obfuscate { Arc::new(IpScrubber) } else { Arc::new(NoopScrubber) };

        let (commands, commands_rx) = mpsc::unbounded_channel();
        let driver =
            Driver::new(tracer, transport, Arc::clone(&status), options.on_close, commands_rx);
        tokio::spawn(driver.run());

        Ok(Trace { commands, status, scrubber })
    }

    /// Records an identity event.
    pub fn identity(&self, values: Vec<Value>) {
        self.submit(Command::Identity(values));
    }

    /// Records a stats entry, scrubbing addresses first.
    ///
    /// The caller's values are scrubbed in place, except for entries named in
    /// the isolated-scrub table: those keep their original values and only the
    /// recorded copy is scrubbed.
    pub fn stats_entry(&self, values: &mut [Value]) {
        let isolated = values.first().and_then(Value::as_str).is_some_and(requires_isolated_scrub);

        let payload = if isolated {
            let mut copy = values.to_vec();
            self.scrubber.scrub(&mut copy);
            copy
        } else {
            self.scrubber.scrub(values);
            values.to_vec()
        };
        self.submit(Command::StatsEntry(payload));
    }

    /// Records a keep-alive. The driver emits these on its own while open.
    pub fn keep_alive(&self) {
        self.submit(Command::KeepAlive);
    }

    /// Connects, replacing any existing connection.
    ///
    /// `is_continuation` marks a hand-off to a sub-session: the current
    /// session becomes the parent and a new session id is used.
    pub fn connect(&self, is_continuation: bool) {
        self.submit(Command::Connect { is_continuation });
    }

    /// Closes with the leave code. No reconnect follows.
    pub fn close(&self) {
        self.submit(Command::Close { done: None });
    }

    /// Closes and waits up to `grace` for the connection to finish closing.
    ///
    /// Returns true if the trace terminated within the grace period.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        let (done, terminated) = oneshot::channel();
        self.submit(Command::Close { done: Some(done) });
        matches!(tokio::time::timeout(grace, terminated).await, Ok(Ok(())))
    }

    pub fn is_connected(&self) -> bool {
        self.status.is_connected()
    }

    pub fn is_closed(&self) -> bool {
        self.status.is_closed()
    }

    pub fn state(&self) -> ChannelState {
        self.status.state()
    }

    pub fn attempts(&self) -> u32 {
        self.status.attempts()
    }

    /// Number of events awaiting acknowledgment.
    pub fn buffered(&self) -> usize {
        self.status.buffered()
    }

    pub fn session_id(&self) -> String {
        self.status.session_id()
    }

    pub fn status(&self) -> &SharedStatus {
        &self.status
    }

    fn submit(&self, cmd: Command) {
        if self.commands.send(cmd).is_err() {
            debug!("trace driver stopped, command dropped");
        }
    }
}

#[cfg(test)]
#[path = "trace_tests.rs"]
mod tests;
