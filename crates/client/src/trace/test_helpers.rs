// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Test doubles for trace tests.

#![allow(clippy::unwrap_used)]

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use tl_core::{ClientMessage, ConnectRequest, IdGenerator};

use super::transport::{ConnectionEvents, Transport, TransportError, TransportResult};

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

#[derive(Default)]
struct MockState {
    opens: Vec<(ConnectRequest, ConnectionEvents)>,
    sent: Vec<ClientMessage>,
    closes: Vec<(u16, String)>,
    open: bool,
    /// Swallow closes instead of echoing them, like a peer that hangs.
    mute_close: bool,
}

/// Transport that records what the driver asks of it.
///
/// Nothing happens on its own except that `close` is echoed back as a
/// `Closed` event, the way a well-behaved peer answers a close frame. Tests
/// use the [`MockHandle`] to inject everything else.
#[derive(Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

/// Test-side view of a [`MockTransport`].
#[derive(Clone)]
pub struct MockHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> (Self, MockHandle) {
        let transport = MockTransport::default();
        let handle = MockHandle { state: Arc::clone(&transport.state) };
        (transport, handle)
    }
}

impl Transport for MockTransport {
    fn connect(
        &mut self,
        request: ConnectRequest,
        events: ConnectionEvents,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            state.open = false;
            state.opens.push((request, events));
            Ok(())
        })
    }

    fn send(
        &mut self,
        msg: ClientMessage,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            if !state.open {
                return Err(TransportError::ConnectionClosed);
            }
            state.sent.push(msg);
            Ok(())
        })
    }

    fn close(
        &mut self,
        code: u16,
        reason: String,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            let mut state = self.state.lock().unwrap();
            let (_, events) = state.opens.last().ok_or(TransportError::ConnectionClosed)?;
            if !state.mute_close {
                events.closed(code, reason.clone());
            }
            state.open = false;
            state.closes.push((code, reason));
            Ok(())
        })
    }

    fn is_open(&self) -> bool {
        self.state.lock().unwrap().open
    }
}

impl MockHandle {
    /// Completes the handshake of the latest connection.
    pub fn open(&self) {
        let mut state = self.state.lock().unwrap();
        state.open = true;
        state.opens.last().unwrap().1.opened();
    }

    /// Delivers a text frame on the latest connection.
    pub fn message(&self, text: &str) {
        self.state.lock().unwrap().opens.last().unwrap().1.message(text.to_string());
    }

    /// Drops the latest connection with `code`.
    pub fn drop_connection(&self, code: u16) {
        let mut state = self.state.lock().unwrap();
        state.open = false;
        state.opens.last().unwrap().1.closed(code, "dropped");
    }

    pub fn mute_close(&self) {
        self.state.lock().unwrap().mute_close = true;
    }

    /// Event sender of the `index`th connection, for stale-event tests.
    pub fn events(&self, index: usize) -> ConnectionEvents {
        self.state.lock().unwrap().opens[index].1.clone()
    }

    pub fn opens(&self) -> Vec<ConnectRequest> {
        self.state.lock().unwrap().opens.iter().map(|(req, _)| req.clone()).collect()
    }

    pub fn sent(&self) -> Vec<ClientMessage> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn closes(&self) -> Vec<(u16, String)> {
        self.state.lock().unwrap().closes.clone()
    }
}
