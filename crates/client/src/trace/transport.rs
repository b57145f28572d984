// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction for WebSocket communication.
//!
//! Provides a trait-based transport layer that enables:
//! - Real WebSocket connections for production
//! - Mock transports for unit testing
//!
//! A transport reports what happens on a connection through
//! [`ConnectionEvents`], tagged with the generation the driver assigned when it
//! asked for the connection. `connect` returns as soon as the attempt has
//! started; the outcome arrives later as an `Opened` or `Closed` event.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, SEC_WEBSOCKET_PROTOCOL, USER_AGENT};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use tl_core::protocol::ABNORMAL_CLOSURE_CODE;
use tl_core::{ClientMessage, ConnectRequest};

/// Reported when the peer closes without a status code.
const NO_STATUS_CODE: u16 = 1005;

/// Error type for transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection request could not be built.
    #[error("invalid connection request: {0}")]
    InvalidRequest(String),

    /// No open connection.
    #[error("connection closed")]
    ConnectionClosed,

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    SerializationError(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Something that happened on a connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Message(String),
    Closed { code: u16, reason: String },
}

/// Generation-tagged sender a transport uses to report connection events.
#[derive(Debug, Clone)]
pub struct ConnectionEvents {
    generation: u64,
    tx: mpsc::UnboundedSender<(u64, TransportEvent)>,
}

impl ConnectionEvents {
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<(u64, TransportEvent)>) -> Self {
        ConnectionEvents { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn opened(&self) {
        self.emit(TransportEvent::Opened);
    }

    pub fn message(&self, text: String) {
        self.emit(TransportEvent::Message(text));
    }

    pub fn closed(&self, code: u16, reason: impl Into<String>) {
        self.emit(TransportEvent::Closed { code, reason: reason.into() });
    }

    fn emit(&self, event: TransportEvent) {
        // The receiver is gone once the driver stopped; nothing left to tell.
        let _ = self.tx.send((self.generation, event));
    }
}

/// Transport trait for WebSocket-like communication.
///
/// This trait abstracts over the actual transport mechanism, allowing
/// for easy testing with mock implementations.
pub trait Transport: Send {
    /// Starts connecting, replacing any existing connection without
    /// reporting its closure.
    fn connect(
        &mut self,
        request: ConnectRequest,
        events: ConnectionEvents,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>>;

    /// Send a message on the open connection.
    fn send(
        &mut self,
        msg: ClientMessage,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>>;

    /// Starts a close handshake; the closure is reported as a `Closed` event.
    fn close(
        &mut self,
        code: u16,
        reason: String,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>>;

    /// Check if the current connection is open.
    fn is_open(&self) -> bool;
}

/// Instructions for a connection task.
enum Outbound {
    Text(String),
    Close { code: u16, reason: String },
}

/// Handle to a running connection task. Dropping it lets the task finish
/// queued sends, including a close, before it shuts the socket.
struct ConnectionHandle {
    outbound: mpsc::UnboundedSender<Outbound>,
    open: Arc<AtomicBool>,
    cancel: CancellationToken,
}

/// WebSocket transport implementation using tokio-tungstenite.
///
/// Each connection runs in its own task, which owns the socket and forwards
/// inbound frames as events.
pub struct WebSocketTransport {
    user_agent: String,
    connection: Option<ConnectionHandle>,
}

impl WebSocketTransport {
    /// Create a new WebSocket transport.
    pub fn new() -> Self {
        Self::with_user_agent(format!("tracelink/{}", env!("CARGO_PKG_VERSION")))
    }

    pub fn with_user_agent(user_agent: impl Into<String>) -> Self {
        WebSocketTransport { user_agent: user_agent.into(), connection: None }
    }

    fn build_request(&self, request: &ConnectRequest) -> TransportResult<Request> {
        let mut ws_request = request
            .url
            .as_str()
            .into_client_request()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let protocol = HeaderValue::from_str(&request.protocol)
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        let user_agent = HeaderValue::from_str(&self.user_agent)
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let headers = ws_request.headers_mut();
        headers.insert(SEC_WEBSOCKET_PROTOCOL, protocol);
        headers.insert(USER_AGENT, user_agent);
        Ok(ws_request)
    }
}

impl Default for WebSocketTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for WebSocketTransport {
    fn connect(
        &mut self,
        request: ConnectRequest,
        events: ConnectionEvents,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            if let Some(previous) = self.connection.take() {
                previous.cancel.cancel();
            }

            let ws_request = self.build_request(&request)?;
            let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
            let open = Arc::new(AtomicBool::new(false));
            let cancel = CancellationToken::new();

            tokio::spawn(run_connection(
                ws_request,
                outbound_rx,
                events,
                Arc::clone(&open),
                cancel.clone(),
            ));

            self.connection = Some(ConnectionHandle { outbound: outbound_tx, open, cancel });
            Ok(())
        })
    }

    fn send(
        &mut self,
        msg: ClientMessage,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            let connection = self
                .connection
                .as_ref()
                .filter(|c| c.open.load(Ordering::Acquire))
                .ok_or(TransportError::ConnectionClosed)?;

            let json = msg
                .to_json()
                .map_err(|e| TransportError::SerializationError(e.to_string()))?;

            connection
                .outbound
                .send(Outbound::Text(json))
                .map_err(|_| TransportError::ConnectionClosed)
        })
    }

    fn close(
        &mut self,
        code: u16,
        reason: String,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            let connection = self.connection.as_ref().ok_or(TransportError::ConnectionClosed)?;
            connection
                .outbound
                .send(Outbound::Close { code, reason })
                .map_err(|_| TransportError::ConnectionClosed)
        })
    }

    fn is_open(&self) -> bool {
        self.connection.as_ref().is_some_and(|c| c.open.load(Ordering::Acquire))
    }
}

/// Runs one connection from handshake to closure.
///
/// Reports `Opened` after the handshake and exactly one `Closed` afterwards,
/// unless cancelled because the connection was replaced.
async fn run_connection(
    request: Request,
    mut outbound: mpsc::UnboundedReceiver<Outbound>,
    events: ConnectionEvents,
    open: Arc<AtomicBool>,
    cancel: CancellationToken,
) {
    let generation = events.generation();

    let handshake = tokio::select! {
        _ = cancel.cancelled() => return,
        close = wait_for_close(&mut outbound) => {
            if let Some((code, reason)) = close {
                debug!(generation, code, "closed before handshake completed");
                events.closed(code, reason);
            }
            return;
        }
        result = tokio_tungstenite::connect_async(request) => result,
    };

    let ws_stream = match handshake {
        Ok((ws_stream, _response)) => ws_stream,
        Err(e) => {
            warn!(generation, error = %e, "websocket handshake failed");
            events.closed(ABNORMAL_CLOSURE_CODE, e.to_string());
            return;
        }
    };

    open.store(true, Ordering::Release);
    events.opened();

    let (mut sink, mut stream) = ws_stream.split();
    // Code we sent, reported if the peer drops without echoing it.
    let mut closing: Option<(u16, String)> = None;

    let (code, reason) = loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                open.store(false, Ordering::Release);
                let _ = sink.close().await;
                return;
            }
            msg = outbound.recv() => match msg {
                Some(Outbound::Text(text)) => {
                    if let Err(e) = sink.send(Message::Text(text.into())).await {
                        break (ABNORMAL_CLOSURE_CODE, e.to_string());
                    }
                }
                Some(Outbound::Close { code, reason }) => {
                    open.store(false, Ordering::Release);
                    let frame = CloseFrame { code: CloseCode::from(code), reason: reason.clone().into() };
                    if let Err(e) = sink.send(Message::Close(Some(frame))).await {
                        debug!(generation, error = %e, "close frame not sent");
                        break (code, reason);
                    }
                    closing = Some((code, reason));
                }
                None => {
                    open.store(false, Ordering::Release);
                    let _ = sink.close().await;
                    return;
                }
            },
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => events.message(text.as_str().to_owned()),
                Some(Ok(Message::Close(frame))) => {
                    break match frame {
                        Some(frame) => (u16::from(frame.code), frame.reason.as_str().to_owned()),
                        None => closing.take().unwrap_or((NO_STATUS_CODE, String::new())),
                    };
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    break closing.take().unwrap_or((ABNORMAL_CLOSURE_CODE, e.to_string()));
                }
                None => {
                    break closing.take().unwrap_or((
                        ABNORMAL_CLOSURE_CODE,
                        "connection ended without close frame".to_string(),
                    ));
                }
            },
        }
    };

    open.store(false, Ordering::Release);
    // Flushes the reply to a peer-initiated close.
    let _ = sink.close().await;
    debug!(generation, code, %reason, "connection closed");
    events.closed(code, reason);
}

/// Resolves with the close request if one arrives before the handshake ends.
/// Text queued before the connection opened is dropped.
async fn wait_for_close(outbound: &mut mpsc::UnboundedReceiver<Outbound>) -> Option<(u16, String)> {
    loop {
        match outbound.recv().await? {
            Outbound::Close { code, reason } => return Some((code, reason)),
            Outbound::Text(_) => continue,
        }
    }
}

#[cfg(test)]
#[path = "transport_tests.rs"]
mod tests;
