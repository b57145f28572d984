// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket server implementation.
//!
//! Accepts `/<meetingId>?statsSessionId=<id>`, reports the session's
//! watermark as an initial resumption and acknowledges received events
//! periodically.

use std::io::Write;
use std::net::SocketAddr;

use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::header::SEC_WEBSOCKET_PROTOCOL;
use tokio_tungstenite::tungstenite::http::{HeaderValue, StatusCode};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use tl_core::{ClientMessage, EventKind, ServerMessage};

use crate::state::CollectorState;

/// State sent with the watermark when a connection opens.
const INITIAL_STATE: &str = "initial";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Meeting and session named by the connection URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub meeting_id: String,
    pub session_id: String,
}

impl Target {
    /// Parses `/<meetingId>?statsSessionId=<id>`. The session id is required.
    pub fn parse(path: &str, query: Option<&str>) -> Option<Target> {
        let session_id = query?
            .split('&')
            .find_map(|pair| pair.strip_prefix("statsSessionId="))
            .filter(|id| !id.is_empty())?;

        Some(Target {
            meeting_id: path.trim_start_matches('/').to_string(),
            session_id: session_id.to_string(),
        })
    }
}

/// Run the WebSocket server on the given address.
///
/// Prints `READY <addr>` on stdout once listening.
pub async fn run(addr: SocketAddr, state: CollectorState) -> Result<(), BoxError> {
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;
    info!("Listening on: {}", local_addr);

    println!("READY {}", local_addr);
    let _ = std::io::stdout().flush();

    serve(listener, state).await
}

/// Accepts connections until the listener fails.
pub(crate) async fn serve(listener: TcpListener, state: CollectorState) -> Result<(), BoxError> {
    loop {
        let (stream, peer_addr) = listener.accept().await?;
        let state = state.clone();

        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }
}

/// Handle a single WebSocket connection.
pub(crate) async fn handle_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: CollectorState,
) -> Result<(), BoxError> {
    let mut target = None;
    let callback = |req: &Request, mut resp: Response| {
        target = Target::parse(req.uri().path(), req.uri().query());
        if target.is_none() {
            let mut rejection = ErrorResponse::new(Some("missing statsSessionId".to_string()));
            *rejection.status_mut() = StatusCode::BAD_REQUEST;
            return Err(rejection);
        }
        if let Some(protocol) = requested_protocol(req) {
            resp.headers_mut().insert(SEC_WEBSOCKET_PROTOCOL, protocol);
        }
        Ok(resp)
    };

    let ws_stream = match tokio_tungstenite::accept_hdr_async(stream, callback).await {
        Ok(ws_stream) => ws_stream,
        Err(e) => {
            warn!("Rejected connection from {}: {}", peer_addr, e);
            return Ok(());
        }
    };
    let Some(Target { meeting_id, session_id }) = target else {
        return Ok(());
    };
    info!(%peer_addr, meeting = %meeting_id, session = %session_id, "session connected");

    let (mut ws_sink, mut ws_stream) = ws_stream.split();

    let watermark = state.watermark(&session_id).await;
    let initial = ServerMessage::resumption(watermark, INITIAL_STATE);
    ws_sink.send(Message::Text(initial.to_json()?.into())).await?;

    loop {
        match ws_stream.next().await {
            Some(Ok(Message::Text(text))) => {
                match handle_client_message(&text, &meeting_id, &session_id, &state).await {
                    Ok(Some(response)) => {
                        ws_sink.send(Message::Text(response.to_json()?.into())).await?;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        debug!(session = %session_id, error = %e, "rejected message");
                        let error_msg = ServerMessage {
                            kind: "error".to_string(),
                            body: Value::from(e.to_string()),
                        };
                        ws_sink.send(Message::Text(error_msg.to_json()?.into())).await?;
                    }
                }
            }
            Some(Ok(Message::Close(frame))) => {
                let code = frame.map(|f| u16::from(f.code));
                info!(session = %session_id, ?code, "client disconnected");
                break;
            }
            Some(Ok(_)) => {
                // Binary, ping and pong frames carry nothing for us
            }
            Some(Err(e)) => {
                warn!("WebSocket error from {}: {}", peer_addr, e);
                break;
            }
            None => {
                info!("Client {} stream ended", peer_addr);
                break;
            }
        }
    }

    // Flushes the reply to the client's close frame.
    let _ = ws_sink.close().await;
    let watermark = state.watermark(&session_id).await;
    info!(session = %session_id, watermark = watermark, "connection closed");
    Ok(())
}

/// First token of the requested sub-protocol list, echoed to accept it.
fn requested_protocol(req: &Request) -> Option<HeaderValue> {
    let requested = req.headers().get(SEC_WEBSOCKET_PROTOCOL)?.to_str().ok()?;
    let first = requested.split(',').next()?.trim();
    HeaderValue::from_str(first).ok()
}

/// Inbound event. `data` arrives inline or as a serialized JSON array.
#[derive(Deserialize)]
struct IncomingMessage {
    #[serde(rename = "statsSessionId")]
    stats_session_id: String,
    #[serde(rename = "type")]
    kind: EventKind,
    #[serde(default)]
    data: Option<Value>,
}

impl IncomingMessage {
    fn normalize(self) -> Result<ClientMessage, BoxError> {
        let data = match self.data {
            None | Some(Value::Null) => None,
            Some(Value::Array(values)) => Some(values),
            Some(Value::String(serialized)) => Some(serde_json::from_str(&serialized)?),
            Some(other) => return Err(format!("unexpected data: {}", other).into()),
        };
        Ok(ClientMessage { stats_session_id: self.stats_session_id, kind: self.kind, data })
    }
}

/// Parses a client message, accepting either shape of `data`.
pub(crate) fn parse_client_message(text: &str) -> Result<ClientMessage, BoxError> {
    let incoming: IncomingMessage = serde_json::from_str(text)?;
    incoming.normalize()
}

/// Records a client message, returning an acknowledgment if one is due.
async fn handle_client_message(
    text: &str,
    meeting_id: &str,
    session_id: &str,
    state: &CollectorState,
) -> Result<Option<ServerMessage>, BoxError> {
    let msg = parse_client_message(text)?;
    debug!(session = %session_id, kind = %msg.kind, sequence = ?msg.sequence(), "received");

    let ack = state.record(meeting_id, session_id, &msg).await?;
    Ok(ack.map(ServerMessage::watermark))
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
