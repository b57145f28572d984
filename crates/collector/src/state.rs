// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Collector state.
//!
//! Tracks the watermark of every session seen since startup and appends
//! received events to the optional output file.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use tl_core::{ClientMessage, EventKind};

/// Per-session delivery bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionRecord {
    /// Highest sequence number received.
    pub watermark: u64,
    /// Sequenced events received, replays included.
    pub received: u64,
}

/// One line of the output file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredEvent {
    pub meeting_id: String,
    pub stats_session_id: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Vec<Value>>,
}

/// Shared collector state.
#[derive(Clone)]
pub struct CollectorState {
    inner: Arc<CollectorStateInner>,
}

struct CollectorStateInner {
    sessions: Mutex<HashMap<String, SessionRecord>>,
    /// Append-only JSON lines file.
    out: Option<Mutex<File>>,
    /// Send a watermark after this many sequenced events; 0 disables.
    ack_every: u64,
}

impl CollectorState {
    /// Creates the state, opening `out` for appending if given.
    pub async fn new(ack_every: u64, out: Option<&Path>) -> std::io::Result<Self> {
        let out = match out {
            Some(path) => {
                Some(Mutex::new(OpenOptions::new().create(true).append(true).open(path).await?))
            }
            None => None,
        };

        Ok(CollectorState {
            inner: Arc::new(CollectorStateInner {
                sessions: Mutex::new(HashMap::new()),
                out,
                ack_every,
            }),
        })
    }

    /// Returns the watermark for `session_id`, zero if never seen.
    pub async fn watermark(&self, session_id: &str) -> u64 {
        self.session(session_id).await.watermark
    }

    pub async fn session(&self, session_id: &str) -> SessionRecord {
        self.inner.sessions.lock().await.get(session_id).copied().unwrap_or_default()
    }

    /// Records a message received on a connection for `session_id`.
    ///
    /// Replays are stored again; an agent may send new events before it
    /// has seen the initial resumption and replayed older ones. Returns the
    /// watermark to report if an acknowledgment is due.
    pub async fn record(
        &self,
        meeting_id: &str,
        session_id: &str,
        msg: &ClientMessage,
    ) -> std::io::Result<Option<u64>> {
        let ack = match msg.sequence() {
            Some(sequence) => {
                let mut sessions = self.inner.sessions.lock().await;
                let record = sessions.entry(session_id.to_string()).or_default();
                record.watermark = record.watermark.max(sequence);
                record.received += 1;

                let due = self.inner.ack_every > 0 && record.received % self.inner.ack_every == 0;
                due.then_some(record.watermark)
            }
            None => None,
        };

        if let Some(out) = &self.inner.out {
            let stored = StoredEvent {
                meeting_id: meeting_id.to_string(),
                stats_session_id: msg.stats_session_id.clone(),
                kind: msg.kind,
                data: msg.data.clone(),
            };
            let mut line = serde_json::to_string(&stored)?;
            line.push('\n');

            let mut file = out.lock().await;
            file.write_all(line.as_bytes()).await?;
            file.flush().await?;
        }

        Ok(ack)
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
