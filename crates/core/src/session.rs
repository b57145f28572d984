// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Session identity across continuity transitions.
//!
//! A trace starts with a fresh session id. The first continuity transition
//! (for example moving from a meeting into a breakout room) records the
//! current id as the parent; from then on every transition rotates the current
//! id and re-attributes buffered events to it. The parent is never overwritten
//! so the collector can always link sub-sessions back to the original one.

use serde_json::Value;
use tracing::debug;

use crate::buffer::EventBuffer;
use crate::event::EventKind;

/// Payload index of the identity details object that carries the parent link.
pub const IDENTITY_DETAILS_INDEX: usize = 2;

/// Field injected into identity details when a parent session is recorded.
pub const PARENT_SESSION_FIELD: &str = "parentStatsSessionId";

/// Produces fresh, collision-resistant identifiers.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random UUID v4 identifiers.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn generate(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Current and parent session identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    current: String,
    parent: Option<String>,
}

impl SessionIdentity {
    pub fn new(current: impl Into<String>) -> Self {
        SessionIdentity { current: current.into(), parent: None }
    }

    pub fn current_id(&self) -> &str {
        &self.current
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Runs the continuity step that precedes every connection attempt.
    ///
    /// Records the parent on the first continuation, then rotates the current
    /// id whenever a parent is recorded, rewriting the session id (and parent
    /// link for identity events) of everything still buffered.
    ///
    /// Returns true if the current id changed.
    pub fn begin_continuity_transition(
        &mut self,
        is_continuation: bool,
        ids: &dyn IdGenerator,
        buffer: &mut EventBuffer,
    ) -> bool {
        if is_continuation && self.parent.is_none() {
            debug!(parent = %self.current, "recording parent session");
            self.parent = Some(self.current.clone());
        }

        if self.parent.is_none() {
            return false;
        }

        let previous = std::mem::replace(&mut self.current, ids.generate());
        debug!(from = %previous, to = %self.current, buffered = buffer.len(), "rotated session id");

        buffer.rewrite_session(&self.current);
        for event in buffer.iter_mut() {
            if event.kind == EventKind::Identity {
                if let Some(payload) = event.payload.as_mut() {
                    self.link_identity(payload);
                }
            }
        }
        true
    }

    /// Injects the parent session id into an identity payload.
    ///
    /// No-op without a recorded parent, or when the designated details element
    /// is missing or not an object.
    pub fn link_identity(&self, payload: &mut [Value]) {
        let Some(parent) = self.parent.as_ref() else {
            return;
        };
        match payload.get_mut(IDENTITY_DETAILS_INDEX) {
            Some(Value::Object(details)) => {
                details.insert(PARENT_SESSION_FIELD.to_string(), Value::String(parent.clone()));
            }
            _ => debug!("identity payload has no details object, parent link skipped"),
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
