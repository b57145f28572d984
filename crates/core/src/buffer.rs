// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded buffer of events awaiting acknowledgment.
//!
//! Events are appended at the tail and only leave the buffer when the
//! collector acknowledges a watermark at or above their sequence number. When
//! the buffer is full new events are not buffered at all; older events are
//! never evicted to make room.

use std::collections::VecDeque;

use crate::event::Event;

/// Default number of events held for replay.
pub const DEFAULT_CAPACITY: usize = 1000;

/// Ordered, bounded store of not-yet-acknowledged events.
#[derive(Debug)]
pub struct EventBuffer {
    events: VecDeque<Event>,
    capacity: usize,
}

impl EventBuffer {
    /// Creates an empty buffer holding at most `capacity` events.
    pub fn new(capacity: usize) -> Self {
        EventBuffer { events: VecDeque::new(), capacity }
    }

    /// Appends an event if there is room.
    ///
    /// Returns false when the buffer is full and the event was not kept.
    pub fn append(&mut self, event: Event) -> bool {
        if self.events.len() >= self.capacity {
            return false;
        }
        self.events.push_back(event);
        true
    }

    /// Removes every event with `sequence <= watermark`.
    ///
    /// Returns the number of events removed.
    pub fn trim(&mut self, watermark: u64) -> usize {
        let before = self.events.len();
        self.events.retain(|event| event.sequence > watermark);
        before - self.events.len()
    }

    /// Returns all buffered events in ascending sequence order without
    /// removing them.
    pub fn replay_all(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// Rewrites the session id of every buffered event.
    pub fn rewrite_session(&mut self, session_id: &str) {
        for event in self.events.iter_mut() {
            event.session_id = session_id.to_string();
        }
    }

    /// Mutable access for in-place enrichment of buffered events.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Event> {
        self.events.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Sequence numbers currently buffered, oldest first.
    pub fn sequences(&self) -> Vec<u64> {
        self.events.iter().map(|event| event.sequence).collect()
    }
}

impl Default for EventBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
#[path = "buffer_tests.rs"]
mod tests;
