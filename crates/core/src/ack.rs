// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Acknowledgment processing.
//!
//! Every `sn` report trims the buffer up to the watermark. An initial
//! resumption report additionally resets reconnect bookkeeping and replays
//! everything still buffered, oldest first.

use tracing::debug;

use crate::buffer::EventBuffer;
use crate::delivery::{DeliveryChannel, Effect};
use crate::protocol::Ack;

/// What an acknowledgment did to the buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AckOutcome {
    pub trimmed: usize,
    pub replayed: usize,
}

/// Applies an acknowledgment to the buffer and channel.
pub fn process_ack(
    ack: Ack,
    buffer: &mut EventBuffer,
    channel: &mut DeliveryChannel,
    effects: &mut Vec<Effect>,
) -> AckOutcome {
    let trimmed = buffer.trim(ack.watermark);
    debug!(watermark = ack.watermark, trimmed, remaining = buffer.len(), "acknowledged");

    if !ack.is_initial_resumption {
        return AckOutcome { trimmed, replayed: 0 };
    }

    channel.resume(effects);
    let replayed = buffer.replay_all().filter(|event| channel.transmit(event, effects)).count();
    debug!(replayed, "replayed buffered events after resumption");

    AckOutcome { trimmed, replayed }
}

#[cfg(test)]
#[path = "ack_tests.rs"]
mod tests;
