// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tl-core: delivery protocol for the tracelink telemetry agent
//!
//! This crate holds the I/O-free parts of the agent: the event model and wire
//! protocol, the bounded replay buffer, session identity, reconnect backoff and
//! the connection state machine. [`Tracer`] ties them together and reports what
//! the runtime should do as a list of [`Effect`]s.

pub mod ack;
pub mod backoff;
pub mod buffer;
pub mod clock;
pub mod delivery;
pub mod error;
pub mod event;
pub mod protocol;
pub mod session;
pub mod tracer;

#[cfg(test)]
mod test_helpers;

pub use ack::{process_ack, AckOutcome};
pub use backoff::Backoff;
pub use buffer::EventBuffer;
pub use clock::{ClockSource, SystemClock};
pub use delivery::{ChannelState, CloseInfo, ConnectRequest, DeliveryChannel, Effect};
pub use error::{Error, Result};
pub use event::{Event, EventKind, Sequencer};
pub use protocol::{Ack, ClientMessage, ServerMessage};
pub use session::{IdGenerator, SessionIdentity, UuidGenerator};
pub use tracer::{Tracer, TracerConfig};
