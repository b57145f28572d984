// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for tl-core operations.

use thiserror::Error;

/// All possible errors that can occur in tl-core operations.
///
/// None of these are fatal to a running trace: malformed inbound messages are
/// dropped by the caller after logging, and configuration errors surface once
/// at construction.
#[derive(Debug, Error)]
pub enum Error {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed acknowledgment: {0}")]
    MalformedAck(String),

    #[error("unsupported message type: '{0}'")]
    UnsupportedMessage(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A specialized Result type for tl-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
