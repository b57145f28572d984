// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// All possible errors that can occur in the tracelink library.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] tl_core::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("missing setting '{0}'\n  hint: set it in the config file or pass --{0}")]
    MissingSetting(&'static str),

    #[error("invalid input line: {0}")]
    Input(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for tracelink operations.
pub type Result<T> = std::result::Result<T, Error>;
