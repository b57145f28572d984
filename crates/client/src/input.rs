// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! JSON lines accepted on the agent's stdin.
//!
//! - `{"type": "identity", "data": [...]}` records an identity event
//! - `{"type": "stats-entry", "data": [...]}` records a stats entry
//! - a bare array is shorthand for a stats entry

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};

/// One parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum InputLine {
    Identity(Vec<Value>),
    StatsEntry(Vec<Value>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLine {
    Bare(Vec<Value>),
    Tagged {
        #[serde(rename = "type")]
        kind: String,
        data: Vec<Value>,
    },
}

impl InputLine {
    pub fn parse(line: &str) -> Result<Self> {
        let raw: RawLine = serde_json::from_str(line)
            .map_err(|_| Error::Input("expected a JSON array or {\"type\", \"data\"} object".into()))?;

        match raw {
            RawLine::Bare(values) => Ok(InputLine::StatsEntry(values)),
            RawLine::Tagged { kind, data } => match kind.as_str() {
                "identity" => Ok(InputLine::Identity(data)),
                "stats-entry" => Ok(InputLine::StatsEntry(data)),
                other => Err(Error::Input(format!("unknown type '{}'", other))),
            },
        }
    }
}

#[cfg(test)]
#[path = "input_tests.rs"]
mod tests;
