// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Redaction of IP addresses in stats entries.
//!
//! Stats entries routinely embed ICE candidates and SDP blobs, which carry
//! host addresses. The scrubber masks the host part of every IPv4 and IPv6
//! address found in string values, recursing through arrays and objects.

use std::net::Ipv6Addr;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

/// Entry names whose values the caller still needs unmodified after the call.
/// For these, a deep copy is scrubbed instead of the caller's values.
const ISOLATED_SCRUB_NAMES: &[&str] =
    &["addIceCandidate", "onicecandidate", "setLocalDescription", "setRemoteDescription"];

// Hard-coded patterns, verified by the tests.
static IPV4: LazyLock<Regex> =
    LazyLock::new(|| match Regex::new(r"\b(\d{1,3}\.\d{1,3}\.\d{1,3}\.)\d{1,3}\b") {
        Ok(re) => re,
        Err(_) => unreachable!("static regex pattern"),
    });
/// Address-shaped tokens. Candidates are confirmed by parsing them as
/// `Ipv6Addr`, so compressed and IPv4-suffixed forms are covered too.
static IPV6: LazyLock<Regex> = LazyLock::new(|| {
    match Regex::new(
        r"(^|[^0-9A-Za-z:])([0-9A-Fa-f]{0,4}(?::[0-9A-Fa-f]{0,4}){2,7}(?:\.\d{1,3}){0,3})",
    ) {
        Ok(re) => re,
        Err(_) => unreachable!("static regex pattern"),
    }
});

/// Groups of an IPv6 address kept verbatim; the remaining five are masked.
const IPV6_KEPT_GROUPS: usize = 3;

/// Returns true if stats entries with this name must be scrubbed on a copy.
pub fn requires_isolated_scrub(name: &str) -> bool {
    ISOLATED_SCRUB_NAMES.contains(&name)
}

/// Redacts sensitive data from a stats entry in place.
pub trait Scrubber: Send + Sync {
    fn scrub(&self, values: &mut [Value]);
}

/// Masks IPv4 and IPv6 addresses.
#[derive(Debug, Default, Clone, Copy)]
pub struct IpScrubber;

impl IpScrubber {
    /// Returns `text` with every address masked, or `None` if nothing matched.
    pub fn mask(text: &str) -> Option<String> {
        let mut masked = None;

        if IPV6.is_match(text) {
            let mut changed = false;
            let replaced = IPV6.replace_all(text, |caps: &Captures<'_>| {
                let token = &caps[2];
                let followed_by_word = caps
                    .get(0)
                    .and_then(|m| text[m.end()..].chars().next())
                    .is_some_and(|c| c.is_ascii_alphanumeric());
                match token.parse::<Ipv6Addr>() {
                    Ok(addr) if !followed_by_word && !addr.is_unspecified() => {
                        changed = true;
                        format!("{}{}", &caps[1], mask_ipv6(addr))
                    }
                    _ => caps[0].to_string(),
                }
            });
            if changed {
                masked = Some(replaced.into_owned());
            }
        }

        let current = masked.as_deref().unwrap_or(text);
        if IPV4.is_match(current) {
            masked = Some(IPV4.replace_all(current, "${1}x").into_owned());
        }

        masked
    }

    fn scrub_value(value: &mut Value) {
        match value {
            Value::String(text) => {
                if let Some(masked) = Self::mask(text) {
                    *text = masked;
                }
            }
            Value::Array(items) => items.iter_mut().for_each(Self::scrub_value),
            Value::Object(map) => map.values_mut().for_each(Self::scrub_value),
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }
}

/// Expands `addr` and keeps its leading groups: `2001:db8::1` becomes
/// `2001:db8:0:x:x:x:x:x`.
fn mask_ipv6(addr: Ipv6Addr) -> String {
    let segments = addr.segments();
    let kept: Vec<String> =
        segments[..IPV6_KEPT_GROUPS].iter().map(|group| format!("{:x}", group)).collect();
    format!("{}{}", kept.join(":"), ":x".repeat(segments.len() - IPV6_KEPT_GROUPS))
}

impl Scrubber for IpScrubber {
    fn scrub(&self, values: &mut [Value]) {
        values.iter_mut().for_each(Self::scrub_value);
    }
}

/// Leaves values untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopScrubber;

impl Scrubber for NoopScrubber {
    fn scrub(&self, _values: &mut [Value]) {}
}

#[cfg(test)]
#[path = "scrub_tests.rs"]
mod tests;
