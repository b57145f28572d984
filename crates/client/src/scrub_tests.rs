// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use serde_json::json;
use yare::parameterized;

#[parameterized(
    ipv4 = { "10.0.0.17", "10.0.0.x" },
    ipv4_in_candidate = {
        "candidate:1 1 udp 2122260223 192.168.1.23 54321 typ host",
        "candidate:1 1 udp 2122260223 192.168.1.x 54321 typ host"
    },
    two_ipv4 = { "c=IN IP4 203.0.113.5 raddr 198.51.100.7", "c=IN IP4 203.0.113.x raddr 198.51.100.x" },
    ipv6_full = { "2001:db8:85a3:0:0:8a2e:370:7334", "2001:db8:85a3:x:x:x:x:x" },
    ipv6_compressed_tail = { "fe80:1:2::1", "fe80:1:2:x:x:x:x:x" },
    ipv6_compressed_early = { "2001:db8::1", "2001:db8:0:x:x:x:x:x" },
    ipv6_unique_local = { "fd00::1", "fd00:0:0:x:x:x:x:x" },
    ipv6_link_local = { "fe80::1ff:fe23:4567:890a", "fe80:0:0:x:x:x:x:x" },
    ipv6_mapped_ipv4 = { "::ffff:192.0.2.1", "0:0:0:x:x:x:x:x" },
    ipv6_in_candidate = {
        "candidate:1 1 udp 2122260223 2001:db8::7 54321 typ host",
        "candidate:1 1 udp 2122260223 2001:db8:0:x:x:x:x:x 54321 typ host"
    },
    ipv6_and_ipv4 = {
        "c=IN IP6 fd00::5 raddr 10.1.2.3",
        "c=IN IP6 fd00:0:0:x:x:x:x:x raddr 10.1.2.x"
    },
)]
fn masks_addresses(input: &str, expected: &str) {
    assert_eq!(IpScrubber::mask(input).as_deref(), Some(expected));
}

#[parameterized(
    plain = { "getstats" },
    empty = { "" },
    short_version = { "v1.2" },
    clock_time = { "12:30:45" },
    rust_path = { "std::fmt" },
    unspecified = { "a :: b" },
    candidate_prefix = { "candidate:1 1 udp" },
)]
fn leaves_text_without_addresses(input: &str) {
    assert_eq!(IpScrubber::mask(input), None);
}

#[test]
fn scrubs_nested_values() {
    let mut values = vec![
        json!("onicecandidate"),
        json!(null),
        json!({"candidate": "candidate:0 1 UDP 1 172.16.4.2 5000 typ srflx", "port": 5000}),
        json!(["8.8.8.8", 42, true]),
    ];

    IpScrubber.scrub(&mut values);

    assert_eq!(values[2]["candidate"], json!("candidate:0 1 UDP 1 172.16.4.x 5000 typ srflx"));
    assert_eq!(values[2]["port"], json!(5000));
    assert_eq!(values[3], json!(["8.8.8.x", 42, true]));
}

#[test]
fn noop_scrubber_leaves_values() {
    let mut values = vec![json!("10.0.0.1")];
    NoopScrubber.scrub(&mut values);
    assert_eq!(values, vec![json!("10.0.0.1")]);
}

#[parameterized(
    add_ice_candidate = { "addIceCandidate", true },
    on_ice_candidate = { "onicecandidate", true },
    set_local = { "setLocalDescription", true },
    set_remote = { "setRemoteDescription", true },
    get_stats = { "getstats", false },
    case_sensitive = { "addicecandidate", false },
)]
fn isolated_scrub_table(name: &str, expected: bool) {
    assert_eq!(requires_isolated_scrub(name), expected);
}
