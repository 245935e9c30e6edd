// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use integration_tests::tracediag_cli::TracediagCli;
use serde_json::{Value, json};
use tracediag_extractor::test_helpers::{ArchiveBuilder, event_lines};

pub const ORDERS_URL: &str = "https://api.example.com/v1/orders";

pub fn tracediag_cli() -> TracediagCli {
    TracediagCli::new(env!("CARGO_BIN_EXE_tracediag-dup"))
}

pub fn console_event(message_type: &str, text: &str) -> Value {
    json!({ "type": "console", "messageType": message_type, "text": text })
}

/// Writes a trace for a test that creates an order, with request and response bodies stored as
/// resources.
#[track_caller]
pub fn write_orders_trace(dir: &Utf8Path) -> Utf8PathBuf {
    let events = [
        json!({ "type": "context-options", "browserName": "chromium" }),
        json!({
            "type": "resource-snapshot",
            "snapshot": {
                "time": 37,
                "_resourceType": "fetch",
                "request": {
                    "method": "POST",
                    "url": ORDERS_URL,
                    "postData": { "mimeType": "application/json", "contentHash": "0a1b2c" },
                },
                "response": {
                    "status": 201,
                    "content": { "mimeType": "application/json", "contentHash": "3d4e5f" },
                },
            },
        }),
        json!({
            "type": "resource-snapshot",
            "snapshot": {
                "request": { "method": "GET", "url": "https://cdn.example.com/logo.png" },
                "response": {
                    "status": 200,
                    "content": { "mimeType": "image/png", "contentHash": "6a7b8c" },
                },
            },
        }),
        console_event("log", "loading orders"),
        console_event("warning", "slow response"),
        json!({
            "type": "event",
            "method": "pageError",
            "params": { "error": { "message": "Cannot read properties of undefined", "stack": "" } },
        }),
    ];

    let path = dir.join("orders-trace.zip");
    ArchiveBuilder::new()
        .deflated("trace.trace", event_lines(&events[..1]))
        .deflated("trace.network", event_lines(&events[1..3]))
        .stored("trace.stacks", "{}")
        .stored("resources/0a1b2c", r#"{"request":"hello"}"#)
        .deflated("resources/3d4e5f", r#"{"response":"world"}"#)
        .stored("resources/6a7b8c", [0x89, b'P', b'N', b'G', 0x0d, 0x0a])
        .deflated("test.trace", event_lines(&events[3..]))
        .write_to(&path)
        .expect("wrote orders trace");
    path
}

/// Writes a trace with `count` console errors, with text `{prefix}-0` through
/// `{prefix}-{count - 1}`.
#[track_caller]
pub fn write_console_trace(dir: &Utf8Path, prefix: &str, count: usize) -> Utf8PathBuf {
    let events: Vec<_> = (0..count)
        .map(|i| console_event("error", &format!("{prefix}-{i}")))
        .collect();

    let path = dir.join(format!("{prefix}-trace.zip"));
    ArchiveBuilder::new()
        .deflated("trace.trace", event_lines(&events))
        .write_to(&path)
        .expect("wrote console trace");
    path
}
