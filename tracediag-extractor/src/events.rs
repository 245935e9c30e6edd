// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scanning trace event streams.
//!
//! Every entry in a trace archive outside the resource directory is a stream of newline-delimited
//! JSON values. Each line is parsed on its own and classified into one of the [`TraceEvent`]
//! shapes; lines that are not valid JSON or do not match a known shape are skipped, and never
//! affect the lines around them.

use crate::archive::Archive;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

/// A recognized trace event.
#[derive(Clone, Debug, PartialEq)]
pub enum TraceEvent {
    /// A captured network request and response (`"type": "resource-snapshot"`).
    ResourceSnapshot(ResourceSnapshot),

    /// A console API call in the page (`"type": "console"`).
    Console(ConsoleMessage),

    /// An uncaught error in the page (`"type": "event"`, `"method": "pageError"`).
    PageError(PageError),
}

impl TraceEvent {
    /// Classifies a raw JSON value, returning `None` if it isn't a recognized event.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value.get("type")?.as_str()? {
            "resource-snapshot" => {
                ResourceSnapshot::from_value(value.get("snapshot")?).map(Self::ResourceSnapshot)
            }
            "console" => ConsoleMessage::deserialize(value).ok().map(Self::Console),
            "event" if value.get("method").and_then(Value::as_str) == Some("pageError") => {
                Some(Self::PageError(PageError::from_params(value.get("params"))))
            }
            _ => None,
        }
    }

    /// Parses and classifies a single event line.
    pub fn from_line(line: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(line).ok()?;
        Self::from_value(&value)
    }
}

/// A pointer to a payload body stored in the resource directory.
#[derive(Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayloadDescriptor {
    /// The declared media type of the body.
    #[serde(default)]
    pub mime_type: Option<String>,

    /// The name of the body's entry under the resource directory.
    #[serde(default, alias = "_sha1")]
    pub content_hash: Option<String>,
}

impl PayloadDescriptor {
    /// Reads a descriptor, treating anything that isn't a well-formed descriptor object as absent.
    fn from_value(value: Option<&Value>) -> Option<Self> {
        Self::deserialize(value?).ok()
    }
}

/// The body of a resource snapshot event.
///
/// Fields are read leniently: a field with an unexpected JSON type is treated as absent. Whether
/// the snapshot is complete enough to become a network record is decided by the record builder.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceSnapshot {
    /// Total request time in milliseconds.
    pub time: Option<f64>,

    /// The browser's classification of the request, such as `fetch` or `document`.
    pub resource_type: Option<String>,

    /// The request.
    pub request: SnapshotRequest,

    /// The response, if one was received.
    pub response: Option<SnapshotResponse>,
}

/// The request half of a [`ResourceSnapshot`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SnapshotRequest {
    /// The request method.
    pub method: Option<String>,

    /// The request URL.
    pub url: Option<String>,

    /// The request body.
    pub post_data: Option<PayloadDescriptor>,
}

/// The response half of a [`ResourceSnapshot`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SnapshotResponse {
    /// The status code, if it was recorded as an integral JSON number.
    pub status: Option<i64>,

    /// The response body.
    pub content: Option<PayloadDescriptor>,
}

impl ResourceSnapshot {
    fn from_value(snapshot: &Value) -> Option<Self> {
        let request = snapshot.get("request")?;
        if !request.is_object() {
            return None;
        }

        let response = snapshot
            .get("response")
            .filter(|response| response.is_object())
            .map(|response| SnapshotResponse {
                status: response.get("status").and_then(integral),
                content: PayloadDescriptor::from_value(response.get("content")),
            });

        Some(Self {
            time: snapshot.get("time").and_then(Value::as_f64),
            resource_type: string_field(snapshot, "_resourceType")
                .or_else(|| string_field(snapshot, "resourceType")),
            request: SnapshotRequest {
                method: string_field(request, "method"),
                url: string_field(request, "url"),
                post_data: PayloadDescriptor::from_value(request.get("postData")),
            },
            response,
        })
    }
}

/// A console message event.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsoleMessage {
    /// The console API used: `log`, `info`, `warning`, `error`, and so on.
    pub message_type: String,

    /// The formatted message text.
    #[serde(default)]
    pub text: Option<String>,
}

/// A page error event.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct PageError {
    /// The error text, from either `params.error` or `params.error.message`.
    pub error: Option<String>,
}

impl PageError {
    fn from_params(params: Option<&Value>) -> Self {
        let error = params.and_then(|params| params.get("error"));
        let text = match error {
            Some(Value::String(text)) => Some(text.clone()),
            Some(error @ Value::Object(_)) => string_field(error, "message"),
            _ => None,
        };
        Self { error: text }
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value.get(key)?.as_str().map(str::to_owned)
}

/// Returns the value as an integer if it is a JSON number with no fractional part.
///
/// Numeric strings such as `"201"` are not coerced.
fn integral(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let n = value.as_f64()?;
    (n.fract() == 0.0 && n >= i64::MIN as f64 && n <= i64::MAX as f64).then_some(n as i64)
}

/// Scans newline-delimited event text, yielding recognized events in line order.
pub fn scan_events(text: &str) -> impl Iterator<Item = TraceEvent> + '_ {
    text.split('\n').filter_map(|line| {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        TraceEvent::from_line(line)
    })
}

/// Events scanned from one archive.
#[derive(Clone, Debug, Default)]
pub struct ScannedArchive {
    /// Recognized events, in entry order and then line order.
    pub events: Vec<TraceEvent>,

    /// The number of event entries that could not be read.
    pub skipped_entries: usize,
}

/// Scans every event entry in an archive.
///
/// Resource and directory entries are not scanned. An entry that cannot be read is skipped
/// without affecting the others.
pub fn scan_archive(archive: &Archive) -> ScannedArchive {
    let mut scanned = ScannedArchive::default();

    for entry in archive.entries() {
        if entry.is_resource() || entry.is_dir() {
            continue;
        }
        match archive.read_entry_text(entry) {
            Ok(text) => scanned.events.extend(scan_events(&text)),
            Err(error) => {
                debug!("skipping unreadable trace entry: {error}");
                scanned.skipped_entries += 1;
            }
        }
    }

    scanned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        archive::ArchiveLimits,
        test_helpers::{ArchiveBuilder, EntrySpec, event_lines},
    };
    use indoc::indoc;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn classify_resource_snapshot() {
        let event = TraceEvent::from_value(&json!({
            "type": "resource-snapshot",
            "snapshot": {
                "time": 37.5,
                "_resourceType": "fetch",
                "request": {
                    "method": "POST",
                    "url": "https://api.example.com/v1/orders",
                    "postData": { "mimeType": "application/json", "contentHash": "req.json" },
                },
                "response": {
                    "status": 201,
                    "content": { "mimeType": "application/json", "_sha1": "resp.json" },
                },
            },
        }));

        assert_eq!(
            event,
            Some(TraceEvent::ResourceSnapshot(ResourceSnapshot {
                time: Some(37.5),
                resource_type: Some("fetch".to_owned()),
                request: SnapshotRequest {
                    method: Some("POST".to_owned()),
                    url: Some("https://api.example.com/v1/orders".to_owned()),
                    post_data: Some(PayloadDescriptor {
                        mime_type: Some("application/json".to_owned()),
                        content_hash: Some("req.json".to_owned()),
                    }),
                },
                response: Some(SnapshotResponse {
                    status: Some(201),
                    content: Some(PayloadDescriptor {
                        mime_type: Some("application/json".to_owned()),
                        content_hash: Some("resp.json".to_owned()),
                    }),
                }),
            }))
        );
    }

    #[test]
    fn snapshot_fields_are_lenient() {
        let event = TraceEvent::from_value(&json!({
            "type": "resource-snapshot",
            "snapshot": {
                "time": "slow",
                "resourceType": "xhr",
                "request": { "method": 7, "url": "https://example.com/" },
                "response": { "status": "201", "content": "not a descriptor" },
            },
        }));

        assert_eq!(
            event,
            Some(TraceEvent::ResourceSnapshot(ResourceSnapshot {
                time: None,
                resource_type: Some("xhr".to_owned()),
                request: SnapshotRequest {
                    method: None,
                    url: Some("https://example.com/".to_owned()),
                    post_data: None,
                },
                response: Some(SnapshotResponse {
                    status: None,
                    content: None,
                }),
            }))
        );
    }

    #[test_case(json!(201), Some(201) ; "integer")]
    #[test_case(json!(201.0), Some(201) ; "integral float")]
    #[test_case(json!(-1), Some(-1) ; "failed request")]
    #[test_case(json!(201.5), None ; "fractional")]
    #[test_case(json!("201"), None ; "numeric string")]
    #[test_case(json!(null), None ; "null")]
    fn status_values(status: Value, expected: Option<i64>) {
        assert_eq!(integral(&status), expected);
    }

    #[test]
    fn classify_console_and_page_errors() {
        assert_eq!(
            TraceEvent::from_value(&json!({ "type": "console", "messageType": "error", "text": "bad" })),
            Some(TraceEvent::Console(ConsoleMessage {
                message_type: "error".to_owned(),
                text: Some("bad".to_owned()),
            }))
        );
        assert_eq!(
            TraceEvent::from_value(&json!({ "type": "console", "messageType": "log" })),
            Some(TraceEvent::Console(ConsoleMessage {
                message_type: "log".to_owned(),
                text: None,
            }))
        );

        let page_error = |params: Value| {
            TraceEvent::from_value(&json!({ "type": "event", "method": "pageError", "params": params }))
        };
        assert_eq!(
            page_error(json!({ "error": "Uncaught TypeError" })),
            Some(TraceEvent::PageError(PageError {
                error: Some("Uncaught TypeError".to_owned()),
            }))
        );
        assert_eq!(
            page_error(json!({ "error": { "message": "boom", "stack": "at x" } })),
            Some(TraceEvent::PageError(PageError {
                error: Some("boom".to_owned()),
            }))
        );
        assert_eq!(
            page_error(json!({ "error": { "name": "Error" } })),
            Some(TraceEvent::PageError(PageError { error: None }))
        );
        assert_eq!(
            TraceEvent::from_value(&json!({ "type": "event", "method": "pageError" })),
            Some(TraceEvent::PageError(PageError { error: None }))
        );
    }

    #[test_case(json!({ "type": "before", "callId": "call@1" }) ; "unknown type")]
    #[test_case(json!({ "snapshot": {} }) ; "no discriminator")]
    #[test_case(json!({ "type": 7 }) ; "non-string discriminator")]
    #[test_case(json!({ "type": "event", "method": "dialog" }) ; "other protocol event")]
    #[test_case(json!({ "type": "resource-snapshot" }) ; "snapshot missing")]
    #[test_case(json!({ "type": "resource-snapshot", "snapshot": { "request": "GET /" } }) ; "request not an object")]
    #[test_case(json!({ "type": "console", "text": "hi" }) ; "console without message type")]
    #[test_case(json!([1, 2, 3]) ; "array")]
    fn unrecognized_shapes(value: Value) {
        assert_eq!(TraceEvent::from_value(&value), None);
    }

    #[test]
    fn scan_skips_bad_lines() {
        let text = indoc! {r#"
            {"type":"console","messageType":"warning","text":"first"}
            not json at all
            {"type":"console","messageType":"warning","text":"second"
            {"type":"unknown"}

            {"type":"console","messageType":"warning","text":"third"}
        "#};
        let texts: Vec<_> = scan_events(&text.replace('\n', "\r\n"))
            .map(|event| match event {
                TraceEvent::Console(message) => message.text.unwrap(),
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(texts, ["first", "third"]);
    }

    #[test]
    fn scan_archive_skips_resources_and_bad_entries() {
        let console = |text: &str| json!({ "type": "console", "messageType": "error", "text": text });
        let bytes = ArchiveBuilder::new()
            .stored("trace.trace", event_lines(&[console("one"), console("two")]))
            .deflated("resources/", "")
            .stored("resources/abc", event_lines(&[console("resource")]))
            .entry(EntrySpec::stored("broken.trace", event_lines(&[console("broken")])).with_method(99))
            .deflated("trace.network", event_lines(&[console("three")]))
            .build();
        let archive = Archive::from_bytes(bytes, &ArchiveLimits::default()).unwrap();

        let scanned = scan_archive(&archive);
        assert_eq!(scanned.skipped_entries, 1);
        let texts: Vec<_> = scanned
            .events
            .into_iter()
            .map(|event| match event {
                TraceEvent::Console(message) => message.text.unwrap(),
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(texts, ["one", "two", "three"]);
    }
}
