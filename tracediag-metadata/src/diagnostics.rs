// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt;

/// Diagnostics extracted from the trace archives of one test attempt.
///
/// Both lists are always present in serialized output, even when empty.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptDiagnostics {
    /// Network requests captured during the attempt, in capture order.
    #[serde(default)]
    pub network: Vec<NetworkRecord>,

    /// Console warnings, console errors and uncaught page errors, in capture order.
    #[serde(default)]
    pub console_messages: Vec<ConsoleRecord>,
}

impl AttemptDiagnostics {
    /// Returns true if no diagnostics were extracted.
    pub fn is_empty(&self) -> bool {
        self.network.is_empty() && self.console_messages.is_empty()
    }
}

/// A single network request and its response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkRecord {
    /// The request method, for example `GET`. Never empty.
    pub method: String,

    /// The request URL. Never empty.
    pub url: String,

    /// The response status code.
    pub status: i64,

    /// The time the request took, in milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<f64>,

    /// The resource type as reported by the browser, for example `fetch` or `document`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,

    /// The request body, if it was a textual JSON payload. Length-capped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<String>,

    /// The response body, if it was a textual JSON payload. Length-capped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_body: Option<String>,
}

/// A console diagnostic emitted by the page under test.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ConsoleRecord {
    /// The kind of diagnostic.
    #[serde(rename = "type")]
    pub kind: ConsoleRecordKind,

    /// The message text. Never empty; length-capped.
    pub text: String,
}

impl ConsoleRecord {
    /// Creates a new console record.
    pub fn new(kind: ConsoleRecordKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }
}

/// The kind of a [`ConsoleRecord`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleRecordKind {
    /// `console.warn` and friends.
    Warning,
    /// `console.error` and friends.
    Error,
    /// An uncaught exception in the page.
    PageError,
}

impl ConsoleRecordKind {
    /// Returns the string used for this kind in serialized output.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
            Self::PageError => "pageerror",
        }
    }
}

impl fmt::Display for ConsoleRecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn serialize_empty_diagnostics() {
        let value = serde_json::to_value(AttemptDiagnostics::default()).unwrap();
        assert_eq!(value, json!({ "network": [], "consoleMessages": [] }));
    }

    #[test]
    fn serialize_records() {
        let diagnostics = AttemptDiagnostics {
            network: vec![NetworkRecord {
                method: "GET".to_owned(),
                url: "https://example.com/".to_owned(),
                status: 200,
                duration_ms: None,
                resource_type: Some("document".to_owned()),
                request_body: None,
                response_body: Some(r#"{"ok":true}"#.to_owned()),
            }],
            console_messages: vec![
                ConsoleRecord::new(ConsoleRecordKind::Warning, "careful"),
                ConsoleRecord::new(ConsoleRecordKind::PageError, "boom"),
            ],
        };

        let value = serde_json::to_value(&diagnostics).unwrap();
        assert_eq!(
            value,
            json!({
                "network": [{
                    "method": "GET",
                    "url": "https://example.com/",
                    "status": 200,
                    "resourceType": "document",
                    "responseBody": "{\"ok\":true}",
                }],
                "consoleMessages": [
                    { "type": "warning", "text": "careful" },
                    { "type": "pageerror", "text": "boom" },
                ],
            })
        );

        let roundtrip: AttemptDiagnostics = serde_json::from_value(value).unwrap();
        assert_eq!(roundtrip, diagnostics);
    }

    #[test]
    fn kind_display_matches_serde() {
        for kind in [
            ConsoleRecordKind::Warning,
            ConsoleRecordKind::Error,
            ConsoleRecordKind::PageError,
        ] {
            assert_eq!(
                serde_json::to_value(kind).unwrap(),
                serde_json::Value::String(kind.to_string()),
            );
        }
    }
}
