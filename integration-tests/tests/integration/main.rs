// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests
//!
//! Library tests go through [`DiagnosticsExtractor`] with archives written to temporary
//! directories. CLI tests run `tracediag-dup`, a copy of the `tracediag` binary built within this
//! package, so that its path is available through `CARGO_BIN_EXE_tracediag-dup`.

use camino_tempfile::Utf8TempDir;
use indoc::indoc;
use pretty_assertions::assert_eq;
use serde_json::json;
use tracediag_extractor::{
    aggregator::DiagnosticsExtractor,
    config::ExtractorConfig,
    test_helpers::{ArchiveBuilder, EntrySpec, event_lines},
};
use tracediag_metadata::{
    AttachmentDescriptor, AttemptDiagnostics, AttemptInput, ConsoleRecord, ConsoleRecordKind,
    NetworkRecord, TracediagExitCode,
};

mod fixtures;

use fixtures::*;

#[test]
fn test_orders_trace() {
    let dir = Utf8TempDir::new().unwrap();
    let trace = write_orders_trace(dir.path());

    let diagnostics =
        DiagnosticsExtractor::default().extract_attempt(&[AttachmentDescriptor::trace(trace)]);

    assert_eq!(
        diagnostics,
        AttemptDiagnostics {
            network: vec![
                NetworkRecord {
                    method: "POST".to_owned(),
                    url: ORDERS_URL.to_owned(),
                    status: 201,
                    duration_ms: Some(37.0),
                    resource_type: Some("fetch".to_owned()),
                    request_body: Some(r#"{"request":"hello"}"#.to_owned()),
                    response_body: Some(r#"{"response":"world"}"#.to_owned()),
                },
                NetworkRecord {
                    method: "GET".to_owned(),
                    url: "https://cdn.example.com/logo.png".to_owned(),
                    status: 200,
                    duration_ms: None,
                    resource_type: None,
                    request_body: None,
                    response_body: None,
                },
            ],
            console_messages: vec![
                ConsoleRecord::new(ConsoleRecordKind::Warning, "slow response"),
                ConsoleRecord::new(
                    ConsoleRecordKind::PageError,
                    "Cannot read properties of undefined"
                ),
            ],
        }
    );
}

#[test]
fn test_console_cap_across_archives() {
    let dir = Utf8TempDir::new().unwrap();
    let attachments = [
        AttachmentDescriptor::trace(write_console_trace(dir.path(), "first", 60)),
        AttachmentDescriptor::trace(write_console_trace(dir.path(), "second", 1)),
    ];

    let (diagnostics, stats) =
        DiagnosticsExtractor::default().extract_attempt_with_stats(&attachments);

    let texts: Vec<_> = diagnostics
        .console_messages
        .iter()
        .map(|record| record.text.clone())
        .collect();
    let expected: Vec<_> = (0..50).map(|i| format!("first-{i}")).collect();
    assert_eq!(texts, expected);
    assert_eq!(stats.console_records_dropped, 11);
}

#[test]
fn test_unreadable_attachments() {
    let dir = Utf8TempDir::new().unwrap();
    let text_file = dir.path().join("trace.zip");
    std::fs::write(&text_file, "Error: test timed out after 30000ms\n").unwrap();

    let attachments = [
        AttachmentDescriptor::trace(text_file),
        AttachmentDescriptor::trace(dir.path().join("does-not-exist.zip")),
    ];
    let diagnostics = DiagnosticsExtractor::default().extract_attempt(&attachments);
    assert_eq!(diagnostics, AttemptDiagnostics::default());
}

#[test]
fn test_corrupt_entry_does_not_affect_siblings() {
    let dir = Utf8TempDir::new().unwrap();
    let path = dir.path().join("trace.zip");
    ArchiveBuilder::new()
        .entry(
            EntrySpec::deflated(
                "trace.trace",
                event_lines(&[console_event("error", "lost")]),
            )
            .with_uncompressed_size(4),
        )
        .entry(EntrySpec::stored("trace.network", "ignored").with_method(12))
        .stored(
            "test.trace",
            event_lines(&[console_event("error", "kept")])
                + "{\"type\":\"console\",\"messageType\":\"error\"\n",
        )
        .write_to(&path)
        .unwrap();

    let (diagnostics, stats) = DiagnosticsExtractor::default()
        .extract_attempt_with_stats(&[AttachmentDescriptor::trace(path)]);
    assert_eq!(
        diagnostics.console_messages,
        [ConsoleRecord::new(ConsoleRecordKind::Error, "kept")]
    );
    assert_eq!(stats.archives_read, 1);
    assert_eq!(stats.entries_skipped, 2);
}

#[test]
fn test_multiple_attempts() {
    let dir = Utf8TempDir::new().unwrap();
    let orders = write_orders_trace(dir.path());
    let console = write_console_trace(dir.path(), "retry", 3);

    let attempts = [
        AttemptInput {
            attachments: vec![
                AttachmentDescriptor::new("screenshot", "image/png", &orders),
                AttachmentDescriptor::trace(&orders),
            ],
        },
        AttemptInput {
            attachments: vec![AttachmentDescriptor::trace(&console)],
        },
    ];

    let results = DiagnosticsExtractor::default().extract_attempts(&attempts);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].network.len(), 2);
    assert_eq!(results[0].console_messages.len(), 2);
    assert!(results[1].network.is_empty());
    assert_eq!(results[1].console_messages.len(), 3);
}

#[test]
fn test_config_limits() {
    let dir = Utf8TempDir::new().unwrap();
    let config_path = dir.path().join("tracediag.toml");
    std::fs::write(
        &config_path,
        indoc! {r#"
            [limits]
            max-console-records = 2
            max-body-chars = 5
        "#},
    )
    .unwrap();
    let config = ExtractorConfig::from_sources(Some(&config_path)).unwrap();

    let attachments = [
        AttachmentDescriptor::trace(write_orders_trace(dir.path())),
        AttachmentDescriptor::trace(write_console_trace(dir.path(), "extra", 5)),
    ];
    let diagnostics = DiagnosticsExtractor::new(config).extract_attempt(&attachments);

    assert_eq!(diagnostics.console_messages.len(), 2);
    assert_eq!(diagnostics.network[0].request_body.as_deref(), Some(r#"{"req"#));
    assert_eq!(diagnostics.network[0].response_body.as_deref(), Some(r#"{"res"#));
}

#[test]
fn test_cli_extract_trace() {
    let dir = Utf8TempDir::new().unwrap();
    let trace = write_orders_trace(dir.path());

    let output = tracediag_cli()
        .args(["extract", "--trace", trace.as_str()])
        .output();

    assert_eq!(
        output.stdout_json(),
        json!({
            "network": [
                {
                    "method": "POST",
                    "url": ORDERS_URL,
                    "status": 201,
                    "durationMs": 37.0,
                    "resourceType": "fetch",
                    "requestBody": "{\"request\":\"hello\"}",
                    "responseBody": "{\"response\":\"world\"}",
                },
                {
                    "method": "GET",
                    "url": "https://cdn.example.com/logo.png",
                    "status": 200,
                },
            ],
            "consoleMessages": [
                { "type": "warning", "text": "slow response" },
                { "type": "pageerror", "text": "Cannot read properties of undefined" },
            ],
        })
    );
}

#[test]
fn test_cli_extract_attachments() {
    let dir = Utf8TempDir::new().unwrap();
    let trace = write_console_trace(dir.path(), "first", 2);
    let attachments_path = dir.path().join("attachments.json");
    let output_path = dir.path().join("diagnostics.json");
    std::fs::write(
        &attachments_path,
        json!([
            { "attachments": [{ "name": "trace", "contentType": "application/zip", "path": trace.as_str() }] },
            { "attachments": [] },
        ])
        .to_string(),
    )
    .unwrap();

    let output = tracediag_cli()
        .args([
            "extract",
            "--attachments",
            attachments_path.as_str(),
            "--output",
            output_path.as_str(),
        ])
        .output();
    assert!(output.stdout.is_empty(), "{output}");

    let results: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&output_path).unwrap()).unwrap();
    assert_eq!(
        results,
        json!([
            {
                "network": [],
                "consoleMessages": [
                    { "type": "error", "text": "first-0" },
                    { "type": "error", "text": "first-1" },
                ],
            },
            { "network": [], "consoleMessages": [] },
        ])
    );
}

#[test]
fn test_cli_list_entries() {
    let dir = Utf8TempDir::new().unwrap();
    let trace = write_orders_trace(dir.path());

    let output = tracediag_cli()
        .args(["list-entries", trace.as_str()])
        .output();
    let names: Vec<_> = output
        .stdout_as_str()
        .lines()
        .map(|line| {
            line.rsplit_once("  ")
                .expect("line has a name column")
                .1
                .to_owned()
        })
        .collect();
    assert_eq!(
        names,
        [
            "trace.trace",
            "trace.network",
            "trace.stacks",
            "resources/0a1b2c",
            "resources/3d4e5f",
            "resources/6a7b8c",
            "test.trace",
        ]
    );
}

#[test]
fn test_cli_errors() {
    let dir = Utf8TempDir::new().unwrap();
    let not_a_trace = dir.path().join("notes.txt");
    std::fs::write(&not_a_trace, "plain text").unwrap();

    let output = tracediag_cli()
        .args(["list-entries", not_a_trace.as_str()])
        .unchecked(true)
        .output();
    assert_eq!(
        output.exit_status.code(),
        Some(TracediagExitCode::ARCHIVE_READ_FAILED),
        "{output}"
    );
    assert!(
        output
            .stderr_as_str()
            .contains("end of central directory record not found"),
        "{output}"
    );

    let output = tracediag_cli()
        .args(["extract", "--attachments", dir.path().join("missing.json").as_str()])
        .unchecked(true)
        .output();
    assert_eq!(
        output.exit_status.code(),
        Some(TracediagExitCode::INPUT_PARSE_FAILED),
        "{output}"
    );

    // Extraction itself never fails on a bad archive.
    let output = tracediag_cli()
        .args(["extract", "--trace", not_a_trace.as_str()])
        .output();
    assert_eq!(
        output.stdout_json(),
        json!({ "network": [], "consoleMessages": [] })
    );
}
