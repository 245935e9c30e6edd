// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Building records from trace events.

use crate::{
    archive::Archive,
    config::ExtractorLimits,
    events::{ConsoleMessage, PageError, PayloadDescriptor, ResourceSnapshot, TraceEvent},
    resources::{resolve_payload, truncate_chars},
};
use tracediag_metadata::{ConsoleRecord, ConsoleRecordKind, NetworkRecord};

/// Builds a network record from a resource snapshot.
///
/// Returns `None` unless the request has a non-empty method and URL, and the response has an
/// integral status. Bodies are resolved from the archive's resource directory; a body that can't
/// be resolved is left out of the record.
pub fn build_network_record(
    snapshot: &ResourceSnapshot,
    archive: &Archive,
    limits: &ExtractorLimits,
) -> Option<NetworkRecord> {
    let request = &snapshot.request;
    let method = non_empty(request.method.as_deref())?;
    let url = non_empty(request.url.as_deref())?;
    let response = snapshot.response.as_ref()?;
    let status = response.status?;

    let resolve = |descriptor: &PayloadDescriptor| {
        resolve_payload(archive, descriptor, limits.max_body_chars)
    };

    Some(NetworkRecord {
        method: method.to_owned(),
        url: url.to_owned(),
        status,
        duration_ms: snapshot.time,
        resource_type: snapshot.resource_type.clone(),
        request_body: request.post_data.as_ref().and_then(resolve),
        response_body: response.content.as_ref().and_then(resolve),
    })
}

/// Builds a console record from a console message or page error.
///
/// Console messages are kept only for the `warning` and `error` message types. Either kind is
/// dropped if it has no text.
pub fn build_console_record(
    event: &TraceEvent,
    limits: &ExtractorLimits,
) -> Option<ConsoleRecord> {
    let (kind, text) = match event {
        TraceEvent::Console(ConsoleMessage { message_type, text }) => {
            let kind = match message_type.as_str() {
                "warning" => ConsoleRecordKind::Warning,
                "error" => ConsoleRecordKind::Error,
                _ => return None,
            };
            (kind, text.as_deref())
        }
        TraceEvent::PageError(PageError { error }) => {
            (ConsoleRecordKind::PageError, error.as_deref())
        }
        TraceEvent::ResourceSnapshot(_) => return None,
    };

    let mut text = non_empty(text)?.to_owned();
    truncate_chars(&mut text, limits.max_console_text_chars);
    Some(ConsoleRecord::new(kind, text))
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}
