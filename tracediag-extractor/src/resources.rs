// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolving out-of-band payload bodies.
//!
//! Request and response bodies are not stored inline in trace events. Instead, events carry a
//! [`PayloadDescriptor`] naming a content hash, and the body is stored in the archive under
//! `resources/<hash>`.

use crate::{archive::Archive, events::PayloadDescriptor};
use tracing::debug;

/// The directory within an archive holding content-addressed payload bodies.
pub const RESOURCE_DIR_PREFIX: &str = "resources/";

/// Resolves a payload descriptor to the text of its body.
///
/// Returns `None` when:
///
/// - the descriptor has no media type, or one that isn't JSON (see [`is_json_media_type`]);
/// - the descriptor has no content hash;
/// - no entry named `resources/<hash>` exists; or
/// - that entry cannot be read.
///
/// None of these are errors: binary bodies are expected to be skipped. Otherwise, the body is
/// returned truncated to `max_chars` characters.
pub fn resolve_payload(
    archive: &Archive,
    descriptor: &PayloadDescriptor,
    max_chars: usize,
) -> Option<String> {
    let mime_type = descriptor.mime_type.as_deref()?;
    if !is_json_media_type(mime_type) {
        return None;
    }
    let content_hash = descriptor.content_hash.as_deref()?;

    let entry = archive.entry_by_name(&format!("{RESOURCE_DIR_PREFIX}{content_hash}"))?;
    match archive.read_entry_text(entry) {
        Ok(mut text) => {
            truncate_chars(&mut text, max_chars);
            Some(text)
        }
        Err(error) => {
            debug!("skipping unreadable resource `{}`: {error}", entry.name());
            None
        }
    }
}

/// Returns true if `mime_type` denotes a JSON payload.
///
/// Only the media type essence (the part before any `;` parameters) is considered, compared
/// ASCII case-insensitively. Accepted are `application/json`, `text/json`, and any structured
/// syntax suffix type `type/subtype+json`. Anything else, including an essence that is empty or
/// lacks a `/`, is rejected.
pub fn is_json_media_type(mime_type: &str) -> bool {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    let Some((kind, subtype)) = essence.split_once('/') else {
        return false;
    };
    if kind.is_empty() || subtype.is_empty() || kind.contains(char::is_whitespace) {
        return false;
    }

    match (kind, subtype) {
        ("application", "json") | ("text", "json") => true,
        (_, subtype) => subtype
            .strip_suffix("+json")
            .is_some_and(|base| !base.is_empty()),
    }
}

/// Truncates `text` in place to at most `max_chars` characters.
///
/// Characters are Unicode scalar values, so multi-byte characters are never split. No marker is
/// appended.
pub fn truncate_chars(text: &mut String, max_chars: usize) {
    if let Some((byte_index, _)) = text.char_indices().nth(max_chars) {
        text.truncate(byte_index);
    }
}
