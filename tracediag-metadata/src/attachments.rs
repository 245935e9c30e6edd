// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

/// The content type that trace archive attachments are declared with by default.
pub const DEFAULT_ARCHIVE_CONTENT_TYPE: &str = "application/zip";

/// One output attachment of a test attempt, as reported by the test runner.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentDescriptor {
    /// The display name of the attachment, for example `"trace"` or `"screenshot"`.
    ///
    /// Not used for extraction.
    #[serde(default)]
    pub name: String,

    /// The declared content type of the attachment.
    pub content_type: String,

    /// Where the attachment lives on disk.
    ///
    /// Inline attachments (with a body rather than a file) have no path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Utf8PathBuf>,
}

impl AttachmentDescriptor {
    /// Creates a new descriptor for an attachment stored on disk.
    pub fn new(
        name: impl Into<String>,
        content_type: impl Into<String>,
        path: impl Into<Utf8PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            path: Some(path.into()),
        }
    }

    /// Creates a descriptor for a trace archive at `path`, declared with
    /// [`DEFAULT_ARCHIVE_CONTENT_TYPE`].
    pub fn trace(path: impl Into<Utf8PathBuf>) -> Self {
        Self::new("trace", DEFAULT_ARCHIVE_CONTENT_TYPE, path)
    }

    /// Returns the path to the attachment, if it is stored on disk.
    pub fn path(&self) -> Option<&Utf8Path> {
        self.path.as_deref()
    }

    /// Returns true if this attachment is declared with exactly `archive_content_type`.
    ///
    /// Content type parameters and case differences are not normalized: a producer that declares
    /// something other than the exact archive type is not producing trace archives.
    pub fn is_archive(&self, archive_content_type: &str) -> bool {
        self.content_type == archive_content_type
    }
}

/// The attachments of one test attempt, in the order the test runner reported them.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptInput {
    /// The attempt's attachments.
    #[serde(default)]
    pub attachments: Vec<AttachmentDescriptor>,
}
