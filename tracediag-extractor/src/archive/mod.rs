// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reading trace archives.
//!
//! Trace archives use a minimal subset of the zip format:
//!
//! - A single disk, with no Zip64 extensions.
//! - Entries are either stored (method 0) or raw-deflate compressed (method 8).
//! - The central directory is authoritative for entry sizes.
//!
//! [`Archive`] parses the whole central directory eagerly, validating every local file header, so
//! that a corrupt archive is rejected as a unit rather than yielding a partial entry list. Entry
//! contents are decompressed on demand with [`Archive::read_entry`].

mod decompress;
mod format;
mod reader;

pub use reader::{Archive, ArchiveEntry, CompressionMethod};

use bytesize::ByteSize;

/// Size limits applied while reading archives.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ArchiveLimits {
    /// Archive files larger than this are rejected without being read.
    pub max_archive_size: ByteSize,

    /// Entries declaring a larger uncompressed size are not decompressed.
    pub max_entry_size: ByteSize,
}

impl ArchiveLimits {
    /// The largest `max_entry_size` that may be configured.
    ///
    /// Entries are decompressed fully into memory, so this bounds memory use per entry.
    pub const MAX_MAX_ENTRY_SIZE: ByteSize = ByteSize::gib(1);
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            max_archive_size: ByteSize::gib(1),
            max_entry_size: ByteSize::mib(256),
        }
    }
}
