// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Helpers for writing trace archives in tests.
//!
//! The output is deterministic: no timestamps, no CRCs, no data descriptors, and sizes always
//! written to the central directory.

use camino::Utf8Path;
use flate2::{Compression, write::DeflateEncoder};
use std::io::{self, Write};

/// One entry to be written by [`ArchiveBuilder`].
#[derive(Clone, Debug)]
pub struct EntrySpec {
    /// The entry name.
    pub name: String,
    /// The compression method written to both headers.
    pub method: u16,
    /// General purpose flags written to both headers.
    pub flags: u16,
    /// The bytes written as entry data, already compressed as appropriate.
    pub data: Vec<u8>,
    /// The uncompressed size declared in both headers.
    pub uncompressed_size: u32,
}

impl EntrySpec {
    /// A stored entry.
    pub fn stored(name: impl Into<String>, contents: impl AsRef<[u8]>) -> Self {
        let contents = contents.as_ref();
        Self {
            name: name.into(),
            method: 0,
            flags: 0,
            data: contents.to_vec(),
            uncompressed_size: contents.len() as u32,
        }
    }

    /// A raw-deflate entry.
    pub fn deflated(name: impl Into<String>, contents: impl AsRef<[u8]>) -> Self {
        let contents = contents.as_ref();
        Self {
            name: name.into(),
            method: 8,
            flags: 0,
            data: deflate(contents),
            uncompressed_size: contents.len() as u32,
        }
    }

    /// Overrides the compression method without touching the data.
    pub fn with_method(mut self, method: u16) -> Self {
        self.method = method;
        self
    }

    /// Overrides the general purpose flags.
    pub fn with_flags(mut self, flags: u16) -> Self {
        self.flags = flags;
        self
    }

    /// Overrides the declared uncompressed size.
    pub fn with_uncompressed_size(mut self, size: u32) -> Self {
        self.uncompressed_size = size;
        self
    }
}

/// Writes archives in the layout read by [`Archive`](crate::archive::Archive).
#[derive(Clone, Debug, Default)]
pub struct ArchiveBuilder {
    entries: Vec<EntrySpec>,
    comment: Vec<u8>,
}

impl ArchiveBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a stored entry.
    pub fn stored(self, name: impl Into<String>, contents: impl AsRef<[u8]>) -> Self {
        self.entry(EntrySpec::stored(name, contents))
    }

    /// Adds a raw-deflate entry.
    pub fn deflated(self, name: impl Into<String>, contents: impl AsRef<[u8]>) -> Self {
        self.entry(EntrySpec::deflated(name, contents))
    }

    /// Adds an arbitrary entry.
    pub fn entry(mut self, entry: EntrySpec) -> Self {
        self.entries.push(entry);
        self
    }

    /// Sets the archive comment, which is written after the end of central directory record.
    pub fn comment(mut self, comment: impl AsRef<[u8]>) -> Self {
        self.comment = comment.as_ref().to_vec();
        self
    }

    /// Returns the archive bytes.
    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut cd = Vec::new();

        for entry in &self.entries {
            let name = entry.name.as_bytes();
            let local_offset = out.len() as u32;

            out.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
            out.extend_from_slice(&20u16.to_le_bytes()); // version needed
            out.extend_from_slice(&entry.flags.to_le_bytes());
            out.extend_from_slice(&entry.method.to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes()); // mtime
            out.extend_from_slice(&0u16.to_le_bytes()); // mdate
            out.extend_from_slice(&0u32.to_le_bytes()); // crc32
            out.extend_from_slice(&(entry.data.len() as u32).to_le_bytes());
            out.extend_from_slice(&entry.uncompressed_size.to_le_bytes());
            out.extend_from_slice(&(name.len() as u16).to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes()); // extra length
            out.extend_from_slice(name);
            out.extend_from_slice(&entry.data);

            cd.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
            cd.extend_from_slice(&20u16.to_le_bytes()); // version made by
            cd.extend_from_slice(&20u16.to_le_bytes()); // version needed
            cd.extend_from_slice(&entry.flags.to_le_bytes());
            cd.extend_from_slice(&entry.method.to_le_bytes());
            cd.extend_from_slice(&0u16.to_le_bytes());
            cd.extend_from_slice(&0u16.to_le_bytes());
            cd.extend_from_slice(&0u32.to_le_bytes());
            cd.extend_from_slice(&(entry.data.len() as u32).to_le_bytes());
            cd.extend_from_slice(&entry.uncompressed_size.to_le_bytes());
            cd.extend_from_slice(&(name.len() as u16).to_le_bytes());
            cd.extend_from_slice(&0u16.to_le_bytes()); // extra length
            cd.extend_from_slice(&0u16.to_le_bytes()); // comment length
            cd.extend_from_slice(&0u16.to_le_bytes()); // disk number start
            cd.extend_from_slice(&0u16.to_le_bytes()); // internal attributes
            cd.extend_from_slice(&0u32.to_le_bytes()); // external attributes
            cd.extend_from_slice(&local_offset.to_le_bytes());
            cd.extend_from_slice(name);
        }

        let cd_offset = out.len() as u32;
        out.extend_from_slice(&cd);

        out.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes()); // disk number
        out.extend_from_slice(&0u16.to_le_bytes()); // central directory disk
        out.extend_from_slice(&(self.entries.len() as u16).to_le_bytes());
        out.extend_from_slice(&(self.entries.len() as u16).to_le_bytes());
        out.extend_from_slice(&(cd.len() as u32).to_le_bytes());
        out.extend_from_slice(&cd_offset.to_le_bytes());
        out.extend_from_slice(&(self.comment.len() as u16).to_le_bytes());
        out.extend_from_slice(&self.comment);

        out
    }

    /// Writes the archive to `path`.
    pub fn write_to(&self, path: &Utf8Path) -> io::Result<()> {
        std::fs::write(path, self.build())
    }
}

/// Compresses `contents` as a raw deflate stream, with no zlib or gzip framing.
pub fn deflate(contents: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(contents)
        .expect("writing to a Vec never fails");
    encoder.finish().expect("writing to a Vec never fails")
}

/// Joins JSON values into newline-delimited trace event text.
pub fn event_lines<'a>(events: impl IntoIterator<Item = &'a serde_json::Value>) -> String {
    let mut out = String::new();
    for event in events {
        out.push_str(&event.to_string());
        out.push('\n');
    }
    out
}
