// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Central directory parsing.
//!
//! # Invariants
//!
//! - All sizes and offsets come from untrusted input and are validated against the archive length
//!   with checked arithmetic before use.
//! - Every entry in [`Archive::entries`] has a validated local file header and a data range that
//!   lies within the archive.

use super::{
    ArchiveLimits,
    decompress::decompress_entry,
    format::{
        CDFH_LEN, EOCD_LEN, EOCD_SEARCH_WINDOW, FLAG_ENCRYPTED, LFH_LEN, METHOD_DEFLATE,
        METHOD_STORED, SIG_CDFH, SIG_EOCD, SIG_LFH, ZIP64_U16, ZIP64_U32, read_u16, read_u32,
    },
};
use crate::{
    errors::{ArchiveReadError, EntryReadError},
    resources::RESOURCE_DIR_PREFIX,
};
use bytesize::ByteSize;
use camino::Utf8Path;
use std::{collections::HashMap, fmt, fs, ops::Range};

/// A parsed trace archive.
///
/// The archive owns its bytes; entries are decompressed on demand.
pub struct Archive {
    data: Vec<u8>,
    entries: Vec<ArchiveEntry>,
    by_name: HashMap<String, usize>,
    limits: ArchiveLimits,
}

impl fmt::Debug for Archive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archive")
            .field("len", &self.data.len())
            .field("entries", &self.entries)
            .field("limits", &self.limits)
            .finish()
    }
}

impl Archive {
    /// Reads and parses the archive at `path`.
    ///
    /// The file is read into memory with a single read.
    pub fn open(path: &Utf8Path, limits: &ArchiveLimits) -> Result<Self, ArchiveReadError> {
        let metadata = fs::metadata(path).map_err(|error| ArchiveReadError::Open {
            path: path.to_owned(),
            error,
        })?;
        if metadata.len() > limits.max_archive_size.as_u64() {
            return Err(ArchiveReadError::TooLarge {
                path: path.to_owned(),
                size: ByteSize::b(metadata.len()),
                limit: limits.max_archive_size,
            });
        }

        let data = fs::read(path).map_err(|error| ArchiveReadError::Open {
            path: path.to_owned(),
            error,
        })?;
        Self::from_bytes(data, limits)
    }

    /// Parses an archive from its bytes.
    pub fn from_bytes(data: Vec<u8>, limits: &ArchiveLimits) -> Result<Self, ArchiveReadError> {
        let eocd = EndOfCentralDirectory::find(&data)?;
        let entries = read_central_directory(&data, &eocd)?;

        let mut by_name = HashMap::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            // The first entry wins if a name is duplicated.
            by_name.entry(entry.name.clone()).or_insert(index);
        }

        Ok(Self {
            data,
            entries,
            by_name,
            limits: limits.clone(),
        })
    }

    /// Returns the entries in central directory order.
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Looks up an entry by its exact name.
    pub fn entry_by_name(&self, name: &str) -> Option<&ArchiveEntry> {
        self.by_name.get(name).map(|&index| &self.entries[index])
    }

    /// Decompresses an entry's contents.
    ///
    /// `entry` must come from this archive.
    pub fn read_entry(&self, entry: &ArchiveEntry) -> Result<Vec<u8>, EntryReadError> {
        decompress_entry(
            entry,
            &self.data[entry.data_range.clone()],
            self.limits.max_entry_size,
        )
    }

    /// Decompresses an entry's contents as text.
    ///
    /// Invalid UTF-8 sequences are replaced with U+FFFD.
    pub fn read_entry_text(&self, entry: &ArchiveEntry) -> Result<String, EntryReadError> {
        let bytes = self.read_entry(entry)?;
        Ok(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(error) => String::from_utf8_lossy(error.as_bytes()).into_owned(),
        })
    }
}

/// The compression method of an [`ArchiveEntry`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompressionMethod {
    /// No compression (method 0).
    Stored,
    /// Raw deflate (method 8).
    Deflate,
    /// Any other method. Entries with this method cannot be read.
    Unsupported(u16),
}

impl CompressionMethod {
    fn from_raw(method: u16) -> Self {
        match method {
            METHOD_STORED => Self::Stored,
            METHOD_DEFLATE => Self::Deflate,
            other => Self::Unsupported(other),
        }
    }

    /// Returns the method number as stored in the archive.
    pub fn as_raw(self) -> u16 {
        match self {
            Self::Stored => METHOD_STORED,
            Self::Deflate => METHOD_DEFLATE,
            Self::Unsupported(other) => other,
        }
    }
}

impl fmt::Display for CompressionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stored => f.write_str("stored"),
            Self::Deflate => f.write_str("deflate"),
            Self::Unsupported(method) => write!(f, "unsupported ({method})"),
        }
    }
}

/// One entry in an [`Archive`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ArchiveEntry {
    name: String,
    flags: u16,
    method: CompressionMethod,
    compressed_size: u64,
    uncompressed_size: u64,
    local_header_offset: u64,
    data_range: Range<usize>,
}

impl ArchiveEntry {
    /// The path of the entry within the archive.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared compression method.
    pub fn method(&self) -> CompressionMethod {
        self.method
    }

    /// The size of the entry's data in the archive.
    pub fn compressed_size(&self) -> u64 {
        self.compressed_size
    }

    /// The declared size of the entry once decompressed.
    pub fn uncompressed_size(&self) -> u64 {
        self.uncompressed_size
    }

    /// The offset of the entry's local file header from the start of the archive.
    pub fn local_header_offset(&self) -> u64 {
        self.local_header_offset
    }

    /// The general purpose flags.
    pub fn flags(&self) -> u16 {
        self.flags
    }

    /// Returns true if the entry is encrypted.
    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }

    /// Returns true if the entry is a directory.
    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }

    /// Returns true if the entry lives in the resource directory, i.e. holds a payload body rather
    /// than trace events.
    pub fn is_resource(&self) -> bool {
        self.name.starts_with(RESOURCE_DIR_PREFIX)
    }
}

/// The fields of the end of central directory record that are used.
#[derive(Debug)]
struct EndOfCentralDirectory {
    disk_number: u16,
    cd_disk: u16,
    entries_on_disk: u16,
    entries_total: u16,
    cd_size: u32,
    cd_offset: u32,
}

impl EndOfCentralDirectory {
    /// Scans backward from the end of `data` for the record.
    ///
    /// A signature match whose declared comment would run past the end of the archive is a false
    /// positive (for example, the signature bytes appearing inside the comment itself), and the
    /// search continues further back.
    fn find(data: &[u8]) -> Result<Self, ArchiveReadError> {
        let Some(last_start) = data.len().checked_sub(EOCD_LEN) else {
            return Err(ArchiveReadError::MissingEndOfDirectory);
        };
        let first_start = data.len().saturating_sub(EOCD_SEARCH_WINDOW);

        for pos in (first_start..=last_start).rev() {
            if read_u32(data, pos) != Some(SIG_EOCD) {
                continue;
            }
            let Some(comment_len) = read_u16(data, pos + 20) else {
                continue;
            };
            if pos + EOCD_LEN + usize::from(comment_len) > data.len() {
                continue;
            }

            let record = &data[pos..pos + EOCD_LEN];
            let field = |offset| read_u16(record, offset).unwrap_or_default();
            let eocd = Self {
                disk_number: field(4),
                cd_disk: field(6),
                entries_on_disk: field(8),
                entries_total: field(10),
                cd_size: read_u32(record, 12).unwrap_or_default(),
                cd_offset: read_u32(record, 16).unwrap_or_default(),
            };
            eocd.validate(data.len())?;
            return Ok(eocd);
        }

        Err(ArchiveReadError::MissingEndOfDirectory)
    }

    fn validate(&self, archive_len: usize) -> Result<(), ArchiveReadError> {
        if self.disk_number != 0 || self.cd_disk != 0 || self.entries_on_disk != self.entries_total
        {
            return Err(ArchiveReadError::UnsupportedMultiDisk);
        }
        if self.entries_total == ZIP64_U16
            || self.cd_size == ZIP64_U32
            || self.cd_offset == ZIP64_U32
        {
            return Err(ArchiveReadError::UnsupportedZip64);
        }

        let end = u64::from(self.cd_offset) + u64::from(self.cd_size);
        if end > archive_len as u64 {
            return Err(ArchiveReadError::CentralDirectoryOutOfBounds {
                offset: self.cd_offset.into(),
                size: self.cd_size.into(),
                archive_len: archive_len as u64,
            });
        }
        Ok(())
    }
}

fn read_central_directory(
    data: &[u8],
    eocd: &EndOfCentralDirectory,
) -> Result<Vec<ArchiveEntry>, ArchiveReadError> {
    // Bounds were checked in EndOfCentralDirectory::validate.
    let cd_start = eocd.cd_offset as usize;
    let cd = &data[cd_start..cd_start + eocd.cd_size as usize];

    let mut entries = Vec::with_capacity(usize::from(eocd.entries_total));
    let mut pos = 0usize;

    for _ in 0..eocd.entries_total {
        let header = cd
            .get(pos..pos + CDFH_LEN)
            .ok_or(ArchiveReadError::Truncated {
                what: "central directory header",
            })?;

        let field16 = |offset| read_u16(header, offset).unwrap_or_default();
        let field32 = |offset| read_u32(header, offset).unwrap_or_default();

        let signature = field32(0);
        if signature != SIG_CDFH {
            return Err(ArchiveReadError::BadCentralDirectorySignature {
                offset: (cd_start + pos) as u64,
                signature,
            });
        }

        let flags = field16(8);
        let method = field16(10);
        let compressed_size = field32(20);
        let uncompressed_size = field32(24);
        let name_len = usize::from(field16(28));
        let extra_len = usize::from(field16(30));
        let comment_len = usize::from(field16(32));
        let local_header_offset = field32(42);

        if compressed_size == ZIP64_U32
            || uncompressed_size == ZIP64_U32
            || local_header_offset == ZIP64_U32
        {
            return Err(ArchiveReadError::UnsupportedZip64);
        }

        let name_start = pos + CDFH_LEN;
        let name_bytes = cd
            .get(name_start..name_start + name_len)
            .ok_or(ArchiveReadError::Truncated {
                what: "central directory file name",
            })?;
        let name = String::from_utf8_lossy(name_bytes).into_owned();

        let record_end = name_start + name_len + extra_len + comment_len;
        if record_end > cd.len() {
            return Err(ArchiveReadError::Truncated {
                what: "central directory extra fields",
            });
        }

        let data_range = local_data_range(data, &name, local_header_offset, compressed_size)?;

        entries.push(ArchiveEntry {
            name,
            flags,
            method: CompressionMethod::from_raw(method),
            compressed_size: compressed_size.into(),
            uncompressed_size: uncompressed_size.into(),
            local_header_offset: local_header_offset.into(),
            data_range,
        });
        pos = record_end;
    }

    Ok(entries)
}

/// Validates an entry's local file header and returns the byte range of its data.
///
/// The local header's own name and extra field lengths determine where the data starts; they may
/// legitimately differ from the central directory's.
fn local_data_range(
    data: &[u8],
    name: &str,
    local_header_offset: u32,
    compressed_size: u32,
) -> Result<Range<usize>, ArchiveReadError> {
    let offset = local_header_offset as usize;
    let header = offset
        .checked_add(LFH_LEN)
        .and_then(|end| data.get(offset..end))
        .ok_or(ArchiveReadError::Truncated {
            what: "local file header",
        })?;

    let signature = read_u32(header, 0).unwrap_or_default();
    if signature != SIG_LFH {
        return Err(ArchiveReadError::BadLocalHeaderSignature {
            name: name.to_owned(),
            signature,
        });
    }

    let name_len = usize::from(read_u16(header, 26).unwrap_or_default());
    let extra_len = usize::from(read_u16(header, 28).unwrap_or_default());

    let start = offset + LFH_LEN + name_len + extra_len;
    let end = start
        .checked_add(compressed_size as usize)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| ArchiveReadError::EntryOutOfBounds {
            name: name.to_owned(),
        })?;

    Ok(start..end)
}
