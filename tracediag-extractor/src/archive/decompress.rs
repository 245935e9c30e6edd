// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{ArchiveEntry, CompressionMethod};
use crate::errors::EntryReadError;
use bytesize::ByteSize;
use flate2::read::DeflateDecoder;
use std::io::Read;

/// Decompresses a single entry's data.
///
/// The declared uncompressed size is checked against `limit` before any work is done, and the
/// decompressed output is required to match it exactly. A mismatch means the archive is corrupt
/// or was tampered with.
pub(super) fn decompress_entry(
    entry: &ArchiveEntry,
    compressed: &[u8],
    limit: ByteSize,
) -> Result<Vec<u8>, EntryReadError> {
    if entry.is_encrypted() {
        return Err(EntryReadError::Encrypted {
            name: entry.name().to_owned(),
        });
    }

    let claimed_size = entry.uncompressed_size();
    if claimed_size > limit.as_u64() {
        return Err(EntryReadError::TooLarge {
            name: entry.name().to_owned(),
            size: ByteSize::b(claimed_size),
            limit,
        });
    }

    match entry.method() {
        CompressionMethod::Stored => {
            if entry.compressed_size() != claimed_size {
                return Err(EntryReadError::StoredSizeMismatch {
                    name: entry.name().to_owned(),
                    compressed_size: entry.compressed_size(),
                    uncompressed_size: claimed_size,
                });
            }
            Ok(compressed.to_vec())
        }
        CompressionMethod::Deflate => inflate_raw(entry.name(), compressed, claimed_size),
        CompressionMethod::Unsupported(method) => Err(EntryReadError::UnsupportedCompression {
            name: entry.name().to_owned(),
            method,
        }),
    }
}

fn inflate_raw(name: &str, compressed: &[u8], claimed_size: u64) -> Result<Vec<u8>, EntryReadError> {
    let capacity = usize::try_from(claimed_size).unwrap_or(usize::MAX);
    let mut contents = Vec::with_capacity(capacity);

    // Read one byte past the claimed size so that overlong streams are detected rather than
    // silently cut off.
    DeflateDecoder::new(compressed)
        .take(claimed_size.saturating_add(1))
        .read_to_end(&mut contents)
        .map_err(|error| EntryReadError::Decompress {
            name: name.to_owned(),
            error,
        })?;

    let actual_size = contents.len() as u64;
    if actual_size != claimed_size {
        return Err(EntryReadError::SizeMismatch {
            name: name.to_owned(),
            claimed_size,
            actual_size,
        });
    }

    Ok(contents)
}
