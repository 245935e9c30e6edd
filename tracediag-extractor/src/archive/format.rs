// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! On-disk layout of trace archives.
//!
//! All multi-byte integers are little-endian.

/// End of central directory record signature (`PK\x05\x06`).
pub(super) const SIG_EOCD: u32 = 0x0605_4b50;

/// Central directory file header signature (`PK\x01\x02`).
pub(super) const SIG_CDFH: u32 = 0x0201_4b50;

/// Local file header signature (`PK\x03\x04`).
pub(super) const SIG_LFH: u32 = 0x0403_4b50;

/// Fixed length of the end of central directory record, excluding the comment.
pub(super) const EOCD_LEN: usize = 22;

/// How far back from the end of the archive to look for the end of central directory record:
/// the fixed record plus the longest possible comment.
pub(super) const EOCD_SEARCH_WINDOW: usize = EOCD_LEN + u16::MAX as usize;

/// Fixed length of a central directory file header.
pub(super) const CDFH_LEN: usize = 46;

/// Fixed length of a local file header.
pub(super) const LFH_LEN: usize = 30;

/// General purpose flag bit set on encrypted entries.
pub(super) const FLAG_ENCRYPTED: u16 = 0x0001;

pub(super) const METHOD_STORED: u16 = 0;
pub(super) const METHOD_DEFLATE: u16 = 8;

/// Zip64 sentinels. An archive using any of these needs Zip64 extra fields to be read.
pub(super) const ZIP64_U16: u16 = 0xffff;
pub(super) const ZIP64_U32: u32 = 0xffff_ffff;

/// Reads a `u16` at `offset`, or `None` if it runs past the end of `buf`.
pub(super) fn read_u16(buf: &[u8], offset: usize) -> Option<u16> {
    let bytes = buf.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

/// Reads a `u32` at `offset`, or `None` if it runs past the end of `buf`.
pub(super) fn read_u32(buf: &[u8], offset: usize) -> Option<u32> {
    let bytes = buf.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
