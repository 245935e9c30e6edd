// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by tracediag.
//!
//! Extraction never surfaces these to callers of
//! [`DiagnosticsExtractor::extract_attempt`](crate::aggregator::DiagnosticsExtractor::extract_attempt):
//! an unreadable archive or entry simply contributes no diagnostics. They are returned from the
//! lower-level [`Archive`](crate::archive::Archive) APIs, and logged at debug level during
//! extraction.

use bytesize::ByteSize;
use camino::Utf8PathBuf;
use config::ConfigError;
use std::collections::BTreeSet;
use thiserror::Error;

/// An error that causes a whole trace archive to be rejected.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ArchiveReadError {
    /// The archive file could not be opened or read.
    #[error("error reading archive `{path}`")]
    Open {
        /// The path that could not be read.
        path: Utf8PathBuf,

        /// The error that occurred.
        #[source]
        error: std::io::Error,
    },

    /// The archive file is larger than the configured maximum.
    #[error("archive `{path}` is {size}, which exceeds the limit of {limit}")]
    TooLarge {
        /// The path to the archive.
        path: Utf8PathBuf,

        /// The size of the archive on disk.
        size: ByteSize,

        /// The configured limit.
        limit: ByteSize,
    },

    /// No end of central directory record was found in the trailing window of the archive.
    #[error("end of central directory record not found")]
    MissingEndOfDirectory,

    /// The archive spans multiple disks.
    #[error("multi-disk archives are not supported")]
    UnsupportedMultiDisk,

    /// The archive uses Zip64 extensions.
    #[error("Zip64 archives are not supported")]
    UnsupportedZip64,

    /// The central directory does not fit within the archive.
    #[error(
        "central directory at offset {offset} with size {size} exceeds archive length {archive_len}"
    )]
    CentralDirectoryOutOfBounds {
        /// The declared offset of the central directory.
        offset: u64,

        /// The declared size of the central directory.
        size: u64,

        /// The length of the archive.
        archive_len: u64,
    },

    /// A central directory header had the wrong signature.
    #[error("bad central directory header signature {signature:#010x} at offset {offset}")]
    BadCentralDirectorySignature {
        /// The offset of the header.
        offset: u64,

        /// The signature that was found.
        signature: u32,
    },

    /// A local file header had the wrong signature.
    #[error("bad local file header signature {signature:#010x} for entry `{name}`")]
    BadLocalHeaderSignature {
        /// The name of the entry.
        name: String,

        /// The signature that was found.
        signature: u32,
    },

    /// An entry's data does not fit within the archive.
    #[error("data for entry `{name}` exceeds archive bounds")]
    EntryOutOfBounds {
        /// The name of the entry.
        name: String,
    },

    /// A structure was cut off by the end of the archive or of the central directory.
    #[error("archive truncated while reading {what}")]
    Truncated {
        /// What was being read.
        what: &'static str,
    },
}

/// An error that causes a single archive entry to be skipped.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EntryReadError {
    /// The entry uses a compression method other than stored or deflate.
    #[error("entry `{name}` uses unsupported compression method {method}")]
    UnsupportedCompression {
        /// The name of the entry.
        name: String,

        /// The compression method.
        method: u16,
    },

    /// The entry is encrypted.
    #[error("entry `{name}` is encrypted")]
    Encrypted {
        /// The name of the entry.
        name: String,
    },

    /// A stored entry declared different compressed and uncompressed sizes.
    #[error(
        "stored entry `{name}` has compressed size {compressed_size} \
         but uncompressed size {uncompressed_size}"
    )]
    StoredSizeMismatch {
        /// The name of the entry.
        name: String,

        /// The declared compressed size.
        compressed_size: u64,

        /// The declared uncompressed size.
        uncompressed_size: u64,
    },

    /// The entry declared a larger uncompressed size than allowed.
    #[error("entry `{name}` is {size}, which exceeds the limit of {limit}")]
    TooLarge {
        /// The name of the entry.
        name: String,

        /// The declared uncompressed size.
        size: ByteSize,

        /// The configured limit.
        limit: ByteSize,
    },

    /// The entry decompressed to a different size than it declared.
    #[error("entry `{name}` claimed {claimed_size} bytes but decompressed to {actual_size} bytes")]
    SizeMismatch {
        /// The name of the entry.
        name: String,

        /// The size declared in the central directory.
        claimed_size: u64,

        /// The number of bytes actually produced.
        actual_size: u64,
    },

    /// The deflate stream was corrupt.
    #[error("error decompressing entry `{name}`")]
    Decompress {
        /// The name of the entry.
        name: String,

        /// The error that occurred.
        #[source]
        error: std::io::Error,
    },
}

/// An error that occurred while loading tracediag configuration.
#[derive(Debug, Error)]
#[error("failed to parse tracediag config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file that failed to parse.
    ///
    /// For errors in the embedded default config, this is `<default config>`.
    pub fn config_file(&self) -> &Utf8PathBuf {
        &self.config_file
    }

    /// Returns the kind of error that occurred.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of a [`ConfigParseError`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// The config sources could not be read or merged.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// The merged config could not be deserialized.
    #[error(transparent)]
    DeserializeError(Box<serde_path_to_error::Error<ConfigError>>),

    /// One or more limits were set to zero.
    #[error("limits must be greater than zero: {}", .0.iter().cloned().collect::<Vec<_>>().join(", "))]
    ZeroLimits(BTreeSet<String>),
}
