// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Extracts network and console diagnostics from browser trace archives attached to test
//! attempts.
//!
//! The flow for one attempt is:
//!
//! 1. Each attachment declared with the archive content type is opened as an
//!    [`Archive`](archive::Archive).
//! 2. Every entry outside the `resources/` directory is decompressed and scanned as
//!    newline-delimited JSON [`TraceEvent`](events::TraceEvent)s.
//! 3. Resource snapshots become [`NetworkRecord`](tracediag_metadata::NetworkRecord)s, with
//!    JSON bodies resolved from the `resources/` directory. Console warnings and errors and page
//!    errors become [`ConsoleRecord`](tracediag_metadata::ConsoleRecord)s.
//!
//! [`DiagnosticsExtractor`](aggregator::DiagnosticsExtractor) ties these together. Extraction is
//! best-effort: malformed input results in fewer diagnostics, never an error.

pub mod aggregator;
pub mod archive;
pub mod config;
pub mod errors;
pub mod events;
pub mod records;
pub mod resources;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
