// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `tracediag` failures.
///
/// `tracediag` invocations may fail for a variety of reasons. This structure documents the exit
/// codes that may occur in case of expected failures.
///
/// Extraction itself never fails because of malformed trace archives: those contribute no
/// diagnostics and the command still exits with [`OK`](Self::OK).
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum TracediagExitCode {}

impl TracediagExitCode {
    /// No errors occurred and tracediag exited normally.
    pub const OK: i32 = 0;

    /// A user issue happened while setting up a tracediag invocation, for example an invalid
    /// config file.
    pub const SETUP_ERROR: i32 = 96;

    /// An archive explicitly requested for inspection could not be read.
    pub const ARCHIVE_READ_FAILED: i32 = 97;

    /// The attachment list passed to `tracediag extract` could not be read or parsed.
    pub const INPUT_PARSE_FAILED: i32 = 98;

    /// Writing data to stdout, stderr or an output file produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}
