// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Structured access to the machine-readable output of tracediag.
//!
//! The types in this crate form the contract between the trace diagnostics
//! extractor and the report assembler that consumes its output:
//!
//! * [`AttachmentDescriptor`] and [`AttemptInput`] describe what the assembler
//!   hands to the extractor for one test attempt.
//! * [`AttemptDiagnostics`], [`NetworkRecord`] and [`ConsoleRecord`] describe
//!   what comes back.
//!
//! All types serialize to camelCase JSON.

mod attachments;
mod diagnostics;
mod exit_codes;

pub use attachments::*;
pub use diagnostics::*;
pub use exit_codes::*;
