// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command-line interface for extracting network and console diagnostics from browser trace
//! archives.
//!
//! The extraction logic lives in [`tracediag_extractor`]; this crate handles argument parsing,
//! configuration loading, logging and output.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::{Color, OutputContext, OutputWriter, StderrStyles};
