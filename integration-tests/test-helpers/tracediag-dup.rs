// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A copy of tracediag's main.rs, built within this package so that integration tests can find
//! it through `CARGO_BIN_EXE_tracediag-dup`.

use color_eyre::Result;

fn main() -> Result<()> {
    color_eyre::install()?;
    let _ = enable_ansi_support::enable_ansi_support();

    tracediag::main_impl()
}
