// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared helpers for tracediag's integration tests.

pub mod tracediag_cli;
