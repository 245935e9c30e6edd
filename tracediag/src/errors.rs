// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::{NO_HEADING_TARGET, StderrStyles};
use camino::Utf8PathBuf;
use owo_colors::OwoColorize;
use std::{error::Error, io};
use thiserror::Error;
use tracediag_extractor::errors::{ArchiveReadError, ConfigParseError};
use tracediag_metadata::TracediagExitCode;
use tracing::error;

pub(crate) type Result<T, E = ExpectedError> = std::result::Result<T, E>;

/// An error that tracediag knows how to report.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("error reading attachments from `{path}`")]
    AttachmentsReadError {
        path: Utf8PathBuf,
        #[source]
        err: io::Error,
    },
    #[error("error parsing attachments from `{path}`")]
    AttachmentsParseError {
        path: Utf8PathBuf,
        #[source]
        err: serde_path_to_error::Error<serde_json::Error>,
    },
    #[error("error reading trace archive `{path}`")]
    ArchiveReadError {
        path: Utf8PathBuf,
        #[source]
        err: ArchiveReadError,
    },
    #[error("error writing output")]
    WriteOutputError {
        path: Option<Utf8PathBuf>,
        #[source]
        err: io::Error,
    },
}

impl ExpectedError {
    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::ConfigParseError { .. } => TracediagExitCode::SETUP_ERROR,
            Self::AttachmentsReadError { .. } | Self::AttachmentsParseError { .. } => {
                TracediagExitCode::INPUT_PARSE_FAILED
            }
            Self::ArchiveReadError { .. } => TracediagExitCode::ARCHIVE_READ_FAILED,
            Self::WriteOutputError { .. } => TracediagExitCode::WRITE_OUTPUT_ERROR,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match self {
            Self::ConfigParseError { err } => {
                error!(
                    "failed to parse tracediag config at `{}`",
                    err.config_file().style(styles.bold)
                );
                Some(err.kind() as &dyn Error)
            }
            Self::AttachmentsReadError { path, err } => {
                error!(
                    "failed to read attachments from `{}`",
                    path.style(styles.bold)
                );
                Some(err as &dyn Error)
            }
            Self::AttachmentsParseError { path, err } => {
                error!(
                    "failed to parse attachments from `{}` at `{}`",
                    path.style(styles.bold),
                    err.path().style(styles.bold),
                );
                Some(err.inner() as &dyn Error)
            }
            Self::ArchiveReadError { path, err } => {
                error!(
                    "failed to read trace archive `{}`",
                    path.style(styles.bold)
                );
                Some(err as &dyn Error)
            }
            Self::WriteOutputError { path, err } => {
                match path {
                    Some(path) => error!("failed to write output to `{}`", path.style(styles.bold)),
                    None => error!("failed to write output to stdout"),
                }
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(target: NO_HEADING_TARGET, "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
