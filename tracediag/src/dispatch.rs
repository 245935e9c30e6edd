// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    errors::{ExpectedError, Result},
    output::{OutputContext, OutputOpts, OutputWriter, StdoutStyles, StdoutWriter, clap_styles},
};
use atomicwrites::{AtomicFile, OverwriteBehavior};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use owo_colors::OwoColorize;
use std::io::{self, Read, Write};
use tracediag_extractor::{
    aggregator::{DiagnosticsExtractor, ExtractionStats},
    archive::Archive,
    config::ExtractorConfig,
};
use tracediag_metadata::{AttachmentDescriptor, AttemptInput, TracediagExitCode};
use tracing::info;

/// Extract network and console diagnostics from browser trace archives.
///
/// Trace archives are attached to test attempts by browser test runners. tracediag reads them and
/// produces the network requests and console messages recorded during each attempt, as JSON.
#[derive(Debug, Parser)]
#[command(version, name = "tracediag", styles = clap_styles::style())]
pub struct TracediagApp {
    #[clap(flatten)]
    output: OutputOpts,

    /// Config file [default: built-in defaults]
    #[arg(long, global = true, value_name = "PATH", env = "TRACEDIAG_CONFIG")]
    config_file: Option<Utf8PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

/// Parses arguments from the environment, runs tracediag, and exits the process.
pub fn main_impl() -> color_eyre::Result<()> {
    let app = TracediagApp::parse();
    let output = app.init_output();

    match app.exec(output, &mut OutputWriter::default()) {
        Ok(code) => std::process::exit(code),
        Err(error) => {
            error.display_to_stderr(&output.stderr_styles());
            std::process::exit(error.process_exit_code())
        }
    }
}

impl TracediagApp {
    /// Initializes output: colors and logging.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, returning the process exit code on success.
    pub fn exec(self, output: OutputContext, output_writer: &mut OutputWriter) -> Result<i32> {
        let config = ExtractorConfig::from_sources(self.config_file.as_deref())?;

        match self.command {
            Command::Extract(opts) => opts.exec(config, output, output_writer),
            Command::ListEntries { path } => {
                exec_list_entries(&path, &config, output, output_writer)
            }
        }
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Extract diagnostics from test attempts
    ///
    /// Malformed or missing trace archives are not errors: they contribute no diagnostics.
    Extract(ExtractOpts),

    /// List the entries in a trace archive
    ListEntries {
        /// Path to the trace archive
        #[arg(value_name = "PATH")]
        path: Utf8PathBuf,
    },
}

#[derive(Debug, Args)]
struct ExtractOpts {
    /// JSON file with a list of attempts and their attachments ("-" for stdin)
    ///
    /// Each attempt is an object of the form `{ "attachments": [ { "name", "contentType",
    /// "path" }, ... ] }`. The output is a list of diagnostics, one per attempt, in order.
    #[arg(
        long,
        value_name = "FILE",
        conflicts_with = "trace",
        required_unless_present = "trace"
    )]
    attachments: Option<Utf8PathBuf>,

    /// Trace archives for a single attempt, in order
    ///
    /// The output is the diagnostics for that one attempt.
    #[arg(long, value_name = "PATH", num_args = 1..)]
    trace: Vec<Utf8PathBuf>,

    /// Write output to this file instead of stdout
    #[arg(long, short, value_name = "FILE")]
    output: Option<Utf8PathBuf>,
}

impl ExtractOpts {
    fn exec(
        self,
        config: ExtractorConfig,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32> {
        let extractor = DiagnosticsExtractor::new(config);

        let json = match &self.attachments {
            Some(path) => {
                let attempts = read_attempts(path)?;
                let results: Vec<_> = attempts
                    .iter()
                    .enumerate()
                    .map(|(index, attempt)| {
                        let (diagnostics, stats) =
                            extractor.extract_attempt_with_stats(&attempt.attachments);
                        log_stats(index, &stats, output);
                        diagnostics
                    })
                    .collect();
                serde_json::to_string_pretty(&results)
            }
            None => {
                let content_type = &extractor.config().archive_content_type;
                let attachments: Vec<_> = self
                    .trace
                    .iter()
                    .map(|path| AttachmentDescriptor::new("trace", content_type, path))
                    .collect();
                let (diagnostics, stats) = extractor.extract_attempt_with_stats(&attachments);
                log_stats(0, &stats, output);
                serde_json::to_string_pretty(&diagnostics)
            }
        };

        let json = json.map_err(|err| ExpectedError::WriteOutputError {
            path: self.output.clone(),
            err: err.into(),
        })?;
        write_output(self.output.as_deref(), &json, output_writer)?;

        Ok(TracediagExitCode::OK)
    }
}

fn read_attempts(path: &Utf8Path) -> Result<Vec<AttemptInput>> {
    let contents = if path.as_str() == "-" {
        let mut contents = String::new();
        io::stdin()
            .read_to_string(&mut contents)
            .map(|_| contents)
    } else {
        std::fs::read_to_string(path)
    }
    .map_err(|err| ExpectedError::AttachmentsReadError {
        path: path.to_owned(),
        err,
    })?;

    let de = &mut serde_json::Deserializer::from_str(&contents);
    serde_path_to_error::deserialize(de).map_err(|err| ExpectedError::AttachmentsParseError {
        path: path.to_owned(),
        err,
    })
}

fn write_output(
    path: Option<&Utf8Path>,
    json: &str,
    output_writer: &mut OutputWriter,
) -> Result<()> {
    match path {
        Some(path) => {
            let file = AtomicFile::new(path, OverwriteBehavior::AllowOverwrite);
            file.write(|f| {
                f.write_all(json.as_bytes())?;
                f.write_all(b"\n")
            })
            .map_err(|err| ExpectedError::WriteOutputError {
                path: Some(path.to_owned()),
                err: match err {
                    atomicwrites::Error::Internal(err) | atomicwrites::Error::User(err) => err,
                },
            })
        }
        None => {
            let mut writer = output_writer.stdout_writer();
            writeln!(writer, "{json}")
                .and_then(|()| writer.flush())
                .map_err(|err| ExpectedError::WriteOutputError { path: None, err })
        }
    }
}

fn log_stats(index: usize, stats: &ExtractionStats, output: OutputContext) {
    if output.verbose {
        info!(
            "attempt {index}: read {} archives ({} skipped), {} network records, \
             {} console records ({} dropped)",
            stats.archives_read,
            stats.archives_skipped,
            stats.network_records,
            stats.console_records,
            stats.console_records_dropped,
        );
    }
}

fn exec_list_entries(
    path: &Utf8Path,
    config: &ExtractorConfig,
    output: OutputContext,
    output_writer: &mut OutputWriter,
) -> Result<i32> {
    let archive = Archive::open(path, &config.archive_limits).map_err(|err| {
        ExpectedError::ArchiveReadError {
            path: path.to_owned(),
            err,
        }
    })?;

    let styles = output.stdout_styles();
    let mut writer = output_writer.stdout_writer();
    write_entries(&archive, &styles, &mut writer)
        .and_then(|()| writer.flush())
        .map_err(|err| ExpectedError::WriteOutputError { path: None, err })?;

    Ok(TracediagExitCode::OK)
}

fn write_entries(
    archive: &Archive,
    styles: &StdoutStyles,
    writer: &mut StdoutWriter<'_>,
) -> io::Result<()> {
    for entry in archive.entries() {
        // Pad before styling so that escape codes don't count toward the width.
        let method = format!("{:<8}", entry.method().to_string());
        writeln!(
            writer,
            "{} {:>12} {:>12}  {}",
            method.style(styles.method),
            entry.compressed_size(),
            entry.uncompressed_size(),
            entry.name().style(styles.name),
        )?;
    }
    Ok(())
}
