// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration for tracediag.
//!
//! Configuration is layered: the embedded [`DEFAULT_CONFIG`] is always read first, and an
//! optional TOML file is layered on top of it. Keys not set in the file fall back to the defaults.

use crate::{
    archive::ArchiveLimits,
    errors::{ConfigParseError, ConfigParseErrorKind},
};
use bytesize::ByteSize;
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigError, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::collections::BTreeSet;
use tracediag_metadata::DEFAULT_ARCHIVE_CONTENT_TYPE;
use tracing::warn;

/// The default configuration, embedded in the binary.
pub const DEFAULT_CONFIG: &str = include_str!("../default-config.toml");

/// The name reported for errors in the embedded default config.
const DEFAULT_CONFIG_NAME: &str = "<default config>";

/// Receives warnings produced while loading configuration.
pub trait ConfigWarnings {
    /// Handle unknown configuration keys found in a config file.
    fn unknown_config_keys(&mut self, config_file: &Utf8Path, unknown: &BTreeSet<String>);
}

/// Default implementation of [`ConfigWarnings`] that logs warnings using the tracing crate.
pub struct DefaultConfigWarnings;

impl ConfigWarnings for DefaultConfigWarnings {
    fn unknown_config_keys(&mut self, config_file: &Utf8Path, unknown: &BTreeSet<String>) {
        let mut unknown_str = String::new();
        if unknown.len() == 1 {
            unknown_str.push_str("key: ");
            unknown_str.extend(unknown.iter().map(String::as_str));
        } else {
            unknown_str.push_str("keys:\n");
            for ignored_key in unknown {
                unknown_str.push('\n');
                unknown_str.push_str("  - ");
                unknown_str.push_str(ignored_key);
            }
        }

        warn!("in config file {config_file}, ignoring unknown configuration {unknown_str}");
    }
}

/// Limits applied while building records.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ExtractorLimits {
    /// The maximum number of console records kept per attempt.
    pub max_console_records: usize,

    /// Request and response bodies are truncated to this many characters.
    pub max_body_chars: usize,

    /// Console and page error text is truncated to this many characters.
    pub max_console_text_chars: usize,
}

impl Default for ExtractorLimits {
    fn default() -> Self {
        Self {
            max_console_records: 50,
            max_body_chars: 2048,
            max_console_text_chars: 2048,
        }
    }
}

/// Resolved tracediag configuration.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExtractorConfig {
    /// Attachments declared with exactly this content type are read as trace archives.
    pub archive_content_type: String,

    /// Limits applied while building records.
    pub limits: ExtractorLimits,

    /// Limits applied while reading archives.
    pub archive_limits: ArchiveLimits,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            archive_content_type: DEFAULT_ARCHIVE_CONTENT_TYPE.to_owned(),
            limits: ExtractorLimits::default(),
            archive_limits: ArchiveLimits::default(),
        }
    }
}

impl ExtractorConfig {
    /// Loads configuration, layering `config_file` over the defaults if provided.
    ///
    /// Unknown keys are logged as warnings.
    pub fn from_sources(config_file: Option<&Utf8Path>) -> Result<Self, ConfigParseError> {
        Self::from_sources_with_warnings(config_file, &mut DefaultConfigWarnings)
    }

    /// Loads configuration, reporting warnings to `warnings`.
    pub fn from_sources_with_warnings(
        config_file: Option<&Utf8Path>,
        warnings: &mut impl ConfigWarnings,
    ) -> Result<Self, ConfigParseError> {
        let mut builder =
            Config::builder().add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml));
        let file_name = match config_file {
            Some(path) => {
                builder = builder.add_source(File::new(path.as_str(), FileFormat::Toml));
                path.to_owned()
            }
            None => Utf8PathBuf::from(DEFAULT_CONFIG_NAME),
        };

        let (deserialized, unknown) = build_and_deserialize_config(builder)
            .map_err(|kind| ConfigParseError::new(&file_name, kind))?;
        if !unknown.is_empty() {
            warnings.unknown_config_keys(&file_name, &unknown);
        }

        deserialized
            .resolve()
            .map_err(|kind| ConfigParseError::new(file_name, kind))
    }
}

fn build_and_deserialize_config(
    builder: config::ConfigBuilder<DefaultState>,
) -> Result<(ConfigDeserialize, BTreeSet<String>), ConfigParseErrorKind> {
    let config = builder
        .build()
        .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

    let mut ignored = BTreeSet::new();
    let mut cb = |path: serde_ignored::Path| {
        ignored.insert(path.to_string());
    };
    let ignored_de = serde_ignored::Deserializer::new(config, &mut cb);
    let config: ConfigDeserialize = serde_path_to_error::deserialize(ignored_de).map_err(|error| {
        // serde_path_to_error already tracks the key, so drop it from the config error.
        let path = error.path().clone();
        let error = match error.into_inner() {
            ConfigError::At { error, .. } => *error,
            other => other,
        };
        ConfigParseErrorKind::DeserializeError(Box::new(serde_path_to_error::Error::new(
            path, error,
        )))
    })?;

    Ok((config, ignored))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ConfigDeserialize {
    attachments: AttachmentsDeserialize,
    limits: LimitsDeserialize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct AttachmentsDeserialize {
    archive_content_type: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct LimitsDeserialize {
    max_console_records: usize,
    max_body_chars: usize,
    max_console_text_chars: usize,
    max_entry_size: ByteSize,
    max_archive_size: ByteSize,
}

impl ConfigDeserialize {
    fn resolve(self) -> Result<ExtractorConfig, ConfigParseErrorKind> {
        let limits = self.limits;

        let mut zero = BTreeSet::new();
        let mut check = |key: &str, is_zero: bool| {
            if is_zero {
                zero.insert(format!("limits.{key}"));
            }
        };
        check("max-console-records", limits.max_console_records == 0);
        check("max-body-chars", limits.max_body_chars == 0);
        check("max-console-text-chars", limits.max_console_text_chars == 0);
        check("max-entry-size", limits.max_entry_size.as_u64() == 0);
        check("max-archive-size", limits.max_archive_size.as_u64() == 0);
        if !zero.is_empty() {
            return Err(ConfigParseErrorKind::ZeroLimits(zero));
        }

        let mut max_entry_size = limits.max_entry_size;
        if max_entry_size > ArchiveLimits::MAX_MAX_ENTRY_SIZE {
            warn!(
                "limits.max-entry-size ({}) is too large, using maximum of {}",
                max_entry_size,
                ArchiveLimits::MAX_MAX_ENTRY_SIZE,
            );
            max_entry_size = ArchiveLimits::MAX_MAX_ENTRY_SIZE;
        }

        Ok(ExtractorConfig {
            archive_content_type: self.attachments.archive_content_type,
            limits: ExtractorLimits {
                max_console_records: limits.max_console_records,
                max_body_chars: limits.max_body_chars,
                max_console_text_chars: limits.max_console_text_chars,
            },
            archive_limits: ArchiveLimits {
                max_archive_size: limits.max_archive_size,
                max_entry_size,
            },
        })
    }
}
