// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Aggregating diagnostics across a test attempt's attachments.
//!
//! Extraction is best-effort. An attachment that can't be read as an archive contributes nothing,
//! and extraction moves on to the next attachment. No error is ever returned to the caller.

use crate::{
    archive::Archive,
    config::{ExtractorConfig, ExtractorLimits},
    events::{TraceEvent, scan_archive},
    records::{build_console_record, build_network_record},
};
use tracediag_metadata::{AttachmentDescriptor, AttemptDiagnostics, AttemptInput};
use tracing::debug;

/// Extracts diagnostics from test attempts.
///
/// The extractor holds no per-attempt state, so a single extractor may be shared across threads
/// processing different attempts.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticsExtractor {
    config: ExtractorConfig,
}

impl DiagnosticsExtractor {
    /// Creates a new extractor with the given configuration.
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration used by this extractor.
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extracts diagnostics from one attempt's attachments.
    ///
    /// Attachments are processed in order. Only attachments whose content type is exactly the
    /// configured archive content type are read.
    pub fn extract_attempt(&self, attachments: &[AttachmentDescriptor]) -> AttemptDiagnostics {
        self.extract_attempt_with_stats(attachments).0
    }

    /// Extracts diagnostics from one attempt's attachments, also returning counts of what was
    /// read and skipped along the way.
    pub fn extract_attempt_with_stats(
        &self,
        attachments: &[AttachmentDescriptor],
    ) -> (AttemptDiagnostics, ExtractionStats) {
        let mut collector = AttemptCollector::new(self.config.limits);

        for attachment in attachments {
            if !attachment.is_archive(&self.config.archive_content_type) {
                continue;
            }
            let Some(path) = attachment.path() else {
                debug!(
                    "skipping trace attachment `{}` with no path",
                    attachment.name
                );
                collector.stats.archives_skipped += 1;
                continue;
            };

            match Archive::open(path, &self.config.archive_limits) {
                Ok(archive) => collector.add_archive(&archive),
                Err(error) => {
                    debug!("skipping unreadable trace archive `{path}`: {error}");
                    collector.stats.archives_skipped += 1;
                }
            }
        }

        collector.finish()
    }

    /// Extracts diagnostics from several attempts, returning one result per attempt in order.
    pub fn extract_attempts(&self, attempts: &[AttemptInput]) -> Vec<AttemptDiagnostics> {
        attempts
            .iter()
            .map(|attempt| self.extract_attempt(&attempt.attachments))
            .collect()
    }
}

/// Counts of what happened while extracting one attempt.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ExtractionStats {
    /// Archives that were read successfully.
    pub archives_read: usize,

    /// Archive attachments that could not be read.
    pub archives_skipped: usize,

    /// Event entries within readable archives that could not be read.
    pub entries_skipped: usize,

    /// Events recognized in event entries.
    pub events_recognized: usize,

    /// Network records produced.
    pub network_records: usize,

    /// Console records kept.
    pub console_records: usize,

    /// Console records dropped because the per-attempt cap was reached.
    pub console_records_dropped: usize,
}

/// Accumulates records for a single attempt.
///
/// Console records are capped across every archive added to the collector. Once the cap is
/// reached, later records are dropped; records already kept are never replaced.
#[derive(Debug)]
pub struct AttemptCollector {
    limits: ExtractorLimits,
    diagnostics: AttemptDiagnostics,
    stats: ExtractionStats,
}

impl AttemptCollector {
    /// Creates an empty collector.
    pub fn new(limits: ExtractorLimits) -> Self {
        Self {
            limits,
            diagnostics: AttemptDiagnostics::default(),
            stats: ExtractionStats::default(),
        }
    }

    /// Scans an archive and adds the records built from its events.
    pub fn add_archive(&mut self, archive: &Archive) {
        let scanned = scan_archive(archive);
        self.stats.archives_read += 1;
        self.stats.entries_skipped += scanned.skipped_entries;

        for event in &scanned.events {
            self.add_event(event, archive);
        }
    }

    /// Adds the record built from a single event, if any.
    ///
    /// `archive` is the archive the event was read from, and is used to resolve payload bodies.
    pub fn add_event(&mut self, event: &TraceEvent, archive: &Archive) {
        self.stats.events_recognized += 1;

        match event {
            TraceEvent::ResourceSnapshot(snapshot) => {
                if let Some(record) = build_network_record(snapshot, archive, &self.limits) {
                    self.diagnostics.network.push(record);
                    self.stats.network_records += 1;
                }
            }
            TraceEvent::Console(_) | TraceEvent::PageError(_) => {
                let Some(record) = build_console_record(event, &self.limits) else {
                    return;
                };
                if self.diagnostics.console_messages.len() < self.limits.max_console_records {
                    self.diagnostics.console_messages.push(record);
                    self.stats.console_records += 1;
                } else {
                    self.stats.console_records_dropped += 1;
                }
            }
        }
    }

    /// Returns the diagnostics collected so far.
    pub fn diagnostics(&self) -> &AttemptDiagnostics {
        &self.diagnostics
    }

    /// Consumes the collector, returning the collected diagnostics and stats.
    pub fn finish(self) -> (AttemptDiagnostics, ExtractionStats) {
        let stats = &self.stats;
        if stats.console_records_dropped > 0 {
            debug!(
                "dropped {} console records over the limit of {}",
                stats.console_records_dropped, self.limits.max_console_records,
            );
        }
        debug!(
            archives_read = stats.archives_read,
            archives_skipped = stats.archives_skipped,
            entries_skipped = stats.entries_skipped,
            events_recognized = stats.events_recognized,
            "extracted {} network records and {} console records",
            stats.network_records,
            stats.console_records,
        );
        (self.diagnostics, self.stats)
    }
}
