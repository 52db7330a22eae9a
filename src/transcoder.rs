//! Streaming MILXLY to NVG transcoder.
//!
//! A single left-to-right pass over the input's structural events:
//!
//! - **Scanning**: events are discarded until a start event names the record
//!   element.
//! - **DecodingRecord**: the record's sub-tree is collected and decoded; the
//!   decoded record is mapped to output nodes which go to the emitter. Decode
//!   and mapping failures are reported and the record is skipped.
//! - **Finished**: the input is exhausted and the emitter is finalized.
//!
//! At most one record is held in memory by the transcoder at any time.

use std::io::Read;

use serde::{Deserialize, Serialize};

use crate::bom;
use crate::diagnostics::{Diagnostic, Diagnostics, Severity};
use crate::emitter::OutputEmitter;
use crate::error::TranscodeResult;
use crate::events::{EventCursor, StructuralEvent};
use crate::mapping::{MappingPolicy, map_record};
use crate::record::{RECORD_ELEMENT, decode_record};

const COMPONENT: &str = "transcoder";

/// Options for one transcoding pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodeOptions {
    /// Local name of record elements
    pub record_element: String,
    pub policy: MappingPolicy,
}

impl Default for TranscodeOptions {
    fn default() -> Self {
        Self {
            record_element: RECORD_ELEMENT.to_string(),
            policy: MappingPolicy::default(),
        }
    }
}

/// Counters collected during one pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodeReport {
    /// Record elements encountered
    pub records_seen: usize,
    /// Records that produced output
    pub records_converted: usize,
    /// Records that failed to decode
    pub records_skipped: usize,
    /// Decoded records that could not be mapped
    pub records_unmapped: usize,
    /// Records whose symbol descriptor could not be parsed
    pub descriptor_failures: usize,
    /// Output nodes written
    pub nodes_emitted: usize,
}

impl TranscodeReport {
    /// Number of recovered per-record problems
    pub fn warning_count(&self) -> usize {
        self.records_skipped + self.records_unmapped + self.descriptor_failures
    }
}

enum ScanState {
    Scanning,
    DecodingRecord(StructuralEvent),
    Finished,
}

pub struct StreamingTranscoder<'d> {
    options: TranscodeOptions,
    diagnostics: &'d dyn Diagnostics,
}

impl<'d> StreamingTranscoder<'d> {
    pub fn new(options: TranscodeOptions, diagnostics: &'d dyn Diagnostics) -> Self {
        Self {
            options,
            diagnostics,
        }
    }

    pub fn options(&self) -> &TranscodeOptions {
        &self.options
    }

    /// Transcode `input` into `emitter`.
    ///
    /// I/O and structural failures abort the pass; per-record failures are
    /// reported through the diagnostics and counted in the report.
    pub fn transcode<R: Read, E: OutputEmitter>(
        &self,
        input: R,
        emitter: &mut E,
    ) -> TranscodeResult<TranscodeReport> {
        let source = bom::strip_bom(input)?;
        let mut cursor = EventCursor::new(source);
        let mut report = TranscodeReport::default();

        emitter.begin()?;

        let mut state = ScanState::Scanning;
        loop {
            state = match state {
                ScanState::Scanning => match cursor.next_event()? {
                    Some(event) if event.is_start_of(&self.options.record_element) => {
                        ScanState::DecodingRecord(event)
                    }
                    Some(_) => ScanState::Scanning,
                    None => ScanState::Finished,
                },
                ScanState::DecodingRecord(start) => {
                    let events = cursor.read_subtree(start)?;
                    self.handle_record(&events, emitter, &mut report)?;
                    ScanState::Scanning
                }
                ScanState::Finished => break,
            };
        }

        emitter.finish()?;

        self.diagnostics.debug(
            COMPONENT,
            format!(
                "{} records seen, {} converted, {} nodes emitted",
                report.records_seen, report.records_converted, report.nodes_emitted
            ),
        );
        Ok(report)
    }

    fn handle_record<E: OutputEmitter>(
        &self,
        events: &[StructuralEvent],
        emitter: &mut E,
        report: &mut TranscodeReport,
    ) -> TranscodeResult<()> {
        let index = report.records_seen;
        report.records_seen += 1;

        let record = match decode_record(events, &self.options.record_element) {
            Ok(record) => record,
            Err(e) => {
                report.records_skipped += 1;
                self.warn(index, format!("Skipping record: {}", e));
                return Ok(());
            }
        };

        match record.symbol_descriptor(self.diagnostics) {
            Some(Ok(symbol)) => self.diagnostics.report(
                Diagnostic::new(
                    Severity::Debug,
                    COMPONENT,
                    format!(
                        "Symbol {} [{}]",
                        symbol.code.as_deref().unwrap_or("-"),
                        symbol
                    ),
                )
                .with_record(index),
            ),
            Some(Err(e)) => {
                report.descriptor_failures += 1;
                self.warn(index, format!("Ignoring symbol descriptor: {}", e));
            }
            None => {}
        }

        let nodes = match map_record(&record, self.options.policy) {
            Ok(nodes) => nodes,
            Err(e) => {
                report.records_unmapped += 1;
                self.warn(index, format!("Skipping record: {}", e));
                return Ok(());
            }
        };

        for node in nodes {
            emitter.emit(node)?;
            report.nodes_emitted += 1;
        }
        report.records_converted += 1;
        Ok(())
    }

    fn warn(&self, record: usize, message: String) {
        self.diagnostics
            .report(Diagnostic::new(Severity::Warning, COMPONENT, message).with_record(record));
    }
}
