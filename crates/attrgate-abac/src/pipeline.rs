//! Streaming decision pipeline.
//!
//! Reads newline-separated records, runs each non-blank record through the
//! decoder and the evaluator, and writes one decision line per record in
//! input order. Records are processed one at a time from a reused buffer, so
//! memory use is bounded by `max_record_bytes` and reading never runs ahead
//! of emission.

use std::io::{self, BufRead, Write};

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::attributes::RequestAttributes;
use crate::decoder::{self, DecodeError};
use crate::evaluator::{Decision, Evaluator};

/// Default per-record size limit (1 MiB).
pub const DEFAULT_MAX_RECORD_BYTES: usize = 1024 * 1024;

// ============================================================================
// Errors
// ============================================================================

/// Fatal pipeline errors. Per-record decode failures are never fatal.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Reading the input stream failed (distinct from end-of-stream).
    #[error("failed to read input stream")]
    Read(#[source] io::Error),

    /// Writing or flushing the decision stream failed.
    #[error("failed to write decision stream")]
    Write(#[source] io::Error),
}

// ============================================================================
// Options
// ============================================================================

/// When decisions are flushed to the output stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlushMode {
    /// Flush after every decision (interactive, request/response callers).
    #[default]
    EveryRecord,
    /// Let the writer buffer; flush once when the input ends.
    OnExit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    pub flush: FlushMode,
    /// Records longer than this are discarded and denied.
    pub max_record_bytes: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            flush: FlushMode::EveryRecord,
            max_record_bytes: DEFAULT_MAX_RECORD_BYTES,
        }
    }
}

// ============================================================================
// Stats
// ============================================================================

/// Counters for one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Records read, blank ones included.
    pub records: u64,
    pub blank: u64,
    /// Records that failed to decode (each also counted as unauthorized).
    pub malformed: u64,
    pub authorized: u64,
    pub unauthorized: u64,
}

impl PipelineStats {
    /// Number of decision lines written.
    pub fn decisions(&self) -> u64 {
        self.authorized + self.unauthorized
    }

    fn count(&mut self, decision: Decision) {
        match decision {
            Decision::Authorized => self.authorized += 1,
            Decision::Unauthorized => self.unauthorized += 1,
        }
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// Drives decoder and evaluator over a record stream.
#[derive(Debug, Clone)]
pub struct Pipeline {
    evaluator: Evaluator,
    options: PipelineOptions,
}

impl Pipeline {
    pub fn new(evaluator: Evaluator, options: PipelineOptions) -> Self {
        Self { evaluator, options }
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn options(&self) -> PipelineOptions {
        self.options
    }

    /// Decides one raw record. Returns `None` for a blank record.
    pub fn decide_record(&self, raw: &[u8]) -> Result<Option<Decision>, DecodeError> {
        Ok(decoder::decode_record(raw)?.map(|set| {
            let request = RequestAttributes::from_attribute_set(&set);
            self.evaluator.decide(&request)
        }))
    }

    /// Runs the pipeline until end of input.
    ///
    /// Returns the run counters on clean end-of-stream. A read or write
    /// failure ends the run with an error; output already produced has been
    /// flushed as far as the writer allows.
    pub fn run<R: BufRead, W: Write>(
        &self,
        mut input: R,
        mut output: W,
    ) -> Result<PipelineStats, PipelineError> {
        let mut stats = PipelineStats::default();
        let mut buf = Vec::new();

        loop {
            let read = match read_record(&mut input, &mut buf, self.options.max_record_bytes) {
                Ok(read) => read,
                Err(err) => {
                    // Keep what was already decided before reporting.
                    let _ = output.flush();
                    return Err(PipelineError::Read(err));
                }
            };

            let outcome = match read {
                RecordRead::Eof => break,
                RecordRead::Complete => self.decide_record(&buf),
                RecordRead::OversizedBlank => Ok(None),
                RecordRead::Oversized => Err(DecodeError::Oversized {
                    limit: self.options.max_record_bytes,
                }),
            };
            stats.records += 1;

            let decision = match outcome {
                Ok(Some(decision)) => {
                    trace!(record = stats.records, %decision, "Decided record");
                    decision
                }
                Ok(None) => {
                    stats.blank += 1;
                    continue;
                }
                Err(err) => {
                    stats.malformed += 1;
                    warn!(
                        record = stats.records,
                        kind = err.kind(),
                        error = %err,
                        "Rejected malformed record"
                    );
                    err.decision()
                }
            };
            stats.count(decision);

            writeln!(output, "{decision}").map_err(PipelineError::Write)?;
            if self.options.flush == FlushMode::EveryRecord {
                output.flush().map_err(PipelineError::Write)?;
            }
        }

        output.flush().map_err(PipelineError::Write)?;
        debug!(
            records = stats.records,
            blank = stats.blank,
            malformed = stats.malformed,
            authorized = stats.authorized,
            unauthorized = stats.unauthorized,
            "Input stream ended"
        );
        Ok(stats)
    }
}

// ============================================================================
// Record Reading
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordRead {
    /// No bytes remained.
    Eof,
    /// `buf` holds one record without its newline.
    Complete,
    /// The record exceeded the limit; it was consumed and `buf` is empty.
    Oversized,
    /// The record exceeded the limit but held only whitespace.
    OversizedBlank,
}

/// Reads the next newline-terminated record into `buf`.
///
/// At most `limit` bytes are buffered. Once a record exceeds the limit the
/// rest of it is skipped up to and including its newline, tracking whether
/// every byte was whitespace. The final record of the stream does not need a
/// trailing newline.
fn read_record<R: BufRead>(input: &mut R, buf: &mut Vec<u8>, limit: usize) -> io::Result<RecordRead> {
    buf.clear();
    let mut started = false;
    let mut oversized = false;
    let mut blank = true;

    loop {
        let available = match input.fill_buf() {
            Ok(available) => available,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        };

        if available.is_empty() {
            return Ok(match (started, oversized) {
                (false, _) => RecordRead::Eof,
                (true, false) => RecordRead::Complete,
                (true, true) => oversized_outcome(blank),
            });
        }
        started = true;

        let (chunk_len, found_newline) = match available.iter().position(|&b| b == b'\n') {
            Some(pos) => (pos, true),
            None => (available.len(), false),
        };

        let chunk = &available[..chunk_len];
        blank = blank && chunk.iter().all(u8::is_ascii_whitespace);

        if !oversized {
            if buf.len() + chunk_len > limit {
                oversized = true;
                buf.clear();
            } else {
                buf.extend_from_slice(chunk);
            }
        }

        input.consume(chunk_len + usize::from(found_newline));

        if found_newline {
            return Ok(if oversized {
                oversized_outcome(blank)
            } else {
                RecordRead::Complete
            });
        }
    }
}

fn oversized_outcome(blank: bool) -> RecordRead {
    if blank {
        RecordRead::OversizedBlank
    } else {
        RecordRead::Oversized
    }
}

// ============================================================================
// Tests
// ============================================================================
