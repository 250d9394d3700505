//! Request decoding.
//!
//! Turns one raw input record into an `AttributeSet`. A record is expected to
//! be a JSON object whose values are all strings. Blank records carry no
//! request and produce no decision; anything else that fails to decode is
//! denied by the caller.

use serde_json::error::Category;
use thiserror::Error;

use crate::attributes::AttributeSet;
use crate::evaluator::Decision;

/// Error type for record decoding.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The record is not a JSON object of string values.
    #[error("invalid request record: {0}")]
    Json(#[from] serde_json::Error),

    /// The record exceeded the configured size limit and was discarded.
    #[error("request record exceeds {limit} bytes")]
    Oversized { limit: usize },
}

impl DecodeError {
    /// Short, stable category for structured diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Json(err) => match err.classify() {
                Category::Io => "io",
                Category::Syntax => "syntax",
                Category::Data => "type",
                Category::Eof => "eof",
            },
            Self::Oversized { .. } => "oversized",
        }
    }

    /// The decision emitted for a record that failed to decode.
    ///
    /// Always `Unauthorized`; the decision stream never distinguishes a
    /// malformed record from a policy denial.
    pub const fn decision(&self) -> Decision {
        Decision::Unauthorized
    }
}

/// Returns `true` if the record is empty or whitespace only.
pub fn is_blank(raw: &[u8]) -> bool {
    match std::str::from_utf8(raw) {
        Ok(text) => text.trim().is_empty(),
        Err(_) => false,
    }
}

/// Decodes one record.
///
/// Returns `Ok(None)` for a blank record, `Ok(Some(set))` for a JSON object
/// of string values, and `Err` for anything else: malformed JSON, a
/// non-object top level, a non-string value under any key, or invalid UTF-8.
/// Surrounding whitespace (including a trailing `\r`) is tolerated.
pub fn decode_record(raw: &[u8]) -> Result<Option<AttributeSet>, DecodeError> {
    if is_blank(raw) {
        return Ok(None);
    }
    let set: AttributeSet = serde_json::from_slice(raw)?;
    Ok(Some(set))
}

/// Convenience wrapper over [`decode_record`] for text input.
pub fn decode_str(record: &str) -> Result<Option<AttributeSet>, DecodeError> {
    decode_record(record.as_bytes())
}
