//! Codec errors for frame, envelope and argument processing
//!
//! Two families live here: [`DecodeError`] for byte-level failures (truncated
//! streams, inconsistent lengths, corrupted frames) and [`CoercionError`] for
//! textual arguments that cannot be read as their declared type.

use thiserror::Error;

/// Byte-level decoding failures
///
/// Every variant carries enough context to locate the fault in the stream:
/// the field being read and the offset it started at.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DecodeError {
    /// Stream ended before a field could be read completely
    #[error("Truncated input: need {need} bytes for {field} at offset {offset}, {remaining} remaining")]
    Truncated {
        field: &'static str,
        offset: usize,
        need: usize,
        remaining: usize,
    },

    /// A declared length or count exceeds protocol limits
    #[error("Length out of range for {field}: {declared} exceeds limit {limit}")]
    LengthOutOfRange {
        field: &'static str,
        declared: usize,
        limit: usize,
    },

    /// Bytes left over after the final field
    #[error("Trailing data: {extra} unread bytes after {context}")]
    TrailingBytes { extra: usize, context: &'static str },

    /// String field is not valid UTF-8
    #[error("Invalid UTF-8 in {field} at offset {offset}: {reason}")]
    InvalidUtf8 {
        field: &'static str,
        offset: usize,
        reason: String,
    },

    /// Frame does not start with the protocol magic
    #[error("Invalid magic: expected {expected:?}, got {actual:?}")]
    InvalidMagic { expected: [u8; 4], actual: [u8; 4] },

    /// Frame was produced by an incompatible protocol version
    #[error("Unsupported frame version {version} (supported: {supported})")]
    UnsupportedVersion { version: u8, supported: u8 },

    /// Frame checksum does not match its contents
    #[error("Checksum mismatch: expected {expected:#010x}, calculated {calculated:#010x} ({frame_size} bytes)")]
    ChecksumMismatch {
        expected: u32,
        calculated: u32,
        frame_size: usize,
    },

    /// `argTypes` and `args` differ in length
    #[error("Argument arity mismatch: {types} type tags for {values} values")]
    ArityMismatch { types: usize, values: usize },

    /// Result payload is not valid JSON of the expected shape
    #[error("Malformed result payload: {reason}")]
    MalformedResult { reason: String },
}

impl DecodeError {
    pub fn truncated(field: &'static str, offset: usize, need: usize, remaining: usize) -> Self {
        Self::Truncated {
            field,
            offset,
            need,
            remaining,
        }
    }

    pub fn length_out_of_range(field: &'static str, declared: usize, limit: usize) -> Self {
        Self::LengthOutOfRange {
            field,
            declared,
            limit,
        }
    }

    pub fn malformed_result(reason: impl Into<String>) -> Self {
        Self::MalformedResult {
            reason: reason.into(),
        }
    }
}

/// A textual argument could not be read as its declared type
#[derive(Debug, Error, Clone, PartialEq)]
#[error("Cannot coerce {value:?} as '{tag}': {reason}")]
pub struct CoercionError {
    /// Type tag the value was paired with
    pub tag: String,
    /// Offending text, truncated for display
    pub value: String,
    pub reason: String,
}

impl CoercionError {
    pub fn new(tag: impl Into<String>, value: &str, reason: impl Into<String>) -> Self {
        const MAX_ECHO: usize = 64;
        let value = if value.len() > MAX_ECHO {
            let mut cut = MAX_ECHO;
            while !value.is_char_boundary(cut) {
                cut -= 1;
            }
            format!("{}…", &value[..cut])
        } else {
            value.to_string()
        };

        Self {
            tag: tag.into(),
            value,
            reason: reason.into(),
        }
    }

    pub fn unknown_tag(tag: &str, value: &str) -> Self {
        Self::new(tag, value, "unknown type tag")
    }
}

/// Failures while serializing an envelope or frame
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EncodeError {
    /// `argTypes` and `args` differ in length
    #[error("Argument arity mismatch: {types} type tags for {values} values")]
    ArityMismatch { types: usize, values: usize },

    /// A string field is longer than the wire format allows
    #[error("Field {field} too long: {len} bytes exceeds limit {limit}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        limit: usize,
    },

    /// An array field has more elements than the wire format allows
    #[error("Field {field} has too many elements: {count} exceeds limit {limit}")]
    TooManyElements {
        field: &'static str,
        count: usize,
        limit: usize,
    },

    /// Frame body exceeds the maximum frame size
    #[error("Frame body too large: {size} bytes exceeds maximum {max}")]
    BodyTooLarge { size: usize, max: usize },

    /// Result payload could not be serialized
    #[error("Result serialization failed: {reason}")]
    ResultSerialization { reason: String },
}

/// Result type alias for decoding operations
pub type Result<T> = std::result::Result<T, DecodeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_message_includes_context() {
        let err = DecodeError::truncated("operation", 12, 8, 3);
        let msg = err.to_string();
        assert!(msg.contains("operation"));
        assert!(msg.contains("offset 12"));
        assert!(msg.contains("3 remaining"));
    }

    #[test]
    fn test_coercion_error_truncates_long_values() {
        let long = "x".repeat(500);
        let err = CoercionError::new("Boolean", &long, "not a boolean");
        assert!(err.value.len() < 80);
        assert!(err.value.ends_with('…'));
    }

    #[test]
    fn test_coercion_error_respects_char_boundaries() {
        let text = "é".repeat(40);
        let err = CoercionError::new("integer", &text, "not an integer");
        assert!(err.value.ends_with('…'));
    }
}
