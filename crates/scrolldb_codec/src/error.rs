//! Error types for box codecs.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while encoding or decoding boxes.
#[derive(Debug, Error)]
pub enum CodecError {
    /// No decoder is registered for the type tag.
    #[error("unknown box type: {type_id:#010x}")]
    UnknownType {
        /// The unrecognized tag.
        type_id: u32,
    },

    /// The payload ended before the decoder was done.
    #[error("truncated payload: needed {needed} bytes, got {got}")]
    TruncatedPayload {
        /// Bytes the decoder asked for.
        needed: usize,
        /// Bytes actually available.
        got: usize,
    },

    /// A text payload held invalid UTF-8.
    #[error("text payload is not valid UTF-8")]
    InvalidUtf8,

    /// A payload's declared type disagrees with the requested type.
    #[error("type mismatch: expected {expected:#010x}, got {actual:#010x}")]
    TypeMismatch {
        /// The tag the caller asked for.
        expected: u32,
        /// The tag found in the data.
        actual: u32,
    },

    /// The underlying byte source or sink failed.
    #[error("payload source failed: {0}")]
    Source(String),
}
