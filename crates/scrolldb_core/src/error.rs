//! Error types for ScrollDB core.

use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in scroll and heap operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] scrolldb_storage::StorageError),

    /// Box codec error.
    #[error("codec error: {0}")]
    Codec(#[from] scrolldb_codec::CodecError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A pointer from a different scroll instance was used here.
    #[error("pointer belongs to a different scroll instance")]
    ForeignPointer,

    /// A pointer that is no longer floating was used.
    #[error("pointer {number:016x} is not floating")]
    StalePointer {
        /// The pointer's segment number.
        number: u64,
    },

    /// A resolved payload's type disagrees with the stored type tag.
    #[error("type mismatch: expected {expected:#010x}, got {actual:#010x}")]
    TypeMismatch {
        /// The tag recorded for the box.
        expected: u32,
        /// The tag the payload decoded to.
        actual: u32,
    },

    /// Stored data is structurally invalid.
    #[error("corruption: {message}")]
    Corruption {
        /// Description of the corruption.
        message: String,
    },

    /// A bulk operation was cancelled between elements.
    #[error("operation cancelled")]
    Cancelled,

    /// An index was outside the collection's bounds.
    #[error("invalid index {index} for length {len}")]
    InvalidIndex {
        /// The offending index.
        index: i64,
        /// The collection length.
        len: usize,
    },
}

impl CoreError {
    /// Creates a corruption error.
    pub fn corruption(message: impl Into<String>) -> Self {
        Self::Corruption {
            message: message.into(),
        }
    }
}
