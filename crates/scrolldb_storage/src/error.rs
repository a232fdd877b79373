//! Error types for storage operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Another process holds the store's lock.
    #[error("store locked: another holder has exclusive access")]
    Locked,

    /// The segment's persisted state is corrupted.
    #[error("segment corrupted: {0}")]
    Corrupted(String),

    /// The segment is in `Closed` mode and cannot serve I/O.
    #[error("segment is closed")]
    Closed,

    /// The requested segment does not exist in the store.
    #[error("segment {number:016x} does not exist")]
    SegmentMissing {
        /// The missing segment number.
        number: u64,
    },

    /// A store was configured with an unusable capacity.
    #[error("invalid segment capacity: {capacity}")]
    InvalidCapacity {
        /// The rejected capacity.
        capacity: usize,
    },
}
