//! Segment mode state machine.
//!
//! Mode changes carry side effects (seeks, header flushes, handle
//! reopens). The transition table lives here as a pure function so the
//! state machine can be tested without touching any backend.

use crate::error::{StorageError, StorageResult};

/// The operating mode of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SegmentMode {
    /// No I/O position is established.
    #[default]
    Idle,
    /// Positioned at the start offset, serving reads.
    Read,
    /// Positioned at the end, serving appends.
    Write,
    /// Header flushed, backing handle released.
    Closed,
}

/// The side effect a mode transition performs on the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeAction {
    /// Nothing to do (mode unchanged).
    None,
    /// Seek to the persisted start offset.
    SeekToStart,
    /// Seek to the end of the segment's content.
    SeekToEnd,
    /// Flush the header and release the backing handle.
    FlushAndRelease,
    /// Reacquire the backing handle, then seek to the start offset.
    ReopenForRead,
    /// Reacquire the backing handle, then seek to the end.
    ReopenForWrite,
}

/// Computes the action for a mode transition.
///
/// # Errors
///
/// Returns [`StorageError::Closed`] for `Closed -> Idle`, which has no
/// meaning: a closed segment reopens directly into `Read` or `Write`.
pub fn transition(from: SegmentMode, to: SegmentMode) -> StorageResult<ModeAction> {
    use SegmentMode::{Closed, Idle, Read, Write};

    Ok(match (from, to) {
        (a, b) if a == b => ModeAction::None,
        (Closed, Read) => ModeAction::ReopenForRead,
        (Closed, Write) => ModeAction::ReopenForWrite,
        (Closed, Idle) => return Err(StorageError::Closed),
        (_, Closed) => ModeAction::FlushAndRelease,
        (_, Read) => ModeAction::SeekToStart,
        (_, Write) => ModeAction::SeekToEnd,
        (_, Idle) => ModeAction::None,
    })
}
