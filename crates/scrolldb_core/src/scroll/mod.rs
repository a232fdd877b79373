//! The scroll abstraction and its implementations.

mod chain;
mod skip;
mod tee;

pub use chain::ChainScroll;
pub use skip::SkipScroll;
pub use tee::TeeScroll;

use crate::error::CoreResult;
use crate::pointer::{Pointer, ScrollId};
use scrolldb_storage::SegmentNumber;

/// A segmented bidirectional byte stream with movable pointers.
///
/// The cursor is the boundary between a *write* segment ([`insert`]
/// appends at its end) and a *read* segment ([`remove`] consumes from its
/// start). A pointer names a marker segment; its position is the start of
/// that segment's content, so bytes inserted right after [`get_pointer`]
/// sit at the pointer's position.
///
/// # Pointer contract
///
/// A pointer is valid only for the scroll instance that issued it and
/// only while *floating* - materialized but not yet consumed by
/// [`set_pointer`]. Violations are contract errors, never silently
/// tolerated. Empty segments passed over while walking are retired, and
/// their pointers with them.
///
/// [`insert`]: Scroll::insert
/// [`remove`]: Scroll::remove
/// [`get_pointer`]: Scroll::get_pointer
/// [`set_pointer`]: Scroll::set_pointer
pub trait Scroll {
    /// Returns the scroll instance's identity.
    fn id(&self) -> ScrollId;

    /// Materializes the current position as a floating pointer.
    ///
    /// # Errors
    ///
    /// Returns an error if backing storage for the marker segment cannot
    /// be created.
    fn get_pointer(&mut self) -> CoreResult<Pointer>;

    /// Moves the cursor to a floating pointer's position, consuming it.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ForeignPointer`] for a pointer from another
    /// scroll and [`CoreError::StalePointer`] for one that is not
    /// floating.
    ///
    /// [`CoreError::ForeignPointer`]: crate::CoreError::ForeignPointer
    /// [`CoreError::StalePointer`]: crate::CoreError::StalePointer
    fn set_pointer(&mut self, ptr: &Pointer) -> CoreResult<()>;

    /// Returns whether the cursor has reached the pointer's position,
    /// retiring empty segments passed over on the way.
    ///
    /// # Errors
    ///
    /// Same contract errors as [`set_pointer`](Scroll::set_pointer).
    fn is_at(&mut self, ptr: &Pointer) -> CoreResult<bool>;

    /// Reconstructs a floating pointer from a stored ordinal.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::StalePointer`] if no such position exists in
    /// this scroll.
    ///
    /// [`CoreError::StalePointer`]: crate::CoreError::StalePointer
    fn materialize(&mut self, ordinal: SegmentNumber) -> CoreResult<Pointer>;

    /// Inserts bytes at the cursor, splitting into fresh segments as the
    /// write segment fills up.
    ///
    /// # Errors
    ///
    /// Propagates backend failures unchanged; no retry.
    fn insert(&mut self, bytes: &[u8]) -> CoreResult<()>;

    /// Removes up to `len` bytes at the cursor, retiring segments as they
    /// are exhausted. A short result means the scroll ran out of bytes.
    ///
    /// # Errors
    ///
    /// Propagates backend failures unchanged; no retry.
    fn remove(&mut self, len: usize) -> CoreResult<Vec<u8>>;

    /// Flushes state so the scroll can reopen at the same cursor, then
    /// releases all segments. Best-effort: every segment is attempted
    /// before the first error is reported.
    ///
    /// # Errors
    ///
    /// Returns the first flush failure encountered.
    fn dispose(&mut self) -> CoreResult<()>;
}
