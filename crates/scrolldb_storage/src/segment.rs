//! Segment and segment-store contracts.

use crate::error::{StorageError, StorageResult};
use crate::mode::SegmentMode;

/// Position key of a segment within a scroll.
pub type SegmentNumber = u64;

/// Reserved successor value marking "no next segment".
pub const TERMINAL: SegmentNumber = u64::MAX;

/// Size of the persisted segment header in bytes.
pub const HEADER_SIZE: usize = 16;

/// The persisted per-segment header.
///
/// Written at segment open and close so a freshly opened backend can
/// resume without external bookkeeping. Layout (host-endian):
/// `next-number` (8 bytes) then `start-offset` (8 bytes). The ordered
/// scroll stores its ordering key in the first field instead of a
/// successor; the layout is shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentHeader {
    /// Successor segment number, or [`TERMINAL`].
    pub next_number: SegmentNumber,
    /// Offset of the first unconsumed byte within the segment's content.
    pub start_offset: u64,
}

impl SegmentHeader {
    /// A header with no successor and nothing consumed.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            next_number: TERMINAL,
            start_offset: 0,
        }
    }

    /// Encodes the header to its 16-byte wire form.
    #[must_use]
    pub fn encode(&self) -> [u8; HEADER_SIZE] {
        let mut buf = [0u8; HEADER_SIZE];
        buf[..8].copy_from_slice(&self.next_number.to_ne_bytes());
        buf[8..].copy_from_slice(&self.start_offset.to_ne_bytes());
        buf
    }

    /// Decodes a header from its wire form.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Corrupted`] if `data` is shorter than
    /// [`HEADER_SIZE`].
    pub fn decode(data: &[u8]) -> StorageResult<Self> {
        if data.len() < HEADER_SIZE {
            return Err(StorageError::Corrupted(format!(
                "segment header too short: {} bytes",
                data.len()
            )));
        }

        let next_number = u64::from_ne_bytes(
            data[..8]
                .try_into()
                .map_err(|_| StorageError::Corrupted("bad next-number field".into()))?,
        );
        let start_offset = u64::from_ne_bytes(
            data[8..16]
                .try_into()
                .map_err(|_| StorageError::Corrupted("bad start-offset field".into()))?,
        );

        Ok(Self {
            next_number,
            start_offset,
        })
    }
}

/// A single contiguous storage unit within a scroll.
///
/// Segments behave as bounded consumable byte queues: [`write`] appends
/// at the end up to the store's capacity, [`read`] consumes from the
/// start offset. Both are allowed to transfer fewer bytes than asked -
/// the caller continues into a neighboring segment.
///
/// # Invariants
///
/// - `write` never accepts more than `capacity - len` bytes
/// - `read` never yields bytes that were already consumed
/// - `is_empty` is `len() == 0`
/// - the header survives a `Closed` round trip
///
/// [`write`]: Segment::write
/// [`read`]: Segment::read
pub trait Segment {
    /// Returns the segment's position key.
    fn number(&self) -> SegmentNumber;

    /// Returns the successor segment number, or [`TERMINAL`].
    fn next_number(&self) -> SegmentNumber;

    /// Sets the successor segment number.
    ///
    /// # Errors
    ///
    /// Returns an error if the header cannot be updated.
    fn set_next_number(&mut self, next: SegmentNumber) -> StorageResult<()>;

    /// Returns the current mode.
    fn mode(&self) -> SegmentMode;

    /// Transitions the segment into `mode`, performing the transition's
    /// side effect (seek, header flush, handle reopen).
    ///
    /// # Errors
    ///
    /// Returns an error on an invalid transition or an I/O failure.
    fn set_mode(&mut self, mode: SegmentMode) -> StorageResult<()>;

    /// Reads into `buf`, consuming from the start offset.
    ///
    /// Returns the number of bytes read; `0` means the segment is
    /// exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Closed`] if the segment is closed, or an
    /// I/O error from the backend.
    fn read(&mut self, buf: &mut [u8]) -> StorageResult<usize>;

    /// Appends from `buf` at the end of the segment's content.
    ///
    /// Returns the number of bytes written, which is less than
    /// `buf.len()` when the segment fills up.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Closed`] if the segment is closed, or an
    /// I/O error from the backend.
    fn write(&mut self, buf: &[u8]) -> StorageResult<usize>;

    /// Drops all content and resets the start offset.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be truncated.
    fn clear(&mut self) -> StorageResult<()>;

    /// Returns whether the segment holds no unconsumed bytes.
    fn is_empty(&self) -> bool;

    /// Returns the number of unconsumed bytes.
    fn len(&self) -> usize;
}

/// Factory and owner of a scroll's segments.
///
/// A store is handed to a scroll at construction. It creates, reopens and
/// destroys segments, knows the shared per-segment capacity, and persists
/// the scroll's resume pointer (the "entry" record).
pub trait SegmentStore {
    /// Creates a new, empty segment with the given number.
    ///
    /// # Errors
    ///
    /// Returns an error if a segment with that number already exists or
    /// the backend fails.
    fn create(&mut self, number: SegmentNumber) -> StorageResult<Box<dyn Segment>>;

    /// Opens an existing segment.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::SegmentMissing`] if no such segment
    /// exists.
    fn open(&mut self, number: SegmentNumber) -> StorageResult<Box<dyn Segment>>;

    /// Destroys a segment and its backing storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be removed.
    fn remove(&mut self, number: SegmentNumber) -> StorageResult<()>;

    /// Returns whether a segment with the given number exists.
    fn exists(&self, number: SegmentNumber) -> bool;

    /// Returns the persisted resume pointer, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry record cannot be read.
    fn entry_number(&self) -> StorageResult<Option<SegmentNumber>>;

    /// Persists the resume pointer.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry record cannot be written.
    fn set_entry_number(&mut self, number: SegmentNumber) -> StorageResult<()>;

    /// Returns the per-segment content capacity in bytes.
    fn capacity(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip() {
        let header = SegmentHeader {
            next_number: 42,
            start_offset: 7,
        };
        let encoded = header.encode();
        assert_eq!(encoded.len(), HEADER_SIZE);
        let decoded = SegmentHeader::decode(&encoded).unwrap();
        assert_eq!(header, decoded);
    }

    #[test]
    fn header_terminal_roundtrip() {
        let header = SegmentHeader::empty();
        let decoded = SegmentHeader::decode(&header.encode()).unwrap();
        assert_eq!(decoded.next_number, TERMINAL);
        assert_eq!(decoded.start_offset, 0);
    }

    #[test]
    fn header_too_short_fails() {
        let result = SegmentHeader::decode(&[0u8; 8]);
        assert!(matches!(result, Err(StorageError::Corrupted(_))));
    }
}
