//! In-memory segment store for tests and ephemeral scrolls.

use crate::error::{StorageError, StorageResult};
use crate::mode::{transition, ModeAction, SegmentMode};
use crate::segment::{Segment, SegmentNumber, SegmentStore, TERMINAL};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;

/// Shared per-segment state, kept alive by the store so that a segment
/// reopened within the process resumes where it left off.
#[derive(Debug)]
struct MemCell {
    /// Fixed-capacity ring buffer.
    buf: Vec<u8>,
    /// Index of the first unconsumed byte.
    start: usize,
    /// Number of unconsumed bytes.
    len: usize,
    /// Successor segment number.
    next_number: SegmentNumber,
}

impl MemCell {
    fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0u8; capacity],
            start: 0,
            len: 0,
            next_number: TERMINAL,
        }
    }
}

/// An in-memory segment backed by a bounds-checked ring buffer.
///
/// Consumed space at the front of the ring is reused by later writes, so
/// a segment can cycle through far more than its capacity in total bytes
/// as long as no more than `capacity` are unconsumed at once.
#[derive(Debug)]
pub struct MemorySegment {
    number: SegmentNumber,
    cell: Arc<RwLock<MemCell>>,
    mode: SegmentMode,
}

impl MemorySegment {
    fn ensure_open(&self) -> StorageResult<()> {
        if self.mode == SegmentMode::Closed {
            return Err(StorageError::Closed);
        }
        Ok(())
    }
}

impl Segment for MemorySegment {
    fn number(&self) -> SegmentNumber {
        self.number
    }

    fn next_number(&self) -> SegmentNumber {
        self.cell.read().next_number
    }

    fn set_next_number(&mut self, next: SegmentNumber) -> StorageResult<()> {
        self.cell.write().next_number = next;
        Ok(())
    }

    fn mode(&self) -> SegmentMode {
        self.mode
    }

    fn set_mode(&mut self, mode: SegmentMode) -> StorageResult<()> {
        // Seeks are implicit in the ring indices; the transition is
        // validated so mode misuse surfaces the same way as on disk.
        let _action: ModeAction = transition(self.mode, mode)?;
        self.mode = mode;
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> StorageResult<usize> {
        self.ensure_open()?;
        let mut cell = self.cell.write();
        let n = buf.len().min(cell.len);
        let cap = cell.buf.len();
        for (i, slot) in buf.iter_mut().take(n).enumerate() {
            *slot = cell.buf[(cell.start + i) % cap];
        }
        cell.start = (cell.start + n) % cap.max(1);
        cell.len -= n;
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> StorageResult<usize> {
        self.ensure_open()?;
        let mut cell = self.cell.write();
        let cap = cell.buf.len();
        let n = buf.len().min(cap - cell.len);
        for (i, &byte) in buf.iter().take(n).enumerate() {
            let at = (cell.start + cell.len + i) % cap;
            cell.buf[at] = byte;
        }
        cell.len += n;
        Ok(n)
    }

    fn clear(&mut self) -> StorageResult<()> {
        let mut cell = self.cell.write();
        cell.start = 0;
        cell.len = 0;
        Ok(())
    }

    fn is_empty(&self) -> bool {
        self.cell.read().len == 0
    }

    fn len(&self) -> usize {
        self.cell.read().len
    }
}

/// An in-memory segment store.
///
/// Suitable for unit tests, integration tests, and scrolls that do not
/// need persistence.
///
/// # Example
///
/// ```rust
/// use scrolldb_storage::{MemoryStore, SegmentStore};
///
/// let mut store = MemoryStore::new(8);
/// let mut seg = store.create(1).unwrap();
/// assert_eq!(seg.write(b"0123456789").unwrap(), 8); // capacity bound
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    cells: HashMap<SegmentNumber, Arc<RwLock<MemCell>>>,
    entry: Option<SegmentNumber>,
    capacity: usize,
}

impl MemoryStore {
    /// Creates a store with the given per-segment capacity.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero; use [`MemoryStore::try_new`] to get
    /// an error instead.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self::try_new(capacity).unwrap()
    }

    /// Creates a store, rejecting a zero capacity.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidCapacity`] if `capacity` is zero.
    pub fn try_new(capacity: usize) -> StorageResult<Self> {
        if capacity == 0 {
            return Err(StorageError::InvalidCapacity { capacity });
        }
        Ok(Self {
            cells: HashMap::new(),
            entry: None,
            capacity,
        })
    }

    /// Returns the number of live segments.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.cells.len()
    }
}

impl SegmentStore for MemoryStore {
    fn create(&mut self, number: SegmentNumber) -> StorageResult<Box<dyn Segment>> {
        if self.cells.contains_key(&number) {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("segment {number:016x} already exists"),
            )));
        }
        let cell = Arc::new(RwLock::new(MemCell::new(self.capacity)));
        self.cells.insert(number, Arc::clone(&cell));
        Ok(Box::new(MemorySegment {
            number,
            cell,
            mode: SegmentMode::Idle,
        }))
    }

    fn open(&mut self, number: SegmentNumber) -> StorageResult<Box<dyn Segment>> {
        let cell = self
            .cells
            .get(&number)
            .ok_or(StorageError::SegmentMissing { number })?;
        Ok(Box::new(MemorySegment {
            number,
            cell: Arc::clone(cell),
            mode: SegmentMode::Idle,
        }))
    }

    fn remove(&mut self, number: SegmentNumber) -> StorageResult<()> {
        self.cells
            .remove(&number)
            .map(|_| ())
            .ok_or(StorageError::SegmentMissing { number })
    }

    fn exists(&self, number: SegmentNumber) -> bool {
        self.cells.contains_key(&number)
    }

    fn entry_number(&self) -> StorageResult<Option<SegmentNumber>> {
        Ok(self.entry)
    }

    fn set_entry_number(&mut self, number: SegmentNumber) -> StorageResult<()> {
        self.entry = Some(number);
        Ok(())
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_capacity_rejected() {
        let result = MemoryStore::try_new(0);
        assert!(matches!(result, Err(StorageError::InvalidCapacity { .. })));
    }

    #[test]
    fn write_bounded_by_capacity() {
        let mut store = MemoryStore::new(4);
        let mut seg = store.create(1).unwrap();

        assert_eq!(seg.write(b"abcdef").unwrap(), 4);
        assert_eq!(seg.write(b"x").unwrap(), 0);
        assert_eq!(seg.len(), 4);
    }

    #[test]
    fn read_consumes() {
        let mut store = MemoryStore::new(8);
        let mut seg = store.create(1).unwrap();
        seg.write(b"hello").unwrap();

        let mut buf = [0u8; 3];
        assert_eq!(seg.read(&mut buf).unwrap(), 3);
        assert_eq!(&buf, b"hel");
        assert_eq!(seg.len(), 2);

        let mut rest = [0u8; 8];
        assert_eq!(seg.read(&mut rest).unwrap(), 2);
        assert_eq!(&rest[..2], b"lo");
        assert!(seg.is_empty());
    }

    #[test]
    fn ring_reuses_consumed_space() {
        let mut store = MemoryStore::new(4);
        let mut seg = store.create(1).unwrap();

        seg.write(b"abcd").unwrap();
        let mut buf = [0u8; 2];
        seg.read(&mut buf).unwrap();

        // Two bytes freed at the front; the ring accepts two more.
        assert_eq!(seg.write(b"ef").unwrap(), 2);

        let mut out = [0u8; 4];
        assert_eq!(seg.read(&mut out).unwrap(), 4);
        assert_eq!(&out, b"cdef");
    }

    #[test]
    fn reopen_resumes_state() {
        let mut store = MemoryStore::new(8);
        {
            let mut seg = store.create(1).unwrap();
            seg.write(b"data").unwrap();
            seg.set_next_number(9).unwrap();
        }

        let mut seg = store.open(1).unwrap();
        assert_eq!(seg.next_number(), 9);
        assert_eq!(seg.len(), 4);
        let mut buf = [0u8; 4];
        seg.read(&mut buf).unwrap();
        assert_eq!(&buf, b"data");
    }

    #[test]
    fn closed_segment_rejects_io() {
        let mut store = MemoryStore::new(8);
        let mut seg = store.create(1).unwrap();
        seg.set_mode(SegmentMode::Closed).unwrap();

        assert!(matches!(seg.write(b"x"), Err(StorageError::Closed)));
        let mut buf = [0u8; 1];
        assert!(matches!(seg.read(&mut buf), Err(StorageError::Closed)));
    }

    #[test]
    fn open_missing_fails() {
        let mut store = MemoryStore::new(8);
        let result = store.open(7);
        assert!(matches!(
            result,
            Err(StorageError::SegmentMissing { number: 7 })
        ));
    }

    #[test]
    fn remove_drops_segment() {
        let mut store = MemoryStore::new(8);
        store.create(1).unwrap();
        assert!(store.exists(1));
        store.remove(1).unwrap();
        assert!(!store.exists(1));
    }

    #[test]
    fn entry_number_roundtrip() {
        let mut store = MemoryStore::new(8);
        assert_eq!(store.entry_number().unwrap(), None);
        store.set_entry_number(3).unwrap();
        assert_eq!(store.entry_number().unwrap(), Some(3));
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn writes_then_read_preserve_order(
                chunks in proptest::collection::vec(
                    proptest::collection::vec(any::<u8>(), 0..16),
                    0..8,
                ),
                capacity in 1usize..64,
            ) {
                let mut store = MemoryStore::new(capacity);
                let mut seg = store.create(1).unwrap();

                let mut accepted = Vec::new();
                for chunk in &chunks {
                    let n = seg.write(chunk).unwrap();
                    accepted.extend_from_slice(&chunk[..n]);
                    prop_assert!(seg.len() <= capacity);
                }

                let mut out = vec![0u8; accepted.len() + 4];
                let n = seg.read(&mut out).unwrap();
                prop_assert_eq!(&out[..n], accepted.as_slice());
                prop_assert!(seg.is_empty());
            }

            #[test]
            fn ring_streams_more_than_its_capacity(
                data in proptest::collection::vec(any::<u8>(), 1..128),
                capacity in 1usize..16,
            ) {
                let mut store = MemoryStore::new(capacity);
                let mut seg = store.create(1).unwrap();

                let mut out = Vec::new();
                let mut rest: &[u8] = &data;
                while !rest.is_empty() || !seg.is_empty() {
                    let n = seg.write(rest).unwrap();
                    rest = &rest[n..];

                    let mut buf = vec![0u8; capacity];
                    let r = seg.read(&mut buf).unwrap();
                    out.extend_from_slice(&buf[..r]);
                }
                prop_assert_eq!(out, data);
            }
        }
    }
}
