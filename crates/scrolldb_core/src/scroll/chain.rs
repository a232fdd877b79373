//! The chain-indexed scroll.
//!
//! Segments form a singly linked chain through their persisted
//! `next_number` fields. The cursor keeps the invariant
//! `write.next_number == read.number`; an in-memory predecessor index
//! mirrors the chain so `set_pointer` can find the segment in front of a
//! marker without walking.

use crate::error::{CoreError, CoreResult};
use crate::pointer::{Pointer, ScrollId};
use crate::scroll::Scroll;
use scrolldb_storage::{Segment, SegmentMode, SegmentNumber, SegmentStore, TERMINAL};
use std::collections::{HashMap, HashSet};
use tracing::{debug, trace};

/// Number of the segment a fresh scroll starts with.
const FIRST_SEGMENT: SegmentNumber = 1;

/// A scroll over a singly linked chain of segments.
pub struct ChainScroll {
    id: ScrollId,
    store: Box<dyn SegmentStore>,
    /// One live handle per segment; the store is only asked for segments
    /// not already here.
    segments: HashMap<SegmentNumber, Box<dyn Segment>>,
    /// In-memory reverse of the `next_number` chain.
    pred: HashMap<SegmentNumber, SegmentNumber>,
    /// Current write segment (the "previous" side of the cursor).
    write: SegmentNumber,
    /// Current read segment (the "next" side), if any.
    read: Option<SegmentNumber>,
    /// Materialized pointers not yet consumed.
    floating: HashSet<SegmentNumber>,
    next_alloc: SegmentNumber,
    disposed: bool,
}

impl ChainScroll {
    /// Opens a scroll over `store`, resuming at the persisted entry
    /// cursor if the store has one.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails or the persisted chain is
    /// inconsistent.
    pub fn open(mut store: Box<dyn SegmentStore>) -> CoreResult<Self> {
        let id = ScrollId::next();
        let mut segments: HashMap<SegmentNumber, Box<dyn Segment>> = HashMap::new();
        let mut pred = HashMap::new();

        let entry = store.entry_number()?;
        let (write, read, next_alloc) = match entry {
            Some(start) if store.exists(start) => {
                // Walk the chain forward from the resume cursor,
                // rebuilding the predecessor index.
                let mut highest = start;
                let mut current = start;
                let mut seg = store.open(current)?;
                loop {
                    let next = seg.next_number();
                    segments.insert(current, seg);
                    if next == TERMINAL {
                        break;
                    }
                    pred.insert(next, current);
                    highest = highest.max(next);
                    seg = store.open(next)?;
                    current = next;
                }

                let read = segments
                    .get(&start)
                    .map(|s| s.next_number())
                    .filter(|&n| n != TERMINAL);
                (start, read, highest + 1)
            }
            _ => {
                let seg = if store.exists(FIRST_SEGMENT) {
                    store.open(FIRST_SEGMENT)?
                } else {
                    store.create(FIRST_SEGMENT)?
                };
                segments.insert(FIRST_SEGMENT, seg);
                (FIRST_SEGMENT, None, FIRST_SEGMENT + 1)
            }
        };

        let mut scroll = Self {
            id,
            store,
            segments,
            pred,
            write,
            read,
            floating: HashSet::new(),
            next_alloc,
            disposed: false,
        };

        scroll.seg(scroll.write)?.set_mode(SegmentMode::Write)?;
        if let Some(r) = scroll.read {
            scroll.seg(r)?.set_mode(SegmentMode::Read)?;
        }

        debug!(scroll = id.as_u64(), write, read = ?scroll.read, "chain scroll opened");
        Ok(scroll)
    }

    /// Returns the number of live segments.
    #[must_use]
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Returns the number of floating pointers.
    #[must_use]
    pub fn floating_count(&self) -> usize {
        self.floating.len()
    }

    fn seg(&mut self, number: SegmentNumber) -> CoreResult<&mut Box<dyn Segment>> {
        if !self.segments.contains_key(&number) {
            let seg = self.store.open(number)?;
            self.segments.insert(number, seg);
        }
        self.segments
            .get_mut(&number)
            .ok_or_else(|| CoreError::corruption(format!("segment {number:016x} vanished")))
    }

    fn alloc(&mut self) -> SegmentNumber {
        let n = self.next_alloc;
        self.next_alloc += 1;
        n
    }

    /// Splices a fresh, empty segment in at the cursor and makes it the
    /// write segment. The shared half of `get_pointer` and the insert
    /// overflow path.
    fn split(&mut self) -> CoreResult<SegmentNumber> {
        let number = self.alloc();
        let old_write = self.write;
        let read = self.read;

        let mut seg = self.store.create(number)?;
        seg.set_next_number(read.unwrap_or(TERMINAL))?;
        seg.set_mode(SegmentMode::Write)?;
        self.segments.insert(number, seg);

        self.seg(old_write)?.set_next_number(number)?;
        self.seg(old_write)?.set_mode(SegmentMode::Idle)?;

        self.pred.insert(number, old_write);
        if let Some(r) = read {
            self.pred.insert(r, number);
        }

        self.write = number;
        trace!(scroll = self.id.as_u64(), number, "segment materialized");
        Ok(number)
    }

    /// Retires the current read segment, rewiring the chain past it and
    /// destroying its backing storage.
    fn retire_read(&mut self) -> CoreResult<()> {
        let Some(r) = self.read else {
            return Ok(());
        };
        let next = self.seg(r)?.next_number();

        self.seg(self.write)?.set_next_number(next)?;
        self.pred.remove(&r);
        if next != TERMINAL {
            self.pred.insert(next, self.write);
        }

        self.segments.remove(&r);
        self.floating.remove(&r);
        self.store.remove(r)?;

        self.read = if next == TERMINAL { None } else { Some(next) };
        if let Some(n) = self.read {
            self.seg(n)?.set_mode(SegmentMode::Read)?;
        }
        trace!(scroll = self.id.as_u64(), number = r, "segment retired");
        Ok(())
    }

    fn check_ordinal(&self, ptr: &Pointer) -> CoreResult<SegmentNumber> {
        if ptr.scroll() != self.id {
            return Err(CoreError::ForeignPointer);
        }
        ptr.as_ordinal()
    }
}

impl Scroll for ChainScroll {
    fn id(&self) -> ScrollId {
        self.id
    }

    fn get_pointer(&mut self) -> CoreResult<Pointer> {
        let number = self.split()?;
        self.floating.insert(number);
        Ok(Pointer::ordinal(self.id, number))
    }

    fn set_pointer(&mut self, ptr: &Pointer) -> CoreResult<()> {
        let number = self.check_ordinal(ptr)?;
        if !self.floating.remove(&number) {
            return Err(CoreError::StalePointer { number });
        }

        let Some(&before) = self.pred.get(&number) else {
            return Err(CoreError::corruption(format!(
                "marker {number:016x} has no predecessor"
            )));
        };

        self.seg(self.write)?.set_mode(SegmentMode::Idle)?;
        if let Some(r) = self.read {
            self.seg(r)?.set_mode(SegmentMode::Idle)?;
        }

        self.seg(before)?.set_mode(SegmentMode::Write)?;
        self.seg(number)?.set_mode(SegmentMode::Read)?;
        self.write = before;
        self.read = Some(number);
        Ok(())
    }

    fn is_at(&mut self, ptr: &Pointer) -> CoreResult<bool> {
        let number = self.check_ordinal(ptr)?;
        if !self.floating.contains(&number) {
            return Err(CoreError::StalePointer { number });
        }

        loop {
            let Some(r) = self.read else {
                return Ok(false);
            };
            if r == number {
                return Ok(true);
            }
            if self.seg(r)?.is_empty() {
                self.retire_read()?;
            } else {
                return Ok(false);
            }
        }
    }

    fn materialize(&mut self, ordinal: SegmentNumber) -> CoreResult<Pointer> {
        if !self.segments.contains_key(&ordinal) && !self.store.exists(ordinal) {
            return Err(CoreError::StalePointer { number: ordinal });
        }
        self.floating.insert(ordinal);
        Ok(Pointer::ordinal(self.id, ordinal))
    }

    fn insert(&mut self, bytes: &[u8]) -> CoreResult<()> {
        let mut rest = bytes;
        while !rest.is_empty() {
            let n = {
                let w = self.write;
                self.seg(w)?.write(rest)?
            };
            rest = &rest[n..];
            if !rest.is_empty() {
                // Write segment is full; continue into a fresh one.
                self.split()?;
            }
        }
        Ok(())
    }

    fn remove(&mut self, len: usize) -> CoreResult<Vec<u8>> {
        let mut out = Vec::with_capacity(len);
        while out.len() < len {
            let Some(r) = self.read else {
                break;
            };
            let mut buf = vec![0u8; len - out.len()];
            let n = self.seg(r)?.read(&mut buf)?;
            out.extend_from_slice(&buf[..n]);

            if self.seg(r)?.is_empty() {
                // Exhausted; retire it and step past unless the chain
                // ends here.
                let terminal = self.seg(r)?.next_number() == TERMINAL;
                self.retire_read()?;
                if terminal {
                    break;
                }
            } else if out.len() < len {
                break;
            }
        }
        Ok(out)
    }

    fn dispose(&mut self) -> CoreResult<()> {
        if self.disposed {
            return Ok(());
        }
        self.disposed = true;

        let mut first_err: Option<CoreError> = None;
        if let Err(e) = self.store.set_entry_number(self.write) {
            first_err = Some(e.into());
        }

        for (_, seg) in self.segments.iter_mut() {
            if let Err(e) = seg.set_mode(SegmentMode::Closed) {
                if first_err.is_none() {
                    first_err = Some(e.into());
                }
            }
        }
        self.segments.clear();
        self.floating.clear();

        debug!(scroll = self.id.as_u64(), "chain scroll disposed");
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for ChainScroll {
    fn drop(&mut self) {
        let _ = self.dispose();
    }
}

impl std::fmt::Debug for ChainScroll {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainScroll")
            .field("id", &self.id)
            .field("write", &self.write)
            .field("read", &self.read)
            .field("segments", &self.segments.len())
            .field("floating", &self.floating.len())
            .finish_non_exhaustive()
    }
}
