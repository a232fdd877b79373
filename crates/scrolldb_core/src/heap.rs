//! The type-tagged record heap over a scroll.
//!
//! A heap is an ordered list of *boxes*. On the wire each box is a
//! 12-byte head (8-byte next-box ordinal, 4-byte type tag) followed by
//! the type's own self-delimiting payload. Opening a heap reads only the
//! heads: every payload stays in the scroll behind a floating pointer
//! until something actually needs the value. Resolution consumes the
//! payload bytes and is therefore one-way.

use crate::cancel::CancelToken;
use crate::error::{CoreError, CoreResult};
use crate::pointer::{Pointer, POINTER_SIZE};
use crate::scroll::Scroll;
use scrolldb_codec::{
    BoxRegistry, BoxTypeId, CodecError, CodecResult, DataBox, PayloadSource, VecSink,
    TYPE_ID_SIZE,
};
use scrolldb_storage::SegmentNumber;
use tracing::{debug, trace};

/// Size of a box head on the wire: next ordinal plus type tag.
pub const HEAD_SIZE: usize = POINTER_SIZE + TYPE_ID_SIZE;

/// Where a box's value currently lives.
#[derive(Debug, Clone)]
enum BoxState {
    /// Decoded and held in memory.
    Resident(DataBox),
    /// Still in the scroll, behind a floating pointer at the payload
    /// start. Resolving consumes the pointer and the bytes.
    Unresolved(Pointer),
}

#[derive(Debug)]
struct DataBoxInfo {
    type_id: BoxTypeId,
    state: BoxState,
}

#[derive(Debug)]
struct Slot {
    info: DataBoxInfo,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Adapts a scroll's `remove` to the codec's pull contract, counting the
/// bytes actually taken so a failed decode can tell whether the payload
/// is still intact.
struct ScrollSource<'s> {
    scroll: &'s mut dyn Scroll,
    consumed: usize,
}

impl PayloadSource for ScrollSource<'_> {
    fn pull(&mut self, len: usize) -> CodecResult<Vec<u8>> {
        let bytes = self
            .scroll
            .remove(len)
            .map_err(|e| CodecError::Source(e.to_string()))?;
        self.consumed += bytes.len();
        if bytes.len() < len {
            return Err(CodecError::TruncatedPayload {
                needed: len,
                got: bytes.len(),
            });
        }
        Ok(bytes)
    }
}

/// An ordered heap of type-tagged boxes stored in a scroll.
///
/// Borrows the scroll for its lifetime; [`close`] (or drop) writes every
/// box back and disposes the scroll so a later [`open`] over the same
/// storage sees the boxes in the same order.
///
/// Requires a scroll whose pointers are ordinal-backed; a duplicating
/// scroll's composite pointers cannot be embedded in box heads.
///
/// [`close`]: BoxHeap::close
/// [`open`]: BoxHeap::open
pub struct BoxHeap<'a> {
    scroll: &'a mut dyn Scroll,
    registry: &'a BoxRegistry,
    slots: Vec<Option<Slot>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    len: usize,
    /// Floating pointer at the position after the last box.
    tail_marker: Pointer,
    closed: bool,
}

impl<'a> BoxHeap<'a> {
    /// Opens the heap stored in `scroll`, reading only box heads.
    ///
    /// Each payload is skipped by jumping to the head's next ordinal, so
    /// opening costs one head read per box regardless of payload size.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Corruption`] on a truncated head and
    /// propagates scroll failures.
    pub fn open(scroll: &'a mut dyn Scroll, registry: &'a BoxRegistry) -> CoreResult<Self> {
        let mut entries: Vec<(BoxTypeId, Pointer)> = Vec::new();
        loop {
            let head = scroll.remove(HEAD_SIZE)?;
            if head.is_empty() {
                break;
            }
            if head.len() < HEAD_SIZE {
                return Err(CoreError::corruption(format!(
                    "truncated box head: {} of {HEAD_SIZE} bytes",
                    head.len()
                )));
            }
            let next = Pointer::decode_ordinal(&head[..POINTER_SIZE])?;
            let type_id = BoxTypeId::decode(&head[POINTER_SIZE..])?;

            let payload = scroll.get_pointer()?;
            let jump = scroll.materialize(next)?;
            scroll.set_pointer(&jump)?;
            entries.push((type_id, payload));
        }
        let tail_marker = scroll.get_pointer()?;
        debug!(scroll = scroll.id().as_u64(), boxes = entries.len(), "heap opened");

        let mut heap = Self {
            scroll,
            registry,
            slots: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
            len: 0,
            tail_marker,
            closed: false,
        };
        for (type_id, ptr) in entries {
            heap.link_before(None, type_id, BoxState::Unresolved(ptr))?;
        }
        Ok(heap)
    }

    /// Returns the number of boxes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns whether the heap holds no boxes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns whether any box carries the tag. Never resolves: resident
    /// boxes are checked first, then unresolved ones by their stored tag.
    #[must_use]
    pub fn contains(&self, type_id: BoxTypeId) -> bool {
        for resident_pass in [true, false] {
            let mut cur = self.head;
            while let Some(idx) = cur {
                let Some(slot) = self.slots.get(idx).and_then(Option::as_ref) else {
                    break;
                };
                let resident = matches!(slot.info.state, BoxState::Resident(_));
                if resident == resident_pass && slot.info.type_id == type_id {
                    return true;
                }
                cur = slot.next;
            }
        }
        false
    }

    /// Removes and returns the first box with the tag, resolving it if
    /// needed. No match is `None`, never an error.
    ///
    /// # Errors
    ///
    /// Propagates resolution failures.
    pub fn get(&mut self, type_id: BoxTypeId) -> CoreResult<Option<DataBox>> {
        match self.find_first(type_id) {
            Some(idx) => Ok(Some(self.take_value(idx)?)),
            None => Ok(None),
        }
    }

    /// Puts `value` into the first box with the tag, returning the
    /// previous occupant. With no match, `value` is dropped and `None`
    /// returned.
    ///
    /// # Errors
    ///
    /// Propagates resolution failures.
    pub fn replace(&mut self, type_id: BoxTypeId, value: DataBox) -> CoreResult<Option<DataBox>> {
        let Some(idx) = self.find_first(type_id) else {
            return Ok(None);
        };
        self.resolve(idx)?;
        let slot = self.slot_mut(idx)?;
        let new_tag = value.type_id();
        let old = std::mem::replace(&mut slot.info.state, BoxState::Resident(value));
        slot.info.type_id = new_tag;
        match old {
            BoxState::Resident(v) => Ok(Some(v)),
            BoxState::Unresolved(_) => Err(CoreError::corruption("unresolved after resolve")),
        }
    }

    /// Inserts `value` immediately before the first box with the tag.
    /// With no match, nothing happens; `replace` and `get` are the
    /// operations that report absence.
    pub fn set(&mut self, type_id: BoxTypeId, value: DataBox) -> CoreResult<()> {
        let Some(idx) = self.find_first(type_id) else {
            return Ok(());
        };
        let tag = value.type_id();
        self.link_before(Some(idx), tag, BoxState::Resident(value))
    }

    /// Appends `value` at the tail.
    ///
    /// # Errors
    ///
    /// Propagates slot-table failures.
    pub fn add(&mut self, value: DataBox) -> CoreResult<()> {
        self.add_at(value, !0)
    }

    /// Inserts `value` at `index`: an offset from the head when
    /// non-negative, or from the tail via bitwise complement when
    /// negative (`!0` appends, `!1` inserts before the last box).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidIndex`] when the position is outside
    /// the heap.
    pub fn add_at(&mut self, value: DataBox, index: i64) -> CoreResult<()> {
        let pos = if index >= 0 {
            index as usize
        } else {
            let from_tail = !index as usize;
            self.len
                .checked_sub(from_tail)
                .ok_or(CoreError::InvalidIndex {
                    index,
                    len: self.len,
                })?
        };

        let mut at = self.head;
        for _ in 0..pos {
            let idx = at.ok_or(CoreError::InvalidIndex {
                index,
                len: self.len,
            })?;
            at = self.slot(idx)?.next;
        }
        let tag = value.type_id();
        self.link_before(at, tag, BoxState::Resident(value))
    }

    /// Removes every box whose value equals `value` structurally,
    /// resolving boxes as it scans. Returns the number removed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Cancelled`] if `cancel` fires between
    /// removals; boxes already removed stay removed.
    pub fn remove_value(
        &mut self,
        value: &DataBox,
        cancel: Option<&CancelToken>,
    ) -> CoreResult<usize> {
        let mut removed = 0;
        let mut cur = self.head;
        while let Some(idx) = cur {
            if let Some(token) = cancel {
                if token.is_cancelled() {
                    return Err(CoreError::Cancelled);
                }
            }
            self.resolve(idx)?;
            let slot = self.slot(idx)?;
            let next = slot.next;
            let matches = matches!(&slot.info.state, BoxState::Resident(v) if v == value);
            if matches {
                self.unlink(idx)?;
                removed += 1;
            }
            cur = next;
        }
        trace!(removed, "removed by value");
        Ok(removed)
    }

    /// Removes every box, one at a time.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Cancelled`] if `cancel` fires between
    /// removals; the heap keeps whatever was not yet removed.
    pub fn clear(&mut self, cancel: Option<&CancelToken>) -> CoreResult<()> {
        while let Some(idx) = self.head {
            if let Some(token) = cancel {
                if token.is_cancelled() {
                    return Err(CoreError::Cancelled);
                }
            }
            self.unlink(idx)?;
        }
        Ok(())
    }

    /// Returns every value in list order, resolving as needed.
    ///
    /// # Errors
    ///
    /// Propagates resolution failures.
    pub fn values(&mut self) -> CoreResult<Vec<DataBox>> {
        let mut out = Vec::with_capacity(self.len);
        let mut cur = self.head;
        while let Some(idx) = cur {
            self.resolve(idx)?;
            let slot = self.slot(idx)?;
            if let BoxState::Resident(v) = &slot.info.state {
                out.push(v.clone());
            }
            cur = slot.next;
        }
        Ok(out)
    }

    /// Writes every box back to the scroll and disposes it.
    ///
    /// Boxes are written tail-first so each head can carry the ordinal of
    /// the box after it; unresolved boxes get a fresh head in front of
    /// their still-stored payload, resident ones are re-encoded in full.
    /// Afterwards the cursor points at the first box, so a reopen scans
    /// the boxes in this exact order.
    ///
    /// # Errors
    ///
    /// Best-effort: the scroll is disposed even after a write failure,
    /// and the first failure is reported.
    pub fn close(mut self) -> CoreResult<()> {
        self.closed = true;
        self.flush()
    }

    fn flush(&mut self) -> CoreResult<()> {
        let mut first_err: Option<CoreError> = None;
        let mut next_ptr = self.tail_marker.clone();
        let mut cur = self.tail;
        while let Some(idx) = cur {
            match self.flush_entry(idx, &next_ptr) {
                Ok((prev, h)) => {
                    next_ptr = h;
                    cur = prev;
                }
                Err(e) => {
                    first_err = Some(e);
                    break;
                }
            }
        }
        if first_err.is_none() {
            if let Err(e) = self.scroll.set_pointer(&next_ptr) {
                first_err = Some(e);
            }
        }
        if let Err(e) = self.scroll.dispose() {
            if first_err.is_none() {
                first_err = Some(e);
            }
        }
        debug!(scroll = self.scroll.id().as_u64(), boxes = self.len, "heap closed");
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Writes one box and returns its predecessor index and the floating
    /// pointer at its head, which becomes the next ordinal of the box
    /// before it.
    fn flush_entry(
        &mut self,
        idx: usize,
        next_ptr: &Pointer,
    ) -> CoreResult<(Option<usize>, Pointer)> {
        let (prev, type_id, state) = {
            let slot = self.slot(idx)?;
            (slot.prev, slot.info.type_id, slot.info.state.clone())
        };
        let next_ordinal = next_ptr.as_ordinal()?;

        let h = match state {
            BoxState::Unresolved(payload) => {
                // Payload bytes are still in place; prepend a head.
                self.scroll.set_pointer(&payload)?;
                let h = self.scroll.get_pointer()?;
                self.write_head(next_ordinal, type_id)?;
                h
            }
            BoxState::Resident(value) => {
                self.scroll.set_pointer(next_ptr)?;
                let h = self.scroll.get_pointer()?;
                self.write_head(next_ordinal, type_id)?;
                let mut sink = VecSink::new();
                self.registry.encode(&value, &mut sink)?;
                self.scroll.insert(sink.as_slice())?;
                h
            }
        };
        Ok((prev, h))
    }

    fn write_head(&mut self, next_ordinal: SegmentNumber, type_id: BoxTypeId) -> CoreResult<()> {
        let mut head = Vec::with_capacity(HEAD_SIZE);
        head.extend_from_slice(&next_ordinal.to_le_bytes());
        head.extend_from_slice(&type_id.encode());
        self.scroll.insert(&head)?;
        Ok(())
    }

    /// Decodes an unresolved box's payload in place. One-way: the
    /// payload bytes and the floating pointer are consumed.
    fn resolve(&mut self, idx: usize) -> CoreResult<()> {
        let (type_id, ptr) = {
            let slot = self.slot(idx)?;
            match &slot.info.state {
                BoxState::Unresolved(p) => (slot.info.type_id, p.clone()),
                BoxState::Resident(_) => return Ok(()),
            }
        };

        self.scroll.set_pointer(&ptr)?;
        let (decoded, consumed) = {
            let mut source = ScrollSource {
                scroll: &mut *self.scroll,
                consumed: 0,
            };
            let decoded = self.registry.decode(type_id, &mut source);
            (decoded, source.consumed)
        };
        let value = match decoded {
            Ok(v) => v,
            Err(e) if consumed == 0 => {
                // An unknown tag fails before pulling anything; park the
                // payload behind a fresh pointer so the box survives the
                // failure and a later close can still write it back.
                let again = self.scroll.get_pointer()?;
                self.slot_mut(idx)?.info.state = BoxState::Unresolved(again);
                return Err(e.into());
            }
            Err(e) => {
                // Part of the payload is gone; the box cannot be written
                // back faithfully, so it is dropped from the heap.
                self.unlink(idx)?;
                return Err(e.into());
            }
        };
        if value.type_id() != type_id {
            return Err(CoreError::TypeMismatch {
                expected: type_id.as_u32(),
                actual: value.type_id().as_u32(),
            });
        }
        trace!(tag = type_id.as_u32(), "box resolved");
        self.slot_mut(idx)?.info.state = BoxState::Resident(value);
        Ok(())
    }

    fn take_value(&mut self, idx: usize) -> CoreResult<DataBox> {
        self.resolve(idx)?;
        let slot = self.unlink(idx)?;
        match slot.info.state {
            BoxState::Resident(v) => Ok(v),
            BoxState::Unresolved(_) => Err(CoreError::corruption("unresolved after resolve")),
        }
    }

    fn find_first(&self, type_id: BoxTypeId) -> Option<usize> {
        let mut cur = self.head;
        while let Some(idx) = cur {
            let slot = self.slots.get(idx).and_then(Option::as_ref)?;
            if slot.info.type_id == type_id {
                return Some(idx);
            }
            cur = slot.next;
        }
        None
    }

    fn slot(&self, idx: usize) -> CoreResult<&Slot> {
        self.slots
            .get(idx)
            .and_then(Option::as_ref)
            .ok_or_else(|| CoreError::corruption("heap slot table out of sync"))
    }

    fn slot_mut(&mut self, idx: usize) -> CoreResult<&mut Slot> {
        self.slots
            .get_mut(idx)
            .and_then(Option::as_mut)
            .ok_or_else(|| CoreError::corruption("heap slot table out of sync"))
    }

    fn alloc(&mut self, slot: Slot) -> usize {
        match self.free.pop() {
            Some(i) => {
                self.slots[i] = Some(slot);
                i
            }
            None => {
                self.slots.push(Some(slot));
                self.slots.len() - 1
            }
        }
    }

    /// Links a new box before `before`, or at the tail when `None`.
    fn link_before(
        &mut self,
        before: Option<usize>,
        type_id: BoxTypeId,
        state: BoxState,
    ) -> CoreResult<()> {
        let prev = match before {
            Some(b) => self.slot(b)?.prev,
            None => self.tail,
        };
        let idx = self.alloc(Slot {
            info: DataBoxInfo { type_id, state },
            prev,
            next: before,
        });
        match prev {
            Some(p) => self.slot_mut(p)?.next = Some(idx),
            None => self.head = Some(idx),
        }
        match before {
            Some(b) => self.slot_mut(b)?.prev = Some(idx),
            None => self.tail = Some(idx),
        }
        self.len += 1;
        Ok(())
    }

    fn unlink(&mut self, idx: usize) -> CoreResult<Slot> {
        let slot = self
            .slots
            .get_mut(idx)
            .and_then(Option::take)
            .ok_or_else(|| CoreError::corruption("heap slot table out of sync"))?;
        match slot.prev {
            Some(p) => self.slot_mut(p)?.next = slot.next,
            None => self.head = slot.next,
        }
        match slot.next {
            Some(n) => self.slot_mut(n)?.prev = slot.prev,
            None => self.tail = slot.prev,
        }
        self.free.push(idx);
        self.len -= 1;
        Ok(slot)
    }
}

impl Drop for BoxHeap<'_> {
    fn drop(&mut self) {
        if !self.closed {
            self.closed = true;
            let _ = self.flush();
        }
    }
}

impl std::fmt::Debug for BoxHeap<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxHeap")
            .field("len", &self.len)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scroll::ChainScroll;
    use scrolldb_storage::MemoryStore;

    fn scroll() -> ChainScroll {
        ChainScroll::open(Box::new(MemoryStore::new(64))).unwrap()
    }

    #[test]
    fn add_then_get() {
        let registry = BoxRegistry::new();
        let mut scroll = scroll();
        let mut heap = BoxHeap::open(&mut scroll, &registry).unwrap();

        heap.add(DataBox::Int32(7)).unwrap();
        heap.add(DataBox::Text("seven".into())).unwrap();
        assert_eq!(heap.len(), 2);

        let value = heap.get(BoxTypeId::TEXT).unwrap();
        assert_eq!(value, Some(DataBox::Text("seven".into())));
        assert_eq!(heap.len(), 1);
        assert_eq!(heap.get(BoxTypeId::TEXT).unwrap(), None);
    }

    #[test]
    fn add_at_orders_boxes() {
        let registry = BoxRegistry::new();
        let mut scroll = scroll();
        let mut heap = BoxHeap::open(&mut scroll, &registry).unwrap();

        heap.add(DataBox::Int32(1)).unwrap();
        heap.add(DataBox::Int32(2)).unwrap();
        heap.add_at(DataBox::Int32(0), 0).unwrap();
        // !1 addresses the position just before the last box.
        heap.add_at(DataBox::Int32(9), !1).unwrap();

        let values = heap.values().unwrap();
        assert_eq!(
            values,
            vec![
                DataBox::Int32(0),
                DataBox::Int32(1),
                DataBox::Int32(9),
                DataBox::Int32(2),
            ]
        );
    }

    #[test]
    fn add_at_rejects_out_of_range() {
        let registry = BoxRegistry::new();
        let mut scroll = scroll();
        let mut heap = BoxHeap::open(&mut scroll, &registry).unwrap();
        heap.add(DataBox::Int32(1)).unwrap();

        assert!(matches!(
            heap.add_at(DataBox::Int32(2), 5),
            Err(CoreError::InvalidIndex { index: 5, .. })
        ));
        assert!(matches!(
            heap.add_at(DataBox::Int32(2), !2),
            Err(CoreError::InvalidIndex { .. })
        ));
    }

    #[test]
    fn replace_without_match_drops_the_value() {
        let registry = BoxRegistry::new();
        let mut scroll = scroll();
        let mut heap = BoxHeap::open(&mut scroll, &registry).unwrap();
        heap.add(DataBox::Int32(1)).unwrap();

        let old = heap.replace(BoxTypeId::TEXT, DataBox::Text("gone".into())).unwrap();
        assert_eq!(old, None);
        assert_eq!(heap.len(), 1);
        assert!(!heap.contains(BoxTypeId::TEXT));
    }

    #[test]
    fn replace_returns_previous_occupant() {
        let registry = BoxRegistry::new();
        let mut scroll = scroll();
        let mut heap = BoxHeap::open(&mut scroll, &registry).unwrap();
        heap.add(DataBox::Int32(1)).unwrap();

        let old = heap.replace(BoxTypeId::INT32, DataBox::Int32(2)).unwrap();
        assert_eq!(old, Some(DataBox::Int32(1)));
        assert_eq!(heap.values().unwrap(), vec![DataBox::Int32(2)]);
    }

    #[test]
    fn set_without_match_is_a_no_op() {
        let registry = BoxRegistry::new();
        let mut scroll = scroll();
        let mut heap = BoxHeap::open(&mut scroll, &registry).unwrap();
        heap.add(DataBox::Int32(1)).unwrap();

        heap.set(BoxTypeId::TEXT, DataBox::Text("lost".into())).unwrap();
        assert_eq!(heap.len(), 1);
    }

    #[test]
    fn set_inserts_before_the_match() {
        let registry = BoxRegistry::new();
        let mut scroll = scroll();
        let mut heap = BoxHeap::open(&mut scroll, &registry).unwrap();
        heap.add(DataBox::Int32(1)).unwrap();
        heap.add(DataBox::Text("t".into())).unwrap();

        heap.set(BoxTypeId::TEXT, DataBox::Int64(5)).unwrap();
        assert_eq!(
            heap.values().unwrap(),
            vec![
                DataBox::Int32(1),
                DataBox::Int64(5),
                DataBox::Text("t".into()),
            ]
        );
    }

    #[test]
    fn remove_value_removes_every_match() {
        let registry = BoxRegistry::new();
        let mut scroll = scroll();
        let mut heap = BoxHeap::open(&mut scroll, &registry).unwrap();
        heap.add(DataBox::Int32(1)).unwrap();
        heap.add(DataBox::Int32(2)).unwrap();
        heap.add(DataBox::Int32(1)).unwrap();

        let removed = heap.remove_value(&DataBox::Int32(1), None).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(heap.values().unwrap(), vec![DataBox::Int32(2)]);
    }

    #[test]
    fn clear_honors_cancellation() {
        let registry = BoxRegistry::new();
        let mut scroll = scroll();
        let mut heap = BoxHeap::open(&mut scroll, &registry).unwrap();
        heap.add(DataBox::Int32(1)).unwrap();
        heap.add(DataBox::Int32(2)).unwrap();

        let token = CancelToken::new();
        token.cancel();
        assert!(matches!(heap.clear(Some(&token)), Err(CoreError::Cancelled)));
        assert_eq!(heap.len(), 2);

        heap.clear(None).unwrap();
        assert!(heap.is_empty());
    }

    #[test]
    fn failed_decode_after_consumption_drops_the_box() {
        let registry = BoxRegistry::new();
        let mut scroll = scroll();

        // Build the wire image by hand, tail-first the way close does:
        // a text box whose payload bytes are not UTF-8, then a valid
        // int box, then the empty tail.
        let tail = scroll.get_pointer().unwrap();
        let t_ord = tail.as_ordinal().unwrap();

        scroll.set_pointer(&tail).unwrap();
        let h2 = scroll.get_pointer().unwrap();
        let h2_ord = h2.as_ordinal().unwrap();
        let mut head2 = t_ord.to_le_bytes().to_vec();
        head2.extend_from_slice(&BoxTypeId::INT32.encode());
        scroll.insert(&head2).unwrap();
        scroll.insert(&7i32.to_le_bytes()).unwrap();

        scroll.set_pointer(&h2).unwrap();
        let h1 = scroll.get_pointer().unwrap();
        let mut head1 = h2_ord.to_le_bytes().to_vec();
        head1.extend_from_slice(&BoxTypeId::TEXT.encode());
        scroll.insert(&head1).unwrap();
        scroll.insert(&2u32.to_le_bytes()).unwrap();
        scroll.insert(&[0xFF, 0xFE]).unwrap();

        scroll.set_pointer(&h1).unwrap();
        let mut heap = BoxHeap::open(&mut scroll, &registry).unwrap();
        assert_eq!(heap.len(), 2);

        // The decoder consumes the length prefix and the bad bytes
        // before failing, so the box is unrecoverable and dropped.
        let result = heap.get(BoxTypeId::TEXT);
        assert!(matches!(
            result,
            Err(CoreError::Codec(CodecError::InvalidUtf8))
        ));
        assert_eq!(heap.len(), 1);

        // The neighboring box is untouched.
        assert_eq!(heap.get(BoxTypeId::INT32).unwrap(), Some(DataBox::Int32(7)));
        heap.close().unwrap();
    }

    #[test]
    fn contains_checks_the_stored_tag() {
        let registry = BoxRegistry::new();
        let mut scroll = scroll();
        let mut heap = BoxHeap::open(&mut scroll, &registry).unwrap();
        heap.add(DataBox::Blob(vec![1, 2])).unwrap();

        assert!(heap.contains(BoxTypeId::BLOB));
        assert!(!heap.contains(BoxTypeId::INT64));
    }
}
