//! The ordered-index scroll.
//!
//! Sectors are ordered by a signed 64-bit key held in a `BTreeMap`
//! instead of chained through successor links. Pointers carry a stable
//! sector id, never the key itself, so the rebalancing pass can rewrite
//! every key without invalidating a single pointer.

use crate::error::{CoreError, CoreResult};
use crate::pointer::{Pointer, ScrollId};
use crate::scroll::Scroll;
use scrolldb_storage::{Segment, SegmentMode, SegmentNumber, SegmentStore};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::ops::Bound::{Excluded, Unbounded};
use tracing::{debug, trace};

/// A scroll over sectors in a totally ordered key space.
pub struct SkipScroll {
    id: ScrollId,
    store: Box<dyn SegmentStore>,
    sectors: HashMap<SegmentNumber, Box<dyn Segment>>,
    by_key: BTreeMap<i64, SegmentNumber>,
    key_of: HashMap<SegmentNumber, i64>,
    /// Sector id of the write side of the cursor, if any sector is
    /// before the boundary.
    write: Option<SegmentNumber>,
    /// Sector id of the read side, if any sector is after the boundary.
    read: Option<SegmentNumber>,
    floating: HashSet<SegmentNumber>,
    next_alloc: SegmentNumber,
    disposed: bool,
}

impl SkipScroll {
    /// Opens an ordered scroll over a fresh `store`.
    ///
    /// The key table lives in memory for the scroll's lifetime: an
    /// ordered scroll never resumes from previously used storage and
    /// writes no resume entry on dispose, so `store` must not hold
    /// sectors from an earlier instance.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial sector cannot be created.
    pub fn open(mut store: Box<dyn SegmentStore>) -> CoreResult<Self> {
        let id = ScrollId::next();

        let first: SegmentNumber = 1;
        let mut seg = store.create(first)?;
        seg.set_next_number(0)?;
        seg.set_mode(SegmentMode::Write)?;

        let mut sectors = HashMap::new();
        sectors.insert(first, seg);

        let mut by_key = BTreeMap::new();
        by_key.insert(0i64, first);
        let mut key_of = HashMap::new();
        key_of.insert(first, 0i64);

        debug!(scroll = id.as_u64(), "ordered scroll opened");
        Ok(Self {
            id,
            store,
            sectors,
            by_key,
            key_of,
            write: Some(first),
            read: None,
            floating: HashSet::new(),
            next_alloc: first + 1,
            disposed: false,
        })
    }

    /// Returns the number of live sectors.
    #[must_use]
    pub fn sector_count(&self) -> usize {
        self.sectors.len()
    }

    /// Returns the current keys in ascending order. For inspection.
    #[must_use]
    pub fn keys(&self) -> Vec<i64> {
        self.by_key.keys().copied().collect()
    }

    fn seg(&mut self, id: SegmentNumber) -> CoreResult<&mut Box<dyn Segment>> {
        self.sectors
            .get_mut(&id)
            .ok_or_else(|| CoreError::corruption(format!("sector {id:016x} vanished")))
    }

    fn key(&self, id: SegmentNumber) -> CoreResult<i64> {
        self.key_of
            .get(&id)
            .copied()
            .ok_or_else(|| CoreError::corruption(format!("sector {id:016x} has no key")))
    }

    fn successor(&self, key: i64) -> Option<SegmentNumber> {
        self.by_key
            .range((Excluded(key), Unbounded))
            .next()
            .map(|(_, &id)| id)
    }

    fn predecessor(&self, key: i64) -> Option<SegmentNumber> {
        self.by_key
            .range((Unbounded, Excluded(key)))
            .next_back()
            .map(|(_, &id)| id)
    }

    /// Re-spaces every sector key evenly across the full key range so
    /// the next midpoint insertion cannot collide.
    ///
    /// Post-condition: keys strictly increasing with adjacent gaps >= 2.
    fn rearrange(&mut self) -> CoreResult<()> {
        let n = self.by_key.len() as i128;
        let span = i64::MAX as i128 - i64::MIN as i128;
        let spacing = span / (n + 1);

        let ordered: Vec<SegmentNumber> = self.by_key.values().copied().collect();
        self.by_key.clear();
        self.key_of.clear();

        for (i, id) in ordered.iter().enumerate() {
            let key = (i64::MIN as i128 + spacing * (i as i128 + 1)) as i64;
            self.by_key.insert(key, *id);
            self.key_of.insert(*id, key);
            // Keys travel with the sector header so a listing-capable
            // store could rebuild the order.
            self.seg(*id)?.set_next_number(key as u64)?;
        }

        debug!(scroll = self.id.as_u64(), sectors = ordered.len(), "rearranged");
        Ok(())
    }

    /// Creates a sector between the cursor's neighbors, rearranging
    /// first when no integer key fits between them.
    fn split(&mut self) -> CoreResult<SegmentNumber> {
        let key = match self.midpoint()? {
            Some(key) => key,
            None => {
                self.rearrange()?;
                self.midpoint()?.ok_or_else(|| {
                    CoreError::corruption("no key gap even after rearrange")
                })?
            }
        };

        let id = self.next_alloc;
        self.next_alloc += 1;

        let mut seg = self.store.create(id)?;
        seg.set_next_number(key as u64)?;
        seg.set_mode(SegmentMode::Write)?;
        self.sectors.insert(id, seg);
        self.by_key.insert(key, id);
        self.key_of.insert(id, key);

        if let Some(w) = self.write {
            self.seg(w)?.set_mode(SegmentMode::Idle)?;
        }
        self.write = Some(id);
        trace!(scroll = self.id.as_u64(), id, key, "sector materialized");
        Ok(id)
    }

    /// Finds a free key strictly between the cursor's neighbor keys.
    fn midpoint(&self) -> CoreResult<Option<i64>> {
        let lo = match self.write {
            Some(id) => self.key(id)? as i128,
            None => i64::MIN as i128,
        };
        let hi = match self.read {
            Some(id) => self.key(id)? as i128,
            None => i64::MAX as i128,
        };
        if hi - lo < 2 {
            return Ok(None);
        }
        // Ceiling of the arithmetic mean.
        Ok(Some(((lo + hi + 1).div_euclid(2)) as i64))
    }

    /// Retires the read sector and advances to its key successor.
    fn retire_read(&mut self) -> CoreResult<()> {
        let Some(r) = self.read else {
            return Ok(());
        };
        let key = self.key(r)?;
        let next = self.successor(key);

        self.by_key.remove(&key);
        self.key_of.remove(&r);
        self.sectors.remove(&r);
        self.floating.remove(&r);
        self.store.remove(r)?;

        self.read = next;
        if let Some(n) = self.read {
            self.seg(n)?.set_mode(SegmentMode::Read)?;
        }
        trace!(scroll = self.id.as_u64(), id = r, "sector retired");
        Ok(())
    }

    fn check_ordinal(&self, ptr: &Pointer) -> CoreResult<SegmentNumber> {
        if ptr.scroll() != self.id {
            return Err(CoreError::ForeignPointer);
        }
        ptr.as_ordinal()
    }
}

impl Scroll for SkipScroll {
    fn id(&self) -> ScrollId {
        self.id
    }

    fn get_pointer(&mut self) -> CoreResult<Pointer> {
        let id = self.split()?;
        self.floating.insert(id);
        Ok(Pointer::ordinal(self.id, id))
    }

    fn set_pointer(&mut self, ptr: &Pointer) -> CoreResult<()> {
        let id = self.check_ordinal(ptr)?;
        if !self.floating.remove(&id) {
            return Err(CoreError::StalePointer { number: id });
        }

        let key = self.key(id)?;
        let before = self.predecessor(key);

        if let Some(w) = self.write {
            self.seg(w)?.set_mode(SegmentMode::Idle)?;
        }
        if let Some(r) = self.read {
            self.seg(r)?.set_mode(SegmentMode::Idle)?;
        }

        if let Some(w) = before {
            self.seg(w)?.set_mode(SegmentMode::Write)?;
        }
        self.seg(id)?.set_mode(SegmentMode::Read)?;
        self.write = before;
        self.read = Some(id);
        Ok(())
    }

    fn is_at(&mut self, ptr: &Pointer) -> CoreResult<bool> {
        let id = self.check_ordinal(ptr)?;
        if !self.floating.contains(&id) {
            return Err(CoreError::StalePointer { number: id });
        }

        loop {
            let Some(r) = self.read else {
                return Ok(false);
            };
            if r == id {
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
        if !self.key_of.contains_key(&ordinal) {
            return Err(CoreError::StalePointer { number: ordinal });
        }
        self.floating.insert(ordinal);
        Ok(Pointer::ordinal(self.id, ordinal))
    }

    fn insert(&mut self, bytes: &[u8]) -> CoreResult<()> {
        let mut rest = bytes;
        while !rest.is_empty() {
            let w = match self.write {
                Some(w) => w,
                None => self.split()?,
            };
            let n = self.seg(w)?.write(rest)?;
            rest = &rest[n..];
            if !rest.is_empty() {
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
                let key = self.key(r)?;
                let at_end = self.successor(key).is_none();
                self.retire_read()?;
                if at_end {
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
        for (_, seg) in self.sectors.iter_mut() {
            if let Err(e) = seg.set_mode(SegmentMode::Closed) {
                if first_err.is_none() {
                    first_err = Some(e.into());
                }
            }
        }
        self.sectors.clear();
        self.floating.clear();

        debug!(scroll = self.id.as_u64(), "ordered scroll disposed");
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for SkipScroll {
    fn drop(&mut self) {
        let _ = self.dispose();
    }
}

impl std::fmt::Debug for SkipScroll {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SkipScroll")
            .field("id", &self.id)
            .field("sectors", &self.sectors.len())
            .field("floating", &self.floating.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scrolldb_storage::MemoryStore;

    fn scroll_with_capacity(capacity: usize) -> SkipScroll {
        SkipScroll::open(Box::new(MemoryStore::new(capacity))).unwrap()
    }

    #[test]
    fn insert_then_remove_roundtrip() {
        let mut scroll = scroll_with_capacity(64);
        let ptr = scroll.get_pointer().unwrap();
        scroll.insert(b"ordered bytes").unwrap();

        scroll.set_pointer(&ptr).unwrap();
        assert_eq!(scroll.remove(13).unwrap(), b"ordered bytes");
    }

    #[test]
    fn splits_at_capacity() {
        let mut scroll = scroll_with_capacity(8);
        assert_eq!(scroll.sector_count(), 1);
        scroll.insert(&[7u8; 20]).unwrap();
        assert_eq!(scroll.sector_count(), 20usize.div_ceil(8));
    }

    #[test]
    fn keys_stay_strictly_increasing() {
        let mut scroll = scroll_with_capacity(8);
        for _ in 0..12 {
            scroll.get_pointer().unwrap();
        }
        let keys = scroll.keys();
        for pair in keys.windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }

    #[test]
    fn rearrange_respaces_evenly() {
        let mut scroll = scroll_with_capacity(8);
        for _ in 0..5 {
            scroll.get_pointer().unwrap();
        }

        scroll.rearrange().unwrap();
        let keys = scroll.keys();
        for pair in keys.windows(2) {
            assert!(pair[1] - pair[0] >= 2, "gap below 2 after rearrange");
        }

        // Materialization after a rearrange still finds room.
        scroll.get_pointer().unwrap();
        let keys = scroll.keys();
        let unique: std::collections::HashSet<i64> = keys.iter().copied().collect();
        assert_eq!(unique.len(), keys.len());
    }

    #[test]
    fn pointers_survive_rearrange() {
        let mut scroll = scroll_with_capacity(64);
        let ptr = scroll.get_pointer().unwrap();
        scroll.insert(b"stable").unwrap();

        scroll.rearrange().unwrap();

        scroll.set_pointer(&ptr).unwrap();
        assert_eq!(scroll.remove(6).unwrap(), b"stable");
    }

    #[test]
    fn foreign_and_stale_pointers_rejected() {
        let mut a = scroll_with_capacity(16);
        let mut b = scroll_with_capacity(16);

        let ptr = a.get_pointer().unwrap();
        assert!(matches!(b.set_pointer(&ptr), Err(CoreError::ForeignPointer)));

        a.set_pointer(&ptr).unwrap();
        assert!(matches!(
            a.set_pointer(&ptr),
            Err(CoreError::StalePointer { .. })
        ));
    }

    #[test]
    fn dispose_writes_no_resume_entry() {
        use scrolldb_storage::{DirStore, SegmentStore};
        use tempfile::tempdir;

        let temp = tempdir().unwrap();
        let path = temp.path().join("ordered");

        {
            let store = DirStore::open(&path, 32).unwrap();
            let mut scroll = SkipScroll::open(Box::new(store)).unwrap();
            let ptr = scroll.get_pointer().unwrap();
            scroll.insert(b"ephemeral").unwrap();
            scroll.set_pointer(&ptr).unwrap();
            scroll.dispose().unwrap();
        }

        let store = DirStore::open(&path, 32).unwrap();
        assert_eq!(store.entry_number().unwrap(), None);
    }

    #[test]
    fn is_at_walks_empty_sectors() {
        let mut scroll = scroll_with_capacity(16);
        let first = scroll.get_pointer().unwrap();
        let second = scroll.get_pointer().unwrap();

        scroll.set_pointer(&first).unwrap();
        assert!(scroll.is_at(&second).unwrap());
    }
}
