//! The duplicating scroll.

use crate::error::{CoreError, CoreResult};
use crate::pointer::{Pointer, PointerRepr, ScrollId};
use crate::scroll::Scroll;
use scrolldb_storage::SegmentNumber;
use tracing::debug;

/// A scroll that mirrors every operation onto a set of children.
///
/// Inserted bytes land in every child; removed bytes come from the first
/// child, with the others consuming in lockstep. Pointers are composite:
/// one sub-pointer per child, in child order.
pub struct TeeScroll {
    id: ScrollId,
    children: Vec<Box<dyn Scroll>>,
}

impl TeeScroll {
    /// Wraps `children` into a duplicating scroll.
    ///
    /// An empty child set is allowed but degenerate: inserts vanish and
    /// removes always come back empty.
    #[must_use]
    pub fn new(children: Vec<Box<dyn Scroll>>) -> Self {
        let id = ScrollId::next();
        debug!(scroll = id.as_u64(), children = children.len(), "tee scroll opened");
        Self { id, children }
    }

    /// Returns the number of children.
    #[must_use]
    pub fn fan_out(&self) -> usize {
        self.children.len()
    }

    fn parts<'p>(&self, ptr: &'p Pointer) -> CoreResult<&'p [Pointer]> {
        if ptr.scroll() != self.id {
            return Err(CoreError::ForeignPointer);
        }
        match ptr.repr() {
            PointerRepr::Composite(parts) if parts.len() == self.children.len() => Ok(parts),
            _ => Err(CoreError::ForeignPointer),
        }
    }
}

impl Scroll for TeeScroll {
    fn id(&self) -> ScrollId {
        self.id
    }

    fn get_pointer(&mut self) -> CoreResult<Pointer> {
        let mut parts = Vec::with_capacity(self.children.len());
        for child in &mut self.children {
            parts.push(child.get_pointer()?);
        }
        Ok(Pointer::composite(self.id, parts))
    }

    fn set_pointer(&mut self, ptr: &Pointer) -> CoreResult<()> {
        let parts = self.parts(ptr)?.to_vec();
        for (child, part) in self.children.iter_mut().zip(&parts) {
            child.set_pointer(part)?;
        }
        Ok(())
    }

    fn is_at(&mut self, ptr: &Pointer) -> CoreResult<bool> {
        let parts = self.parts(ptr)?.to_vec();
        // The children move in lockstep, so the first child answers for
        // all of them; the rest still walk so their empty segments retire.
        let mut reached = true;
        for (child, part) in self.children.iter_mut().zip(&parts) {
            if !child.is_at(part)? {
                reached = false;
            }
        }
        Ok(reached)
    }

    fn materialize(&mut self, _ordinal: SegmentNumber) -> CoreResult<Pointer> {
        // A single ordinal cannot name one position in several children.
        Err(CoreError::ForeignPointer)
    }

    fn insert(&mut self, bytes: &[u8]) -> CoreResult<()> {
        for child in &mut self.children {
            child.insert(bytes)?;
        }
        Ok(())
    }

    fn remove(&mut self, len: usize) -> CoreResult<Vec<u8>> {
        let mut out = Vec::new();
        for (i, child) in self.children.iter_mut().enumerate() {
            let bytes = child.remove(len)?;
            if i == 0 {
                out = bytes;
            } else if bytes.len() != out.len() {
                return Err(CoreError::corruption(format!(
                    "tee children diverged: {} vs {} bytes",
                    out.len(),
                    bytes.len()
                )));
            }
        }
        Ok(out)
    }

    fn dispose(&mut self) -> CoreResult<()> {
        let mut first_err: Option<CoreError> = None;
        for child in &mut self.children {
            if let Err(e) = child.dispose() {
                if first_err.is_none() {
                    first_err = Some(e);
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for TeeScroll {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TeeScroll")
            .field("id", &self.id)
            .field("children", &self.children.len())
            .finish_non_exhaustive()
    }
}
