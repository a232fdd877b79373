//! Scroll-scoped position pointers.

use crate::error::{CoreError, CoreResult};
use scrolldb_storage::SegmentNumber;
use std::sync::atomic::{AtomicU64, Ordering};

/// Size of an ordinal pointer on the wire.
pub const POINTER_SIZE: usize = 8;

static NEXT_SCROLL_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a scroll instance.
///
/// Every scroll gets a process-unique id at construction; a pointer
/// carries the id of the scroll that issued it, which is how cross-scroll
/// misuse is caught instead of silently corrupting data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScrollId(u64);

impl ScrollId {
    /// Allocates a fresh, process-unique id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_SCROLL_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw id value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

/// The pointer's scroll-specific encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerRepr {
    /// A simple ordinal: the marker segment's number.
    Ordinal(SegmentNumber),
    /// One sub-pointer per child of a duplicating scroll.
    Composite(Vec<Pointer>),
}

/// An opaque handle to a position inside one scroll instance.
///
/// Valid only for the scroll that produced it, and only while floating
/// (materialized but not yet consumed by `set_pointer`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pointer {
    scroll: ScrollId,
    repr: PointerRepr,
}

impl Pointer {
    /// Creates an ordinal pointer. Intended for scroll implementations.
    #[must_use]
    pub fn ordinal(scroll: ScrollId, number: SegmentNumber) -> Self {
        Self {
            scroll,
            repr: PointerRepr::Ordinal(number),
        }
    }

    /// Creates a composite pointer from per-child sub-pointers.
    #[must_use]
    pub fn composite(scroll: ScrollId, parts: Vec<Pointer>) -> Self {
        Self {
            scroll,
            repr: PointerRepr::Composite(parts),
        }
    }

    /// Returns the issuing scroll's id.
    #[must_use]
    pub fn scroll(&self) -> ScrollId {
        self.scroll
    }

    /// Returns the pointer's encoding.
    #[must_use]
    pub fn repr(&self) -> &PointerRepr {
        &self.repr
    }

    /// Returns the ordinal for a simple pointer.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ForeignPointer`] for a composite pointer,
    /// which has no single ordinal.
    pub fn as_ordinal(&self) -> CoreResult<SegmentNumber> {
        match &self.repr {
            PointerRepr::Ordinal(n) => Ok(*n),
            PointerRepr::Composite(_) => Err(CoreError::ForeignPointer),
        }
    }

    /// Encodes an ordinal pointer to its 8-byte wire form.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::ForeignPointer`] for a composite pointer.
    pub fn encode(&self) -> CoreResult<[u8; POINTER_SIZE]> {
        Ok(self.as_ordinal()?.to_le_bytes())
    }

    /// Decodes an ordinal from its wire form.
    ///
    /// The result is a raw number; it only becomes a usable pointer via
    /// the owning scroll's `materialize`.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Corruption`] if `data` is too short.
    pub fn decode_ordinal(data: &[u8]) -> CoreResult<SegmentNumber> {
        let raw: [u8; POINTER_SIZE] = data
            .get(..POINTER_SIZE)
            .and_then(|s| s.try_into().ok())
            .ok_or_else(|| CoreError::corruption("pointer field too short"))?;
        Ok(u64::from_le_bytes(raw))
    }
}
