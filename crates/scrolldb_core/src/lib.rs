//! Scrolls and the box heap.
//!
//! A *scroll* is a segmented byte stream with a movable cursor: bytes go
//! in at the cursor's write side and come out at its read side, and any
//! position can be captured as a floating [`Pointer`] and returned to
//! later. [`ChainScroll`] orders segments by successor links,
//! [`SkipScroll`] by a rebalancing key space, and [`TeeScroll`] mirrors
//! one cursor across several scrolls.
//!
//! [`BoxHeap`] layers an ordered list of type-tagged records over a
//! scroll. Records load lazily: opening a heap reads a fixed-size head
//! per record and leaves each payload parked behind a pointer until the
//! value is actually needed.
//!
//! # Example
//!
//! ```
//! use scrolldb_codec::{BoxRegistry, BoxTypeId, DataBox};
//! use scrolldb_core::{BoxHeap, ChainScroll};
//! use scrolldb_storage::MemoryStore;
//!
//! # fn main() -> scrolldb_core::CoreResult<()> {
//! let registry = BoxRegistry::new();
//! let mut scroll = ChainScroll::open(Box::new(MemoryStore::new(4096)))?;
//! let mut heap = BoxHeap::open(&mut scroll, &registry)?;
//!
//! heap.add(DataBox::Text("hello".into()))?;
//! assert_eq!(heap.get(BoxTypeId::TEXT)?, Some(DataBox::Text("hello".into())));
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cancel;
mod error;
mod heap;
mod pointer;
mod scroll;

pub use cancel::CancelToken;
pub use error::{CoreError, CoreResult};
pub use heap::{BoxHeap, HEAD_SIZE};
pub use pointer::{Pointer, PointerRepr, ScrollId, POINTER_SIZE};
pub use scroll::{ChainScroll, Scroll, SkipScroll, TeeScroll};
