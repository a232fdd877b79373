//! # ScrollDB Storage
//!
//! Segment contract and storage backends for ScrollDB.
//!
//! A scroll is a chain of fixed-capacity **segments**. This crate defines
//! the segment contract and the concrete backends; it knows nothing about
//! pointers, box records, or any higher-level layout. Segments are
//! consumable byte queues: `write` appends at the end, `read` consumes
//! from a persisted start offset, and a 16-byte header (successor number,
//! start offset) lets a freshly opened backend resume without external
//! bookkeeping.
//!
//! ## Available backends
//!
//! - [`MemoryStore`] / [`MemorySegment`] - ring-buffer segments for tests
//!   and ephemeral scrolls
//! - [`FileSegment`] - one file per segment, handle tied to the mode
//! - [`DirStore`] - a directory of file segments with LOCK and ENTRY files
//!
//! ## Example
//!
//! ```rust
//! use scrolldb_storage::{MemoryStore, SegmentStore};
//!
//! let mut store = MemoryStore::new(64);
//! let mut seg = store.create(1).unwrap();
//! assert_eq!(seg.write(b"hello").unwrap(), 5);
//! let mut buf = [0u8; 5];
//! assert_eq!(seg.read(&mut buf).unwrap(), 5);
//! assert_eq!(&buf, b"hello");
//! assert!(seg.is_empty());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod dir;
mod error;
mod file;
mod memory;
mod mode;
mod segment;

pub use dir::{DirStore, DEFAULT_EXTENSION};
pub use error::{StorageError, StorageResult};
pub use file::FileSegment;
pub use memory::{MemorySegment, MemoryStore};
pub use mode::{transition, ModeAction, SegmentMode};
pub use segment::{Segment, SegmentHeader, SegmentNumber, SegmentStore, HEADER_SIZE, TERMINAL};
