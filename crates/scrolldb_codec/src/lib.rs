//! # ScrollDB Codec
//!
//! Box type tags, payload codecs, and the decoder registry.
//!
//! A *box* is a self-describing record: a fixed-width type tag plus a
//! payload in the type's own encoding. This crate defines the closed
//! [`DataBox`] variant set, the streaming [`PayloadSource`] /
//! [`PayloadSink`] traits a codec moves bytes through, and the
//! [`BoxRegistry`] that maps tags to decoders - including extension tags
//! whose payloads the registry carries opaquely.
//!
//! Every encoding is self-delimiting: a decoder reads exactly its own
//! payload and never looks past it. That is what lets a store skip a box
//! it does not care about.
//!
//! ## Example
//!
//! ```rust
//! use scrolldb_codec::{BoxRegistry, DataBox, SliceSource, VecSink};
//!
//! let registry = BoxRegistry::new();
//! let value = DataBox::Text("hello".into());
//!
//! let mut sink = VecSink::new();
//! registry.encode(&value, &mut sink).unwrap();
//!
//! let mut source = SliceSource::new(sink.as_slice());
//! let back = registry.decode(value.type_id(), &mut source).unwrap();
//! assert_eq!(back, value);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod registry;
mod source;
mod value;

pub use error::{CodecError, CodecResult};
pub use registry::BoxRegistry;
pub use source::{PayloadSink, PayloadSource, SliceSource, VecSink};
pub use value::{BoxTypeId, DataBox, TYPE_ID_SIZE};
