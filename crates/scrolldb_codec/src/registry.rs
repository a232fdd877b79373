//! The tag-to-decoder registry.

use crate::error::{CodecError, CodecResult};
use crate::source::{PayloadSink, PayloadSource};
use crate::value::{self, BoxTypeId, DataBox};
use std::collections::HashMap;

type DecodeFn = fn(&mut dyn PayloadSource) -> CodecResult<DataBox>;

/// Maps type tags to payload decoders.
///
/// The registry comes pre-seeded with the closed [`DataBox`] kinds.
/// Extension tags are admitted with [`register`]; their payloads are
/// length-prefixed and carried opaquely as [`DataBox::Extension`].
///
/// Decoding an unregistered tag fails with [`CodecError::UnknownType`] -
/// an unknown tag in stored data means the reader is missing a plugin or
/// the data is corrupt, and neither is recoverable here.
///
/// [`register`]: BoxRegistry::register
#[derive(Debug, Clone)]
pub struct BoxRegistry {
    decoders: HashMap<BoxTypeId, DecodeFn>,
}

impl Default for BoxRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BoxRegistry {
    /// Creates a registry holding the built-in kinds.
    #[must_use]
    pub fn new() -> Self {
        let mut decoders: HashMap<BoxTypeId, DecodeFn> = HashMap::new();
        decoders.insert(BoxTypeId::INT32, value::decode_int32);
        decoders.insert(BoxTypeId::INT64, value::decode_int64);
        decoders.insert(BoxTypeId::TEXT, value::decode_text);
        decoders.insert(BoxTypeId::BLOB, value::decode_blob);
        Self { decoders }
    }

    /// Admits an extension tag whose payloads decode to
    /// [`DataBox::Extension`].
    ///
    /// Extension payloads share the length-prefixed blob wire form; fn
    /// pointers cannot close over the tag, so [`decode`] rewraps the
    /// result under the caller's tag.
    ///
    /// [`decode`]: BoxRegistry::decode
    pub fn register(&mut self, type_id: BoxTypeId) {
        self.decoders.insert(type_id, value::decode_blob);
    }

    /// Returns whether a decoder exists for the tag.
    #[must_use]
    pub fn knows(&self, type_id: BoxTypeId) -> bool {
        self.decoders.contains_key(&type_id)
    }

    /// Decodes one payload of the given tag from `source`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnknownType`] for an unregistered tag, or
    /// whatever the decoder reports.
    pub fn decode(
        &self,
        type_id: BoxTypeId,
        source: &mut dyn PayloadSource,
    ) -> CodecResult<DataBox> {
        let decode = self
            .decoders
            .get(&type_id)
            .ok_or(CodecError::UnknownType {
                type_id: type_id.as_u32(),
            })?;
        let decoded = decode(source)?;

        // Extension tags share the blob decoder; rewrap under their own
        // tag so equality and re-encoding are faithful.
        match decoded {
            DataBox::Blob(bytes) if type_id != BoxTypeId::BLOB => Ok(DataBox::Extension {
                type_id,
                bytes,
            }),
            other => Ok(other),
        }
    }

    /// Encodes a value's payload (tag not included) into `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::UnknownType`] if the value carries an
    /// unregistered extension tag, or propagates sink failures.
    pub fn encode(&self, value: &DataBox, sink: &mut dyn PayloadSink) -> CodecResult<()> {
        if !self.knows(value.type_id()) {
            return Err(CodecError::UnknownType {
                type_id: value.type_id().as_u32(),
            });
        }
        value.encode_payload(sink)
    }
}
