//! The closed box variant set and its encodings.

use crate::error::{CodecError, CodecResult};
use crate::source::{PayloadSink, PayloadSource};

/// Size of a type tag on the wire.
pub const TYPE_ID_SIZE: usize = 4;

/// Fixed-width type tag identifying a box's payload encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoxTypeId(u32);

impl BoxTypeId {
    /// Tag of [`DataBox::Int32`].
    pub const INT32: Self = Self(1);
    /// Tag of [`DataBox::Int64`].
    pub const INT64: Self = Self(2);
    /// Tag of [`DataBox::Text`].
    pub const TEXT: Self = Self(3);
    /// Tag of [`DataBox::Blob`].
    pub const BLOB: Self = Self(4);

    /// Creates a tag from its raw value.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw tag value.
    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }

    /// Encodes the tag to its 4-byte wire form.
    #[must_use]
    pub fn encode(self) -> [u8; TYPE_ID_SIZE] {
        self.0.to_le_bytes()
    }

    /// Decodes a tag from its wire form.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::TruncatedPayload`] if `data` is too short.
    pub fn decode(data: &[u8]) -> CodecResult<Self> {
        let raw: [u8; TYPE_ID_SIZE] =
            data.get(..TYPE_ID_SIZE)
                .and_then(|s| s.try_into().ok())
                .ok_or(CodecError::TruncatedPayload {
                    needed: TYPE_ID_SIZE,
                    got: data.len(),
                })?;
        Ok(Self(u32::from_le_bytes(raw)))
    }
}

/// A decoded box value.
///
/// The closed variants cover the built-in payload kinds; `Extension`
/// carries any registered tag's payload opaquely. Structural equality
/// (`PartialEq`) is what the heap's remove-by-value compares with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataBox {
    /// A 32-bit integer, 4-byte little-endian payload.
    Int32(i32),
    /// A 64-bit integer, 8-byte little-endian payload.
    Int64(i64),
    /// UTF-8 text, u32 little-endian length prefix.
    Text(String),
    /// Raw bytes, u32 little-endian length prefix.
    Blob(Vec<u8>),
    /// A payload for a registered extension tag, kept opaque.
    Extension {
        /// The extension's tag.
        type_id: BoxTypeId,
        /// The raw payload, without its length prefix.
        bytes: Vec<u8>,
    },
}

impl DataBox {
    /// Returns the value's type tag.
    #[must_use]
    pub fn type_id(&self) -> BoxTypeId {
        match self {
            Self::Int32(_) => BoxTypeId::INT32,
            Self::Int64(_) => BoxTypeId::INT64,
            Self::Text(_) => BoxTypeId::TEXT,
            Self::Blob(_) => BoxTypeId::BLOB,
            Self::Extension { type_id, .. } => *type_id,
        }
    }

    /// Encodes the payload (tag not included) into `sink`.
    ///
    /// # Errors
    ///
    /// Propagates sink failures.
    pub fn encode_payload(&self, sink: &mut dyn PayloadSink) -> CodecResult<()> {
        match self {
            Self::Int32(v) => sink.push(&v.to_le_bytes()),
            Self::Int64(v) => sink.push(&v.to_le_bytes()),
            Self::Text(s) => {
                sink.push(&(s.len() as u32).to_le_bytes())?;
                sink.push(s.as_bytes())
            }
            Self::Blob(b) => {
                sink.push(&(b.len() as u32).to_le_bytes())?;
                sink.push(b)
            }
            Self::Extension { bytes, .. } => {
                sink.push(&(bytes.len() as u32).to_le_bytes())?;
                sink.push(bytes)
            }
        }
    }

    /// Returns the encoded payload size in bytes.
    #[must_use]
    pub fn payload_size(&self) -> usize {
        match self {
            Self::Int32(_) => 4,
            Self::Int64(_) => 8,
            Self::Text(s) => 4 + s.len(),
            Self::Blob(b) => 4 + b.len(),
            Self::Extension { bytes, .. } => 4 + bytes.len(),
        }
    }
}

pub(crate) fn pull_u32(source: &mut dyn PayloadSource) -> CodecResult<u32> {
    let raw = source.pull(4)?;
    Ok(u32::from_le_bytes(
        raw.as_slice()
            .try_into()
            .map_err(|_| CodecError::Source("short pull".into()))?,
    ))
}

pub(crate) fn decode_int32(source: &mut dyn PayloadSource) -> CodecResult<DataBox> {
    let raw = source.pull(4)?;
    let raw: [u8; 4] = raw
        .as_slice()
        .try_into()
        .map_err(|_| CodecError::Source("short pull".into()))?;
    Ok(DataBox::Int32(i32::from_le_bytes(raw)))
}

pub(crate) fn decode_int64(source: &mut dyn PayloadSource) -> CodecResult<DataBox> {
    let raw = source.pull(8)?;
    let raw: [u8; 8] = raw
        .as_slice()
        .try_into()
        .map_err(|_| CodecError::Source("short pull".into()))?;
    Ok(DataBox::Int64(i64::from_le_bytes(raw)))
}

pub(crate) fn decode_text(source: &mut dyn PayloadSource) -> CodecResult<DataBox> {
    let len = pull_u32(source)? as usize;
    let raw = source.pull(len)?;
    let text = String::from_utf8(raw).map_err(|_| CodecError::InvalidUtf8)?;
    Ok(DataBox::Text(text))
}

pub(crate) fn decode_blob(source: &mut dyn PayloadSource) -> CodecResult<DataBox> {
    let len = pull_u32(source)? as usize;
    Ok(DataBox::Blob(source.pull(len)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{SliceSource, VecSink};

    fn roundtrip(value: &DataBox) -> DataBox {
        let mut sink = VecSink::new();
        value.encode_payload(&mut sink).unwrap();
        assert_eq!(sink.as_slice().len(), value.payload_size());

        let mut source = SliceSource::new(sink.as_slice());
        match value.type_id() {
            BoxTypeId::INT32 => decode_int32(&mut source).unwrap(),
            BoxTypeId::INT64 => decode_int64(&mut source).unwrap(),
            BoxTypeId::TEXT => decode_text(&mut source).unwrap(),
            BoxTypeId::BLOB => decode_blob(&mut source).unwrap(),
            other => {
                let len = pull_u32(&mut source).unwrap() as usize;
                DataBox::Extension {
                    type_id: other,
                    bytes: source.pull(len).unwrap(),
                }
            }
        }
    }

    #[test]
    fn int32_roundtrip() {
        let value = DataBox::Int32(-7);
        assert_eq!(roundtrip(&value), value);
    }

    #[test]
    fn int64_roundtrip() {
        let value = DataBox::Int64(i64::MIN);
        assert_eq!(roundtrip(&value), value);
    }

    #[test]
    fn text_roundtrip() {
        let value = DataBox::Text("scroll \u{1F4DC}".into());
        assert_eq!(roundtrip(&value), value);
    }

    #[test]
    fn blob_roundtrip() {
        let value = DataBox::Blob(vec![0xCA, 0xFE, 0x00, 0xBA]);
        assert_eq!(roundtrip(&value), value);
    }

    #[test]
    fn extension_roundtrip() {
        let value = DataBox::Extension {
            type_id: BoxTypeId::new(100),
            bytes: vec![1, 2, 3],
        };
        assert_eq!(roundtrip(&value), value);
    }

    #[test]
    fn invalid_utf8_rejected() {
        let mut raw = Vec::new();
        raw.extend_from_slice(&2u32.to_le_bytes());
        raw.extend_from_slice(&[0xFF, 0xFE]);

        let mut source = SliceSource::new(&raw);
        let result = decode_text(&mut source);
        assert!(matches!(result, Err(CodecError::InvalidUtf8)));
    }

    #[test]
    fn type_id_wire_roundtrip() {
        let tag = BoxTypeId::new(0xDEAD_BEEF);
        assert_eq!(BoxTypeId::decode(&tag.encode()).unwrap(), tag);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn arb_value() -> impl Strategy<Value = DataBox> {
            prop_oneof![
                any::<i32>().prop_map(DataBox::Int32),
                any::<i64>().prop_map(DataBox::Int64),
                ".{0,16}".prop_map(DataBox::Text),
                proptest::collection::vec(any::<u8>(), 0..32).prop_map(DataBox::Blob),
            ]
        }

        proptest! {
            #[test]
            fn any_payload_roundtrips(value in arb_value()) {
                prop_assert_eq!(roundtrip(&value), value);
            }

            #[test]
            fn truncated_payload_is_rejected(bytes in proptest::collection::vec(any::<u8>(), 1..32)) {
                let value = DataBox::Blob(bytes);
                let mut sink = VecSink::new();
                value.encode_payload(&mut sink).unwrap();
                let encoded = sink.into_vec();

                let mut source = SliceSource::new(&encoded[..encoded.len() - 1]);
                prop_assert!(decode_blob(&mut source).is_err());
            }
        }
    }
}
