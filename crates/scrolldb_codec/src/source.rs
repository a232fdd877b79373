//! Streaming byte traits codecs move payloads through.
//!
//! Decoders pull exactly the bytes they need from a [`PayloadSource`];
//! the store behind it decides where the bytes come from. Encoders push
//! into a [`PayloadSink`] the same way.

use crate::error::{CodecError, CodecResult};

/// A consuming byte reader a decoder pulls its payload from.
pub trait PayloadSource {
    /// Pulls exactly `len` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::TruncatedPayload`] if fewer than `len` bytes
    /// remain, or [`CodecError::Source`] if the backing store fails.
    fn pull(&mut self, len: usize) -> CodecResult<Vec<u8>>;
}

/// A byte writer an encoder pushes its payload into.
pub trait PayloadSink {
    /// Pushes all of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Source`] if the backing store fails.
    fn push(&mut self, bytes: &[u8]) -> CodecResult<()>;
}

/// A [`PayloadSource`] over an in-memory slice.
#[derive(Debug)]
pub struct SliceSource<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceSource<'a> {
    /// Wraps a slice.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the number of unconsumed bytes.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }
}

impl PayloadSource for SliceSource<'_> {
    fn pull(&mut self, len: usize) -> CodecResult<Vec<u8>> {
        if self.remaining() < len {
            return Err(CodecError::TruncatedPayload {
                needed: len,
                got: self.remaining(),
            });
        }
        let out = self.data[self.pos..self.pos + len].to_vec();
        self.pos += len;
        Ok(out)
    }
}

/// A [`PayloadSink`] collecting into a `Vec<u8>`.
#[derive(Debug, Default)]
pub struct VecSink {
    data: Vec<u8>,
}

impl VecSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the collected bytes.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Consumes the sink, returning the collected bytes.
    #[must_use]
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl PayloadSink for VecSink {
    fn push(&mut self, bytes: &[u8]) -> CodecResult<()> {
        self.data.extend_from_slice(bytes);
        Ok(())
    }
}
