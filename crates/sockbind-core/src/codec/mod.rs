//! Pluggable codecs: decoders for inbound wire data, encoders for replies.
//!
//! Adapters register on the endpoint configuration and are looked up by the
//! payload type they handle. The wire capability (text, binary, or their
//! streamed forms) is carried by the registration entry, so lookup never has
//! to probe an adapter. An adapter that cannot name its payload type
//! resolves to the universal token and matches any lookup.

pub mod defaults;
pub mod primitives;

use std::io::{Read, Write};
use std::marker::PhantomData;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::{DecodeError, EncodeError};
use crate::payload::{ParamType, PayloadValue};

// ─────────────────────────────────────────────────────────────────────────────
// Decoder traits
// ─────────────────────────────────────────────────────────────────────────────

/// Decodes a whole text frame into a payload value.
pub trait TextDecoder: Send + Sync {
    /// Payload type this decoder produces, when statically known.
    fn target(&self) -> Option<ParamType>;

    /// Whether this decoder wants to handle `text`.
    fn will_decode(&self, _text: &str) -> bool {
        true
    }

    /// Decodes the frame.
    fn decode(&self, text: &str) -> Result<PayloadValue, DecodeError>;
}

/// Decodes a whole binary frame into a payload value.
pub trait BinaryDecoder: Send + Sync {
    /// Payload type this decoder produces, when statically known.
    fn target(&self) -> Option<ParamType>;

    /// Whether this decoder wants to handle `data`.
    fn will_decode(&self, _data: &[u8]) -> bool {
        true
    }

    /// Decodes the frame.
    fn decode(&self, data: &[u8]) -> Result<PayloadValue, DecodeError>;
}

/// Decodes streamed text into a payload value.
pub trait TextStreamDecoder: Send + Sync {
    /// Payload type this decoder produces, when statically known.
    fn target(&self) -> Option<ParamType>;

    /// Reads the stream to completion and decodes it.
    fn decode(&self, reader: &mut dyn Read) -> Result<PayloadValue, DecodeError>;
}

/// Decodes streamed binary data into a payload value.
pub trait BinaryStreamDecoder: Send + Sync {
    /// Payload type this decoder produces, when statically known.
    fn target(&self) -> Option<ParamType>;

    /// Reads the stream to completion and decodes it.
    fn decode(&self, reader: &mut dyn Read) -> Result<PayloadValue, DecodeError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Encoder traits
// ─────────────────────────────────────────────────────────────────────────────

/// Encodes a reply value into a text frame.
pub trait TextEncoder: Send + Sync {
    /// Payload type this encoder accepts, when statically known.
    fn source(&self) -> Option<ParamType>;

    /// Encodes the value.
    fn encode(&self, value: &PayloadValue) -> Result<String, EncodeError>;
}

/// Encodes a reply value into a binary frame.
pub trait BinaryEncoder: Send + Sync {
    /// Payload type this encoder accepts, when statically known.
    fn source(&self) -> Option<ParamType>;

    /// Encodes the value.
    fn encode(&self, value: &PayloadValue) -> Result<Bytes, EncodeError>;
}

/// Encodes a reply value by writing text to a stream.
pub trait TextStreamEncoder: Send + Sync {
    /// Payload type this encoder accepts, when statically known.
    fn source(&self) -> Option<ParamType>;

    /// Encodes the value into `writer`.
    fn encode(
        &self,
        value: &PayloadValue,
        writer: &mut dyn std::fmt::Write,
    ) -> Result<(), EncodeError>;
}

/// Encodes a reply value by writing bytes to a stream.
pub trait BinaryStreamEncoder: Send + Sync {
    /// Payload type this encoder accepts, when statically known.
    fn source(&self) -> Option<ParamType>;

    /// Encodes the value into `writer`.
    fn encode(&self, value: &PayloadValue, writer: &mut dyn Write) -> Result<(), EncodeError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Registration entries
// ─────────────────────────────────────────────────────────────────────────────

/// Wire form a codec consumes or produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodecCapability {
    /// Whole text frames.
    Text,
    /// Whole binary frames.
    Binary,
    /// Streamed text.
    TextStream,
    /// Streamed binary data.
    BinaryStream,
}

/// A registered decoder together with the wire capability it consumes.
#[derive(Clone)]
pub enum DecoderEntry {
    /// Whole text frames.
    Text(Arc<dyn TextDecoder>),
    /// Whole binary frames.
    Binary(Arc<dyn BinaryDecoder>),
    /// Streamed text.
    TextStream(Arc<dyn TextStreamDecoder>),
    /// Streamed binary data.
    BinaryStream(Arc<dyn BinaryStreamDecoder>),
}

impl DecoderEntry {
    /// Registers a whole-text decoder.
    #[must_use]
    pub fn text(decoder: impl TextDecoder + 'static) -> Self {
        Self::Text(Arc::new(decoder))
    }

    /// Registers a whole-binary decoder.
    #[must_use]
    pub fn binary(decoder: impl BinaryDecoder + 'static) -> Self {
        Self::Binary(Arc::new(decoder))
    }

    /// Registers a streamed-text decoder.
    #[must_use]
    pub fn text_stream(decoder: impl TextStreamDecoder + 'static) -> Self {
        Self::TextStream(Arc::new(decoder))
    }

    /// Registers a streamed-binary decoder.
    #[must_use]
    pub fn binary_stream(decoder: impl BinaryStreamDecoder + 'static) -> Self {
        Self::BinaryStream(Arc::new(decoder))
    }

    /// Wire capability this entry consumes.
    #[must_use]
    pub fn capability(&self) -> CodecCapability {
        match self {
            Self::Text(_) => CodecCapability::Text,
            Self::Binary(_) => CodecCapability::Binary,
            Self::TextStream(_) => CodecCapability::TextStream,
            Self::BinaryStream(_) => CodecCapability::BinaryStream,
        }
    }

    /// Payload type this entry produces.
    ///
    /// Walks the capability variants and asks the adapter; an adapter with
    /// no statically known target resolves to the universal token.
    #[must_use]
    pub fn payload_type(&self) -> ParamType {
        let target = match self {
            Self::Text(d) => d.target(),
            Self::Binary(d) => d.target(),
            Self::TextStream(d) => d.target(),
            Self::BinaryStream(d) => d.target(),
        };
        target.unwrap_or_else(ParamType::any)
    }
}

/// A registered encoder together with the wire capability it produces.
#[derive(Clone)]
pub enum EncoderEntry {
    /// Whole text frames.
    Text(Arc<dyn TextEncoder>),
    /// Whole binary frames.
    Binary(Arc<dyn BinaryEncoder>),
    /// Streamed text.
    TextStream(Arc<dyn TextStreamEncoder>),
    /// Streamed binary data.
    BinaryStream(Arc<dyn BinaryStreamEncoder>),
}

impl EncoderEntry {
    /// Registers a whole-text encoder.
    #[must_use]
    pub fn text(encoder: impl TextEncoder + 'static) -> Self {
        Self::Text(Arc::new(encoder))
    }

    /// Registers a whole-binary encoder.
    #[must_use]
    pub fn binary(encoder: impl BinaryEncoder + 'static) -> Self {
        Self::Binary(Arc::new(encoder))
    }

    /// Registers a streamed-text encoder.
    #[must_use]
    pub fn text_stream(encoder: impl TextStreamEncoder + 'static) -> Self {
        Self::TextStream(Arc::new(encoder))
    }

    /// Registers a streamed-binary encoder.
    #[must_use]
    pub fn binary_stream(encoder: impl BinaryStreamEncoder + 'static) -> Self {
        Self::BinaryStream(Arc::new(encoder))
    }

    /// Wire capability this entry produces.
    #[must_use]
    pub fn capability(&self) -> CodecCapability {
        match self {
            Self::Text(_) => CodecCapability::Text,
            Self::Binary(_) => CodecCapability::Binary,
            Self::TextStream(_) => CodecCapability::TextStream,
            Self::BinaryStream(_) => CodecCapability::BinaryStream,
        }
    }

    /// Payload type this entry accepts, falling back to the universal token.
    #[must_use]
    pub fn payload_type(&self) -> ParamType {
        let source = match self {
            Self::Text(e) => e.source(),
            Self::Binary(e) => e.source(),
            Self::TextStream(e) => e.source(),
            Self::BinaryStream(e) => e.source(),
        };
        source.unwrap_or_else(ParamType::any)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Ordered decoder and encoder registrations for one endpoint.
///
/// Order is meaningful. Lookups scan registration order, so adapters the
/// application registered win over the built-in defaults appended after
/// them.
#[derive(Clone, Default)]
pub struct CodecRegistry {
    decoders: Vec<DecoderEntry>,
    encoders: Vec<EncoderEntry>,
}

fn accepts(entry_ty: ParamType, ty: ParamType) -> bool {
    entry_ty == ty || entry_ty.is_any()
}

impl CodecRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a decoder registration.
    pub fn add_decoder(&mut self, entry: DecoderEntry) {
        self.decoders.push(entry);
    }

    /// Appends an encoder registration.
    pub fn add_encoder(&mut self, entry: EncoderEntry) {
        self.encoders.push(entry);
    }

    /// All decoder registrations, in order.
    #[must_use]
    pub fn decoders(&self) -> &[DecoderEntry] {
        &self.decoders
    }

    /// All encoder registrations, in order.
    #[must_use]
    pub fn encoders(&self) -> &[EncoderEntry] {
        &self.encoders
    }

    /// Decoders producing `ty`, in registration order.
    pub fn decoders_for(&self, ty: ParamType) -> impl Iterator<Item = &DecoderEntry> + '_ {
        self.decoders
            .iter()
            .filter(move |entry| accepts(entry.payload_type(), ty))
    }

    /// Whether any registered decoder produces `ty`.
    #[must_use]
    pub fn has_decoder_for(&self, ty: ParamType) -> bool {
        self.decoders_for(ty).next().is_some()
    }

    /// First encoder accepting `ty`.
    ///
    /// An exact type match anywhere in the list beats a universal entry.
    #[must_use]
    pub fn encoder_for(&self, ty: ParamType) -> Option<&EncoderEntry> {
        self.encoders
            .iter()
            .find(|entry| entry.payload_type() == ty)
            .or_else(|| self.encoders.iter().find(|entry| entry.payload_type().is_any()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Closure adapters
// ─────────────────────────────────────────────────────────────────────────────

/// Text decoder built from a parse closure.
pub struct FnTextDecoder<T, F> {
    decode: F,
    _target: PhantomData<fn() -> T>,
}

impl<T, F> FnTextDecoder<T, F>
where
    T: Send + 'static,
    F: Fn(&str) -> Result<T, DecodeError> + Send + Sync,
{
    /// Wraps `decode`.
    #[must_use]
    pub fn new(decode: F) -> Self {
        Self {
            decode,
            _target: PhantomData,
        }
    }
}

impl<T, F> TextDecoder for FnTextDecoder<T, F>
where
    T: Send + 'static,
    F: Fn(&str) -> Result<T, DecodeError> + Send + Sync,
{
    fn target(&self) -> Option<ParamType> {
        Some(ParamType::of::<T>())
    }

    fn decode(&self, text: &str) -> Result<PayloadValue, DecodeError> {
        (self.decode)(text).map(PayloadValue::new)
    }
}

/// Binary decoder built from a parse closure.
pub struct FnBinaryDecoder<T, F> {
    decode: F,
    _target: PhantomData<fn() -> T>,
}

impl<T, F> FnBinaryDecoder<T, F>
where
    T: Send + 'static,
    F: Fn(&[u8]) -> Result<T, DecodeError> + Send + Sync,
{
    /// Wraps `decode`.
    #[must_use]
    pub fn new(decode: F) -> Self {
        Self {
            decode,
            _target: PhantomData,
        }
    }
}

impl<T, F> BinaryDecoder for FnBinaryDecoder<T, F>
where
    T: Send + 'static,
    F: Fn(&[u8]) -> Result<T, DecodeError> + Send + Sync,
{
    fn target(&self) -> Option<ParamType> {
        Some(ParamType::of::<T>())
    }

    fn decode(&self, data: &[u8]) -> Result<PayloadValue, DecodeError> {
        (self.decode)(data).map(PayloadValue::new)
    }
}

/// Text encoder built from a render closure.
pub struct FnTextEncoder<T, F> {
    encode: F,
    _source: PhantomData<fn(T)>,
}

impl<T, F> FnTextEncoder<T, F>
where
    T: Send + 'static,
    F: Fn(&T) -> Result<String, EncodeError> + Send + Sync,
{
    /// Wraps `encode`.
    #[must_use]
    pub fn new(encode: F) -> Self {
        Self {
            encode,
            _source: PhantomData,
        }
    }
}

impl<T, F> TextEncoder for FnTextEncoder<T, F>
where
    T: Send + 'static,
    F: Fn(&T) -> Result<String, EncodeError> + Send + Sync,
{
    fn source(&self) -> Option<ParamType> {
        Some(ParamType::of::<T>())
    }

    fn encode(&self, value: &PayloadValue) -> Result<String, EncodeError> {
        let typed = value.downcast_ref::<T>().ok_or_else(|| {
            EncodeError::new::<T>(format!("value has type {}", value.param_type()))
        })?;
        (self.encode)(typed)
    }
}

/// Binary encoder built from a render closure.
pub struct FnBinaryEncoder<T, F> {
    encode: F,
    _source: PhantomData<fn(T)>,
}

impl<T, F> FnBinaryEncoder<T, F>
where
    T: Send + 'static,
    F: Fn(&T) -> Result<Bytes, EncodeError> + Send + Sync,
{
    /// Wraps `encode`.
    #[must_use]
    pub fn new(encode: F) -> Self {
        Self {
            encode,
            _source: PhantomData,
        }
    }
}

impl<T, F> BinaryEncoder for FnBinaryEncoder<T, F>
where
    T: Send + 'static,
    F: Fn(&T) -> Result<Bytes, EncodeError> + Send + Sync,
{
    fn source(&self) -> Option<ParamType> {
        Some(ParamType::of::<T>())
    }

    fn encode(&self, value: &PayloadValue) -> Result<Bytes, EncodeError> {
        let typed = value.downcast_ref::<T>().ok_or_else(|| {
            EncodeError::new::<T>(format!("value has type {}", value.param_type()))
        })?;
        (self.encode)(typed)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
