//! Built-in codecs appended after application registrations.
//!
//! Raw text and binary payloads pass through untouched, primitives parse
//! from text, and replies render with `to_string`. Applications override
//! any of these simply by registering their own adapter first.

use bytes::Bytes;

use super::primitives;
use super::{
    DecoderEntry, EncoderEntry, FnBinaryDecoder, FnBinaryEncoder, FnTextDecoder, FnTextEncoder,
};

/// Decoder entries every endpoint gets out of the box.
#[must_use]
pub fn decoders() -> Vec<DecoderEntry> {
    let mut entries = vec![
        DecoderEntry::text(FnTextDecoder::new(|text: &str| Ok(text.to_owned()))),
        DecoderEntry::binary(FnBinaryDecoder::new(|data: &[u8]| {
            Ok(Bytes::copy_from_slice(data))
        })),
        DecoderEntry::binary(FnBinaryDecoder::new(|data: &[u8]| Ok(data.to_vec()))),
    ];
    entries.extend(primitives::text_decoders());
    entries
}

/// Encoder entries every endpoint gets out of the box.
#[must_use]
pub fn encoders() -> Vec<EncoderEntry> {
    let mut entries = vec![
        EncoderEntry::text(FnTextEncoder::new(|text: &String| Ok(text.clone()))),
        EncoderEntry::binary(FnBinaryEncoder::new(|data: &Bytes| Ok(data.clone()))),
        EncoderEntry::binary(FnBinaryEncoder::new(|data: &Vec<u8>| {
            Ok(Bytes::copy_from_slice(data))
        })),
    ];
    entries.extend(primitives::text_encoders());
    entries
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
