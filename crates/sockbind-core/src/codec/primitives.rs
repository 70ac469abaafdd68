//! Primitive text decoding, used for path variables and the built-in codecs.

use super::{DecoderEntry, EncoderEntry, FnTextDecoder, FnTextEncoder};
use crate::error::DecodeError;
use crate::payload::{ParamType, PayloadValue};

/// Applies a macro to every primitive type with text decoding support.
macro_rules! primitive_table {
    ($apply:ident) => {
        $apply!(bool, char, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64)
    };
}

/// Whether `ty` is a primitive with built-in text decoding.
#[must_use]
pub fn is_primitive(ty: ParamType) -> bool {
    macro_rules! check {
        ($($t:ty),*) => {
            false $(|| ty == ParamType::of::<$t>())*
        };
    }
    primitive_table!(check)
}

/// Whether `ty` may be declared as a path-variable parameter.
///
/// Path segments arrive as text, so the set is the primitives plus raw
/// `String`.
#[must_use]
pub fn is_path_variable_type(ty: ParamType) -> bool {
    ty == ParamType::of::<String>() || is_primitive(ty)
}

/// Decodes a raw text segment as `ty`.
///
/// `String` passes through untouched; primitives parse with their standard
/// `FromStr` forms. Any other type is rejected.
pub fn decode(ty: ParamType, raw: &str) -> Result<PayloadValue, DecodeError> {
    if ty == ParamType::of::<String>() {
        return Ok(PayloadValue::new(raw.to_owned()));
    }
    macro_rules! parse {
        ($($t:ty),*) => {
            $(
                if ty == ParamType::of::<$t>() {
                    return raw
                        .parse::<$t>()
                        .map(PayloadValue::new)
                        .map_err(|err| DecodeError::new::<$t>(err.to_string()));
                }
            )*
        };
    }
    primitive_table!(parse);
    Err(DecodeError::for_type(ty, "not a primitive type"))
}

/// Whole-text decoder entries for every primitive type.
#[must_use]
pub fn text_decoders() -> Vec<DecoderEntry> {
    let mut entries = Vec::new();
    macro_rules! push {
        ($($t:ty),*) => {
            $(
                entries.push(DecoderEntry::text(FnTextDecoder::new(|text: &str| {
                    text.parse::<$t>()
                        .map_err(|err| DecodeError::new::<$t>(err.to_string()))
                })));
            )*
        };
    }
    primitive_table!(push);
    entries
}

/// Whole-text encoder entries for every primitive type.
#[must_use]
pub fn text_encoders() -> Vec<EncoderEntry> {
    let mut entries = Vec::new();
    macro_rules! push {
        ($($t:ty),*) => {
            $(
                entries.push(EncoderEntry::text(FnTextEncoder::new(|value: &$t| {
                    Ok(value.to_string())
                })));
            )*
        };
    }
    primitive_table!(push);
    entries
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_set_is_closed() {
        assert!(is_primitive(ParamType::of::<i32>()));
        assert!(is_primitive(ParamType::of::<bool>()));
        assert!(is_primitive(ParamType::of::<f64>()));
        assert!(!is_primitive(ParamType::of::<String>()));
        assert!(!is_primitive(ParamType::of::<Vec<u8>>()));
    }

    #[test]
    fn path_variable_types_include_string() {
        assert!(is_path_variable_type(ParamType::of::<String>()));
        assert!(is_path_variable_type(ParamType::of::<u16>()));
        assert!(!is_path_variable_type(ParamType::of::<Vec<u8>>()));
    }

    #[test]
    fn decodes_each_primitive_form() {
        assert_eq!(
            decode(ParamType::of::<i32>(), "42")
                .unwrap()
                .downcast::<i32>()
                .unwrap(),
            42
        );
        assert!(
            decode(ParamType::of::<bool>(), "true")
                .unwrap()
                .downcast::<bool>()
                .unwrap()
        );
        assert_eq!(
            decode(ParamType::of::<char>(), "x")
                .unwrap()
                .downcast::<char>()
                .unwrap(),
            'x'
        );
        assert_eq!(
            decode(ParamType::of::<f64>(), "2.5")
                .unwrap()
                .downcast::<f64>()
                .unwrap(),
            2.5
        );
    }

    #[test]
    fn string_passes_through() {
        let value = decode(ParamType::of::<String>(), "as-is").unwrap();
        assert_eq!(value.downcast::<String>().unwrap(), "as-is");
    }

    #[test]
    fn bad_digit_reports_decode_error() {
        let err = decode(ParamType::of::<i32>(), "forty-two").unwrap_err();
        assert_eq!(err.ty, "i32");
    }

    #[test]
    fn non_primitive_type_is_rejected() {
        let err = decode(ParamType::of::<Vec<u8>>(), "zzz").unwrap_err();
        assert!(err.message.contains("not a primitive"));
    }

    #[test]
    fn decoder_entries_cover_the_table() {
        let entries = text_decoders();
        assert_eq!(entries.len(), 12);
        assert!(
            entries
                .iter()
                .any(|e| e.payload_type() == ParamType::of::<u64>())
        );
    }

    #[test]
    fn encoder_entries_render_with_to_string() {
        let entries = text_encoders();
        let entry = entries
            .iter()
            .find(|e| e.payload_type() == ParamType::of::<i64>())
            .unwrap();
        let EncoderEntry::Text(encoder) = entry else {
            panic!("expected a text entry");
        };
        assert_eq!(encoder.encode(&PayloadValue::new(-9_i64)).unwrap(), "-9");
    }
}
