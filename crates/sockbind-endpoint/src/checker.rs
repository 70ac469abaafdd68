//! Signature validity checks that run after parameter resolution.
//!
//! The binding compiler accepts a method tentatively; this checker can
//! still reject it by collecting errors, e.g. a message payload type with
//! no registered decoder. It never panics and never stops at the first
//! fault.

use std::collections::BTreeMap;

use bytes::Bytes;
use sockbind_core::codec::CodecRegistry;
use sockbind_core::error::{ConfigError, ErrorCollector};
use sockbind_core::payload::ParamType;
use sockbind_core::session::PongMessage;

use crate::class::HandlerMethod;
use crate::compiler::MessageKind;

/// Cross-checks resolved signatures against the endpoint's codecs.
pub struct SignatureChecker<'a> {
    class_name: &'a str,
    codecs: &'a CodecRegistry,
}

impl<'a> SignatureChecker<'a> {
    /// Checker for one handler class and its codec registrations.
    #[must_use]
    pub fn new(class_name: &'a str, codecs: &'a CodecRegistry) -> Self {
        Self { class_name, codecs }
    }

    /// Rejects parameters a lifecycle method left unresolved.
    pub fn check_lifecycle(
        &self,
        method: &HandlerMethod,
        unresolved: &BTreeMap<usize, ParamType>,
        collector: &mut ErrorCollector,
    ) {
        for (&position, &ty) in unresolved {
            collector.push(ConfigError::UnresolvedParam {
                class: self.class_name.to_owned(),
                method: method.name().to_owned(),
                position,
                ty: ty.name(),
            });
        }
    }

    /// Cross-checks a tentatively accepted message binding.
    ///
    /// Whole payloads need a registered decoder, except pongs, which the
    /// transport delivers already materialized. Partial payloads must be a
    /// raw text or binary form; decoders never see increments.
    pub fn check_message(
        &self,
        method: &HandlerMethod,
        kind: MessageKind,
        payload_type: ParamType,
        collector: &mut ErrorCollector,
    ) {
        match kind {
            MessageKind::Whole => {
                if payload_type == ParamType::of::<PongMessage>() {
                    return;
                }
                if !self.codecs.has_decoder_for(payload_type) {
                    collector.push(ConfigError::MissingDecoder {
                        class: self.class_name.to_owned(),
                        method: method.name().to_owned(),
                        ty: payload_type.name(),
                    });
                }
            }
            MessageKind::Partial => {
                let partial_capable = [
                    ParamType::of::<String>(),
                    ParamType::of::<Bytes>(),
                    ParamType::of::<Vec<u8>>(),
                ];
                if !partial_capable.contains(&payload_type) {
                    collector.push(ConfigError::NotPartialCapable {
                        class: self.class_name.to_owned(),
                        method: method.name().to_owned(),
                        ty: payload_type.name(),
                    });
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
