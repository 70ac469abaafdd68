//! Parameter extractors: the closed set of argument sources.
//!
//! Every declared parameter resolves to exactly one [`Extractor`] when the
//! class is bound. Invocation then walks the extractor list in parameter
//! order, so argument lookup never inspects the signature again.

use std::collections::BTreeMap;
use std::sync::Arc;

use sockbind_core::codec::primitives;
use sockbind_core::config::EndpointConfig;
use sockbind_core::error::{ConfigError, ErrorCollector, ExtractError};
use sockbind_core::payload::{ParamType, PayloadValue};
use sockbind_core::session::SessionHandle;

use crate::class::HandlerMethod;

/// How one declared parameter obtains its value at invocation time.
///
/// The set is closed: binding produces nothing but these variants, and
/// equality is structural so plans can be compared across rebuilds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Extractor {
    /// Event payload at a fixed position.
    Payload {
        /// Index into the payload values supplied by the event.
        index: usize,
    },
    /// The session handle.
    Session,
    /// The shared endpoint configuration.
    Config,
    /// A path variable, decoded to the declared type.
    PathVariable {
        /// Path variable name.
        name: String,
        /// Declared parameter type.
        target: ParamType,
    },
    /// First event payload carrying the declared type.
    Capability {
        /// Declared parameter type.
        target: ParamType,
    },
}

/// Per-invocation inputs extractors draw from.
pub struct ExtractContext<'a> {
    /// Session the event arrived on.
    pub session: &'a SessionHandle,
    /// Endpoint configuration.
    pub config: &'a Arc<EndpointConfig>,
    /// Event payload slots; extraction takes ownership of what it uses.
    pub payloads: &'a mut [Option<PayloadValue>],
}

impl Extractor {
    /// Produces the argument value for this parameter.
    pub fn extract(&self, cx: &mut ExtractContext<'_>) -> Result<PayloadValue, ExtractError> {
        match self {
            Self::Payload { index } => cx
                .payloads
                .get_mut(*index)
                .and_then(Option::take)
                .ok_or(ExtractError::MissingPayload { index: *index }),
            Self::Session => Ok(PayloadValue::new(cx.session.clone())),
            Self::Config => Ok(PayloadValue::new(Arc::clone(cx.config))),
            Self::PathVariable { name, target } => {
                let raw = cx.session.path_parameter(name).ok_or_else(|| {
                    ExtractError::MissingPathVariable { name: name.clone() }
                })?;
                primitives::decode(*target, &raw).map_err(|source| {
                    ExtractError::PathVariableDecode {
                        name: name.clone(),
                        source,
                    }
                })
            }
            Self::Capability { target } => cx
                .payloads
                .iter_mut()
                .find(|slot| {
                    slot.as_ref()
                        .is_some_and(|value| value.param_type() == *target)
                })
                .and_then(Option::take)
                .ok_or(ExtractError::NoMatchingPayload { ty: target.name() }),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolution
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of resolving one method's parameters.
#[derive(Debug)]
pub struct ResolvedParams {
    /// One slot per declared parameter, `None` while unresolved.
    pub extractors: Vec<Option<Extractor>>,
    /// Unresolved positions and their declared types, in position order.
    /// The marker-specific binding rules claim or reject these.
    pub unresolved: BTreeMap<usize, ParamType>,
}

/// Resolves every parameter of `method` against the extractor kinds.
///
/// Priority per parameter: the path marker first, then the session handle
/// type, then the endpoint configuration type, then one of `known_types`
/// (capabilities the event supplies). Anything else stays unresolved.
///
/// A second session parameter is a configuration error, but both still
/// resolve to the session extractor so invocation of an otherwise valid
/// plan stays well defined.
pub fn resolve_params(
    class_name: &str,
    method: &HandlerMethod,
    known_types: &[ParamType],
    collector: &mut ErrorCollector,
) -> ResolvedParams {
    let session_ty = ParamType::of::<SessionHandle>();
    let config_ty = ParamType::of::<Arc<EndpointConfig>>();

    let mut extractors: Vec<Option<Extractor>> = Vec::with_capacity(method.params().len());
    let mut unresolved = BTreeMap::new();
    let mut session_seen = false;

    for (position, param) in method.params().iter().enumerate() {
        let ty = param.ty();
        if let Some(name) = param.path_variable() {
            if !primitives::is_path_variable_type(ty) {
                collector.push(ConfigError::InvalidPathVariableType {
                    class: class_name.to_owned(),
                    method: method.name().to_owned(),
                    name: name.to_owned(),
                    ty: ty.name(),
                });
            }
            extractors.push(Some(Extractor::PathVariable {
                name: name.to_owned(),
                target: ty,
            }));
        } else if ty == session_ty {
            if session_seen {
                collector.push(ConfigError::DuplicateSessionParam {
                    class: class_name.to_owned(),
                    method: method.name().to_owned(),
                });
            }
            session_seen = true;
            extractors.push(Some(Extractor::Session));
        } else if ty == config_ty {
            extractors.push(Some(Extractor::Config));
        } else if known_types.contains(&ty) {
            extractors.push(Some(Extractor::Capability { target: ty }));
        } else {
            let _ = unresolved.insert(position, ty);
            extractors.push(None);
        }
    }

    ResolvedParams {
        extractors,
        unresolved,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
