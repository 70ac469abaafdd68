//! Error taxonomy for registration-time and invocation-time faults.
//!
//! Registration faults ([`ConfigError`]) are accumulated in an
//! [`ErrorCollector`] so a handler class with several bad signatures reports
//! all of them in one pass instead of failing on the first. Invocation-time
//! faults are small dedicated types ([`ExtractError`], [`SendError`],
//! [`InstanceError`]) that the runtime folds into the session error path.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use crate::payload::ParamType;

/// Shared error value handed to a bound error handler.
///
/// Always the original cause of the failure, never a runtime wrapper around
/// it, so handler bodies can downcast to concrete error types.
pub type ErrorCause = Arc<dyn std::error::Error + Send + Sync>;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration errors
// ─────────────────────────────────────────────────────────────────────────────

/// A fault in a registered handler class, detected while binding.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A lifecycle event already has a bound method; the later one loses.
    #[error("{class}: multiple {kind} methods, '{kept}' is already bound and '{ignored}' will be ignored")]
    DuplicateHandler {
        /// Handler class name.
        class: String,
        /// Lifecycle kind, one of `open`, `close` or `error`.
        kind: &'static str,
        /// Method bound first, which stays in effect.
        kept: String,
        /// Method declared later, which is dropped.
        ignored: String,
    },

    /// A path-variable parameter has a type with no primitive decoding.
    #[error("{class}.{method}: {ty} is not an allowed type for path variable '{name}'")]
    InvalidPathVariableType {
        /// Handler class name.
        class: String,
        /// Method carrying the bad parameter.
        method: String,
        /// Path variable name.
        name: String,
        /// Declared parameter type.
        ty: &'static str,
    },

    /// A method declares more than one session parameter.
    #[error("{class}.{method}: multiple session parameters")]
    DuplicateSessionParam {
        /// Handler class name.
        class: String,
        /// Offending method.
        method: String,
    },

    /// A message method has an unresolved-parameter count other than one
    /// payload plus an optional completion flag.
    #[error("{class}.{method}: wrong number of unresolved parameters ({count}) for a message method")]
    WrongMessageArity {
        /// Handler class name.
        class: String,
        /// Offending method.
        method: String,
        /// Number of parameters left after known kinds were extracted.
        count: usize,
    },

    /// A parameter matched no extractor kind at all.
    #[error("{class}.{method}: parameter {position} of type {ty} cannot be resolved")]
    UnresolvedParam {
        /// Handler class name.
        class: String,
        /// Offending method.
        method: String,
        /// Zero-based parameter position.
        position: usize,
        /// Declared parameter type.
        ty: &'static str,
    },

    /// A message payload type has no registered decoder.
    #[error("{class}.{method}: no decoder registered for message type {ty}")]
    MissingDecoder {
        /// Handler class name.
        class: String,
        /// Offending method.
        method: String,
        /// Declared payload type.
        ty: &'static str,
    },

    /// A partial-message payload type is not a raw text or binary form.
    #[error("{class}.{method}: {ty} cannot be delivered in partial messages")]
    NotPartialCapable {
        /// Handler class name.
        class: String,
        /// Offending method.
        method: String,
        /// Declared payload type.
        ty: &'static str,
    },
}

/// Every configuration error found while binding one handler class.
#[derive(Debug, Default)]
pub struct ConfigErrors {
    errors: Vec<ConfigError>,
}

impl ConfigErrors {
    /// The collected errors, in detection order.
    #[must_use]
    pub fn errors(&self) -> &[ConfigError] {
        &self.errors
    }

    /// Number of collected errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Consumes the batch.
    #[must_use]
    pub fn into_vec(self) -> Vec<ConfigError> {
        self.errors
    }
}

impl fmt::Display for ConfigErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} configuration error(s)", self.errors.len())?;
        for error in &self.errors {
            write!(f, "\n  - {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ConfigErrors {}

/// Accumulates configuration errors so registration reports them together.
///
/// Binding never aborts on the first fault. Every method of a class is
/// examined, and the caller decides afterwards whether the batch is fatal.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    errors: Vec<ConfigError>,
}

impl ErrorCollector {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one configuration error.
    pub fn push(&mut self, error: ConfigError) {
        debug!(%error, "configuration error collected");
        self.errors.push(error);
    }

    /// Whether anything has been collected.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// The collected errors, in detection order.
    #[must_use]
    pub fn errors(&self) -> &[ConfigError] {
        &self.errors
    }

    /// Resolves the batch: `Ok` when nothing was collected.
    pub fn into_result(self) -> Result<(), ConfigErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigErrors {
                errors: self.errors,
            })
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Codec errors
// ─────────────────────────────────────────────────────────────────────────────

/// Failure turning wire input into a payload value.
#[derive(Debug, Error)]
#[error("failed to decode {ty}: {message}")]
pub struct DecodeError {
    /// Target payload type.
    pub ty: &'static str,
    /// Decoder-supplied detail.
    pub message: String,
}

impl DecodeError {
    /// Error for target type `T`.
    #[must_use]
    pub fn new<T>(message: impl Into<String>) -> Self {
        Self {
            ty: std::any::type_name::<T>(),
            message: message.into(),
        }
    }

    /// Error for a target known only as a runtime token.
    #[must_use]
    pub fn for_type(ty: ParamType, message: impl Into<String>) -> Self {
        Self {
            ty: ty.name(),
            message: message.into(),
        }
    }
}

/// Failure turning a reply value into wire output.
#[derive(Debug, Error)]
#[error("failed to encode {ty}: {message}")]
pub struct EncodeError {
    /// Source payload type.
    pub ty: &'static str,
    /// Encoder-supplied detail.
    pub message: String,
}

impl EncodeError {
    /// Error for source type `T`.
    #[must_use]
    pub fn new<T>(message: impl Into<String>) -> Self {
        Self {
            ty: std::any::type_name::<T>(),
            message: message.into(),
        }
    }

    /// Error for a source known only as a runtime token.
    #[must_use]
    pub fn for_type(ty: ParamType, message: impl Into<String>) -> Self {
        Self {
            ty: ty.name(),
            message: message.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Invocation-time errors
// ─────────────────────────────────────────────────────────────────────────────

/// Failure materializing one declared parameter at invocation time.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The session has no value for a declared path variable.
    #[error("path variable '{name}' is not bound on this session")]
    MissingPathVariable {
        /// Path variable name.
        name: String,
    },

    /// The raw path segment did not parse as the declared type.
    #[error("path variable '{name}' could not be decoded: {source}")]
    PathVariableDecode {
        /// Path variable name.
        name: String,
        /// Underlying parse failure.
        #[source]
        source: DecodeError,
    },

    /// The event supplied fewer payload values than the plan expects.
    #[error("no event payload at position {index}")]
    MissingPayload {
        /// Positional payload index the extractor was bound to.
        index: usize,
    },

    /// No event payload carried the declared capability type.
    #[error("no event payload of type {ty}")]
    NoMatchingPayload {
        /// Declared parameter type.
        ty: &'static str,
    },
}

/// Failure pushing an outbound frame to the peer.
#[derive(Debug, Error)]
pub enum SendError {
    /// The outbound channel is gone; the peer will never see the frame.
    #[error("session outbound channel is closed")]
    Closed,

    /// The outbound channel is saturated and the frame was dropped.
    #[error("session outbound channel is full")]
    Full,

    /// A reply value had no registered encoder.
    #[error("no encoder registered for reply type {ty}")]
    NoEncoder {
        /// Reply payload type.
        ty: &'static str,
    },

    /// The registered encoder rejected the reply value.
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Failure obtaining a handler instance for a session.
#[derive(Debug, Error)]
#[error("could not obtain an instance of {class}: {message}")]
pub struct InstanceError {
    /// Handler class name.
    pub class: String,
    /// Provider-supplied detail.
    pub message: String,
}

impl InstanceError {
    /// Builds the error.
    #[must_use]
    pub fn new(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            message: message.into(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
