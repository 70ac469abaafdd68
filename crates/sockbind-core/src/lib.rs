//! # sockbind-core
//!
//! Core domain types for the sockbind endpoint engine.
//!
//! Everything the binding and dispatch layers share lives here:
//!
//! - **Payloads** — [`ParamType`] tokens, type-erased [`PayloadValue`]s and
//!   the positional [`Args`] cursor handler bodies consume.
//! - **Sessions** — the [`Session`] trait, the cloneable [`SessionHandle`]
//!   parameter type, close codes and the channel-backed reference session.
//! - **Codecs** — decoder/encoder traits for the four wire capabilities,
//!   the ordered [`CodecRegistry`] and the built-in defaults.
//! - **Configuration** — [`EndpointConfig`] with its builder.
//! - **Errors** — the registration-time [`ConfigError`] batch model and the
//!   invocation-time fault types.
//! - **Providers** — [`InstanceProvider`] for handler instancing policy.

#![deny(unsafe_code)]

pub mod codec;
pub mod config;
pub mod error;
pub mod payload;
pub mod provider;
pub mod session;

pub use codec::{CodecCapability, CodecRegistry, DecoderEntry, EncoderEntry};
pub use config::{EndpointConfig, EndpointConfigBuilder};
pub use error::{
    ConfigError, ConfigErrors, DecodeError, EncodeError, ErrorCause, ErrorCollector, ExtractError,
    InstanceError, SendError,
};
pub use payload::{ArgError, Args, ParamType, PayloadValue};
pub use provider::{InstanceProvider, InstanceRef, SingletonProvider, instance_of};
pub use session::{
    ChannelSession, CloseCode, CloseReason, OutboundFrame, PongMessage, Session, SessionHandle,
};
