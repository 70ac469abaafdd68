//! # sockbind-endpoint
//!
//! The handler-binding and dispatch engine.
//!
//! A user describes their handler type as a [`HandlerClass`]: named methods
//! tagged with lifecycle or message markers, declared parameter types, and
//! async bodies. [`compile`] validates the whole class once, at
//! registration time, and produces an immutable [`BindingPlan`]; every
//! configuration problem surfaces together in one batch. A
//! [`BoundEndpoint`] then drives the plan for live sessions:
//!
//! - **open/close/error** events invoke their bound method with arguments
//!   pulled by per-parameter [`Extractor`]s (session handle, config, path
//!   variables, event payloads);
//! - **inbound messages** flow through per-session [`MessageSink`]s, whole
//!   or partial per the method's signature;
//! - **replies** (non-`None` results) are encoded and sent back, and every
//!   failure on the way routes to the class's error handler exactly once.

#![deny(unsafe_code)]

pub mod checker;
pub mod class;
pub mod compiler;
pub mod endpoint;
pub mod extractor;
mod invoker;
pub mod message;

pub use checker::SignatureChecker;
pub use class::{
    HandlerClass, HandlerClassBuilder, HandlerFault, HandlerMethod, Marker, MethodBody,
    MethodFuture, ParamDecl, into_body, no_reply, reply,
};
pub use compiler::{
    BindingPlan, MessageBinding, MessageKind, MethodBinding, compile, compile_with,
};
pub use endpoint::BoundEndpoint;
pub use extractor::{ExtractContext, Extractor, ResolvedParams, resolve_params};
pub use message::{MessageSink, SinkState};
