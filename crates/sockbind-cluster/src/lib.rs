//! # sockbind-cluster
//!
//! Distributed session sharing for sockbind deployments that span several
//! nodes. The crate defines the contract a clustering backend implements
//! ([`ClusterContext`]) and the pieces a node plugs into it:
//!
//! - [`SessionEventListener`] receives send requests relayed from other
//!   nodes and forwards them to the locally connected socket.
//! - [`SessionListener`] observes remote sessions opening and closing on an
//!   endpoint.
//! - [`RemoteSession`] wraps a session owned by another node behind the
//!   local [`Session`](sockbind_core::session::Session) trait, so broadcast
//!   code never distinguishes local from remote peers.
//! - [`SessionProperties`] carries the replicated per-session state, keyed
//!   by [`DistributedMapKey`].
//!
//! The crate ships no backend of its own. A backend owns replication and
//! delivery; everything here is the node-side surface.

#![deny(unsafe_code)]

pub mod context;
pub mod listener;
pub mod properties;
pub mod remote;

pub use context::{ClusterContext, ClusterError, SendCompletion};
pub use listener::{SessionEventListener, SessionListener};
pub use properties::{DistributedMapKey, SessionProperties};
pub use remote::RemoteSession;
