//! The cluster node contract.
//!
//! One [`ClusterContext`] exists per node; every cross-node operation goes
//! through it. The dispatch engine itself never touches this layer: the
//! session abstraction consults it when the peer lives on another node.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use sockbind_core::session::CloseReason;

use crate::listener::{SessionEventListener, SessionListener};
use crate::properties::SessionProperties;

/// Failure of a cluster operation.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// The addressed session id is not registered anywhere in the cluster.
    #[error("remote session '{session_id}' is not known to the cluster")]
    UnknownSession {
        /// Session id the operation addressed.
        session_id: String,
    },

    /// The node was shut down; no further operations will succeed.
    #[error("cluster node is shut down")]
    ShutDown,

    /// The replication transport failed to deliver the operation.
    #[error("cluster transport failed: {message}")]
    Transport {
        /// Transport-specific failure description.
        message: String,
    },
}

/// Callback invoked once a fire-and-forget send has been acknowledged or
/// has failed.
pub type SendCompletion = Box<dyn FnOnce(Result<(), ClusterError>) + Send>;

/// Cross-node session operations.
///
/// Async sends resolve once the owning node has acknowledged delivery to
/// its local socket. The `*_with` variants return immediately and report
/// through the completion callback instead, for callers that must not
/// await (see `RemoteSession`).
#[async_trait]
pub trait ClusterContext: Send + Sync {
    /// Sends a text message to a remote session.
    async fn send_text(&self, session_id: &str, text: &str) -> Result<(), ClusterError>;

    /// Sends one increment of a text message to a remote session.
    async fn send_text_partial(
        &self,
        session_id: &str,
        text: &str,
        last: bool,
    ) -> Result<(), ClusterError>;

    /// Sends a binary message to a remote session.
    async fn send_binary(&self, session_id: &str, data: &[u8]) -> Result<(), ClusterError>;

    /// Sends one increment of a binary message to a remote session.
    async fn send_binary_partial(
        &self,
        session_id: &str,
        data: &[u8],
        last: bool,
    ) -> Result<(), ClusterError>;

    /// Sends a ping frame carrying `data` to a remote session.
    async fn send_ping(&self, session_id: &str, data: &[u8]) -> Result<(), ClusterError>;

    /// Sends an unsolicited pong frame carrying `data` to a remote session.
    async fn send_pong(&self, session_id: &str, data: &[u8]) -> Result<(), ClusterError>;

    /// Sends a text message, reporting the outcome through `completion`.
    fn send_text_with(&self, session_id: &str, text: &str, completion: SendCompletion);

    /// Sends a binary message, reporting the outcome through `completion`.
    fn send_binary_with(&self, session_id: &str, data: &[u8], completion: SendCompletion);

    /// Closes a remote session normally.
    async fn close(&self, session_id: &str) -> Result<(), ClusterError>;

    /// Closes a remote session with `reason`.
    async fn close_with_reason(
        &self,
        session_id: &str,
        reason: CloseReason,
    ) -> Result<(), ClusterError>;

    /// Ids of every remote session bound to the endpoint at `endpoint_path`.
    fn remote_session_ids(&self, endpoint_path: &str) -> HashSet<String>;

    /// Creates a session id unique across all nodes.
    fn create_session_id(&self) -> String;

    /// Registers a local session with the cluster.
    ///
    /// The session's distributed properties must be populated before this
    /// call; other nodes read them as soon as the id is broadcast.
    /// `listener` receives every send a remote node addresses to this
    /// session.
    fn init_clustered_session(
        &self,
        session_id: &str,
        endpoint_path: &str,
        listener: Arc<dyn SessionEventListener>,
    );

    /// Subscribes to open/close notifications for sessions of one endpoint.
    fn register_session_listener(&self, endpoint_path: &str, listener: Arc<dyn SessionListener>);

    /// Shared property map replicated for `session_id`.
    ///
    /// Writes propagate to every node.
    fn distributed_session_properties(&self, session_id: &str) -> SessionProperties;

    /// Removes a session from the cluster bookkeeping.
    fn remove_session(&self, session_id: &str, endpoint_path: &str);

    /// Stops this node; every later operation on this context fails.
    fn shutdown(&self);
}
