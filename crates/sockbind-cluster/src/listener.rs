//! Listeners a node registers with its cluster context.

use async_trait::async_trait;

use sockbind_core::error::SendError;

/// Receives sends that remote nodes address to one local session.
///
/// Registered through `ClusterContext::init_clustered_session`; each method
/// forwards to the local socket and reports the local send outcome back to
/// the replication layer.
#[async_trait]
pub trait SessionEventListener: Send + Sync {
    /// A remote node asks this session to send a text message.
    async fn on_send_text(&self, text: &str) -> Result<(), SendError>;

    /// A remote node asks this session to send one text increment.
    async fn on_send_text_partial(&self, text: &str, last: bool) -> Result<(), SendError>;

    /// A remote node asks this session to send a binary message.
    async fn on_send_binary(&self, data: &[u8]) -> Result<(), SendError>;

    /// A remote node asks this session to send one binary increment.
    async fn on_send_binary_partial(&self, data: &[u8], last: bool) -> Result<(), SendError>;

    /// A remote node asks this session to send a ping frame.
    async fn on_send_ping(&self, data: &[u8]) -> Result<(), SendError>;

    /// A remote node asks this session to send a pong frame.
    async fn on_send_pong(&self, data: &[u8]) -> Result<(), SendError>;
}

/// Cluster-wide session lifecycle notifications for one endpoint path.
pub trait SessionListener: Send + Sync {
    /// A session opened somewhere in the cluster.
    fn on_session_opened(&self, session_id: &str);

    /// A session closed somewhere in the cluster.
    fn on_session_closed(&self, session_id: &str);
}
