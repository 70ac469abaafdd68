//! Local view of a session owned by another node.

use std::fmt;
use std::sync::Arc;

use tracing::warn;

use sockbind_core::error::SendError;
use sockbind_core::session::{CloseReason, Session};

use crate::context::{ClusterContext, ClusterError};
use crate::properties::{DistributedMapKey, SessionProperties};

/// A session that lives on another node, usable wherever a local
/// [`Session`] is.
///
/// Sends go through the cluster context's callback variants so they stay
/// non-blocking; a relay failure is logged on acknowledgement, matching how
/// a local enqueue can fail after the fact. Path variables come from the
/// replicated property map.
pub struct RemoteSession {
    id: String,
    context: Arc<dyn ClusterContext>,
    properties: SessionProperties,
}

impl RemoteSession {
    /// Attaches to the remote session `session_id` through `context`.
    #[must_use]
    pub fn attach(context: Arc<dyn ClusterContext>, session_id: impl Into<String>) -> Self {
        let id = session_id.into();
        let properties = context.distributed_session_properties(&id);
        Self {
            id,
            context,
            properties,
        }
    }

    /// Replicated properties of the remote session.
    #[must_use]
    pub fn properties(&self) -> &SessionProperties {
        &self.properties
    }

    /// Asks the owning node to close the session with `reason`.
    pub async fn close(&self, reason: CloseReason) -> Result<(), ClusterError> {
        self.context.close_with_reason(&self.id, reason).await
    }
}

impl Session for RemoteSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn path_parameter(&self, name: &str) -> Option<String> {
        self.properties
            .get(&DistributedMapKey::PathParameters)
            .and_then(|entry| {
                entry
                    .value()
                    .get(name)
                    .and_then(serde_json::Value::as_str)
                    .map(ToOwned::to_owned)
            })
    }

    fn send_text(&self, text: &str) -> Result<(), SendError> {
        let session = self.id.clone();
        self.context.send_text_with(
            &self.id,
            text,
            Box::new(move |result| {
                if let Err(error) = result {
                    warn!(session = %session, %error, "relayed text send failed");
                }
            }),
        );
        Ok(())
    }

    fn send_binary(&self, data: &[u8]) -> Result<(), SendError> {
        let session = self.id.clone();
        self.context.send_binary_with(
            &self.id,
            data,
            Box::new(move |result| {
                if let Err(error) = result {
                    warn!(session = %session, %error, "relayed binary send failed");
                }
            }),
        );
        Ok(())
    }
}

impl fmt::Debug for RemoteSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteSession")
            .field("id", &self.id)
            .field("properties", &self.properties.len())
            .finish_non_exhaustive()
    }
}
