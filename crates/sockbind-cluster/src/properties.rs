//! Session properties replicated across the cluster.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// Well-known keys of the distributed session property map.
///
/// The owning node populates these at session open; every other node reads
/// them to reconstruct a remote view of the session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributedMapKey {
    /// Subprotocol agreed during the handshake.
    NegotiatedSubprotocol,
    /// Extensions agreed during the handshake.
    NegotiatedExtensions,
    /// Whether the session runs over a secure transport.
    Secure,
    /// Idle timeout in milliseconds.
    MaxIdleTimeout,
    /// Largest accepted binary message in bytes.
    MaxBinaryMessageBufferSize,
    /// Largest accepted text message in bytes.
    MaxTextMessageBufferSize,
    /// URI the handshake requested.
    RequestUri,
    /// Query parameters of the handshake request.
    RequestParameterMap,
    /// Raw query string of the handshake request.
    QueryString,
    /// Path variables matched against the endpoint's path template.
    PathParameters,
    /// Authenticated principal name, when any.
    UserPrincipal,
    /// Transport-level connection properties.
    ConnectionProperties,
    /// Free-form application properties.
    UserProperties,
}

/// Shared, replicated property map of one session.
pub type SessionProperties = Arc<DashMap<DistributedMapKey, serde_json::Value>>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_serialize_snake_case() {
        let json = serde_json::to_string(&DistributedMapKey::PathParameters).unwrap();
        assert_eq!(json, "\"path_parameters\"");

        let back: DistributedMapKey = serde_json::from_str("\"max_idle_timeout\"").unwrap();
        assert_eq!(back, DistributedMapKey::MaxIdleTimeout);
    }

    #[test]
    fn map_stores_heterogeneous_values() {
        let properties: SessionProperties = Arc::new(DashMap::new());
        let _ = properties.insert(DistributedMapKey::Secure, serde_json::Value::Bool(true));
        let _ = properties.insert(
            DistributedMapKey::QueryString,
            serde_json::Value::String("room=lobby".to_owned()),
        );

        assert_eq!(properties.len(), 2);
        assert_eq!(
            properties
                .get(&DistributedMapKey::Secure)
                .map(|value| value.value().clone()),
            Some(serde_json::Value::Bool(true))
        );
    }
}
