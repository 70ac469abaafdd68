//! Session abstraction and the channel-backed reference implementation.
//!
//! The engine sees a connection only through [`Session`]: identity,
//! path-variable lookup and raw outbound send. Negotiation, timeouts and
//! buffering belong to the transport that owns the connection.

use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use uuid::Uuid;

use crate::error::SendError;

// ─────────────────────────────────────────────────────────────────────────────
// Close codes
// ─────────────────────────────────────────────────────────────────────────────

/// Close code carried in a close frame, RFC 6455 section 7.4.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "u16", from = "u16")]
pub enum CloseCode {
    /// 1000, the purpose for which the connection was established is done.
    NormalClosure,
    /// 1001, endpoint is going away.
    GoingAway,
    /// 1002, protocol error.
    ProtocolError,
    /// 1003, received a data type it cannot accept.
    CannotAccept,
    /// 1005, no status code was present (never sent on the wire).
    NoStatusCode,
    /// 1006, connection dropped without a close frame (never sent).
    ClosedAbnormally,
    /// 1007, message data inconsistent with its type.
    NotConsistent,
    /// 1008, message violated the endpoint policy.
    ViolatedPolicy,
    /// 1009, message too big to process.
    TooBig,
    /// 1010, client expected an extension the server did not negotiate.
    NoExtension,
    /// 1011, server hit an unexpected condition.
    UnexpectedCondition,
    /// 1012, service is restarting.
    ServiceRestart,
    /// 1013, try again later.
    TryAgainLater,
    /// 1015, TLS handshake failure (never sent).
    TlsHandshakeFailure,
    /// Any other registered or application-defined code.
    Other(u16),
}

impl CloseCode {
    /// Numeric code for this variant.
    #[must_use]
    pub fn code(self) -> u16 {
        match self {
            Self::NormalClosure => 1000,
            Self::GoingAway => 1001,
            Self::ProtocolError => 1002,
            Self::CannotAccept => 1003,
            Self::NoStatusCode => 1005,
            Self::ClosedAbnormally => 1006,
            Self::NotConsistent => 1007,
            Self::ViolatedPolicy => 1008,
            Self::TooBig => 1009,
            Self::NoExtension => 1010,
            Self::UnexpectedCondition => 1011,
            Self::ServiceRestart => 1012,
            Self::TryAgainLater => 1013,
            Self::TlsHandshakeFailure => 1015,
            Self::Other(code) => code,
        }
    }

    /// Variant for a numeric code.
    #[must_use]
    pub fn from_code(code: u16) -> Self {
        match code {
            1000 => Self::NormalClosure,
            1001 => Self::GoingAway,
            1002 => Self::ProtocolError,
            1003 => Self::CannotAccept,
            1005 => Self::NoStatusCode,
            1006 => Self::ClosedAbnormally,
            1007 => Self::NotConsistent,
            1008 => Self::ViolatedPolicy,
            1009 => Self::TooBig,
            1010 => Self::NoExtension,
            1011 => Self::UnexpectedCondition,
            1012 => Self::ServiceRestart,
            1013 => Self::TryAgainLater,
            1015 => Self::TlsHandshakeFailure,
            other => Self::Other(other),
        }
    }
}

impl From<CloseCode> for u16 {
    fn from(code: CloseCode) -> Self {
        code.code()
    }
}

impl From<u16> for CloseCode {
    fn from(code: u16) -> Self {
        CloseCode::from_code(code)
    }
}

/// Why a session closed, as delivered to close handlers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseReason {
    /// Close code sent or received on the wire.
    pub code: CloseCode,
    /// Optional human-readable explanation.
    pub phrase: String,
}

impl CloseReason {
    /// Builds a close reason.
    #[must_use]
    pub fn new(code: CloseCode, phrase: impl Into<String>) -> Self {
        Self {
            code,
            phrase: phrase.into(),
        }
    }

    /// Normal closure with an empty phrase.
    #[must_use]
    pub fn normal() -> Self {
        Self::new(CloseCode::NormalClosure, "")
    }
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.phrase.is_empty() {
            write!(f, "{}", self.code.code())
        } else {
            write!(f, "{}: {}", self.code.code(), self.phrase)
        }
    }
}

/// Pong payload delivered to message handlers that declare it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PongMessage {
    data: Bytes,
}

impl PongMessage {
    /// Wraps the application data echoed by the peer.
    #[must_use]
    pub fn new(data: Bytes) -> Self {
        Self { data }
    }

    /// The echoed application data.
    #[must_use]
    pub fn data(&self) -> &Bytes {
        &self.data
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// Peer-facing view of one live connection.
pub trait Session: Send + Sync {
    /// Stable identifier of this session.
    fn id(&self) -> &str;

    /// Value bound to a path variable during the handshake, if any.
    fn path_parameter(&self, name: &str) -> Option<String>;

    /// Queues a text frame for the peer.
    fn send_text(&self, text: &str) -> Result<(), SendError>;

    /// Queues a binary frame for the peer.
    fn send_binary(&self, data: &[u8]) -> Result<(), SendError>;
}

/// Cloneable session reference that handler methods accept as a parameter.
///
/// Signatures declare `SessionHandle` itself; parameter matching is by this
/// exact type, not by the underlying trait object.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<dyn Session>,
}

impl SessionHandle {
    /// Wraps a session implementation.
    #[must_use]
    pub fn new(inner: Arc<dyn Session>) -> Self {
        Self { inner }
    }
}

impl Deref for SessionHandle {
    type Target = dyn Session;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionHandle({})", self.inner.id())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ChannelSession
// ─────────────────────────────────────────────────────────────────────────────

/// One outbound frame as handed to the transport.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OutboundFrame {
    /// UTF-8 text frame.
    Text(String),
    /// Binary frame.
    Binary(Bytes),
}

/// Reference [`Session`] backed by a bounded mpsc channel.
///
/// Sends never block: a saturated channel drops the frame and reports
/// [`SendError::Full`] rather than stalling a handler.
pub struct ChannelSession {
    id: String,
    path: Mutex<HashMap<String, String>>,
    outbound: mpsc::Sender<OutboundFrame>,
}

impl ChannelSession {
    /// Wraps an existing outbound channel.
    #[must_use]
    pub fn new(id: impl Into<String>, outbound: mpsc::Sender<OutboundFrame>) -> Self {
        Self {
            id: id.into(),
            path: Mutex::new(HashMap::new()),
            outbound,
        }
    }

    /// Creates a session with a fresh id and its outbound receiver.
    #[must_use]
    pub fn open(capacity: usize) -> (Arc<Self>, mpsc::Receiver<OutboundFrame>) {
        let (tx, rx) = mpsc::channel(capacity);
        let session = Arc::new(Self::new(Uuid::now_v7().to_string(), tx));
        (session, rx)
    }

    /// Binds the path variables matched during the handshake.
    pub fn bind_path_parameters(&self, params: HashMap<String, String>) {
        *self.path.lock() = params;
    }

    fn push(&self, frame: OutboundFrame) -> Result<(), SendError> {
        self.outbound.try_send(frame).map_err(|err| match err {
            TrySendError::Full(_) => SendError::Full,
            TrySendError::Closed(_) => SendError::Closed,
        })
    }
}

impl Session for ChannelSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn path_parameter(&self, name: &str) -> Option<String> {
        self.path.lock().get(name).cloned()
    }

    fn send_text(&self, text: &str) -> Result<(), SendError> {
        self.push(OutboundFrame::Text(text.to_owned()))
    }

    fn send_binary(&self, data: &[u8]) -> Result<(), SendError> {
        self.push(OutboundFrame::Binary(Bytes::copy_from_slice(data)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn close_codes_round_trip() {
        for raw in [1000, 1001, 1006, 1011, 1015, 4000] {
            assert_eq!(CloseCode::from_code(raw).code(), raw);
        }
        assert_eq!(CloseCode::from_code(4000), CloseCode::Other(4000));
    }

    #[test]
    fn close_code_serializes_as_number() {
        let reason = CloseReason::new(CloseCode::GoingAway, "maintenance");
        let json = serde_json::to_value(&reason).unwrap();
        assert_eq!(json["code"], 1001);
        assert_eq!(json["phrase"], "maintenance");

        let back: CloseReason = serde_json::from_value(json).unwrap();
        assert_eq!(back, reason);
    }

    #[test]
    fn close_reason_display_omits_empty_phrase() {
        assert_eq!(CloseReason::normal().to_string(), "1000");
        assert_eq!(
            CloseReason::new(CloseCode::TooBig, "limit").to_string(),
            "1009: limit"
        );
    }

    #[tokio::test]
    async fn channel_session_delivers_frames() {
        let (session, mut rx) = ChannelSession::open(4);

        session.send_text("hello").unwrap();
        session.send_binary(b"\x01\x02").unwrap();

        assert_eq!(rx.recv().await.unwrap(), OutboundFrame::Text("hello".into()));
        assert_eq!(
            rx.recv().await.unwrap(),
            OutboundFrame::Binary(Bytes::from_static(b"\x01\x02"))
        );
    }

    #[tokio::test]
    async fn saturated_channel_reports_full() {
        let (session, _rx) = ChannelSession::open(1);

        session.send_text("one").unwrap();
        assert!(matches!(session.send_text("two"), Err(SendError::Full)));
    }

    #[tokio::test]
    async fn dropped_receiver_reports_closed() {
        let (session, rx) = ChannelSession::open(1);
        drop(rx);

        assert!(matches!(session.send_text("x"), Err(SendError::Closed)));
    }

    #[tokio::test]
    async fn path_parameters_are_bound_after_handshake() {
        let (session, _rx) = ChannelSession::open(1);
        assert_eq!(session.path_parameter("room"), None);

        session.bind_path_parameters(HashMap::from([("room".to_owned(), "42".to_owned())]));
        assert_eq!(session.path_parameter("room").as_deref(), Some("42"));
        assert_eq!(session.path_parameter("user"), None);
    }

    #[tokio::test]
    async fn open_generates_distinct_ids() {
        let (a, _rx_a) = ChannelSession::open(1);
        let (b, _rx_b) = ChannelSession::open(1);
        assert!(!a.id().is_empty());
        assert_ne!(a.id(), b.id());
    }

    #[tokio::test]
    async fn handle_derefs_to_session() {
        let (session, mut rx) = ChannelSession::open(1);
        let handle = SessionHandle::new(session);

        handle.send_text("via handle").unwrap();
        assert_eq!(
            rx.recv().await.unwrap(),
            OutboundFrame::Text("via handle".into())
        );
        assert!(format!("{handle:?}").starts_with("SessionHandle("));
    }
}
