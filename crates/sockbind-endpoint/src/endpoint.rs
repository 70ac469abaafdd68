//! The deployed endpoint the surrounding transport drives.
//!
//! [`BoundEndpoint`] glues a compiled plan to live sessions. Opening a
//! session creates one [`MessageSink`] per message binding and stores them
//! under the session id; the transport fetches them with [`sinks`] and
//! feeds decoded frames in. Closing a session runs the close handler,
//! discards its sinks, and releases its handler instance.
//!
//! [`sinks`]: BoundEndpoint::sinks

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::debug;

use sockbind_core::config::EndpointConfig;
use sockbind_core::error::{ErrorCause, ErrorCollector};
use sockbind_core::payload::PayloadValue;
use sockbind_core::provider::{InstanceProvider, SingletonProvider};
use sockbind_core::session::{CloseReason, SessionHandle};

use crate::class::HandlerClass;
use crate::compiler;
use crate::invoker::EndpointRuntime;
use crate::message::MessageSink;

/// A handler class bound to a path and ready to receive session events.
pub struct BoundEndpoint {
    runtime: Arc<EndpointRuntime>,
    sinks: DashMap<String, Vec<MessageSink>>,
}

impl BoundEndpoint {
    /// Binds `class` with `provider` supplying handler instances.
    ///
    /// The plan is built even when `collector` picks up configuration
    /// errors; the caller decides whether a flawed class still deploys.
    pub fn from_class(
        class: &HandlerClass,
        config: EndpointConfig,
        provider: Arc<dyn InstanceProvider>,
        collector: &mut ErrorCollector,
    ) -> Self {
        let config = Arc::new(config);
        let plan = compiler::compile_with(class, &config, collector);
        Self {
            runtime: Arc::new(EndpointRuntime::new(plan, config, provider)),
            sinks: DashMap::new(),
        }
    }

    /// Binds `class` with every session sharing `instance`.
    pub fn from_instance<T: Any + Send + Sync>(
        instance: T,
        class: &HandlerClass,
        config: EndpointConfig,
        collector: &mut ErrorCollector,
    ) -> Self {
        Self::from_class(
            class,
            config,
            Arc::new(SingletonProvider::new(instance)),
            collector,
        )
    }

    /// Bound endpoint configuration.
    #[must_use]
    pub fn config(&self) -> &Arc<EndpointConfig> {
        self.runtime.config()
    }

    /// Name of the handler class this endpoint dispatches to.
    #[must_use]
    pub fn class_name(&self) -> &str {
        self.runtime.plan().class_name()
    }

    /// Live sinks for `session_id`, in declaration order.
    ///
    /// Empty once the session has closed or was never opened here.
    #[must_use]
    pub fn sinks(&self, session_id: &str) -> Vec<MessageSink> {
        self.sinks
            .get(session_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Opens `session`: creates its message sinks, then invokes the open
    /// handler.
    ///
    /// Sinks are stored before the open handler runs, so a frame arriving
    /// while the handler is still executing already has a consumer.
    pub async fn on_open(&self, session: &SessionHandle) {
        let sinks: Vec<MessageSink> = self
            .runtime
            .plan()
            .messages()
            .iter()
            .map(|binding| {
                MessageSink::new(Arc::clone(&self.runtime), session.clone(), binding.clone())
            })
            .collect();
        debug!(
            class = self.class_name(),
            session = session.id(),
            sinks = sinks.len(),
            "session opened"
        );
        let _ = self.sinks.insert(session.id().to_owned(), sinks);

        if let Some(binding) = self.runtime.plan().open() {
            self.runtime.call(binding, session, Vec::new()).await;
        }
    }

    /// Closes `session`: invokes the close handler with `reason`, then
    /// discards the session's sinks and releases its handler instance.
    pub async fn on_close(&self, session: &SessionHandle, reason: CloseReason) {
        if let Some(binding) = self.runtime.plan().close() {
            self.runtime
                .call(binding, session, vec![PayloadValue::new(reason)])
                .await;
        }
        let _ = self.sinks.remove(session.id());
        self.runtime.provider().release(session);
        debug!(
            class = self.class_name(),
            session = session.id(),
            "session closed"
        );
    }

    /// Routes `cause` to the error handler, or logs it when none is bound.
    pub async fn on_error(&self, session: &SessionHandle, cause: ErrorCause) {
        self.runtime.report_error(session, cause).await;
    }
}

impl fmt::Debug for BoundEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundEndpoint")
            .field("class", &self.class_name())
            .field("sessions", &self.sinks.len())
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
