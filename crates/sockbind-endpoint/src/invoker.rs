//! Runtime invocation of bound methods.
//!
//! [`EndpointRuntime`] owns everything a dispatch needs: the compiled plan,
//! the endpoint configuration, and the instance provider. Invoking a
//! binding pulls one argument per extractor, runs the type-erased body, and
//! sends a reply if the body produced one. Any failure along that path
//! routes to the class's error binding exactly once; a failure inside the
//! error binding itself only logs.

use std::fmt;
use std::sync::Arc;

use futures::future::BoxFuture;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use sockbind_core::codec::EncoderEntry;
use sockbind_core::config::EndpointConfig;
use sockbind_core::error::{ErrorCause, ExtractError, InstanceError, SendError};
use sockbind_core::payload::{Args, PayloadValue};
use sockbind_core::provider::InstanceProvider;
use sockbind_core::session::SessionHandle;

use crate::class::HandlerFault;
use crate::compiler::{BindingPlan, MethodBinding};
use crate::extractor::ExtractContext;

/// Failure while invoking one bound method.
#[derive(Debug, Error)]
pub(crate) enum InvocationError {
    /// The provider could not supply a handler instance.
    #[error(transparent)]
    Instance(#[from] InstanceError),

    /// An extractor could not produce an argument.
    #[error("extracting arguments for '{method}' failed: {source}")]
    Extract {
        /// Method whose arguments were being pulled.
        method: String,
        /// Underlying extraction failure.
        #[source]
        source: ExtractError,
    },

    /// The method body returned an error.
    #[error("handler '{method}' failed: {fault}")]
    Handler {
        /// Method that failed.
        method: String,
        /// Error the body returned.
        fault: HandlerFault,
    },

    /// The reply the body produced could not be sent.
    #[error("sending the reply of '{method}' failed: {source}")]
    Reply {
        /// Method whose reply was being sent.
        method: String,
        /// Underlying send failure.
        #[source]
        source: SendError,
    },
}

impl InvocationError {
    /// Unwraps to the cause an error handler should observe.
    ///
    /// A fault returned by the body surfaces as-is, so handlers can
    /// downcast to their own error types; infrastructure failures surface
    /// as the typed error that describes them.
    fn into_cause(self) -> ErrorCause {
        match self {
            Self::Instance(error) => Arc::new(error),
            Self::Extract { source, .. } => Arc::new(source),
            Self::Handler { fault, .. } => Arc::from(fault),
            Self::Reply { source, .. } => Arc::new(source),
        }
    }
}

/// Shared invocation state for one deployed handler class.
pub(crate) struct EndpointRuntime {
    plan: BindingPlan,
    config: Arc<EndpointConfig>,
    provider: Arc<dyn InstanceProvider>,
}

impl EndpointRuntime {
    pub(crate) fn new(
        plan: BindingPlan,
        config: Arc<EndpointConfig>,
        provider: Arc<dyn InstanceProvider>,
    ) -> Self {
        Self {
            plan,
            config,
            provider,
        }
    }

    pub(crate) fn plan(&self) -> &BindingPlan {
        &self.plan
    }

    pub(crate) fn config(&self) -> &Arc<EndpointConfig> {
        &self.config
    }

    pub(crate) fn provider(&self) -> &Arc<dyn InstanceProvider> {
        &self.provider
    }

    /// Invokes `binding` with `payloads`, routing any failure to the error
    /// binding.
    pub(crate) async fn call(
        &self,
        binding: &MethodBinding,
        session: &SessionHandle,
        payloads: Vec<PayloadValue>,
    ) {
        if let Err(error) = self.invoke(binding, session, payloads).await {
            warn!(
                class = self.plan.class_name(),
                method = binding.name(),
                %error,
                "handler invocation failed"
            );
            self.report_error(session, error.into_cause()).await;
        }
    }

    /// Hands `cause` to the error binding, or logs when there is none.
    ///
    /// Boxed so the error path can nest under [`Self::call`] without making
    /// the future type recursive. The error binding runs without routing:
    /// if it fails too, the failure stops at a log line.
    pub(crate) fn report_error<'a>(
        &'a self,
        session: &'a SessionHandle,
        cause: ErrorCause,
    ) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            let Some(binding) = self.plan.error() else {
                warn!(
                    class = self.plan.class_name(),
                    %cause,
                    "no error handler bound, dropping the failure"
                );
                return;
            };
            let payloads = vec![PayloadValue::new(cause)];
            if let Err(error) = self.invoke(binding, session, payloads).await {
                warn!(
                    class = self.plan.class_name(),
                    method = binding.name(),
                    %error,
                    "error handler itself failed"
                );
            }
        })
    }

    #[instrument(
        skip_all,
        fields(class = self.plan.class_name(), method = binding.name(), session = session.id())
    )]
    async fn invoke(
        &self,
        binding: &MethodBinding,
        session: &SessionHandle,
        payloads: Vec<PayloadValue>,
    ) -> Result<(), InvocationError> {
        debug!(payloads = payloads.len(), "invoking handler");
        let instance = self.provider.instance(session)?;

        let mut slots: Vec<Option<PayloadValue>> = payloads.into_iter().map(Some).collect();
        let mut cx = ExtractContext {
            session,
            config: &self.config,
            payloads: &mut slots,
        };
        let mut values = Vec::with_capacity(binding.extractors().len());
        for extractor in binding.extractors() {
            let value = extractor
                .extract(&mut cx)
                .map_err(|source| InvocationError::Extract {
                    method: binding.name().to_owned(),
                    source,
                })?;
            values.push(value);
        }

        let body = binding.method().body();
        match body(instance, Args::new(values)).await {
            Ok(Some(reply)) => {
                self.send_reply(session, &reply)
                    .map_err(|source| InvocationError::Reply {
                        method: binding.name().to_owned(),
                        source,
                    })
            }
            Ok(None) => Ok(()),
            Err(fault) => Err(InvocationError::Handler {
                method: binding.name().to_owned(),
                fault,
            }),
        }
    }

    /// Encodes a handler result and sends it back on the session.
    fn send_reply(&self, session: &SessionHandle, reply: &PayloadValue) -> Result<(), SendError> {
        let ty = reply.param_type();
        let Some(entry) = self.config.codecs().encoder_for(ty) else {
            return Err(SendError::NoEncoder { ty: ty.name() });
        };
        match entry {
            EncoderEntry::Text(encoder) => session.send_text(&encoder.encode(reply)?),
            EncoderEntry::Binary(encoder) => session.send_binary(&encoder.encode(reply)?),
            EncoderEntry::TextStream(encoder) => {
                let mut text = String::new();
                encoder.encode(reply, &mut text)?;
                session.send_text(&text)
            }
            EncoderEntry::BinaryStream(encoder) => {
                let mut data = Vec::new();
                encoder.encode(reply, &mut data)?;
                session.send_binary(&data)
            }
        }
    }
}

impl fmt::Debug for EndpointRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointRuntime")
            .field("class", &self.plan.class_name())
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
