//! Live, session-bound message consumers.
//!
//! A [`MessageSink`] pairs one compiled message binding with one open
//! session. The transport decodes an inbound frame to the sink's payload
//! type and feeds it in; the sink drives the invocation runtime, which
//! also sends any reply the method produced. Sinks are created when a
//! session opens and discarded when it closes.

use std::sync::Arc;

use tracing::warn;

use sockbind_core::payload::{ParamType, PayloadValue};
use sockbind_core::session::SessionHandle;

use crate::compiler::{MessageBinding, MessageKind};
use crate::invoker::EndpointRuntime;

/// Session-bound state shared by both sink variants.
#[derive(Clone, Debug)]
pub struct SinkState {
    runtime: Arc<EndpointRuntime>,
    session: SessionHandle,
    binding: MessageBinding,
}

/// Live consumer for one message binding on one session.
#[derive(Clone, Debug)]
pub enum MessageSink {
    /// Consumes complete messages.
    Whole(SinkState),
    /// Consumes message increments, each paired with a completion flag.
    Partial(SinkState),
}

impl MessageSink {
    pub(crate) fn new(
        runtime: Arc<EndpointRuntime>,
        session: SessionHandle,
        binding: MessageBinding,
    ) -> Self {
        let state = SinkState {
            runtime,
            session,
            binding,
        };
        match state.binding.kind() {
            MessageKind::Whole => Self::Whole(state),
            MessageKind::Partial => Self::Partial(state),
        }
    }

    fn state(&self) -> &SinkState {
        match self {
            Self::Whole(state) | Self::Partial(state) => state,
        }
    }

    /// Whole or partial consumption.
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        self.state().binding.kind()
    }

    /// Payload type the transport must decode inbound frames to.
    #[must_use]
    pub fn payload_type(&self) -> ParamType {
        self.state().binding.payload_type()
    }

    /// Largest accepted whole message in bytes; negative means unlimited.
    #[must_use]
    pub fn max_message_size(&self) -> i64 {
        self.state().binding.max_message_size()
    }

    /// Delivers one complete message.
    ///
    /// A partial sink receives it as a final increment.
    pub async fn deliver(&self, payload: PayloadValue) {
        match self {
            Self::Whole(state) => state.invoke(vec![payload]).await,
            Self::Partial(state) => {
                state
                    .invoke(vec![payload, PayloadValue::new(true)])
                    .await;
            }
        }
    }

    /// Delivers one increment of a message, `last` marking the final one.
    ///
    /// A whole sink cannot consume bare increments; the increment is
    /// dropped with a warning. Assembling increments into complete
    /// messages is the transport's job.
    pub async fn deliver_partial(&self, increment: PayloadValue, last: bool) {
        match self {
            Self::Partial(state) => {
                state
                    .invoke(vec![increment, PayloadValue::new(last)])
                    .await;
            }
            Self::Whole(state) => {
                warn!(
                    class = state.runtime.plan().class_name(),
                    method = state.binding.name(),
                    "dropping a message increment aimed at a whole-message consumer"
                );
            }
        }
    }
}

impl SinkState {
    async fn invoke(&self, payloads: Vec<PayloadValue>) {
        self.runtime
            .call(self.binding.binding(), &self.session, payloads)
            .await;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{HandlerClass, ParamDecl, no_reply, reply};
    use crate::compiler;
    use sockbind_core::config::EndpointConfig;
    use sockbind_core::provider::SingletonProvider;
    use sockbind_core::session::{ChannelSession, OutboundFrame};
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    fn sinks_for(class: &HandlerClass) -> (Vec<MessageSink>, mpsc::Receiver<OutboundFrame>) {
        let config = Arc::new(EndpointConfig::builder("/echo").build());
        let plan = compiler::compile(class, &config).unwrap();
        let runtime = Arc::new(EndpointRuntime::new(
            plan,
            config,
            Arc::new(SingletonProvider::new(())),
        ));
        let (session, rx) = ChannelSession::open(8);
        let handle = SessionHandle::new(session);
        let sinks = runtime
            .plan()
            .messages()
            .iter()
            .map(|binding| MessageSink::new(Arc::clone(&runtime), handle.clone(), binding.clone()))
            .collect();
        (sinks, rx)
    }

    #[tokio::test]
    async fn whole_sink_delivers_and_replies() {
        let class = HandlerClass::builder("Echo")
            .on_message(
                "speak",
                vec![ParamDecl::of::<String>()],
                |_, mut args| async move {
                    let text = args.take::<String>()?;
                    reply(text.to_uppercase())
                },
            )
            .build();
        let (sinks, mut rx) = sinks_for(&class);
        let [sink] = sinks.as_slice() else {
            panic!("expected one sink");
        };
        assert_eq!(sink.kind(), MessageKind::Whole);
        assert_eq!(sink.payload_type(), ParamType::of::<String>());

        sink.deliver(PayloadValue::new("hi".to_owned())).await;

        match rx.try_recv() {
            Ok(OutboundFrame::Text(text)) => assert_eq!(text, "HI"),
            other => panic!("unexpected outbound frame: {other:?}"),
        }
    }

    #[tokio::test]
    async fn partial_sink_forwards_the_completion_flag() {
        let increments: Arc<Mutex<Vec<(String, bool)>>> = Arc::default();
        let increments_in = Arc::clone(&increments);
        let class = HandlerClass::builder("Stream")
            .on_message(
                "chunk",
                vec![ParamDecl::of::<String>(), ParamDecl::of::<bool>()],
                move |_, mut args| {
                    let increments = Arc::clone(&increments_in);
                    async move {
                        let text = args.take::<String>()?;
                        let last = args.take::<bool>()?;
                        increments.lock().unwrap().push((text, last));
                        no_reply()
                    }
                },
            )
            .build();
        let (sinks, _rx) = sinks_for(&class);
        let sink = &sinks[0];
        assert_eq!(sink.kind(), MessageKind::Partial);

        sink.deliver_partial(PayloadValue::new("he".to_owned()), false)
            .await;
        sink.deliver_partial(PayloadValue::new("llo".to_owned()), true)
            .await;

        assert_eq!(
            *increments.lock().unwrap(),
            [("he".to_owned(), false), ("llo".to_owned(), true)]
        );
    }

    #[tokio::test]
    async fn whole_delivery_to_a_partial_sink_is_a_final_increment() {
        let increments: Arc<Mutex<Vec<(String, bool)>>> = Arc::default();
        let increments_in = Arc::clone(&increments);
        let class = HandlerClass::builder("Stream")
            .on_message(
                "chunk",
                vec![ParamDecl::of::<String>(), ParamDecl::of::<bool>()],
                move |_, mut args| {
                    let increments = Arc::clone(&increments_in);
                    async move {
                        let text = args.take::<String>()?;
                        let last = args.take::<bool>()?;
                        increments.lock().unwrap().push((text, last));
                        no_reply()
                    }
                },
            )
            .build();
        let (sinks, _rx) = sinks_for(&class);

        sinks[0].deliver(PayloadValue::new("all".to_owned())).await;

        assert_eq!(*increments.lock().unwrap(), [("all".to_owned(), true)]);
    }

    #[tokio::test]
    async fn increment_to_a_whole_sink_is_dropped() {
        let calls = Arc::new(Mutex::new(0_u32));
        let calls_in = Arc::clone(&calls);
        let class = HandlerClass::builder("Echo")
            .on_message("speak", vec![ParamDecl::of::<String>()], move |_, _| {
                let calls = Arc::clone(&calls_in);
                async move {
                    *calls.lock().unwrap() += 1;
                    no_reply()
                }
            })
            .build();
        let (sinks, _rx) = sinks_for(&class);

        sinks[0]
            .deliver_partial(PayloadValue::new("he".to_owned()), false)
            .await;

        assert_eq!(*calls.lock().unwrap(), 0);
    }
}
