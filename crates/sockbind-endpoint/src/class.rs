//! Registration-time description of a handler class.
//!
//! Nothing here is reflective. A [`HandlerClass`] is an explicit list of
//! [`HandlerMethod`]s: a lifecycle or message marker, the declared
//! parameters in order, and a type-erased async body. The binding compiler
//! turns this description into an immutable plan; after that the class
//! itself is no longer consulted.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use sockbind_core::payload::{Args, ParamType, PayloadValue};
use sockbind_core::provider::InstanceRef;

/// Error type a method body may fail with.
pub type HandlerFault = Box<dyn std::error::Error + Send + Sync>;

/// Future returned by a method body.
pub type MethodFuture = BoxFuture<'static, Result<Option<PayloadValue>, HandlerFault>>;

/// Type-erased, shareable method body.
pub type MethodBody = Arc<dyn Fn(InstanceRef, Args) -> MethodFuture + Send + Sync>;

/// Boxes an async closure into a shareable method body.
pub fn into_body<F, Fut>(body: F) -> MethodBody
where
    F: Fn(InstanceRef, Args) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Option<PayloadValue>, HandlerFault>> + Send + 'static,
{
    Arc::new(move |instance, args| Box::pin(body(instance, args)))
}

/// Body result carrying a reply for the peer.
pub fn reply<T: Any + Send>(value: T) -> Result<Option<PayloadValue>, HandlerFault> {
    Ok(Some(PayloadValue::new(value)))
}

/// Body result with nothing to send back.
pub fn no_reply() -> Result<Option<PayloadValue>, HandlerFault> {
    Ok(None)
}

// ─────────────────────────────────────────────────────────────────────────────
// Markers and parameters
// ─────────────────────────────────────────────────────────────────────────────

/// Which endpoint event a method is registered for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Marker {
    /// Runs once when a session opens.
    OnOpen,
    /// Runs once when a session closes.
    OnClose,
    /// Runs when a failure is routed to the endpoint.
    OnError,
    /// Runs for inbound messages.
    OnMessage {
        /// Largest accepted whole message in bytes; negative means unlimited.
        max_message_size: i64,
    },
}

/// One declared parameter of a handler method.
#[derive(Clone, Debug)]
pub struct ParamDecl {
    ty: ParamType,
    path_variable: Option<String>,
}

impl ParamDecl {
    /// Plain parameter of type `T`.
    #[must_use]
    pub fn of<T: Any>() -> Self {
        Self {
            ty: ParamType::of::<T>(),
            path_variable: None,
        }
    }

    /// Parameter bound to path variable `name`, decoded as `T`.
    #[must_use]
    pub fn path<T: Any>(name: impl Into<String>) -> Self {
        Self {
            ty: ParamType::of::<T>(),
            path_variable: Some(name.into()),
        }
    }

    /// Declared type token.
    #[must_use]
    pub fn ty(&self) -> ParamType {
        self.ty
    }

    /// Path variable name, when this parameter carries the path marker.
    #[must_use]
    pub fn path_variable(&self) -> Option<&str> {
        self.path_variable.as_deref()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Methods and classes
// ─────────────────────────────────────────────────────────────────────────────

/// One registered handler method.
#[derive(Clone)]
pub struct HandlerMethod {
    name: String,
    marker: Marker,
    params: Vec<ParamDecl>,
    body: MethodBody,
}

impl HandlerMethod {
    /// Describes a method.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        marker: Marker,
        params: Vec<ParamDecl>,
        body: MethodBody,
    ) -> Self {
        Self {
            name: name.into(),
            marker,
            params,
            body,
        }
    }

    /// Method name, used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Event this method is registered for.
    #[must_use]
    pub fn marker(&self) -> Marker {
        self.marker
    }

    /// Declared parameters, in order.
    #[must_use]
    pub fn params(&self) -> &[ParamDecl] {
        &self.params
    }

    pub(crate) fn body(&self) -> &MethodBody {
        &self.body
    }
}

impl fmt::Debug for HandlerMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerMethod")
            .field("name", &self.name)
            .field("marker", &self.marker)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}

/// Registration-time description of a handler class.
///
/// Method order is declaration order. When two methods claim the same
/// lifecycle event the earlier one stays bound and the later is reported
/// as a configuration error.
pub struct HandlerClass {
    name: String,
    methods: Vec<HandlerMethod>,
}

impl HandlerClass {
    /// Starts a builder for a class named `name`.
    #[must_use]
    pub fn builder(name: impl Into<String>) -> HandlerClassBuilder {
        HandlerClassBuilder {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    /// Class name, used in diagnostics.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registered methods, in declaration order.
    #[must_use]
    pub fn methods(&self) -> &[HandlerMethod] {
        &self.methods
    }
}

impl fmt::Debug for HandlerClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerClass")
            .field("name", &self.name)
            .field("methods", &self.methods)
            .finish()
    }
}

/// Builder for [`HandlerClass`].
pub struct HandlerClassBuilder {
    name: String,
    methods: Vec<HandlerMethod>,
}

impl HandlerClassBuilder {
    /// Adds a fully described method.
    #[must_use]
    pub fn method(mut self, method: HandlerMethod) -> Self {
        self.methods.push(method);
        self
    }

    /// Adds an open method.
    #[must_use]
    pub fn on_open<F, Fut>(self, name: impl Into<String>, params: Vec<ParamDecl>, body: F) -> Self
    where
        F: Fn(InstanceRef, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<PayloadValue>, HandlerFault>> + Send + 'static,
    {
        self.method(HandlerMethod::new(
            name,
            Marker::OnOpen,
            params,
            into_body(body),
        ))
    }

    /// Adds a close method.
    #[must_use]
    pub fn on_close<F, Fut>(self, name: impl Into<String>, params: Vec<ParamDecl>, body: F) -> Self
    where
        F: Fn(InstanceRef, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<PayloadValue>, HandlerFault>> + Send + 'static,
    {
        self.method(HandlerMethod::new(
            name,
            Marker::OnClose,
            params,
            into_body(body),
        ))
    }

    /// Adds an error method.
    #[must_use]
    pub fn on_error<F, Fut>(self, name: impl Into<String>, params: Vec<ParamDecl>, body: F) -> Self
    where
        F: Fn(InstanceRef, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<PayloadValue>, HandlerFault>> + Send + 'static,
    {
        self.method(HandlerMethod::new(
            name,
            Marker::OnError,
            params,
            into_body(body),
        ))
    }

    /// Adds a message method with no size limit.
    #[must_use]
    pub fn on_message<F, Fut>(
        self,
        name: impl Into<String>,
        params: Vec<ParamDecl>,
        body: F,
    ) -> Self
    where
        F: Fn(InstanceRef, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<PayloadValue>, HandlerFault>> + Send + 'static,
    {
        self.on_message_with_limit(name, -1, params, body)
    }

    /// Adds a message method accepting at most `max_message_size` bytes.
    #[must_use]
    pub fn on_message_with_limit<F, Fut>(
        self,
        name: impl Into<String>,
        max_message_size: i64,
        params: Vec<ParamDecl>,
        body: F,
    ) -> Self
    where
        F: Fn(InstanceRef, Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Option<PayloadValue>, HandlerFault>> + Send + 'static,
    {
        self.method(HandlerMethod::new(
            name,
            Marker::OnMessage { max_message_size },
            params,
            into_body(body),
        ))
    }

    /// Finalizes the class description.
    #[must_use]
    pub fn build(self) -> HandlerClass {
        HandlerClass {
            name: self.name,
            methods: self.methods,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use sockbind_core::session::SessionHandle;

    #[test]
    fn builder_keeps_declaration_order() {
        let class = HandlerClass::builder("Chat")
            .on_open("joined", vec![], |_, _| async { no_reply() })
            .on_message("speak", vec![ParamDecl::of::<String>()], |_, _| async {
                no_reply()
            })
            .on_close("left", vec![], |_, _| async { no_reply() })
            .build();

        assert_eq!(class.name(), "Chat");
        let names: Vec<_> = class.methods().iter().map(HandlerMethod::name).collect();
        assert_eq!(names, ["joined", "speak", "left"]);
        assert_eq!(class.methods()[0].marker(), Marker::OnOpen);
        assert_eq!(
            class.methods()[1].marker(),
            Marker::OnMessage {
                max_message_size: -1
            }
        );
    }

    #[test]
    fn param_decl_records_path_variable() {
        let plain = ParamDecl::of::<SessionHandle>();
        assert_eq!(plain.path_variable(), None);

        let bound = ParamDecl::path::<i32>("room");
        assert_eq!(bound.path_variable(), Some("room"));
        assert_eq!(bound.ty(), ParamType::of::<i32>());
    }

    #[tokio::test]
    async fn into_body_round_trips_arguments() {
        let body = into_body(|_, mut args: Args| async move {
            let text = args.take::<String>()?;
            reply(format!("got {text}"))
        });

        let instance: InstanceRef = Arc::new(());
        let out = body(instance, Args::new(vec![PayloadValue::new("it".to_owned())]))
            .await
            .unwrap();
        assert_eq!(
            out.unwrap().downcast::<String>().unwrap(),
            "got it"
        );
    }

    #[test]
    fn debug_output_is_structural() {
        let class = HandlerClass::builder("Feed")
            .on_open("hello", vec![], |_, _| async { no_reply() })
            .build();
        let text = format!("{class:?}");
        assert!(text.contains("Feed"));
        assert!(text.contains("hello"));
        assert!(text.contains("OnOpen"));
    }
}
