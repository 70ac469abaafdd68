//! The binding compiler: handler class in, immutable binding plan out.
//!
//! Compilation walks the registered methods in declaration order and
//! resolves every parameter to an extractor. Lifecycle events bind at most
//! one method each; the first declaration wins and later claims are
//! collected as configuration errors. Message methods classify as whole or
//! partial from their unresolved-parameter shape. Nothing about a
//! [`BindingPlan`] changes after this pass, and compiling the same class
//! twice yields a structurally identical plan.

use std::fmt;

use tracing::{debug, warn};

use sockbind_core::config::EndpointConfig;
use sockbind_core::error::{ConfigError, ConfigErrors, ErrorCause, ErrorCollector};
use sockbind_core::payload::ParamType;
use sockbind_core::session::CloseReason;

use crate::checker::SignatureChecker;
use crate::class::{HandlerClass, HandlerMethod, Marker};
use crate::extractor::{Extractor, ResolvedParams, resolve_params};

// ─────────────────────────────────────────────────────────────────────────────
// Plan types
// ─────────────────────────────────────────────────────────────────────────────

/// How a message binding receives its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageKind {
    /// One complete message per invocation.
    Whole,
    /// Increments of one message, each paired with a completion flag.
    Partial,
}

/// One bound method: the registered body plus its sealed extractor list.
#[derive(Clone)]
pub struct MethodBinding {
    method: HandlerMethod,
    extractors: Vec<Extractor>,
}

impl MethodBinding {
    /// Name of the bound method.
    #[must_use]
    pub fn name(&self) -> &str {
        self.method.name()
    }

    /// Extractors in parameter order.
    #[must_use]
    pub fn extractors(&self) -> &[Extractor] {
        &self.extractors
    }

    pub(crate) fn method(&self) -> &HandlerMethod {
        &self.method
    }
}

impl fmt::Debug for MethodBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodBinding")
            .field("method", &self.method.name())
            .field("extractors", &self.extractors)
            .finish()
    }
}

/// A bound message method together with its classification.
#[derive(Clone, Debug)]
pub struct MessageBinding {
    binding: MethodBinding,
    kind: MessageKind,
    payload_type: ParamType,
    max_message_size: i64,
}

impl MessageBinding {
    /// Name of the bound method.
    #[must_use]
    pub fn name(&self) -> &str {
        self.binding.name()
    }

    /// Whole or partial delivery.
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// Payload type the method consumes.
    #[must_use]
    pub fn payload_type(&self) -> ParamType {
        self.payload_type
    }

    /// Largest accepted whole message in bytes; negative means unlimited.
    #[must_use]
    pub fn max_message_size(&self) -> i64 {
        self.max_message_size
    }

    pub(crate) fn binding(&self) -> &MethodBinding {
        &self.binding
    }
}

/// Immutable dispatch plan for one handler class.
#[derive(Debug, Default)]
pub struct BindingPlan {
    class_name: String,
    open: Option<MethodBinding>,
    close: Option<MethodBinding>,
    error: Option<MethodBinding>,
    messages: Vec<MessageBinding>,
}

impl BindingPlan {
    /// Name of the class this plan was compiled from.
    #[must_use]
    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// Binding invoked when a session opens.
    #[must_use]
    pub fn open(&self) -> Option<&MethodBinding> {
        self.open.as_ref()
    }

    /// Binding invoked when a session closes.
    #[must_use]
    pub fn close(&self) -> Option<&MethodBinding> {
        self.close.as_ref()
    }

    /// Binding invoked when a failure routes to the endpoint.
    #[must_use]
    pub fn error(&self) -> Option<&MethodBinding> {
        self.error.as_ref()
    }

    /// Message bindings, in declaration order.
    #[must_use]
    pub fn messages(&self) -> &[MessageBinding] {
        &self.messages
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Compilation
// ─────────────────────────────────────────────────────────────────────────────

/// Compiles `class` into a plan, failing on any configuration error.
pub fn compile(class: &HandlerClass, config: &EndpointConfig) -> Result<BindingPlan, ConfigErrors> {
    let mut collector = ErrorCollector::new();
    let plan = compile_with(class, config, &mut collector);
    collector.into_result().map(|()| plan)
}

/// Compiles `class` into a plan, accumulating errors in `collector`.
///
/// The plan is returned even when errors were collected; the caller owns
/// the decision to deploy it or not.
pub fn compile_with(
    class: &HandlerClass,
    config: &EndpointConfig,
    collector: &mut ErrorCollector,
) -> BindingPlan {
    let checker = SignatureChecker::new(class.name(), config.codecs());
    let mut plan = BindingPlan {
        class_name: class.name().to_owned(),
        ..BindingPlan::default()
    };

    for method in class.methods() {
        match method.marker() {
            Marker::OnOpen => {
                bind_open(&mut plan, class.name(), method, &checker, collector);
            }
            Marker::OnClose => {
                bind_close(&mut plan, class.name(), method, &checker, collector);
            }
            Marker::OnError => {
                bind_error(&mut plan, class.name(), method, collector);
            }
            Marker::OnMessage { max_message_size } => {
                bind_message(
                    &mut plan,
                    class.name(),
                    method,
                    max_message_size,
                    &checker,
                    collector,
                );
            }
        }
    }

    debug!(
        class = %plan.class_name,
        open = plan.open.is_some(),
        close = plan.close.is_some(),
        error = plan.error.is_some(),
        messages = plan.messages.len(),
        collected = collector.errors().len(),
        "handler class bound"
    );
    plan
}

/// Seals resolved parameters into an extractor list.
///
/// A slot that stayed unresolved binds to its own position; if a plan with
/// collected errors is invoked anyway, the pull fails and routes like any
/// other invocation fault.
fn seal(method: &HandlerMethod, resolved: ResolvedParams) -> MethodBinding {
    let extractors = resolved
        .extractors
        .into_iter()
        .enumerate()
        .map(|(position, slot)| slot.unwrap_or(Extractor::Payload { index: position }))
        .collect();
    MethodBinding {
        method: method.clone(),
        extractors,
    }
}

fn duplicate(
    class_name: &str,
    kind: &'static str,
    kept: &MethodBinding,
    ignored: &HandlerMethod,
) -> ConfigError {
    ConfigError::DuplicateHandler {
        class: class_name.to_owned(),
        kind,
        kept: kept.name().to_owned(),
        ignored: ignored.name().to_owned(),
    }
}

fn bind_open(
    plan: &mut BindingPlan,
    class_name: &str,
    method: &HandlerMethod,
    checker: &SignatureChecker<'_>,
    collector: &mut ErrorCollector,
) {
    if let Some(bound) = &plan.open {
        collector.push(duplicate(class_name, "open", bound, method));
        return;
    }
    let resolved = resolve_params(class_name, method, &[], collector);
    checker.check_lifecycle(method, &resolved.unresolved, collector);
    plan.open = Some(seal(method, resolved));
}

fn bind_close(
    plan: &mut BindingPlan,
    class_name: &str,
    method: &HandlerMethod,
    checker: &SignatureChecker<'_>,
    collector: &mut ErrorCollector,
) {
    if let Some(bound) = &plan.close {
        collector.push(duplicate(class_name, "close", bound, method));
        return;
    }
    let close_reason = ParamType::of::<CloseReason>();
    let mut resolved = resolve_params(class_name, method, &[close_reason], collector);

    // Legacy tolerance: a close method with exactly one leftover parameter
    // gets it bound as the close payload even though its type is not
    // CloseReason (that type would have resolved as a capability already).
    // The pull then fails inside the body and routes to the error path.
    if resolved.unresolved.len() == 1 {
        if let Some((&position, &ty)) = resolved.unresolved.iter().next() {
            debug!(
                class = class_name,
                method = method.name(),
                ty = ty.name(),
                "tolerating sole unresolved close parameter as the close payload"
            );
            resolved.extractors[position] = Some(Extractor::Payload { index: 0 });
            resolved.unresolved.clear();
        }
    }

    checker.check_lifecycle(method, &resolved.unresolved, collector);
    plan.close = Some(seal(method, resolved));
}

fn bind_error(
    plan: &mut BindingPlan,
    class_name: &str,
    method: &HandlerMethod,
    collector: &mut ErrorCollector,
) {
    if let Some(bound) = &plan.error {
        collector.push(duplicate(class_name, "error", bound, method));
        return;
    }
    let mut resolved = resolve_params(class_name, method, &[], collector);
    let leftover: Vec<(usize, ParamType)> = resolved
        .unresolved
        .iter()
        .map(|(&position, &ty)| (position, ty))
        .collect();

    match leftover.as_slice() {
        [] => {
            plan.error = Some(seal(method, resolved));
        }
        [(position, ty)] if *ty == ParamType::of::<ErrorCause>() => {
            resolved.extractors[*position] = Some(Extractor::Payload { index: 0 });
            resolved.unresolved.clear();
            plan.error = Some(seal(method, resolved));
        }
        _ => {
            // Not a configuration error: the method is skipped, the class
            // stays deployable without an error handler.
            warn!(
                class = class_name,
                method = method.name(),
                "cannot determine the cause parameter of the error method, ignoring it"
            );
        }
    }
}

fn bind_message(
    plan: &mut BindingPlan,
    class_name: &str,
    method: &HandlerMethod,
    max_message_size: i64,
    checker: &SignatureChecker<'_>,
    collector: &mut ErrorCollector,
) {
    let mut resolved = resolve_params(class_name, method, &[], collector);
    let leftover: Vec<(usize, ParamType)> = resolved
        .unresolved
        .iter()
        .map(|(&position, &ty)| (position, ty))
        .collect();

    let classified = match leftover.as_slice() {
        [(position, ty)] => {
            resolved.extractors[*position] = Some(Extractor::Payload { index: 0 });
            Some((MessageKind::Whole, *ty))
        }
        [first, second] => {
            // The bool-typed leftover is the completion flag no matter
            // which position it holds; the other one is the payload.
            let bool_ty = ParamType::of::<bool>();
            let (payload, flag) = if first.1 == bool_ty {
                (*second, *first)
            } else {
                (*first, *second)
            };
            if flag.1 == bool_ty {
                resolved.extractors[payload.0] = Some(Extractor::Payload { index: 0 });
                resolved.extractors[flag.0] = Some(Extractor::Payload { index: 1 });
                Some((MessageKind::Partial, payload.1))
            } else {
                collector.push(ConfigError::WrongMessageArity {
                    class: class_name.to_owned(),
                    method: method.name().to_owned(),
                    count: 2,
                });
                None
            }
        }
        other => {
            collector.push(ConfigError::WrongMessageArity {
                class: class_name.to_owned(),
                method: method.name().to_owned(),
                count: other.len(),
            });
            None
        }
    };

    if let Some((kind, payload_type)) = classified {
        resolved.unresolved.clear();
        checker.check_message(method, kind, payload_type, collector);
        plan.messages.push(MessageBinding {
            binding: seal(method, resolved),
            kind,
            payload_type,
            max_message_size,
        });
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::{ParamDecl, no_reply, reply};
    use bytes::Bytes;
    use sockbind_core::session::SessionHandle;
    use std::sync::Arc;

    fn config() -> EndpointConfig {
        EndpointConfig::builder("/chat/{room}").build()
    }

    fn compile_clean(class: &HandlerClass) -> BindingPlan {
        match compile(class, &config()) {
            Ok(plan) => plan,
            Err(batch) => panic!("unexpected configuration errors: {batch}"),
        }
    }

    // ── Lifecycle binding ───────────────────────────────────────────

    #[test]
    fn binds_each_lifecycle_event_once() {
        let class = HandlerClass::builder("Chat")
            .on_open(
                "joined",
                vec![ParamDecl::of::<SessionHandle>()],
                |_, _| async { no_reply() },
            )
            .on_close(
                "left",
                vec![ParamDecl::of::<sockbind_core::session::CloseReason>()],
                |_, _| async { no_reply() },
            )
            .on_error(
                "failed",
                vec![ParamDecl::of::<ErrorCause>()],
                |_, _| async { no_reply() },
            )
            .build();

        let plan = compile_clean(&class);
        assert_eq!(plan.class_name(), "Chat");
        assert_eq!(plan.open().unwrap().name(), "joined");
        assert_eq!(plan.close().unwrap().name(), "left");
        assert_eq!(plan.error().unwrap().name(), "failed");
        assert_eq!(plan.open().unwrap().extractors(), [Extractor::Session]);
        assert_eq!(
            plan.close().unwrap().extractors(),
            [Extractor::Capability {
                target: ParamType::of::<CloseReason>()
            }]
        );
        assert_eq!(
            plan.error().unwrap().extractors(),
            [Extractor::Payload { index: 0 }]
        );
    }

    #[test]
    fn first_open_method_wins_and_the_duplicate_is_collected() {
        let class = HandlerClass::builder("Chat")
            .on_open("first", vec![], |_, _| async { no_reply() })
            .on_open("second", vec![], |_, _| async { no_reply() })
            .build();

        let mut collector = ErrorCollector::new();
        let plan = compile_with(&class, &config(), &mut collector);

        assert_eq!(plan.open().unwrap().name(), "first");
        match collector.errors() {
            [ConfigError::DuplicateHandler { kind, kept, ignored, .. }] => {
                assert_eq!(*kind, "open");
                assert_eq!(kept, "first");
                assert_eq!(ignored, "second");
            }
            other => panic!("unexpected errors: {other:?}"),
        }
    }

    #[test]
    fn duplicate_close_and_error_methods_are_collected_too() {
        let class = HandlerClass::builder("Chat")
            .on_close("a", vec![], |_, _| async { no_reply() })
            .on_close("b", vec![], |_, _| async { no_reply() })
            .on_error("c", vec![], |_, _| async { no_reply() })
            .on_error("d", vec![], |_, _| async { no_reply() })
            .build();

        let mut collector = ErrorCollector::new();
        let plan = compile_with(&class, &config(), &mut collector);

        assert_eq!(plan.close().unwrap().name(), "a");
        assert_eq!(plan.error().unwrap().name(), "c");
        assert_eq!(collector.errors().len(), 2);
    }

    #[test]
    fn open_with_path_variable_and_config_resolves() {
        let class = HandlerClass::builder("Chat")
            .on_open(
                "joined",
                vec![
                    ParamDecl::path::<i32>("room"),
                    ParamDecl::of::<Arc<EndpointConfig>>(),
                ],
                |_, _| async { no_reply() },
            )
            .build();

        let plan = compile_clean(&class);
        assert_eq!(
            plan.open().unwrap().extractors(),
            [
                Extractor::PathVariable {
                    name: "room".to_owned(),
                    target: ParamType::of::<i32>()
                },
                Extractor::Config,
            ]
        );
    }

    #[test]
    fn open_with_an_unresolvable_parameter_fails_compilation() {
        let class = HandlerClass::builder("Chat")
            .on_open("joined", vec![ParamDecl::of::<String>()], |_, _| async {
                no_reply()
            })
            .build();

        let batch = compile(&class, &config()).unwrap_err();
        assert!(matches!(
            batch.errors(),
            [ConfigError::UnresolvedParam { position: 0, .. }]
        ));
    }

    // ── Close tolerance ─────────────────────────────────────────────

    #[test]
    fn sole_unresolved_close_parameter_is_tolerated_as_payload() {
        let class = HandlerClass::builder("Chat")
            .on_close(
                "left",
                vec![
                    ParamDecl::of::<SessionHandle>(),
                    ParamDecl::of::<String>(),
                ],
                |_, _| async { no_reply() },
            )
            .build();

        // No configuration error: the leftover String binds as the close
        // payload, and the mismatch surfaces at invocation time instead.
        let plan = compile_clean(&class);
        assert_eq!(
            plan.close().unwrap().extractors(),
            [Extractor::Session, Extractor::Payload { index: 0 }]
        );
    }

    #[test]
    fn two_unresolved_close_parameters_are_errors() {
        let class = HandlerClass::builder("Chat")
            .on_close(
                "left",
                vec![ParamDecl::of::<String>(), ParamDecl::of::<u32>()],
                |_, _| async { no_reply() },
            )
            .build();

        let batch = compile(&class, &config()).unwrap_err();
        assert_eq!(batch.len(), 2);
        assert!(batch.errors().iter().all(|error| matches!(
            error,
            ConfigError::UnresolvedParam { .. }
        )));
    }

    // ── Error binding ───────────────────────────────────────────────

    #[test]
    fn error_method_with_cause_and_session_binds() {
        let class = HandlerClass::builder("Chat")
            .on_error(
                "failed",
                vec![
                    ParamDecl::of::<SessionHandle>(),
                    ParamDecl::of::<ErrorCause>(),
                ],
                |_, _| async { no_reply() },
            )
            .build();

        let plan = compile_clean(&class);
        assert_eq!(
            plan.error().unwrap().extractors(),
            [Extractor::Session, Extractor::Payload { index: 0 }]
        );
    }

    #[test]
    fn error_method_with_a_non_cause_leftover_is_skipped_silently() {
        let class = HandlerClass::builder("Chat")
            .on_error("failed", vec![ParamDecl::of::<String>()], |_, _| async {
                no_reply()
            })
            .build();

        // Skipped, not collected: the class deploys without an error
        // handler.
        let plan = compile_clean(&class);
        assert!(plan.error().is_none());
    }

    // ── Message classification ──────────────────────────────────────

    #[test]
    fn one_unresolved_parameter_classifies_as_whole() {
        let class = HandlerClass::builder("Chat")
            .on_message(
                "speak",
                vec![
                    ParamDecl::of::<SessionHandle>(),
                    ParamDecl::of::<String>(),
                ],
                |_, mut args| async move {
                    let _session = args.take::<SessionHandle>()?;
                    let text = args.take::<String>()?;
                    reply(text)
                },
            )
            .build();

        let plan = compile_clean(&class);
        let [binding] = plan.messages() else {
            panic!("expected one message binding");
        };
        assert_eq!(binding.kind(), MessageKind::Whole);
        assert_eq!(binding.payload_type(), ParamType::of::<String>());
        assert_eq!(binding.max_message_size(), -1);
        assert_eq!(
            binding.binding().extractors(),
            [Extractor::Session, Extractor::Payload { index: 0 }]
        );
    }

    #[test]
    fn payload_plus_bool_classifies_as_partial_in_either_order() {
        let class = HandlerClass::builder("Chat")
            .on_message(
                "chunk_first",
                vec![ParamDecl::of::<String>(), ParamDecl::of::<bool>()],
                |_, _| async { no_reply() },
            )
            .on_message(
                "flag_first",
                vec![ParamDecl::of::<bool>(), ParamDecl::of::<Bytes>()],
                |_, _| async { no_reply() },
            )
            .build();

        let plan = compile_clean(&class);
        let [chunk_first, flag_first] = plan.messages() else {
            panic!("expected two message bindings");
        };

        assert_eq!(chunk_first.kind(), MessageKind::Partial);
        assert_eq!(chunk_first.payload_type(), ParamType::of::<String>());
        assert_eq!(
            chunk_first.binding().extractors(),
            [
                Extractor::Payload { index: 0 },
                Extractor::Payload { index: 1 }
            ]
        );

        // With the flag declared first, the extractors swap so the payload
        // still lands at event position zero.
        assert_eq!(flag_first.kind(), MessageKind::Partial);
        assert_eq!(flag_first.payload_type(), ParamType::of::<Bytes>());
        assert_eq!(
            flag_first.binding().extractors(),
            [
                Extractor::Payload { index: 1 },
                Extractor::Payload { index: 0 }
            ]
        );
    }

    #[test]
    fn two_non_flag_leftovers_are_a_wrong_arity_error() {
        let class = HandlerClass::builder("Chat")
            .on_message(
                "speak",
                vec![ParamDecl::of::<String>(), ParamDecl::of::<u32>()],
                |_, _| async { no_reply() },
            )
            .build();

        let batch = compile(&class, &config()).unwrap_err();
        assert!(matches!(
            batch.errors(),
            [ConfigError::WrongMessageArity { count: 2, .. }]
        ));
    }

    #[test]
    fn zero_or_three_leftovers_are_wrong_arity_errors() {
        let class = HandlerClass::builder("Chat")
            .on_message("empty", vec![ParamDecl::of::<SessionHandle>()], |_, _| {
                async { no_reply() }
            })
            .on_message(
                "crowded",
                vec![
                    ParamDecl::of::<String>(),
                    ParamDecl::of::<u32>(),
                    ParamDecl::of::<f64>(),
                ],
                |_, _| async { no_reply() },
            )
            .build();

        let batch = compile(&class, &config()).unwrap_err();
        let counts: Vec<_> = batch
            .errors()
            .iter()
            .map(|error| match error {
                ConfigError::WrongMessageArity { count, .. } => *count,
                other => panic!("unexpected error: {other}"),
            })
            .collect();
        assert_eq!(counts, [0, 3]);

        // Neither method made it into the plan.
        assert!(compile_with(&class, &config(), &mut ErrorCollector::new())
            .messages()
            .is_empty());
    }

    #[test]
    fn message_payload_without_decoder_is_collected() {
        struct Blob;
        let class = HandlerClass::builder("Chat")
            .on_message("ingest", vec![ParamDecl::of::<Blob>()], |_, _| async {
                no_reply()
            })
            .build();

        let batch = compile(&class, &config()).unwrap_err();
        assert!(matches!(
            batch.errors(),
            [ConfigError::MissingDecoder { .. }]
        ));
    }

    #[test]
    fn message_size_limit_is_carried_into_the_plan() {
        let class = HandlerClass::builder("Chat")
            .on_message_with_limit(
                "bounded",
                4096,
                vec![ParamDecl::of::<String>()],
                |_, _| async { no_reply() },
            )
            .build();

        let plan = compile_clean(&class);
        assert_eq!(plan.messages()[0].max_message_size(), 4096);
    }

    // ── Idempotence ─────────────────────────────────────────────────

    #[test]
    fn compiling_twice_yields_structurally_identical_plans() {
        let class = HandlerClass::builder("Chat")
            .on_open(
                "joined",
                vec![ParamDecl::path::<String>("room")],
                |_, _| async { no_reply() },
            )
            .on_message(
                "speak",
                vec![ParamDecl::of::<String>(), ParamDecl::of::<SessionHandle>()],
                |_, _| async { no_reply() },
            )
            .on_message(
                "stream",
                vec![ParamDecl::of::<Bytes>(), ParamDecl::of::<bool>()],
                |_, _| async { no_reply() },
            )
            .on_close("left", vec![], |_, _| async { no_reply() })
            .build();

        let first = compile_clean(&class);
        let second = compile_clean(&class);

        assert_eq!(
            first.open().unwrap().extractors(),
            second.open().unwrap().extractors()
        );
        assert_eq!(
            first.close().unwrap().extractors(),
            second.close().unwrap().extractors()
        );
        assert_eq!(first.messages().len(), second.messages().len());
        for (a, b) in first.messages().iter().zip(second.messages()) {
            assert_eq!(a.name(), b.name());
            assert_eq!(a.kind(), b.kind());
            assert_eq!(a.payload_type(), b.payload_type());
            assert_eq!(a.max_message_size(), b.max_message_size());
            assert_eq!(a.binding().extractors(), b.binding().extractors());
        }
    }
}
