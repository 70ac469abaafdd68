//! Type tokens and type-erased payload values.
//!
//! Handler signatures are described at registration time with [`ParamType`]
//! tokens. At invocation time each argument travels as a [`PayloadValue`],
//! an owned, type-erased value that the method body recovers through the
//! positional [`Args`] cursor.

use std::any::{Any, TypeId};
use std::collections::VecDeque;
use std::fmt;
use std::hash::{Hash, Hasher};

use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// ParamType
// ─────────────────────────────────────────────────────────────────────────────

/// Runtime token identifying a concrete Rust type in a handler signature.
///
/// Tokens compare by [`TypeId`], so two tokens are equal exactly when they
/// were produced from the same concrete type. The [`ParamType::any`] token
/// stands in for "no statically resolvable type" and is what codec lookup
/// falls back to when an adapter does not report a target type.
#[derive(Clone, Copy)]
pub struct ParamType {
    id: TypeId,
    name: &'static str,
}

/// Uninhabited marker backing the universal token.
enum AnyPayload {}

impl ParamType {
    /// Token for the concrete type `T`.
    #[must_use]
    pub fn of<T: Any>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    /// Universal fallback token used when a codec target type is unknown.
    #[must_use]
    pub fn any() -> Self {
        Self {
            id: TypeId::of::<AnyPayload>(),
            name: "any",
        }
    }

    /// Whether this is the universal fallback token.
    #[must_use]
    pub fn is_any(self) -> bool {
        self.id == TypeId::of::<AnyPayload>()
    }

    /// Human-readable type name, for diagnostics only.
    #[must_use]
    pub fn name(self) -> &'static str {
        self.name
    }
}

impl PartialEq for ParamType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ParamType {}

impl Hash for ParamType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ParamType({})", self.name)
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// PayloadValue
// ─────────────────────────────────────────────────────────────────────────────

/// An owned, type-erased argument or reply value.
///
/// The type token is captured at construction, so matching against a
/// declared [`ParamType`] never has to inspect the boxed value.
pub struct PayloadValue {
    value: Box<dyn Any + Send>,
    ty: ParamType,
}

impl PayloadValue {
    /// Wraps `value`, capturing its type token.
    #[must_use]
    pub fn new<T: Any + Send>(value: T) -> Self {
        Self {
            value: Box::new(value),
            ty: ParamType::of::<T>(),
        }
    }

    /// Token for the concrete type stored inside.
    #[must_use]
    pub fn param_type(&self) -> ParamType {
        self.ty
    }

    /// Whether the stored value is a `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.ty == ParamType::of::<T>()
    }

    /// Borrows the stored value as a `T`, if the types match.
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Recovers the concrete value, handing `self` back on a type mismatch.
    pub fn downcast<T: Any>(self) -> Result<T, PayloadValue> {
        let Self { value, ty } = self;
        match value.downcast::<T>() {
            Ok(boxed) => Ok(*boxed),
            Err(value) => Err(Self { value, ty }),
        }
    }
}

impl fmt::Debug for PayloadValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PayloadValue({})", self.ty.name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Args
// ─────────────────────────────────────────────────────────────────────────────

/// Positional arguments for one handler invocation, consumed front to back.
///
/// Argument order matches the parameter order declared on the handler
/// method, which is also the extractor order in the binding plan.
#[derive(Debug, Default)]
pub struct Args {
    values: VecDeque<PayloadValue>,
}

impl Args {
    /// Builds the cursor from already-extracted values.
    #[must_use]
    pub fn new(values: Vec<PayloadValue>) -> Self {
        Self {
            values: values.into(),
        }
    }

    /// Removes and downcasts the next argument.
    pub fn take<T: Any>(&mut self) -> Result<T, ArgError> {
        let value = self.values.pop_front().ok_or(ArgError::Exhausted {
            expected: std::any::type_name::<T>(),
        })?;
        value.downcast::<T>().map_err(|value| ArgError::TypeMismatch {
            expected: std::any::type_name::<T>(),
            found: value.param_type().name(),
        })
    }

    /// Number of arguments not yet taken.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether every argument has been taken.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Failure while pulling typed arguments out of [`Args`].
#[derive(Debug, Error)]
pub enum ArgError {
    /// The argument list was already empty.
    #[error("no argument left, expected {expected}")]
    Exhausted {
        /// Type the caller asked for.
        expected: &'static str,
    },
    /// The next argument had a different concrete type.
    #[error("argument type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// Type the caller asked for.
        expected: &'static str,
        /// Type actually stored at this position.
        found: &'static str,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_compare_by_concrete_type() {
        assert_eq!(ParamType::of::<String>(), ParamType::of::<String>());
        assert_ne!(ParamType::of::<String>(), ParamType::of::<i64>());
        assert_ne!(ParamType::of::<i32>(), ParamType::of::<u32>());
    }

    #[test]
    fn any_token_matches_only_itself() {
        assert_eq!(ParamType::any(), ParamType::any());
        assert!(ParamType::any().is_any());
        assert!(!ParamType::of::<String>().is_any());
        assert_ne!(ParamType::any(), ParamType::of::<String>());
    }

    #[test]
    fn payload_value_captures_token() {
        let value = PayloadValue::new(7_i32);
        assert_eq!(value.param_type(), ParamType::of::<i32>());
        assert!(value.is::<i32>());
        assert!(!value.is::<i64>());
    }

    #[test]
    fn payload_value_downcast_recovers_value() {
        let value = PayloadValue::new("hi".to_owned());
        assert_eq!(value.downcast::<String>().unwrap(), "hi");
    }

    #[test]
    fn payload_value_downcast_mismatch_returns_original() {
        let value = PayloadValue::new(1.5_f64);
        let back = value.downcast::<String>().unwrap_err();
        assert_eq!(back.param_type(), ParamType::of::<f64>());
        assert_eq!(back.downcast::<f64>().unwrap(), 1.5);
    }

    #[test]
    fn args_are_taken_in_declaration_order() {
        let mut args = Args::new(vec![
            PayloadValue::new("first".to_owned()),
            PayloadValue::new(true),
        ]);
        assert_eq!(args.len(), 2);
        assert_eq!(args.take::<String>().unwrap(), "first");
        assert!(args.take::<bool>().unwrap());
        assert!(args.is_empty());
    }

    #[test]
    fn args_take_past_end_is_reported() {
        let mut args = Args::new(Vec::new());
        assert!(matches!(
            args.take::<String>(),
            Err(ArgError::Exhausted { .. })
        ));
    }

    #[test]
    fn args_take_wrong_type_is_reported() {
        let mut args = Args::new(vec![PayloadValue::new(42_u16)]);
        let err = args.take::<String>().unwrap_err();
        assert!(matches!(err, ArgError::TypeMismatch { .. }));
    }
}
