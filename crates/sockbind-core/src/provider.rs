//! Handler instance acquisition.
//!
//! The engine never constructs handler state itself. An
//! [`InstanceProvider`] decides the instancing policy: one shared instance,
//! one per session, or anything the integrating server wants.

use std::any::Any;
use std::sync::Arc;

use crate::error::InstanceError;
use crate::session::SessionHandle;

/// Shared, type-erased handler instance.
pub type InstanceRef = Arc<dyn Any + Send + Sync>;

/// Supplies the handler instance bound to each session.
pub trait InstanceProvider: Send + Sync {
    /// Instance to invoke for `session`.
    fn instance(&self, session: &SessionHandle) -> Result<InstanceRef, InstanceError>;

    /// Drops any per-session state once `session` has closed.
    fn release(&self, _session: &SessionHandle) {}
}

/// Provider handing every session the same shared instance.
pub struct SingletonProvider {
    instance: InstanceRef,
}

impl SingletonProvider {
    /// Wraps `instance` for shared use.
    #[must_use]
    pub fn new<T: Any + Send + Sync>(instance: T) -> Self {
        Self {
            instance: Arc::new(instance),
        }
    }
}

impl InstanceProvider for SingletonProvider {
    fn instance(&self, _session: &SessionHandle) -> Result<InstanceRef, InstanceError> {
        Ok(Arc::clone(&self.instance))
    }
}

/// Downcasts a provided instance to its concrete type.
///
/// Method bodies call this first to get their typed receiver back.
pub fn instance_of<T: Any + Send + Sync>(instance: &InstanceRef) -> Result<Arc<T>, InstanceError> {
    Arc::clone(instance).downcast::<T>().map_err(|_| {
        InstanceError::new(
            std::any::type_name::<T>(),
            "provided instance has a different concrete type",
        )
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
