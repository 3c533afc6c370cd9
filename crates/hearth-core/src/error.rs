//! Error types for the service registry.
//!
//! Two families:
//!
//! - [`RegistryError`]: declaration misuse (duplicate key, register after
//!   build, resolve before build, unknown key, wrong type).  Returned
//!   immediately from the offending call.
//! - [`BuildError`]: the expected operational outcome of a failed
//!   [`build`](crate::ServiceRegistry::build): a dependency cycle or a service
//!   that could not be produced.

use std::any::Any;

use thiserror::Error;

use crate::key::ServiceKey;
use crate::registry::RegistryPhase;

/// Boxed error returned by user factories and release capabilities.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

// =============================================================================
// Registry Errors
// =============================================================================

/// Misuse of the registry API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Registration attempted outside the registering phase.
    #[error("cannot register '{key}': registry is {phase}")]
    Closed {
        /// The key the caller tried to register.
        key: ServiceKey,
        /// Phase the registry was in.
        phase: RegistryPhase,
    },

    /// An instance is already registered under this key.
    #[error("service '{0}' already registered")]
    DuplicateInstance(ServiceKey),

    /// A factory is already registered under this key.
    #[error("factory for '{0}' already registered")]
    DuplicateFactory(ServiceKey),

    /// Resolution attempted before a successful build.
    #[error("registry has not been built (phase: {0})")]
    NotBuilt(RegistryPhase),

    /// No instance exists under this key.
    #[error("service '{0}' not found")]
    NotFound(ServiceKey),

    /// The stored instance is not of the requested type.
    #[error("service '{key}' is not a `{expected}`")]
    TypeMismatch {
        /// The requested key.
        key: ServiceKey,
        /// Name of the type the caller asked for.
        expected: &'static str,
    },
}

/// Result type for registry operations.
pub type RegistryResult<T> = Result<T, RegistryError>;

// =============================================================================
// Build Errors
// =============================================================================

/// Why [`ServiceRegistry::build`](crate::ServiceRegistry::build) failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// The dependency graph contains a cycle.
    ///
    /// `path` starts at the repeated key and lists the cycle members in
    /// traversal order.
    #[error("dependency cycle detected: {}", join_keys(.path))]
    DependencyChain {
        /// Keys forming the cycle.
        path: Vec<ServiceKey>,
    },

    /// A service has neither an instance nor a factory, or its factory failed.
    #[error("cannot resolve service '{key}'{}", reason_suffix(.reason))]
    Unresolvable {
        /// The service that could not be produced.
        key: ServiceKey,
        /// Message captured from the failing factory, if any.
        reason: Option<String>,
    },

    /// `build` was called after a failed build or after disposal.
    #[error("cannot build: registry is {phase}")]
    Closed {
        /// Phase the registry was in.
        phase: RegistryPhase,
    },
}

impl BuildError {
    /// Creates an unresolvable error without a reason.
    pub fn unresolvable(key: impl Into<ServiceKey>) -> Self {
        Self::Unresolvable {
            key: key.into(),
            reason: None,
        }
    }

    /// Returns the key the error is about, if it names a single one.
    pub fn key(&self) -> Option<&ServiceKey> {
        match self {
            Self::DependencyChain { path } => path.first(),
            Self::Unresolvable { key, .. } => Some(key),
            Self::Closed { .. } => None,
        }
    }
}

/// Renders keys as `a -> b -> c`.
pub(crate) fn join_keys(keys: &[ServiceKey]) -> String {
    keys.iter()
        .map(ServiceKey::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn reason_suffix(reason: &Option<String>) -> String {
    match reason {
        Some(reason) => format!(": {reason}"),
        None => ": no instance or factory registered".to_string(),
    }
}

/// Extracts a readable message from a caught panic payload.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
