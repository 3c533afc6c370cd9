//! Type-erased service values.

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::dispose::{AsyncDispose, Dispose, ReleaseCapabilities};
use crate::error::{BoxError, RegistryError, RegistryResult};
use crate::key::ServiceKey;

/// Type-erased handle to a stored instance.
///
/// Consumers downcast back to the concrete type through
/// [`resolve`](crate::ServiceRegistry::resolve) or [`downcast`].
pub type ServiceHandle = Arc<dyn Any + Send + Sync>;

/// Downcasts `handle` to `T`, reporting a [`RegistryError::TypeMismatch`] for `key`.
pub fn downcast<T>(key: &str, handle: ServiceHandle) -> RegistryResult<Arc<T>>
where
    T: Any + Send + Sync,
{
    handle
        .downcast::<T>()
        .map_err(|_| RegistryError::TypeMismatch {
            key: key.into(),
            expected: type_name::<T>(),
        })
}

// ─── Service ──────────────────────────────────────────────────────────────────

/// A value handed to the registry together with its release capabilities.
///
/// ```rust,ignore
/// registry.register_service("config", Service::new(config))?;
/// registry.register_service("pool", Service::async_disposable(pool))?;
/// registry.register_service(
///     "tmp",
///     Service::new(dir.clone()).on_release(move || remove_dir(dir.clone())),
/// )?;
/// ```
pub struct Service {
    handle: ServiceHandle,
    release: ReleaseCapabilities,
    type_name: &'static str,
}

impl Service {
    /// A plain, non-releasable value.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// A plain value that is already shared.
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            handle: value,
            release: ReleaseCapabilities::none(),
            type_name: type_name::<T>(),
        }
    }

    /// A value released through [`AsyncDispose`].
    pub fn async_disposable<T: AsyncDispose + Any>(value: T) -> Self {
        let value = Arc::new(value);
        Self {
            handle: value.clone(),
            release: ReleaseCapabilities::none().with_async_dispose(value),
            type_name: type_name::<T>(),
        }
    }

    /// A value released through [`Dispose`].
    pub fn disposable<T: Dispose + Any>(value: T) -> Self {
        let value = Arc::new(value);
        Self {
            handle: value.clone(),
            release: ReleaseCapabilities::none().with_dispose(value),
            type_name: type_name::<T>(),
        }
    }

    /// Attaches a release hook.
    ///
    /// The hook only runs when the value has no [`AsyncDispose`] or
    /// [`Dispose`] capability.
    pub fn on_release<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.release = self.release.with_hook(hook);
        self
    }

    /// The type-erased instance.
    pub fn handle(&self) -> &ServiceHandle {
        &self.handle
    }

    /// Name of the concrete type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns `true` if the value carries a release capability.
    pub fn is_releasable(&self) -> bool {
        self.release.is_releasable()
    }

    pub(crate) fn into_parts(self) -> (ServiceHandle, ReleaseCapabilities) {
        (self.handle, self.release)
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Service")
            .field("type_name", &self.type_name)
            .field("release", &self.release)
            .finish_non_exhaustive()
    }
}

// ─── Dependencies ─────────────────────────────────────────────────────────────

/// The resolved dependencies handed to a factory.
///
/// Holds exactly the keys the factory declared; asking for anything else is a
/// [`RegistryError::NotFound`].
#[derive(Clone, Default)]
pub struct Dependencies {
    entries: HashMap<ServiceKey, ServiceHandle>,
}

impl Dependencies {
    pub(crate) fn new(entries: HashMap<ServiceKey, ServiceHandle>) -> Self {
        Self { entries }
    }

    /// Returns the dependency `key` as a `T`.
    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> RegistryResult<Arc<T>> {
        let handle = self
            .entries
            .get(key)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(key.into()))?;
        downcast(key, handle)
    }

    /// Returns the untyped handle for `key`.
    pub fn handle(&self, key: &str) -> Option<&ServiceHandle> {
        self.entries.get(key)
    }

    /// Number of resolved dependencies.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the factory declared no dependencies.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.entries.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_downcast_mismatch() {
        let handle: ServiceHandle = Arc::new(7_u32);
        let error = downcast::<String>("port", handle).unwrap_err();
        assert_eq!(
            error,
            RegistryError::TypeMismatch {
                key: "port".into(),
                expected: type_name::<String>(),
            }
        );
    }

    #[test]
    fn test_dependencies_restricted_to_declared() {
        let mut entries = HashMap::new();
        entries.insert(ServiceKey::from("a"), Arc::new(1_i32) as ServiceHandle);
        let deps = Dependencies::new(entries);

        assert_eq!(*deps.get::<i32>("a").unwrap(), 1);
        assert_eq!(
            deps.get::<i32>("b").unwrap_err(),
            RegistryError::NotFound("b".into())
        );
    }

    #[test]
    fn test_plain_service_not_releasable() {
        let service = Service::new("hello");
        assert!(!service.is_releasable());
        assert_eq!(service.type_name(), "&str");

        let service = service.on_release(|| async { Ok::<(), BoxError>(()) });
        assert!(service.is_releasable());
    }
}
