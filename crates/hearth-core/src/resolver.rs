//! Resolve-only views over a set of services.
//!
//! Plugins never see the registry itself, only something that can look up a
//! built service by key. [`ServiceRegistry`](crate::ServiceRegistry) is one such
//! view; [`StaticResolver`] is another, backed by a fixed map, useful in tests
//! and when embedding plugins without a registry.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::{RegistryError, RegistryResult};
use crate::key::ServiceKey;
use crate::service::{ServiceHandle, downcast};

/// Looks up a built service by key.
pub trait ServiceResolver: Send + Sync {
    /// Returns the untyped handle stored under `key`.
    fn resolve_handle(&self, key: &str) -> RegistryResult<ServiceHandle>;
}

/// Typed lookups for every [`ServiceResolver`].
pub trait ResolverExt: ServiceResolver {
    /// Returns the service stored under `key` as a `T`.
    fn resolve<T: Any + Send + Sync>(&self, key: &str) -> RegistryResult<Arc<T>> {
        downcast(key, self.resolve_handle(key)?)
    }
}

impl<R: ServiceResolver + ?Sized> ResolverExt for R {}

impl<R: ServiceResolver + ?Sized> ServiceResolver for Arc<R> {
    fn resolve_handle(&self, key: &str) -> RegistryResult<ServiceHandle> {
        (**self).resolve_handle(key)
    }
}

/// A resolver over a fixed set of values.
#[derive(Clone, Default)]
pub struct StaticResolver {
    services: HashMap<ServiceKey, ServiceHandle>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `value` under `key`, builder style.
    pub fn with<T: Any + Send + Sync>(mut self, key: impl Into<ServiceKey>, value: T) -> Self {
        self.insert(key, value);
        self
    }

    /// Adds `value` under `key`, replacing any previous value.
    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<ServiceKey>, value: T) {
        self.services.insert(key.into(), Arc::new(value));
    }
}

impl ServiceResolver for StaticResolver {
    fn resolve_handle(&self, key: &str) -> RegistryResult<ServiceHandle> {
        self.services
            .get(key)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(key.into()))
    }
}

impl FromIterator<(ServiceKey, ServiceHandle)> for StaticResolver {
    fn from_iter<I: IntoIterator<Item = (ServiceKey, ServiceHandle)>>(iter: I) -> Self {
        Self {
            services: iter.into_iter().collect(),
        }
    }
}

impl fmt::Debug for StaticResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.services.keys()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_resolver() {
        let resolver = StaticResolver::new()
            .with("name", String::from("hearth"))
            .with("port", 8080_u16);

        assert_eq!(*resolver.resolve::<u16>("port").unwrap(), 8080);
        assert_eq!(resolver.resolve::<String>("name").unwrap().as_str(), "hearth");
        assert!(matches!(
            resolver.resolve::<u16>("name"),
            Err(RegistryError::TypeMismatch { .. })
        ));
        assert_eq!(
            resolver.resolve::<u16>("missing").unwrap_err(),
            RegistryError::NotFound("missing".into())
        );
    }

    #[test]
    fn test_resolve_through_trait_object() {
        let resolver: Arc<dyn ServiceResolver> = Arc::new(StaticResolver::new().with("n", 3_i64));
        assert_eq!(*resolver.resolve::<i64>("n").unwrap(), 3);
    }
}
