//! The service registry.
//!
//! [`ServiceRegistry`] holds named services that are either registered as
//! ready values or produced by factories declaring the keys they depend on.
//! [`build`](ServiceRegistry::build) walks the dependency graph once, invoking
//! every factory after its dependencies and rejecting cycles; after that the
//! registry is read-only and answers [`resolve`](ServiceRegistry::resolve).
//!
//! Every releasable service is recorded in the order it became available.
//! [`dispose_all`](ServiceRegistry::dispose_all) releases them in exactly the
//! reverse order, so a service is always released before the services it was
//! built from.
//!
//! ```text
//! register_*() ──► Registering ──build()──► Building ──► Built
//!                                                   └──► Failed
//!                       dispose_all() from Building / Built / Failed ──► Disposed
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! let registry = ServiceRegistry::new();
//! registry.register_instance("a", 1_i32)?;
//! registry.register_instance("b", 2_i32)?;
//! registry.register_factory("sum", &["a", "b"], |deps| async move {
//!     let a = deps.get::<i32>("a")?;
//!     let b = deps.get::<i32>("b")?;
//!     Ok::<_, BoxError>(Service::new(*a + *b))
//! })?;
//!
//! registry.build().await?;
//! assert_eq!(*registry.resolve::<i32>("sum")?, 3);
//! registry.dispose_all().await;
//! ```

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use tracing::{Instrument, Span, debug, error, info, info_span};

use crate::dispose::{ReleaseCapabilities, release_guarded};
use crate::error::{BoxError, BuildError, RegistryError, RegistryResult, panic_message};
use crate::key::ServiceKey;
use crate::resolver::ServiceResolver;
use crate::service::{Dependencies, Service, ServiceHandle, downcast};

// =============================================================================
// RegistryPhase
// =============================================================================

/// Lifecycle phase of a [`ServiceRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegistryPhase {
    /// Accepting registrations.
    #[default]
    Registering,
    /// `build()` is walking the dependency graph.
    Building,
    /// Every service was produced; resolution is available.
    Built,
    /// `build()` returned an error.  Partially built services are kept until
    /// disposal.
    Failed,
    /// Every releasable service has been released.
    Disposed,
}

impl fmt::Display for RegistryPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Registering => "registering",
            Self::Building => "building",
            Self::Built => "built",
            Self::Failed => "failed",
            Self::Disposed => "disposed",
        })
    }
}

// =============================================================================
// Internal state
// =============================================================================

type FactoryFn =
    Arc<dyn Fn(Dependencies) -> BoxFuture<'static, Result<Service, BoxError>> + Send + Sync>;

struct FactoryEntry {
    dependencies: Vec<ServiceKey>,
    factory: FactoryFn,
}

struct DisposableEntry {
    key: ServiceKey,
    release: ReleaseCapabilities,
}

#[derive(Default)]
struct RegistryState {
    instances: HashMap<ServiceKey, ServiceHandle>,
    factories: HashMap<ServiceKey, Arc<FactoryEntry>>,
    /// Factory keys in registration order; drives the top-level build walk.
    factory_order: Vec<ServiceKey>,
    /// Releasable services in the order they became instances.
    disposables: Vec<DisposableEntry>,
    phase: RegistryPhase,
}

impl RegistryState {
    fn ensure_registering(&self, key: &ServiceKey) -> RegistryResult<()> {
        match self.phase {
            RegistryPhase::Registering => Ok(()),
            phase => Err(RegistryError::Closed {
                key: key.clone(),
                phase,
            }),
        }
    }

    fn insert(&mut self, key: ServiceKey, service: Service) -> ServiceHandle {
        let (handle, release) = service.into_parts();
        if release.is_releasable() {
            self.disposables.push(DisposableEntry {
                key: key.clone(),
                release,
            });
        }
        self.instances.insert(key, Arc::clone(&handle));
        handle
    }
}

// =============================================================================
// ServiceRegistry
// =============================================================================

/// Named services with dependency-ordered construction and reverse-order
/// release.
///
/// All methods take `&self`; share the registry as `Arc<ServiceRegistry>` to
/// hand resolve-only views to plugins.
pub struct ServiceRegistry {
    state: Mutex<RegistryState>,
    span: Span,
}

impl ServiceRegistry {
    /// Creates an empty registry logging under a `service_registry` span.
    pub fn new() -> Self {
        Self::with_span(info_span!("service_registry"))
    }

    /// Creates an empty registry that records its diagnostics under `span`.
    pub fn with_span(span: Span) -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
            span,
        }
    }

    // ─── Registration ────────────────────────────────────────────────────────

    /// Registers a plain, non-releasable value under `key`.
    pub fn register_instance<T>(&self, key: impl Into<ServiceKey>, value: T) -> RegistryResult<()>
    where
        T: Any + Send + Sync,
    {
        self.register_service(key, Service::new(value))
    }

    /// Registers a ready service under `key`.
    ///
    /// If the service is releasable it is queued for disposal right away, ahead
    /// of everything `build()` produces later.
    pub fn register_service(
        &self,
        key: impl Into<ServiceKey>,
        service: Service,
    ) -> RegistryResult<()> {
        let key = key.into();
        let mut state = self.state.lock();
        state.ensure_registering(&key)?;
        if state.instances.contains_key(&key) {
            return Err(RegistryError::DuplicateInstance(key));
        }

        let _enter = self.span.enter();
        debug!(
            service = %key,
            type_name = service.type_name(),
            releasable = service.is_releasable(),
            "Service registered"
        );
        state.insert(key, service);
        Ok(())
    }

    /// Registers a factory producing the service `key` from `dependencies`.
    ///
    /// The factory is not invoked until [`build`](Self::build), and receives
    /// exactly the declared dependencies.  An instance registered under the
    /// same key shadows the factory, which then never runs.
    pub fn register_factory<F, Fut>(
        &self,
        key: impl Into<ServiceKey>,
        dependencies: &[&str],
        factory: F,
    ) -> RegistryResult<()>
    where
        F: Fn(Dependencies) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Service, BoxError>> + Send + 'static,
    {
        let key = key.into();
        let mut state = self.state.lock();
        state.ensure_registering(&key)?;
        if state.factories.contains_key(&key) {
            return Err(RegistryError::DuplicateFactory(key));
        }

        let dependencies: Vec<ServiceKey> =
            dependencies.iter().map(|dep| ServiceKey::from(*dep)).collect();
        let _enter = self.span.enter();
        debug!(service = %key, dependencies = ?dependencies, "Factory registered");

        let factory: FactoryFn = Arc::new(move |deps| factory(deps).boxed());
        state.factory_order.push(key.clone());
        state.factories.insert(key, Arc::new(FactoryEntry { dependencies, factory }));
        Ok(())
    }

    // ─── Build ───────────────────────────────────────────────────────────────

    /// Produces every factory-backed service in dependency order.
    ///
    /// Top-level keys are visited in factory registration order; the first
    /// error ends the walk and moves the registry to [`RegistryPhase::Failed`].
    /// Calling `build` again after success is a no-op; calling it after a
    /// failure or after disposal returns [`BuildError::Closed`].
    pub async fn build(&self) -> Result<(), BuildError> {
        self.build_inner().instrument(self.span.clone()).await
    }

    async fn build_inner(&self) -> Result<(), BuildError> {
        let order = {
            let mut state = self.state.lock();
            match state.phase {
                RegistryPhase::Registering => {}
                RegistryPhase::Built => return Ok(()),
                phase => return Err(BuildError::Closed { phase }),
            }
            state.phase = RegistryPhase::Building;
            state.factory_order.clone()
        };

        info!(factories = order.len(), "Building service registry");

        let mut stack = Vec::new();
        let mut outcome = Ok(());
        for key in order {
            if let Err(e) = self.resolve_recursive(key, &mut stack).await {
                outcome = Err(e);
                break;
            }
        }

        let mut state = self.state.lock();
        match &outcome {
            Ok(()) => {
                if state.phase == RegistryPhase::Building {
                    state.phase = RegistryPhase::Built;
                }
                info!(
                    services = state.instances.len(),
                    releasable = state.disposables.len(),
                    "Service registry built"
                );
            }
            Err(e) => {
                if state.phase == RegistryPhase::Building {
                    state.phase = RegistryPhase::Failed;
                }
                error!(error = %e, built = state.instances.len(), "Service registry build failed");
            }
        }
        outcome
    }

    /// Resolves `key`, building its dependencies first.
    ///
    /// `stack` holds the keys currently being resolved, outermost first.
    fn resolve_recursive<'a>(
        &'a self,
        key: ServiceKey,
        stack: &'a mut Vec<ServiceKey>,
    ) -> BoxFuture<'a, Result<ServiceHandle, BuildError>> {
        async move {
            let entry = {
                let state = self.state.lock();
                if let Some(handle) = state.instances.get(&key) {
                    return Ok(Arc::clone(handle));
                }
                if let Some(pos) = stack.iter().position(|k| *k == key) {
                    return Err(BuildError::DependencyChain {
                        path: stack[pos..].to_vec(),
                    });
                }
                match state.factories.get(&key) {
                    Some(entry) => Arc::clone(entry),
                    None => return Err(BuildError::unresolvable(key)),
                }
            };

            stack.push(key.clone());

            let mut resolved = HashMap::with_capacity(entry.dependencies.len());
            for dep in &entry.dependencies {
                let handle = self.resolve_recursive(dep.clone(), stack).await?;
                resolved.insert(dep.clone(), handle);
            }

            debug!(service = %key, "Invoking factory");
            let deps = Dependencies::new(resolved);
            let factory = Arc::clone(&entry.factory);
            let produced = AssertUnwindSafe(async move { factory(deps).await })
                .catch_unwind()
                .await;

            let service = match produced {
                Ok(Ok(service)) => service,
                Ok(Err(e)) => {
                    return Err(BuildError::Unresolvable {
                        key,
                        reason: Some(e.to_string()),
                    });
                }
                Err(payload) => {
                    return Err(BuildError::Unresolvable {
                        key,
                        reason: Some(format!(
                            "factory panicked: {}",
                            panic_message(payload.as_ref())
                        )),
                    });
                }
            };

            stack.pop();

            let mut state = self.state.lock();
            state.factories.remove(&key);
            debug!(service = %key, type_name = service.type_name(), "Service built");
            Ok(state.insert(key, service))
        }
        .boxed()
    }

    // ─── Resolution ──────────────────────────────────────────────────────────

    /// Returns the service stored under `key` as a `T`.
    ///
    /// Only available after a successful [`build`](Self::build).
    pub fn resolve<T: Any + Send + Sync>(&self, key: &str) -> RegistryResult<Arc<T>> {
        downcast(key, self.resolve_handle(key)?)
    }

    /// Returns the untyped handle stored under `key`.
    pub fn resolve_handle(&self, key: &str) -> RegistryResult<ServiceHandle> {
        let state = self.state.lock();
        if state.phase != RegistryPhase::Built {
            return Err(RegistryError::NotBuilt(state.phase));
        }
        state
            .instances
            .get(key)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(key.into()))
    }

    // ─── Disposal ────────────────────────────────────────────────────────────

    /// Releases every releasable service in reverse build order.
    ///
    /// Does nothing if `build()` was never called or the registry is already
    /// disposed.  Release failures are logged and do not stop the walk.
    pub async fn dispose_all(&self) {
        self.dispose_inner().instrument(self.span.clone()).await
    }

    async fn dispose_inner(&self) {
        let entries = {
            let mut state = self.state.lock();
            match state.phase {
                RegistryPhase::Registering => {
                    debug!("Registry was never built; nothing to dispose");
                    return;
                }
                RegistryPhase::Disposed => return,
                _ => {}
            }
            state.phase = RegistryPhase::Disposed;
            state.instances.clear();
            state.factories.clear();
            state.factory_order.clear();
            std::mem::take(&mut state.disposables)
        };

        let total = entries.len();
        let mut failed = 0_usize;
        for entry in entries.iter().rev() {
            match release_guarded(&entry.release).await {
                Ok(_) => debug!(service = %entry.key, "Service released"),
                Err(e) => {
                    failed += 1;
                    error!(service = %entry.key, error = %e, "Failed to release service");
                }
            }
        }

        info!(released = total - failed, failed, "Service registry disposed");
    }

    // ─── Introspection ───────────────────────────────────────────────────────

    /// Current lifecycle phase.
    pub fn phase(&self) -> RegistryPhase {
        self.state.lock().phase
    }

    /// Returns `true` after a successful build and before disposal.
    pub fn is_built(&self) -> bool {
        self.phase() == RegistryPhase::Built
    }

    /// Returns `true` if an instance is stored under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.state.lock().instances.contains_key(key)
    }

    /// Number of stored instances.
    pub fn len(&self) -> usize {
        self.state.lock().instances.len()
    }

    /// Returns `true` if no instance is stored.
    pub fn is_empty(&self) -> bool {
        self.state.lock().instances.is_empty()
    }

    /// Keys of the stored instances, sorted.
    pub fn keys(&self) -> Vec<ServiceKey> {
        let mut keys: Vec<_> = self.state.lock().instances.keys().cloned().collect();
        keys.sort();
        keys
    }

    /// A copy of every stored instance handle, in any phase.
    pub fn snapshot(&self) -> HashMap<ServiceKey, ServiceHandle> {
        self.state.lock().instances.clone()
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ServiceRegistry")
            .field("phase", &state.phase)
            .field("instances", &state.instances.len())
            .field("factories", &state.factories.len())
            .field("disposables", &state.disposables.len())
            .finish()
    }
}

impl ServiceResolver for ServiceRegistry {
    fn resolve_handle(&self, key: &str) -> RegistryResult<ServiceHandle> {
        ServiceRegistry::resolve_handle(self, key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispose::Dispose;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct Journal(parking_lot::Mutex<Vec<String>>);

    impl Journal {
        fn entries(&self) -> Vec<String> {
            self.0.lock().clone()
        }
    }

    struct Recorder {
        name: &'static str,
        journal: Arc<Journal>,
        fail: bool,
    }

    impl Dispose for Recorder {
        fn dispose(&self) -> Result<(), BoxError> {
            self.journal.0.lock().push(self.name.to_string());
            if self.fail {
                return Err(format!("{} refused to close", self.name).into());
            }
            Ok(())
        }
    }

    fn recorder(name: &'static str, journal: &Arc<Journal>) -> Service {
        Service::disposable(Recorder {
            name,
            journal: Arc::clone(journal),
            fail: false,
        })
    }

    fn register_recording_factory(
        registry: &ServiceRegistry,
        name: &'static str,
        deps: &[&str],
        journal: &Arc<Journal>,
    ) {
        let journal = Arc::clone(journal);
        registry
            .register_factory(name, deps, move |_| {
                let journal = Arc::clone(&journal);
                async move { Ok(recorder(name, &journal)) }
            })
            .unwrap();
    }

    #[tokio::test]
    async fn test_sum_of_instances() {
        let registry = ServiceRegistry::new();
        registry.register_instance("a", 1_i32).unwrap();
        registry.register_instance("b", 2_i32).unwrap();
        registry
            .register_factory("sum", &["a", "b"], |deps| async move {
                let a = deps.get::<i32>("a")?;
                let b = deps.get::<i32>("b")?;
                Ok::<_, BoxError>(Service::new(*a + *b))
            })
            .unwrap();

        registry.build().await.unwrap();
        assert!(registry.is_built());
        assert_eq!(*registry.resolve::<i32>("sum").unwrap(), 3);
        assert_eq!(registry.keys(), vec!["a", "b", "sum"]);
    }

    #[tokio::test]
    async fn test_resolve_before_build() {
        let registry = ServiceRegistry::new();
        registry.register_instance("a", 1_i32).unwrap();
        assert_eq!(
            registry.resolve::<i32>("a").unwrap_err(),
            RegistryError::NotBuilt(RegistryPhase::Registering)
        );
    }

    #[tokio::test]
    async fn test_duplicate_registrations() {
        let registry = ServiceRegistry::new();
        registry.register_instance("a", 1_i32).unwrap();
        assert_eq!(
            registry.register_instance("a", 2_i32).unwrap_err(),
            RegistryError::DuplicateInstance("a".into())
        );

        registry
            .register_factory("f", &[], |_| async { Ok(Service::new(0_u8)) })
            .unwrap();
        assert_eq!(
            registry
                .register_factory("f", &[], |_| async { Ok(Service::new(1_u8)) })
                .unwrap_err(),
            RegistryError::DuplicateFactory("f".into())
        );
    }

    #[tokio::test]
    async fn test_register_after_build_rejected() {
        let registry = ServiceRegistry::new();
        registry.build().await.unwrap();
        assert_eq!(
            registry.register_instance("late", 1_i32).unwrap_err(),
            RegistryError::Closed {
                key: "late".into(),
                phase: RegistryPhase::Built,
            }
        );
        // Idempotent after success.
        registry.build().await.unwrap();
    }

    #[tokio::test]
    async fn test_two_node_cycle() {
        let registry = ServiceRegistry::new();
        registry
            .register_factory("x", &["y"], |_| async { Ok(Service::new(())) })
            .unwrap();
        registry
            .register_factory("y", &["x"], |_| async { Ok(Service::new(())) })
            .unwrap();

        let error = registry.build().await.unwrap_err();
        assert_eq!(
            error,
            BuildError::DependencyChain {
                path: vec!["x".into(), "y".into()],
            }
        );
        assert_eq!(registry.phase(), RegistryPhase::Failed);
        assert_eq!(
            registry.build().await.unwrap_err(),
            BuildError::Closed {
                phase: RegistryPhase::Failed
            }
        );
    }

    #[tokio::test]
    async fn test_cycle_path_starts_at_repeated_key() {
        let registry = ServiceRegistry::new();
        registry
            .register_factory("a", &["b"], |_| async { Ok(Service::new(())) })
            .unwrap();
        registry
            .register_factory("b", &["c"], |_| async { Ok(Service::new(())) })
            .unwrap();
        registry
            .register_factory("c", &["b"], |_| async { Ok(Service::new(())) })
            .unwrap();

        match registry.build().await.unwrap_err() {
            BuildError::DependencyChain { path } => assert_eq!(path, vec!["b", "c"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_missing_dependency() {
        let registry = ServiceRegistry::new();
        registry
            .register_factory("app", &["x"], |_| async { Ok(Service::new(())) })
            .unwrap();

        assert_eq!(
            registry.build().await.unwrap_err(),
            BuildError::unresolvable("x")
        );
    }

    #[tokio::test]
    async fn test_failing_factory_stops_build() {
        let registry = ServiceRegistry::new();
        let later_calls = Arc::new(AtomicUsize::new(0));

        registry
            .register_factory("bad", &[], |_| async {
                Err::<Service, BoxError>("connection refused".into())
            })
            .unwrap();
        let counter = Arc::clone(&later_calls);
        registry
            .register_factory("later", &[], move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(Service::new(())) }
            })
            .unwrap();

        assert_eq!(
            registry.build().await.unwrap_err(),
            BuildError::Unresolvable {
                key: "bad".into(),
                reason: Some("connection refused".into()),
            }
        );
        assert_eq!(later_calls.load(Ordering::SeqCst), 0);
        assert!(matches!(
            registry.resolve_handle("bad"),
            Err(RegistryError::NotBuilt(RegistryPhase::Failed))
        ));
    }

    #[tokio::test]
    async fn test_panicking_factory() {
        let registry = ServiceRegistry::new();
        registry
            .register_factory("p", &[], |_| async {
                if true {
                    panic!("out of cheese");
                }
                Ok(Service::new(()))
            })
            .unwrap();

        match registry.build().await.unwrap_err() {
            BuildError::Unresolvable { key, reason } => {
                assert_eq!(key, "p");
                assert_eq!(reason.as_deref(), Some("factory panicked: out of cheese"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_dispose_in_reverse_build_order() {
        let journal = Arc::new(Journal::default());
        let registry = ServiceRegistry::new();

        registry.register_service("config", recorder("config", &journal)).unwrap();
        register_recording_factory(&registry, "app", &["db", "cache"], &journal);
        register_recording_factory(&registry, "db", &["config"], &journal);
        register_recording_factory(&registry, "cache", &["db"], &journal);

        registry.build().await.unwrap();
        registry.dispose_all().await;

        assert_eq!(journal.entries(), vec!["app", "cache", "db", "config"]);
        assert_eq!(registry.phase(), RegistryPhase::Disposed);
        assert!(registry.is_empty());

        registry.dispose_all().await;
        assert_eq!(journal.entries().len(), 4);
    }

    #[tokio::test]
    async fn test_dispose_continues_past_failure() {
        let journal = Arc::new(Journal::default());
        let registry = ServiceRegistry::new();

        registry.register_service("first", recorder("first", &journal)).unwrap();
        registry
            .register_service(
                "broken",
                Service::disposable(Recorder {
                    name: "broken",
                    journal: Arc::clone(&journal),
                    fail: true,
                }),
            )
            .unwrap();
        registry.register_service("last", recorder("last", &journal)).unwrap();

        registry.build().await.unwrap();
        registry.dispose_all().await;

        assert_eq!(journal.entries(), vec!["last", "broken", "first"]);
    }

    #[tokio::test]
    async fn test_dispose_without_build_is_noop() {
        let journal = Arc::new(Journal::default());
        let registry = ServiceRegistry::new();
        registry.register_service("a", recorder("a", &journal)).unwrap();

        registry.dispose_all().await;
        assert!(journal.entries().is_empty());
        assert_eq!(registry.phase(), RegistryPhase::Registering);
    }

    #[tokio::test]
    async fn test_failed_build_releases_partial_state() {
        let journal = Arc::new(Journal::default());
        let registry = ServiceRegistry::new();

        register_recording_factory(&registry, "ok", &[], &journal);
        registry
            .register_factory("bad", &["ok"], |_| async {
                Err::<Service, BoxError>("nope".into())
            })
            .unwrap();

        assert!(registry.build().await.is_err());
        assert!(registry.contains("ok"));

        registry.dispose_all().await;
        assert_eq!(journal.entries(), vec!["ok"]);
    }

    #[tokio::test]
    async fn test_type_mismatch() {
        let registry = ServiceRegistry::new();
        registry.register_instance("port", 8080_u16).unwrap();
        registry.build().await.unwrap();

        assert!(matches!(
            registry.resolve::<String>("port"),
            Err(RegistryError::TypeMismatch { .. })
        ));
        assert_eq!(
            registry.resolve::<u16>("host").unwrap_err(),
            RegistryError::NotFound("host".into())
        );
    }

    #[tokio::test]
    async fn test_instance_shadows_factory() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = ServiceRegistry::new();

        let counter = Arc::clone(&calls);
        registry
            .register_factory("name", &[], move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(Service::new(String::from("factory"))) }
            })
            .unwrap();
        registry
            .register_instance("name", String::from("instance"))
            .unwrap();

        registry.build().await.unwrap();
        assert_eq!(registry.resolve::<String>("name").unwrap().as_str(), "instance");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_undeclared_dependency_not_visible() {
        let registry = ServiceRegistry::new();
        registry.register_instance("secret", 42_i32).unwrap();
        registry
            .register_factory("peek", &[], |deps| async move {
                let seen = deps.get::<i32>("secret").is_ok();
                Ok(Service::new(seen))
            })
            .unwrap();

        registry.build().await.unwrap();
        assert!(!*registry.resolve::<bool>("peek").unwrap());
    }

    #[tokio::test]
    async fn test_shared_dependency_built_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = ServiceRegistry::new();

        let counter = Arc::clone(&calls);
        registry
            .register_factory("db", &[], move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Ok(Service::new(())) }
            })
            .unwrap();
        for name in ["users", "orders"] {
            registry
                .register_factory(name, &["db"], |_| async { Ok(Service::new(())) })
                .unwrap();
        }

        registry.build().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(registry.len(), 3);
    }
}
