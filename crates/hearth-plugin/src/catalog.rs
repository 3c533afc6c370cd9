//! Name → initializer lookup used by the loader.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, warn};

use crate::descriptor::{InitializerDescriptor, PLUGIN_API_VERSION, PLUGIN_INITIALIZERS};
use crate::plugin::{InitResult, PluginContext};

/// A type-erased initializer.
pub type Initializer = Arc<dyn Fn(PluginContext) -> BoxFuture<'static, InitResult> + Send + Sync>;

/// The initializers a [`PluginLoader`](crate::PluginLoader) may invoke,
/// keyed by the name manifests use.
///
/// ```rust,ignore
/// // Everything registered with #[plugin_initializer] in this binary…
/// let mut catalog = PluginCatalog::from_registered();
/// // …plus one registered by hand.
/// catalog.register("audit", |ctx| async move { Ok(LoadedPlugin::new(ctx.name())) });
/// ```
#[derive(Clone, Default)]
pub struct PluginCatalog {
    entries: HashMap<String, Initializer>,
}

impl PluginCatalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog holding every initializer in [`PLUGIN_INITIALIZERS`].
    ///
    /// Descriptors built against an incompatible API version are left out.
    pub fn from_registered() -> Self {
        let mut catalog = Self::new();
        for desc in PLUGIN_INITIALIZERS.iter() {
            catalog.insert_descriptor(*desc);
        }
        catalog
    }

    /// Adds a compiled-in descriptor.  Returns `false` if it was rejected.
    pub fn insert_descriptor(&mut self, desc: InitializerDescriptor) -> bool {
        if !desc.is_compatible() {
            warn!(
                initializer = desc.name,
                plugin_api = format_args!("{:#010x}", desc.api_version),
                host_api = format_args!("{:#010x}", PLUGIN_API_VERSION),
                "Initializer built against an incompatible plugin API; ignored"
            );
            return false;
        }
        let init = desc.init;
        self.insert(desc.name, Arc::new(init));
        true
    }

    /// Registers an initializer closure under `name`.
    pub fn register<F, Fut>(&mut self, name: impl Into<String>, init: F) -> &mut Self
    where
        F: Fn(PluginContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = InitResult> + Send + 'static,
    {
        self.insert(name, Arc::new(move |ctx| init(ctx).boxed()));
        self
    }

    fn insert(&mut self, name: impl Into<String>, init: Initializer) {
        let name = name.into();
        if self.entries.insert(name.clone(), init).is_some() {
            warn!(initializer = %name, "Duplicate initializer name; last registration wins");
        } else {
            debug!(initializer = %name, "Initializer registered");
        }
    }

    /// Looks up the initializer registered under `name`.
    pub fn get(&self, name: &str) -> Option<Initializer> {
        self.entries.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<_> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for PluginCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginCatalog")
            .field("initializers", &self.names())
            .finish()
    }
}
