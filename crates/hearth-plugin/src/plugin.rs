//! The plugin contract: what an initializer receives and what it hands back.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hearth_core::{
    AsyncDispose, BoxError, Dispose, RegistryError, RegistryResult, ReleaseCapabilities,
    ResolverExt, ServiceResolver,
};
use thiserror::Error;
use tracing::Span;

// ─── PluginContext ────────────────────────────────────────────────────────────

/// Context passed to a plugin initializer.
///
/// Gives the plugin a resolve-only view of the built services, the `[config]`
/// table of its manifest (an empty object when absent), and a tracing span
/// scoped to the plugin unit.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(serde::Deserialize, Default)]
/// #[serde(default)]
/// struct GreeterConfig { greeting: String }
///
/// async fn init(ctx: PluginContext) -> InitResult {
///     let cfg: GreeterConfig = ctx.get_config()?;
///     let names = ctx.resolve::<Names>("names")?;
///     info!(parent: ctx.span(), greeting = %cfg.greeting, "Greeter ready");
///     Ok(LoadedPlugin::new(ctx.name()))
/// }
/// ```
#[derive(Clone)]
pub struct PluginContext {
    name: String,
    category: String,
    path: PathBuf,
    config: Arc<serde_json::Value>,
    resolver: Arc<dyn ServiceResolver>,
    span: Span,
}

impl PluginContext {
    pub fn new(
        name: impl Into<String>,
        category: impl Into<String>,
        path: impl Into<PathBuf>,
        config: serde_json::Value,
        resolver: Arc<dyn ServiceResolver>,
        span: Span,
    ) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            path: path.into(),
            config: Arc::new(config),
            resolver,
            span,
        }
    }

    /// Name of the plugin unit (the manifest's file stem).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Category directory the unit was discovered in.
    pub fn category(&self) -> &str {
        &self.category
    }

    /// Path of the manifest file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Span covering this unit's initialization.
    pub fn span(&self) -> &Span {
        &self.span
    }

    /// The resolve-only service view.
    pub fn resolver(&self) -> &Arc<dyn ServiceResolver> {
        &self.resolver
    }

    /// Resolves a built service by key.
    pub fn resolve<T: Any + Send + Sync>(&self, key: &str) -> RegistryResult<Arc<T>> {
        self.resolver.resolve(key)
    }

    /// Deserializes the manifest's `[config]` table into `T`.
    ///
    /// Use `#[serde(default)]` on `T` to make every field optional.
    pub fn get_config<T>(&self) -> serde_json::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        T::deserialize(self.config.as_ref())
    }

    /// The raw `[config]` table.
    pub fn raw_config(&self) -> &serde_json::Value {
        &self.config
    }
}

impl fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginContext")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("path", &self.path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ─── LoadedPlugin ─────────────────────────────────────────────────────────────

/// Record of a successfully initialized plugin.
///
/// Carries the capabilities the loader uses to release the plugin on
/// shutdown; a plugin with none is simply dropped.
#[derive(Clone)]
pub struct LoadedPlugin {
    name: String,
    release: ReleaseCapabilities,
}

impl LoadedPlugin {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            release: ReleaseCapabilities::none(),
        }
    }

    /// Releases the plugin through `target` on shutdown.
    pub fn with_async_dispose(mut self, target: Arc<dyn AsyncDispose>) -> Self {
        self.release = self.release.with_async_dispose(target);
        self
    }

    /// Releases the plugin through `target` on shutdown.
    pub fn with_dispose(mut self, target: Arc<dyn Dispose>) -> Self {
        self.release = self.release.with_dispose(target);
        self
    }

    /// Runs `hook` on shutdown.
    pub fn on_dispose<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.release = self.release.with_hook(hook);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn release(&self) -> &ReleaseCapabilities {
        &self.release
    }
}

impl fmt::Debug for LoadedPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedPlugin")
            .field("name", &self.name)
            .field("release", &self.release.kind())
            .finish()
    }
}

// ─── PluginFailure ────────────────────────────────────────────────────────────

/// Why an initializer did not produce a plugin.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginFailure {
    /// The plugin chose not to load (missing optional prerequisite, disabled
    /// by its own config).  Logged at info level.
    #[error("plugin skipped")]
    Skip,

    /// Initialization failed.  Logged at error level.
    #[error("{0}")]
    Error(String),
}

impl PluginFailure {
    pub fn error(reason: impl fmt::Display) -> Self {
        Self::Error(reason.to_string())
    }
}

impl From<RegistryError> for PluginFailure {
    fn from(e: RegistryError) -> Self {
        Self::error(e)
    }
}

impl From<serde_json::Error> for PluginFailure {
    fn from(e: serde_json::Error) -> Self {
        Self::Error(format!("invalid plugin config: {e}"))
    }
}

impl From<BoxError> for PluginFailure {
    fn from(e: BoxError) -> Self {
        Self::error(e)
    }
}

impl From<String> for PluginFailure {
    fn from(reason: String) -> Self {
        Self::Error(reason)
    }
}

impl From<&str> for PluginFailure {
    fn from(reason: &str) -> Self {
        Self::Error(reason.to_string())
    }
}

/// What an initializer returns.
pub type InitResult = Result<LoadedPlugin, PluginFailure>;

#[cfg(test)]
mod tests {
    use super::*;
    use hearth_core::{ReleaseKind, StaticResolver};

    fn context(config: serde_json::Value) -> PluginContext {
        PluginContext::new(
            "greeter",
            "greeters",
            "plugins/greeters/greeter.toml",
            config,
            Arc::new(StaticResolver::new().with("port", 80_u16)),
            Span::none(),
        )
    }

    #[derive(Debug, serde::Deserialize, Default)]
    #[serde(default)]
    struct Cfg {
        greeting: String,
        repeat: u32,
    }

    #[test]
    fn test_get_config() {
        let ctx = context(serde_json::json!({ "greeting": "hi" }));
        let cfg: Cfg = ctx.get_config().unwrap();
        assert_eq!(cfg.greeting, "hi");
        assert_eq!(cfg.repeat, 0);

        let ctx = context(serde_json::json!({ "repeat": "many" }));
        let failure: PluginFailure = ctx.get_config::<Cfg>().unwrap_err().into();
        assert!(failure.to_string().starts_with("invalid plugin config"));
    }

    #[test]
    fn test_resolve_through_context() {
        let ctx = context(serde_json::json!({}));
        assert_eq!(*ctx.resolve::<u16>("port").unwrap(), 80);

        let failure: PluginFailure = ctx.resolve::<u16>("db").unwrap_err().into();
        assert_eq!(failure, PluginFailure::Error("service 'db' not found".into()));
    }

    #[test]
    fn test_loaded_plugin_release_kind() {
        let plain = LoadedPlugin::new("plain");
        assert!(!plain.release().is_releasable());

        let hooked = LoadedPlugin::new("hooked").on_dispose(|| async { Ok::<(), BoxError>(()) });
        assert_eq!(hooked.release().kind(), Some(ReleaseKind::Hook));
    }
}
