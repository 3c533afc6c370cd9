//! Plugin discovery, initialization and disposal.
//!
//! [`PluginLoader`] scans `<plugin_dir>/<category>/` for manifest files and
//! initializes each unit in file-name order:
//!
//! - Each unit is isolated: a malformed manifest, an initializer error, a
//!   panic, or a timeout is logged and counted, and loading moves on to the
//!   next file.
//! - Units without a recognized initializer, units disabled in their manifest,
//!   and initializers returning [`PluginFailure::Skip`] are skipped.
//! - Successfully loaded plugins are kept in load order across categories.
//!
//! [`dispose`](PluginLoader::dispose) releases the loaded plugins in reverse
//! order through the same disposal protocol the service registry uses.
//!
//! ```text
//! new() ──► Created ──load(c)──► Loading(c) ──► Idle ──load(c')──► …
//!                                               └──dispose()──► Disposing ──► Disposed
//! ```

use std::fmt;
use std::io;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use hearth_core::{ServiceResolver, panic_message, release_guarded};
use tracing::{Instrument, Span, debug, error, info, info_span, warn};

use crate::catalog::PluginCatalog;
use crate::error::PluginError;
use crate::manifest::PluginManifest;
use crate::plugin::{LoadedPlugin, PluginContext, PluginFailure};

// =============================================================================
// Options & summary
// =============================================================================

/// Where and how the loader looks for plugin units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginLoaderOptions {
    /// Root directory holding one subdirectory per category.
    pub plugin_dir: PathBuf,
    /// File extension of manifest files, without the dot.
    pub extension: String,
    /// Upper bound on a single initializer.  `None` waits indefinitely.
    pub init_timeout: Option<Duration>,
}

impl Default for PluginLoaderOptions {
    fn default() -> Self {
        Self {
            plugin_dir: PathBuf::from("plugins"),
            extension: "toml".to_string(),
            init_timeout: None,
        }
    }
}

impl PluginLoaderOptions {
    pub fn new(plugin_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugin_dir: plugin_dir.into(),
            ..Self::default()
        }
    }

    pub fn extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn init_timeout(mut self, timeout: Duration) -> Self {
        self.init_timeout = Some(timeout);
        self
    }
}

/// Outcome counts of one [`PluginLoader::load`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub category: String,
    pub loaded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl LoadSummary {
    fn new(category: &str) -> Self {
        Self {
            category: category.to_string(),
            ..Self::default()
        }
    }

    /// Number of units examined.
    pub fn total(&self) -> usize {
        self.loaded + self.skipped + self.failed
    }
}

/// Lifecycle of a [`PluginLoader`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderState {
    Created,
    /// Initializing the units of one category.
    Loading(String),
    Idle,
    Disposing,
    Disposed,
}

impl fmt::Display for LoaderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("created"),
            Self::Loading(category) => write!(f, "loading '{category}'"),
            Self::Idle => f.write_str("idle"),
            Self::Disposing => f.write_str("disposing"),
            Self::Disposed => f.write_str("disposed"),
        }
    }
}

enum UnitOutcome {
    Loaded(LoadedPlugin),
    Skipped,
    Failed,
}

// =============================================================================
// PluginLoader
// =============================================================================

/// Discovers, initializes and disposes plugins.
pub struct PluginLoader {
    options: PluginLoaderOptions,
    catalog: PluginCatalog,
    resolver: Arc<dyn ServiceResolver>,
    plugins: Vec<LoadedPlugin>,
    state: LoaderState,
}

impl PluginLoader {
    /// Creates a loader that hands `resolver` to every initializer.
    pub fn new(
        resolver: Arc<dyn ServiceResolver>,
        catalog: PluginCatalog,
        options: PluginLoaderOptions,
    ) -> Self {
        Self {
            options,
            catalog,
            resolver,
            plugins: Vec::new(),
            state: LoaderState::Created,
        }
    }

    /// Loads every unit of `category`.
    ///
    /// Individual plugin failures are logged and counted, never returned; the
    /// only error is calling this after disposal has begun.
    pub async fn load(&mut self, category: &str) -> Result<LoadSummary, PluginError> {
        if matches!(self.state, LoaderState::Disposing | LoaderState::Disposed) {
            return Err(PluginError::Disposed(self.state.clone()));
        }

        self.state = LoaderState::Loading(category.to_string());
        let span = info_span!("plugin_load", category = %category);
        let summary = self.load_category(category).instrument(span).await;
        self.state = LoaderState::Idle;
        Ok(summary)
    }

    async fn load_category(&mut self, category: &str) -> LoadSummary {
        let mut summary = LoadSummary::new(category);
        let dir = self.options.plugin_dir.join(category);

        let files = match discover(&dir, &self.options.extension).await {
            Ok(files) => files,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %dir.display(), "Plugin directory not found");
                return summary;
            }
            Err(e) => {
                error!(path = %dir.display(), error = %e, "Failed to scan plugin directory");
                return summary;
            }
        };
        debug!(path = %dir.display(), units = files.len(), "Plugin units discovered");

        for path in files {
            let file = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let span = info_span!("plugin_unit", file = %file);
            match self.load_unit(category, &path).instrument(span).await {
                UnitOutcome::Loaded(plugin) => {
                    summary.loaded += 1;
                    self.plugins.push(plugin);
                }
                UnitOutcome::Skipped => summary.skipped += 1,
                UnitOutcome::Failed => summary.failed += 1,
            }
        }

        info!(
            loaded = summary.loaded,
            skipped = summary.skipped,
            failed = summary.failed,
            "Loaded {} plugin(s) from '{}'",
            summary.loaded,
            category
        );
        summary
    }

    async fn load_unit(&self, category: &str, path: &Path) -> UnitOutcome {
        let manifest = match PluginManifest::load(path).await {
            Ok(manifest) => manifest,
            Err(e) => {
                error!(error = %e, "Failed to load plugin unit");
                return UnitOutcome::Failed;
            }
        };

        if !manifest.enabled {
            info!("Plugin disabled by its manifest; skipping");
            return UnitOutcome::Skipped;
        }

        let Some(init_name) = manifest.initializer.as_deref() else {
            warn!("Plugin unit names no initializer; skipping");
            return UnitOutcome::Skipped;
        };
        let Some(init) = self.catalog.get(init_name) else {
            warn!(initializer = init_name, "No recognized initializer for plugin unit; skipping");
            return UnitOutcome::Skipped;
        };

        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| init_name.to_string());
        let ctx = PluginContext::new(
            name,
            category,
            path,
            manifest.config,
            Arc::clone(&self.resolver),
            Span::current(),
        );

        debug!(initializer = init_name, "Initializing plugin");
        let guarded = AssertUnwindSafe(async move { init(ctx).await }).catch_unwind();
        let outcome = match self.options.init_timeout {
            Some(limit) => match tokio::time::timeout(limit, guarded).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    error!(
                        timeout_ms = limit.as_millis() as u64,
                        "Plugin initializer timed out"
                    );
                    return UnitOutcome::Failed;
                }
            },
            None => guarded.await,
        };

        match outcome {
            Ok(Ok(plugin)) => {
                info!(
                    plugin = plugin.name(),
                    releasable = plugin.release().is_releasable(),
                    "Plugin loaded"
                );
                UnitOutcome::Loaded(plugin)
            }
            Ok(Err(PluginFailure::Skip)) => {
                info!("Plugin declined to load; skipping");
                UnitOutcome::Skipped
            }
            Ok(Err(PluginFailure::Error(reason))) => {
                error!(reason = %reason, "Plugin failed to initialize");
                UnitOutcome::Failed
            }
            Err(payload) => {
                error!(
                    panic = %panic_message(payload.as_ref()),
                    "Plugin initializer panicked"
                );
                UnitOutcome::Failed
            }
        }
    }

    /// Releases every loaded plugin in reverse load order.
    ///
    /// Release failures are logged and do not stop the walk.
    pub async fn dispose(&mut self) -> Result<(), PluginError> {
        if matches!(self.state, LoaderState::Disposing | LoaderState::Disposed) {
            return Err(PluginError::Disposed(self.state.clone()));
        }

        self.state = LoaderState::Disposing;
        let plugins = std::mem::take(&mut self.plugins);

        async {
            let mut failed = 0_usize;
            for plugin in plugins.iter().rev() {
                match release_guarded(plugin.release()).await {
                    Ok(true) => debug!(plugin = plugin.name(), "Plugin disposed"),
                    Ok(false) => debug!(plugin = plugin.name(), "Plugin holds nothing to release"),
                    Err(e) => {
                        failed += 1;
                        error!(plugin = plugin.name(), error = %e, "Failed to dispose plugin");
                    }
                }
            }
            info!(plugins = plugins.len(), failed, "Plugins disposed");
        }
        .instrument(info_span!("plugin_dispose"))
        .await;

        self.state = LoaderState::Disposed;
        Ok(())
    }

    /// Loaded plugins, in load order.
    pub fn plugins(&self) -> &[LoadedPlugin] {
        &self.plugins
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn state(&self) -> &LoaderState {
        &self.state
    }

    pub fn options(&self) -> &PluginLoaderOptions {
        &self.options
    }

    pub fn catalog(&self) -> &PluginCatalog {
        &self.catalog
    }
}

impl fmt::Debug for PluginLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginLoader")
            .field("options", &self.options)
            .field("catalog", &self.catalog)
            .field("plugins", &self.plugins)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Regular files directly inside `dir` with the given extension, sorted by
/// file name.
async fn discover(dir: &Path, extension: &str) -> io::Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == extension) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}
