//! Process host tying configuration, services and plugins together.
//!
//! ```rust,ignore
//! use hearth_runtime::Host;
//!
//! let mut host = Host::builder().config_file("hearth.toml").build()?;
//! host.registry().register_instance("greeting", String::from("hello"))?;
//!
//! // Builds the registry, loads every configured plugin category,
//! // waits for Ctrl+C or SIGTERM, then tears everything down.
//! host.run().await?;
//! ```

use std::fmt;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use hearth_core::ServiceRegistry;
use hearth_plugin::{LoadSummary, PluginCatalog, PluginLoader};
use tokio::signal;
use tracing::{error, info, warn};

use crate::config::{ConfigLoader, HearthConfig, validate_config};
use crate::error::{RuntimeError, RuntimeResult};
use crate::logging;

/// Lifecycle of a [`Host`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostState {
    Created,
    Running,
    Stopped,
}

impl fmt::Display for HostState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Stopped => "stopped",
        })
    }
}

/// Owns the service registry and the plugin loader of one process.
///
/// Services are registered through [`Host::registry`] before [`Host::start`].
/// Shutdown disposes plugins first, then the registry, so plugins may still
/// use their services while releasing.
pub struct Host {
    config: HearthConfig,
    registry: Arc<ServiceRegistry>,
    loader: PluginLoader,
    summaries: Vec<LoadSummary>,
    state: HostState,
}

impl Host {
    pub fn builder() -> HostBuilder {
        HostBuilder::new()
    }

    /// Creates a host over the link-time registered plugin initializers.
    pub fn from_config(config: HearthConfig) -> RuntimeResult<Self> {
        Self::with_catalog(config, PluginCatalog::from_registered())
    }

    /// Creates a host over an explicit plugin catalog.
    pub fn with_catalog(config: HearthConfig, catalog: PluginCatalog) -> RuntimeResult<Self> {
        validate_config(&config)?;

        let registry = Arc::new(ServiceRegistry::new());
        let loader = PluginLoader::new(
            registry.clone(),
            catalog,
            config.plugins.loader_options(),
        );

        Ok(Self {
            config,
            registry,
            loader,
            summaries: Vec::new(),
            state: HostState::Created,
        })
    }

    pub fn config(&self) -> &HearthConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ServiceRegistry> {
        &self.registry
    }

    pub fn plugins(&self) -> &PluginLoader {
        &self.loader
    }

    /// Per-category results of the last [`Host::start`].
    pub fn summaries(&self) -> &[LoadSummary] {
        &self.summaries
    }

    pub fn state(&self) -> HostState {
        self.state
    }

    /// Builds the registry, then loads every configured plugin category.
    ///
    /// When the build fails, whatever was constructed is released and the
    /// host is stopped.
    pub async fn start(&mut self) -> RuntimeResult<&[LoadSummary]> {
        if self.state != HostState::Created {
            return Err(RuntimeError::State {
                action: "start",
                state: self.state,
            });
        }

        info!(services = self.registry.len(), "Building services");
        if let Err(e) = self.registry.build().await {
            error!(error = %e, "Service build failed");
            self.registry.dispose_all().await;
            self.state = HostState::Stopped;
            return Err(e.into());
        }
        self.state = HostState::Running;

        for category in &self.config.plugins.categories {
            let summary = self.loader.load(category).await?;
            if summary.failed > 0 {
                warn!(
                    category = %summary.category,
                    failed = summary.failed,
                    "Some plugins failed to load"
                );
            }
            self.summaries.push(summary);
        }

        info!(
            services = self.registry.len(),
            plugins = self.loader.len(),
            "Host started"
        );
        Ok(&self.summaries)
    }

    /// Disposes plugins in reverse load order, then the registry.
    ///
    /// Calling this again after it completed is a no-op.
    pub async fn shutdown(&mut self) -> RuntimeResult<()> {
        if self.state == HostState::Stopped {
            return Ok(());
        }

        info!(plugins = self.loader.len(), "Shutting down host");
        self.loader.dispose().await?;
        self.registry.dispose_all().await;
        self.state = HostState::Stopped;

        info!("Host stopped");
        Ok(())
    }

    /// Starts, waits for Ctrl+C or SIGTERM, then shuts down.
    pub async fn run(&mut self) -> RuntimeResult<()> {
        self.start().await?;
        info!("Host is running. Press Ctrl+C to stop.");

        let signalled = wait_for_shutdown().await;
        self.shutdown().await?;
        signalled
    }

    /// Starts, waits for `shutdown`, then shuts down.
    pub async fn run_until<F>(&mut self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        self.start().await?;
        shutdown.await;
        self.shutdown().await
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host")
            .field("state", &self.state)
            .field("registry", &self.registry)
            .field("loader", &self.loader)
            .finish_non_exhaustive()
    }
}

async fn wait_for_shutdown() -> RuntimeResult<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())
            .map_err(RuntimeError::Signal)?;

        tokio::select! {
            result = signal::ctrl_c() => {
                result.map_err(RuntimeError::Signal)?;
                info!("Received Ctrl+C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await.map_err(RuntimeError::Signal)?;
        info!("Received Ctrl+C, shutting down");
    }

    Ok(())
}

// =============================================================================
// HostBuilder
// =============================================================================

/// Loads configuration, installs logging and creates a [`Host`].
///
/// ```rust,ignore
/// let host = Host::builder()
///     .profile("production")
///     .search_path("/etc/hearth")
///     .build()?;
/// ```
#[derive(Debug)]
pub struct HostBuilder {
    config_loader: ConfigLoader,
    catalog: Option<PluginCatalog>,
    init_logging: bool,
}

impl Default for HostBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HostBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
            catalog: None,
            init_logging: true,
        }
    }

    pub fn config_file(mut self, path: impl AsRef<Path>) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    pub fn search_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    pub fn merge(mut self, config: HearthConfig) -> Self {
        self.config_loader = self.config_loader.merge(config);
        self
    }

    /// Uses `catalog` instead of the link-time registered initializers.
    pub fn catalog(mut self, catalog: PluginCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Leaves the global tracing subscriber alone.
    pub fn without_logging(mut self) -> Self {
        self.init_logging = false;
        self
    }

    pub fn build(self) -> RuntimeResult<Host> {
        let config = self.config_loader.load()?;
        validate_config(&config)?;

        if self.init_logging {
            logging::init_from_config(&config.logging)?;
        }

        let catalog = self.catalog.unwrap_or_else(PluginCatalog::from_registered);
        info!(
            level = %config.logging.level,
            plugin_dir = %config.plugins.dir.display(),
            initializers = catalog.len(),
            "Host configured"
        );
        Host::with_catalog(config, catalog)
    }
}
