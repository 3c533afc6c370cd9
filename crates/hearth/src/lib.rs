//! # Hearth
//!
//! A service registry with dependency-ordered construction, reverse-order
//! disposal, and a plugin loader built on top of it.
//!
//! ## Architecture
//!
//! ```text
//!  factories ─┐   build()    ┌─────────────────┐   resolve   ┌────────────────┐
//!  instances ─┴────────────▶ │ ServiceRegistry │ ◀────────── │  PluginLoader  │
//!                            │  (hearth-core)  │             │ (hearth-plugin)│
//!                            └─────────────────┘             └────────────────┘
//!                                     ▲                               ▲
//!                                     └──── Host (hearth-runtime) ────┘
//! ```
//!
//! - **Registry**: services are declared up front, built once in dependency
//!   order, and released in exactly the reverse order.
//! - **Plugins**: initializers compiled into the binary, selected and
//!   configured by manifest files under `<plugin_dir>/<category>/`.
//! - **Host**: configuration, logging and the start/shutdown lifecycle.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hearth::prelude::*;
//!
//! #[plugin_initializer(name = "greeter", crate = hearth::plugin)]
//! async fn greeter(ctx: PluginContext) -> InitResult {
//!     let greeting = ctx.resolve::<String>("greeting")?;
//!     info!(plugin = ctx.name(), "{greeting}");
//!     Ok(LoadedPlugin::new(ctx.name()))
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut host = Host::builder().build()?;
//!     host.registry().register_instance("greeting", String::from("hello"))?;
//!     host.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: `hearth.toml` configuration files
//! - `yaml-config`: `hearth.yaml` configuration files
//! - `json-log`: JSON log output

pub use hearth_core as core;
pub use hearth_plugin as plugin;
pub use hearth_runtime as runtime;

pub use hearth_macros::plugin_initializer;

/// Commonly used types for building Hearth applications.
///
/// ```rust,ignore
/// use hearth::prelude::*;
/// ```
pub mod prelude {
    pub use hearth_macros::plugin_initializer;

    // Registry
    pub use hearth_core::{
        AsyncDispose, BoxError, BuildError, Dependencies, Dispose, RegistryError, ResolverExt,
        Service, ServiceRegistry, ServiceResolver,
    };

    // Plugins
    pub use hearth_plugin::{
        InitResult, LoadedPlugin, PluginCatalog, PluginContext, PluginFailure, PluginLoader,
        PluginLoaderOptions,
    };

    // Host
    pub use hearth_runtime::{HearthConfig, Host, RuntimeError};

    pub use hearth_runtime::prelude::*;
}
