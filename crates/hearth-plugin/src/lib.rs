//! # Hearth Plugin
//!
//! Plugin lifecycle management on top of the Hearth service registry.
//!
//! Plugins are compiled into the host binary as *initializers*, registered
//! either with `#[plugin_initializer]` (collected at link time into
//! [`PLUGIN_INITIALIZERS`]) or by hand in a [`PluginCatalog`].  Which of them
//! run, and with what settings, is decided by *plugin units*: manifest files
//! laid out as `<plugin_dir>/<category>/<name>.toml`.
//!
//! The [`PluginLoader`] initializes the units of a category one by one,
//! isolating every failure, and on shutdown disposes the loaded plugins in
//! reverse order.
//!
//! ```rust,ignore
//! use hearth_macros::plugin_initializer;
//! use hearth_plugin::prelude::*;
//!
//! #[plugin_initializer(name = "greeter")]
//! async fn greeter(ctx: PluginContext) -> InitResult {
//!     let cfg: GreeterConfig = ctx.get_config()?;
//!     let names = ctx.resolve::<Names>("names")?;
//!     Ok(LoadedPlugin::new(ctx.name()))
//! }
//!
//! let mut loader = PluginLoader::new(
//!     registry.clone(),
//!     PluginCatalog::from_registered(),
//!     PluginLoaderOptions::new("plugins"),
//! );
//! loader.load("greeters").await?;
//! // …later…
//! loader.dispose().await?;
//! ```

pub mod catalog;
pub mod descriptor;
pub mod error;
pub mod loader;
pub mod manifest;
pub mod plugin;

pub use catalog::{Initializer, PluginCatalog};
pub use descriptor::{
    InitializerDescriptor, InitializerFn, PLUGIN_API_VERSION, PLUGIN_INITIALIZERS,
};
pub use error::PluginError;
pub use loader::{LoadSummary, LoaderState, PluginLoader, PluginLoaderOptions};
pub use manifest::{ManifestError, PluginManifest};
pub use plugin::{InitResult, LoadedPlugin, PluginContext, PluginFailure};

// Paths used by `#[plugin_initializer]` expansions.
#[doc(hidden)]
pub use futures;
#[doc(hidden)]
pub use linkme;

/// Prelude for plugin authors.
pub mod prelude {
    pub use super::catalog::PluginCatalog;
    pub use super::loader::{PluginLoader, PluginLoaderOptions};
    pub use super::plugin::{InitResult, LoadedPlugin, PluginContext, PluginFailure};
}
