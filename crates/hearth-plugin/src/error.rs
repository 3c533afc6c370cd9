//! Error types for the plugin loader.

use thiserror::Error;

use crate::loader::LoaderState;

/// Misuse of a [`PluginLoader`](crate::PluginLoader).
///
/// Individual plugin failures never surface here; they are logged and
/// counted in the [`LoadSummary`](crate::LoadSummary).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PluginError {
    /// `load` or `dispose` called once disposal has started.
    #[error("plugin loader is {0}")]
    Disposed(LoaderState),
}
