//! Runtime error types.

use std::io;

use hearth_core::{BuildError, RegistryError};
use hearth_plugin::PluginError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::host::HostState;
use crate::logging::LoggingError;

/// Errors that can occur while configuring or running a [`Host`](crate::Host).
#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to initialize logging: {0}")]
    Logging(#[from] LoggingError),

    /// The service graph could not be built.
    #[error("Failed to build services: {0}")]
    Build(#[from] BuildError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error("Failed to listen for shutdown signals: {0}")]
    Signal(#[source] io::Error),

    /// A lifecycle method was called in the wrong state.
    #[error("Cannot {action} a host that is {state}")]
    State {
        action: &'static str,
        state: HostState,
    },
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
