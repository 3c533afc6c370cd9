//! # Hearth Runtime
//!
//! Process-level wiring for Hearth applications:
//!
//! - [`config`]: figment-based layered configuration (`hearth.toml`,
//!   `HEARTH_*` environment variables, programmatic overrides).
//! - [`logging`]: `tracing-subscriber` setup driven by the `[logging]` section.
//! - [`Host`]: owns the [`ServiceRegistry`](hearth_core::ServiceRegistry) and
//!   the [`PluginLoader`](hearth_plugin::PluginLoader), and runs the
//!   build → load → wait → dispose lifecycle.
//!
//! ```ignore
//! use hearth_runtime::Host;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut host = Host::builder().build()?;
//!     host.registry().register_instance("greeting", String::from("hello"))?;
//!     host.run().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod host;
pub mod logging;

pub use config::{ConfigError, ConfigLoader, ConfigResult, HearthConfig, Profile};
pub use error::{RuntimeError, RuntimeResult};
pub use host::{Host, HostBuilder, HostState};
pub use logging::{LoggingBuilder, LoggingError, SpanEvents};

// Re-export tracing for use by other crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros and the [`Level`](tracing::Level) type.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
