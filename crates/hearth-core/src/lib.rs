//! # Hearth Core
//!
//! The service registry at the heart of Hearth.
//!
//! A process declares its services up front, either as ready values or as
//! asynchronous factories naming the services they depend on, and then calls
//! [`ServiceRegistry::build`] once.  The registry:
//!
//! - invokes every factory exactly once, after all of its dependencies;
//! - rejects dependency cycles with the offending path
//!   ([`BuildError::DependencyChain`]);
//! - records every releasable service in build order and, on
//!   [`ServiceRegistry::dispose_all`], releases them in exactly the reverse
//!   order, logging and skipping past failures.
//!
//! ## Modules
//!
//! - [`registry`]: [`ServiceRegistry`] and its lifecycle ([`RegistryPhase`]).
//! - [`service`]: type-erased [`ServiceHandle`]s, [`Service`] values with
//!   their release capabilities, and the [`Dependencies`] a factory receives.
//! - [`dispose`]: the disposal protocol ([`AsyncDispose`], [`Dispose`],
//!   release hooks) shared with the plugin loader.
//! - [`resolver`]: resolve-only views ([`ServiceResolver`], [`StaticResolver`]).
//! - [`key`]: [`ServiceKey`].
//! - [`error`]: [`RegistryError`] and [`BuildError`].
//!
//! ## Example
//!
//! ```rust,ignore
//! use hearth_core::{BoxError, Service, ServiceRegistry};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = ServiceRegistry::new();
//!     registry.register_instance("greeting", String::from("hello"))?;
//!     registry.register_factory("shout", &["greeting"], |deps| async move {
//!         let greeting = deps.get::<String>("greeting")?;
//!         Ok::<_, BoxError>(Service::new(greeting.to_uppercase()))
//!     })?;
//!
//!     registry.build().await?;
//!     println!("{}", registry.resolve::<String>("shout")?);
//!     registry.dispose_all().await;
//!     Ok(())
//! }
//! ```

pub mod dispose;
pub mod error;
pub mod key;
pub mod registry;
pub mod resolver;
pub mod service;

pub use dispose::{
    AsyncDispose, Dispose, ReleaseCapabilities, ReleaseHook, ReleaseKind, release,
    release_guarded,
};
pub use error::{BoxError, BuildError, RegistryError, RegistryResult, panic_message};
pub use key::ServiceKey;
pub use registry::{RegistryPhase, ServiceRegistry};
pub use resolver::{ResolverExt, ServiceResolver, StaticResolver};
pub use service::{Dependencies, Service, ServiceHandle, downcast};

pub use futures::future::BoxFuture;

/// Prelude for common imports.
pub mod prelude {
    pub use super::dispose::{AsyncDispose, Dispose};
    pub use super::error::{BoxError, BuildError, RegistryError};
    pub use super::registry::ServiceRegistry;
    pub use super::resolver::{ResolverExt, ServiceResolver};
    pub use super::service::{Dependencies, Service};
}
