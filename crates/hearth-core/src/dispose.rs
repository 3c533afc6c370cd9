//! Disposal protocol shared by services and plugins.
//!
//! A value is *releasable* when it carries at least one release capability.
//! Capabilities are declared explicitly when the value is handed over (see
//! [`Service`](crate::Service)), never probed at runtime, and are tried in a
//! fixed priority order:
//!
//! 1. [`AsyncDispose`]: asynchronous teardown (close a pool, flush a writer).
//! 2. [`Dispose`]: synchronous teardown.
//! 3. A release hook closure.
//!
//! [`release`] invokes the first capability present and reports `false` for
//! values that have none.  The service registry and the plugin loader both go
//! through [`release_guarded`], which additionally turns a panicking release
//! into an error so that teardown of the remaining entries can continue.
//!
//! # Example
//!
//! ```rust,ignore
//! struct Pool { /* … */ }
//!
//! #[async_trait::async_trait]
//! impl AsyncDispose for Pool {
//!     async fn dispose_async(&self) -> Result<(), BoxError> {
//!         self.close().await?;
//!         Ok(())
//!     }
//! }
//!
//! registry.register_service("db", Service::async_disposable(Pool::connect().await?))?;
//! ```

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;

use crate::error::{BoxError, panic_message};

// ─── Capabilities ─────────────────────────────────────────────────────────────

/// Asynchronous release capability.  Highest priority.
#[async_trait]
pub trait AsyncDispose: Send + Sync {
    /// Releases the resources held by `self`.
    async fn dispose_async(&self) -> Result<(), BoxError>;
}

/// Synchronous release capability.
pub trait Dispose: Send + Sync {
    /// Releases the resources held by `self`.
    fn dispose(&self) -> Result<(), BoxError>;
}

/// Release hook closure.  Lowest priority.
pub type ReleaseHook = Arc<dyn Fn() -> BoxFuture<'static, Result<(), BoxError>> + Send + Sync>;

/// Which capability [`release`] will invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseKind {
    /// [`AsyncDispose::dispose_async`].
    AsyncDispose,
    /// [`Dispose::dispose`].
    Dispose,
    /// A release hook closure.
    Hook,
}

/// The set of release capabilities attached to one value.
#[derive(Clone, Default)]
pub struct ReleaseCapabilities {
    async_dispose: Option<Arc<dyn AsyncDispose>>,
    dispose: Option<Arc<dyn Dispose>>,
    hook: Option<ReleaseHook>,
}

impl ReleaseCapabilities {
    /// A value with no release capability.
    pub fn none() -> Self {
        Self::default()
    }

    /// Attaches an asynchronous release capability.
    pub fn with_async_dispose(mut self, target: Arc<dyn AsyncDispose>) -> Self {
        self.async_dispose = Some(target);
        self
    }

    /// Attaches a synchronous release capability.
    pub fn with_dispose(mut self, target: Arc<dyn Dispose>) -> Self {
        self.dispose = Some(target);
        self
    }

    /// Attaches a release hook.
    pub fn with_hook<F, Fut>(mut self, hook: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
    {
        self.hook = Some(Arc::new(move || hook().boxed()));
        self
    }

    /// Returns `true` when at least one capability is present.
    pub fn is_releasable(&self) -> bool {
        self.kind().is_some()
    }

    /// The capability [`release`] would invoke, by priority.
    pub fn kind(&self) -> Option<ReleaseKind> {
        if self.async_dispose.is_some() {
            Some(ReleaseKind::AsyncDispose)
        } else if self.dispose.is_some() {
            Some(ReleaseKind::Dispose)
        } else if self.hook.is_some() {
            Some(ReleaseKind::Hook)
        } else {
            None
        }
    }
}

impl fmt::Debug for ReleaseCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReleaseCapabilities")
            .field("async_dispose", &self.async_dispose.is_some())
            .field("dispose", &self.dispose.is_some())
            .field("hook", &self.hook.is_some())
            .finish()
    }
}

// ─── release ──────────────────────────────────────────────────────────────────

/// Invokes the highest-priority capability in `caps`.
///
/// Returns `Ok(true)` when something was released, `Ok(false)` when `caps`
/// carries no capability.
pub async fn release(caps: &ReleaseCapabilities) -> Result<bool, BoxError> {
    if let Some(target) = &caps.async_dispose {
        target.dispose_async().await?;
    } else if let Some(target) = &caps.dispose {
        target.dispose()?;
    } else if let Some(hook) = &caps.hook {
        hook().await?;
    } else {
        return Ok(false);
    }
    Ok(true)
}

/// Same as [`release`], but a panic inside the capability is caught and
/// reported as an error.
pub async fn release_guarded(caps: &ReleaseCapabilities) -> Result<bool, BoxError> {
    match AssertUnwindSafe(release(caps)).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => {
            Err(format!("release panicked: {}", panic_message(payload.as_ref())).into())
        }
    }
}
