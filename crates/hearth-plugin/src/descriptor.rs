//! Initializer descriptors and the link-time initializer registry.

use futures::future::BoxFuture;
use linkme::distributed_slice;

use crate::plugin::{InitResult, PluginContext};

// ─── API versioning ───────────────────────────────────────────────────────────

/// Current plugin API version (1.0).
pub const PLUGIN_API_VERSION: u32 = 0x0001_0000;

// ─── InitializerDescriptor ────────────────────────────────────────────────────

/// Signature of a compiled-in plugin initializer.
pub type InitializerFn = fn(PluginContext) -> BoxFuture<'static, InitResult>;

/// A static, `Copy` handle to one compiled-in initializer.
///
/// Usually produced by `#[plugin_initializer]`, which places the descriptor in
/// [`PLUGIN_INITIALIZERS`].  Manifests refer to it by [`name`](Self::name).
#[derive(Debug, Clone, Copy)]
pub struct InitializerDescriptor {
    /// Plugin API version this descriptor was compiled against.
    pub api_version: u32,
    /// Name manifests use in their `initializer` field.
    pub name: &'static str,
    /// The initializer itself.
    pub init: InitializerFn,
}

impl InitializerDescriptor {
    /// Returns `true` if this descriptor can run on the current host.
    ///
    /// The major part must match exactly; the descriptor's minor part must be
    /// ≤ the host's minor part.
    pub fn is_compatible(&self) -> bool {
        let host_major = PLUGIN_API_VERSION >> 16;
        let desc_major = self.api_version >> 16;
        let desc_minor = self.api_version & 0xFFFF;
        let host_minor = PLUGIN_API_VERSION & 0xFFFF;
        desc_major == host_major && desc_minor <= host_minor
    }
}

/// Every initializer registered with `#[plugin_initializer]` in the final
/// binary.
#[distributed_slice]
pub static PLUGIN_INITIALIZERS: [InitializerDescriptor];

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;

    fn noop(_: PluginContext) -> BoxFuture<'static, InitResult> {
        async { Err(crate::PluginFailure::Skip) }.boxed()
    }

    #[test]
    fn test_api_compatibility() {
        let mut desc = InitializerDescriptor {
            api_version: PLUGIN_API_VERSION,
            name: "noop",
            init: noop,
        };
        assert!(desc.is_compatible());

        desc.api_version = 0x0002_0000;
        assert!(!desc.is_compatible());

        desc.api_version = 0x0001_0001;
        assert!(!desc.is_compatible());

        desc.api_version = 0x0001_0000;
        assert!(desc.is_compatible());
    }
}
