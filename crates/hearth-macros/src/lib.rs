//! Procedural macros for Hearth.
//!
//! # `#[plugin_initializer]`
//!
//! Registers an `async fn(PluginContext) -> InitResult` as a compiled-in
//! plugin initializer.  Plugin manifests select it by name:
//!
//! ```rust,ignore
//! use hearth::prelude::*;
//!
//! // Selected by `initializer = "greeter"` in a plugin unit.
//! #[plugin_initializer(name = "greeter", crate = hearth::plugin)]
//! async fn greeter(ctx: PluginContext) -> InitResult {
//!     Ok(LoadedPlugin::new(ctx.name()))
//! }
//! ```
//!
//! Arguments:
//!
//! - `name = "..."`: the name manifests use (defaults to the function name).
//! - `crate = path`: where `hearth_plugin` is reachable from the calling crate
//!   (defaults to `::hearth_plugin`).

mod initializer;

use proc_macro::TokenStream;

/// Registers an async plugin initializer in `PLUGIN_INITIALIZERS`.
///
/// See the [crate-level documentation](crate) for the accepted arguments.
#[proc_macro_attribute]
pub fn plugin_initializer(attr: TokenStream, item: TokenStream) -> TokenStream {
    initializer::plugin_initializer(attr, item)
}
