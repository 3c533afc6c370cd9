use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{Ident, ItemFn, LitStr, Path, parse_macro_input, parse_quote};

/// Implementation of the `#[plugin_initializer]` attribute macro.
///
/// Leaves the decorated `async fn` unchanged and appends a
/// `distributed_slice` static that places an `InitializerDescriptor` for it in
/// `PLUGIN_INITIALIZERS`.
pub fn plugin_initializer(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut name: Option<LitStr> = None;
    let mut krate: Option<Path> = None;
    let parser = syn::meta::parser(|meta| {
        if meta.path.is_ident("name") {
            name = Some(meta.value()?.parse()?);
            Ok(())
        } else if meta.path.is_ident("crate") {
            krate = Some(meta.value()?.parse()?);
            Ok(())
        } else {
            Err(meta.error("unsupported argument, expected `name = \"...\"` or `crate = path`"))
        }
    });
    parse_macro_input!(attr with parser);

    let func = parse_macro_input!(item as ItemFn);
    if func.sig.asyncness.is_none() {
        return syn::Error::new_spanned(
            &func.sig.fn_token,
            "#[plugin_initializer] must be applied to an `async fn`",
        )
        .into_compile_error()
        .into();
    }
    if func.sig.inputs.len() != 1 {
        return syn::Error::new_spanned(
            &func.sig.inputs,
            "a plugin initializer takes exactly one `PluginContext` argument",
        )
        .into_compile_error()
        .into();
    }

    let fn_name = &func.sig.ident;
    let name = name.unwrap_or_else(|| LitStr::new(&fn_name.to_string(), fn_name.span()));
    let krate = krate.unwrap_or_else(|| parse_quote!(::hearth_plugin));

    let fn_name_upper = fn_name.to_string().to_uppercase();
    let static_name = Ident::new(
        &format!("_PLUGIN_INITIALIZER_{fn_name_upper}"),
        Span::call_site(),
    );

    quote! {
        #func

        #[doc(hidden)]
        #[#krate::linkme::distributed_slice(#krate::PLUGIN_INITIALIZERS)]
        #[linkme(crate = #krate::linkme)]
        static #static_name: #krate::InitializerDescriptor = #krate::InitializerDescriptor {
            api_version: #krate::PLUGIN_API_VERSION,
            name: #name,
            init: |ctx| #krate::futures::FutureExt::boxed(#fn_name(ctx)),
        };
    }
    .into()
}
