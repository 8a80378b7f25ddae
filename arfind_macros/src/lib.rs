#![forbid(unsafe_code)]

extern crate proc_macro;

mod field;
mod model;

mod attr {
    pub mod attr_util;
}

use proc_macro::TokenStream;

/// Declare the fields of a model stored under the given name.
///
/// ```ignore
/// pub struct GreenSmoothie;
///
/// #[arfind::model("green_smoothies")]
/// impl GreenSmoothie {
///     #[key]
///     fn id() -> i64;
///     fn name() -> String;
///     fn customer_id() -> Option<i64>;
/// }
/// ```
///
/// Each declaration becomes an associated function returning a typed
/// `arfind::field::Field` handle. Without any `#[key]`, a field named `id`
/// is the key.
#[proc_macro_attribute]
pub fn model(args: TokenStream, input: TokenStream) -> TokenStream {
    let name: syn::LitStr = syn::parse_macro_input!(args as syn::LitStr);
    let impl_model = syn::parse_macro_input!(input as model::ImplModel);

    let tokens = model::gen_model(name, impl_model);

    TokenStream::from(tokens)
}
