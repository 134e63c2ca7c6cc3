//! Derive macro for squill entities.

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

mod entity;

/// Derives `squill::Entity` for a named-field struct.
///
/// Table and column names can be overridden with raw tags:
///
/// ```ignore
/// #[derive(Entity)]
/// #[orm("table=people")]
/// struct Person {
///     id: i64,
///     #[orm("column=given_name")]
///     first_name: String,
/// }
/// ```
///
/// Every field type must be `Clone`, `Into<squill::Value>` and
/// `squill::FromValue`.
#[proc_macro_derive(Entity, attributes(orm))]
pub fn derive_entity(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    entity::expand(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}
