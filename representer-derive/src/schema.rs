use proc_macro2::TokenStream;
use quote::quote;

use crate::{ContainerAttrs, FieldKind, MappedField};

/// Generates the `schema()` method implementation.
pub fn generate_schema(fields: &[MappedField], container: &ContainerAttrs, crate_path: &TokenStream) -> TokenStream {
    let definitions = fields.iter().map(|f| field_definition(f, crate_path));

    let wrap = container
        .wrap
        .as_ref()
        .map(|wrap| quote! { .wrapped(#wrap) });

    quote! {
        fn schema() -> #crate_path::Schema {
            #crate_path::Schema::record([#(#definitions),*])#wrap
        }
    }
}

/// Builds the definition of one field.
///
/// Nested types are referenced through their own `schema()` lazily, so a
/// type may contain itself.
fn field_definition(field: &MappedField, crate_path: &TokenStream) -> TokenStream {
    let name = &field.name;
    let mut definition = quote! { #crate_path::Definition::new(#name) };

    let nested = match &field.kind {
        FieldKind::Value => None,
        FieldKind::Nested(ty) | FieldKind::Optional { inner: ty, .. } | FieldKind::Collection(ty) => Some(ty),
    };
    if let Some(ty) = nested {
        definition = quote! {
            #definition.nested_deferred(<#ty as #crate_path::Representable>::schema)
        };
    }
    if let FieldKind::Collection(_) = field.kind {
        definition = quote! { #definition.collection() };
    }
    if let Some(key) = &field.attrs.rename {
        definition = quote! { #definition.rename(#key) };
    }
    if let Some(wrap) = &field.attrs.wrap {
        definition = quote! { #definition.wrapped(#wrap) };
    }
    definition
}
