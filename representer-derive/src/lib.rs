use proc_macro::TokenStream;
use quote::quote;
use syn::{parse_macro_input, DeriveInput, Type};

mod schema;

/// Derive macro for the `Represented` and `Representable` traits.
///
/// Generates property reflection (`read`, `write`, `nested_mut`,
/// `push_nested`) and the type-level `schema()`, with one definition per
/// field in field order.
///
/// # Example
///
/// ```ignore
/// use representer_core::Represented;
///
/// #[derive(Default, Represented)]
/// #[represent(wrap = "song")]
/// struct Song {
///     title: String,
///     #[represent(rename = "trackNumber")]
///     track: u32,
///     #[represent(nested)]
///     album: Option<Album>,
///     #[represent(collection)]
///     composers: Vec<Composer>,
/// }
/// ```
///
/// # Attributes
///
/// - `#[represent(skip)]` - Leave the field out of the schema
/// - `#[represent(rename = "key")]` - Use a different document key
/// - `#[represent(nested)]` - Map the field through the schema of its type
///   (`T`, `Option<T>` or `Option<Box<T>>`)
/// - `#[represent(collection)]` - Map a `Vec<T>` as a list of nested objects
/// - `#[represent(wrap = "name")]` - Wrap the nested representation; on the
///   container, wrap the whole document
///
/// Plain fields convert through `serde_json`, so they must be `Serialize`
/// and `DeserializeOwned`. Nested types must be `Representable + Default`.
#[proc_macro_derive(Represented, attributes(represent))]
pub fn derive_represented(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match derive_represented_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn derive_represented_impl(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let crate_path = quote! { ::representer_core };
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let fields = collect_fields(input)?;
    let container = parse_container_attrs(&input.attrs)?;

    let schema_impl = schema::generate_schema(&fields, &container, &crate_path);
    let reflect_impl = generate_reflection(&fields, &crate_path);

    Ok(quote! {
        impl #impl_generics #crate_path::Represented for #name #ty_generics #where_clause {
            #reflect_impl
        }

        impl #impl_generics #crate_path::Representable for #name #ty_generics #where_clause {
            #schema_impl
        }
    })
}

/// How a field is mapped.
pub(crate) enum FieldKind {
    Value,
    /// A nested object stored directly.
    Nested(Type),
    /// `Option<T>` or, with `boxed`, `Option<Box<T>>`.
    Optional { inner: Type, boxed: bool },
    /// `Vec<T>`.
    Collection(Type),
}

pub(crate) struct MappedField {
    pub ident: syn::Ident,
    pub name: String,
    pub kind: FieldKind,
    pub attrs: FieldAttrs,
}

fn collect_fields(input: &DeriveInput) -> syn::Result<Vec<MappedField>> {
    let named = match &input.data {
        syn::Data::Struct(syn::DataStruct {
            fields: syn::Fields::Named(named),
            ..
        }) => named,
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Represented can only be derived for structs with named fields",
            ))
        }
    };

    let mut fields = Vec::new();
    for field in &named.named {
        let attrs = parse_field_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        let kind = field_kind(field, &attrs)?;
        fields.push(MappedField {
            name: ident.to_string(),
            ident,
            kind,
            attrs,
        });
    }
    Ok(fields)
}

fn field_kind(field: &syn::Field, attrs: &FieldAttrs) -> syn::Result<FieldKind> {
    if attrs.collection {
        return match generic_arg_of(&field.ty, "Vec") {
            Some(inner) => Ok(FieldKind::Collection(inner)),
            None => Err(syn::Error::new_spanned(
                &field.ty,
                "`collection` fields must be of type `Vec<T>`",
            )),
        };
    }
    if !attrs.nested {
        return Ok(FieldKind::Value);
    }
    match generic_arg_of(&field.ty, "Option") {
        Some(inner) => match generic_arg_of(&inner, "Box") {
            Some(boxed) => Ok(FieldKind::Optional {
                inner: boxed,
                boxed: true,
            }),
            None => Ok(FieldKind::Optional {
                inner,
                boxed: false,
            }),
        },
        None => Ok(FieldKind::Nested(field.ty.clone())),
    }
}

/// Returns `T` if `ty` is `wrapper<T>`.
fn generic_arg_of(ty: &Type, wrapper: &str) -> Option<Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    extract_single_generic_arg(&segment.arguments)
}

/// Extract the single generic argument from angle brackets, e.g., T from Vec<T>.
fn extract_single_generic_arg(args: &syn::PathArguments) -> Option<Type> {
    match args {
        syn::PathArguments::AngleBracketed(angle) if angle.args.len() == 1 => match &angle.args[0] {
            syn::GenericArgument::Type(ty) => Some(ty.clone()),
            _ => None,
        },
        _ => None,
    }
}

fn generate_reflection(fields: &[MappedField], crate_path: &proc_macro2::TokenStream) -> proc_macro2::TokenStream {
    let undeclared = quote! {
        ::std::result::Result::Err(
            #crate_path::SchemaError::Undeclared(::std::string::ToString::to_string(name)).into()
        )
    };
    let not_nested = quote! {
        ::std::result::Result::Err(
            #crate_path::SchemaError::NotNested(::std::string::ToString::to_string(name)).into()
        )
    };

    let reads = fields.iter().map(|f| {
        let ident = &f.ident;
        let name = &f.name;
        let property = match &f.kind {
            FieldKind::Value => quote! {
                #crate_path::Property::Value(#crate_path::to_value(&self.#ident)?)
            },
            FieldKind::Nested(_) => quote! {
                #crate_path::Property::Nested(::std::option::Option::Some(
                    &self.#ident as &dyn #crate_path::Represented
                ))
            },
            FieldKind::Optional { boxed: false, .. } => quote! {
                #crate_path::Property::Nested(
                    self.#ident.as_ref().map(|v| v as &dyn #crate_path::Represented)
                )
            },
            FieldKind::Optional { boxed: true, .. } => quote! {
                #crate_path::Property::Nested(
                    self.#ident.as_deref().map(|v| v as &dyn #crate_path::Represented)
                )
            },
            FieldKind::Collection(_) => quote! {
                #crate_path::Property::Collection(
                    self.#ident.iter().map(|v| v as &dyn #crate_path::Represented).collect()
                )
            },
        };
        quote! { #name => ::std::result::Result::Ok(#property), }
    });

    let writes = fields.iter().map(|f| {
        let ident = &f.ident;
        let name = &f.name;
        let clear = match &f.kind {
            FieldKind::Value => {
                return quote! {
                    #name => {
                        self.#ident = #crate_path::from_value(value)?;
                        ::std::result::Result::Ok(())
                    }
                };
            }
            FieldKind::Nested(_) => quote! { self.#ident = ::std::default::Default::default(); },
            FieldKind::Optional { .. } => quote! { self.#ident = ::std::option::Option::None; },
            FieldKind::Collection(_) => quote! { self.#ident.clear(); },
        };
        quote! {
            #name => {
                if !value.is_null() {
                    return ::std::result::Result::Err(#crate_path::MappingError::Document(
                        ::std::format!("`{}` is nested and only accepts null as a plain value", name)
                    ));
                }
                #clear
                ::std::result::Result::Ok(())
            }
        }
    });

    let nested = fields.iter().filter_map(|f| {
        let ident = &f.ident;
        let name = &f.name;
        let child = match &f.kind {
            FieldKind::Nested(_) => quote! { &mut self.#ident },
            FieldKind::Optional { inner, .. } => quote! {{
                let child: &mut #inner = self.#ident.get_or_insert_with(::std::default::Default::default);
                child
            }},
            FieldKind::Value | FieldKind::Collection(_) => return None,
        };
        Some(quote! {
            #name => {
                let child: &mut dyn #crate_path::Represented = #child;
                ::std::result::Result::Ok(child)
            }
        })
    });

    let pushes = fields.iter().filter_map(|f| {
        let ident = &f.ident;
        let name = &f.name;
        let FieldKind::Collection(_) = &f.kind else {
            return None;
        };
        Some(quote! {
            #name => {
                let index = self.#ident.len();
                self.#ident.push(::std::default::Default::default());
                let child: &mut dyn #crate_path::Represented = &mut self.#ident[index];
                ::std::result::Result::Ok(child)
            }
        })
    });

    let flat_arm = |mapped: fn(&FieldKind) -> bool| {
        let names: Vec<_> = fields.iter().filter(|f| !mapped(&f.kind)).map(|f| &f.name).collect();
        (!names.is_empty()).then(|| quote! { #(#names)|* => #not_nested, })
    };
    let not_single = flat_arm(|kind| matches!(kind, FieldKind::Nested(_) | FieldKind::Optional { .. }));
    let not_collection = flat_arm(|kind| matches!(kind, FieldKind::Collection(_)));

    quote! {
        fn read(&self, name: &str) -> ::std::result::Result<#crate_path::Property<'_>, #crate_path::MappingError> {
            match name {
                #(#reads)*
                _ => #undeclared,
            }
        }

        fn write(
            &mut self,
            name: &str,
            value: #crate_path::Value,
        ) -> ::std::result::Result<(), #crate_path::MappingError> {
            match name {
                #(#writes)*
                _ => {
                    let _ = value;
                    #undeclared
                }
            }
        }

        fn nested_mut(
            &mut self,
            name: &str,
        ) -> ::std::result::Result<&mut dyn #crate_path::Represented, #crate_path::MappingError> {
            match name {
                #(#nested)*
                #not_single
                _ => #undeclared,
            }
        }

        fn push_nested(
            &mut self,
            name: &str,
        ) -> ::std::result::Result<&mut dyn #crate_path::Represented, #crate_path::MappingError> {
            match name {
                #(#pushes)*
                #not_collection
                _ => #undeclared,
            }
        }
    }
}

#[derive(Default)]
pub(crate) struct ContainerAttrs {
    pub wrap: Option<String>,
}

fn parse_container_attrs(attrs: &[syn::Attribute]) -> syn::Result<ContainerAttrs> {
    let mut result = ContainerAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("represent") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("wrap") {
                let value: syn::LitStr = meta.value()?.parse()?;
                result.wrap = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported container attribute"))
            }
        })?;
    }

    Ok(result)
}

#[derive(Default)]
pub(crate) struct FieldAttrs {
    pub skip: bool,
    pub rename: Option<String>,
    pub nested: bool,
    pub collection: bool,
    pub wrap: Option<String>,
}

pub(crate) fn parse_field_attrs(attrs: &[syn::Attribute]) -> syn::Result<FieldAttrs> {
    let mut result = FieldAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("represent") {
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                result.skip = true;
            } else if meta.path.is_ident("rename") {
                let value: syn::LitStr = meta.value()?.parse()?;
                result.rename = Some(value.value());
            } else if meta.path.is_ident("nested") {
                result.nested = true;
            } else if meta.path.is_ident("collection") {
                result.collection = true;
            } else if meta.path.is_ident("wrap") {
                let value: syn::LitStr = meta.value()?.parse()?;
                result.wrap = Some(value.value());
            } else {
                return Err(meta.error("unsupported field attribute"));
            }
            Ok(())
        })?;
    }

    Ok(result)
}
