//! Derive macro for keel record descriptors.
//!
//! This crate provides `#[derive(Record)]`, which registers a struct's field
//! list (name, kind, and constraint tag) as a static descriptor so that the
//! schema parser never needs runtime reflection.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Expr, Fields, Ident, Lit, Meta, Type};

/// Derives `keel::schema::Record` for a struct with named fields.
///
/// The table name is the struct's bare name and each column is named after
/// its field.
///
/// # Attributes
///
/// - `#[record(hooks)]` - The struct provides its own `keel::Hooks` impl.
///   Without it an empty impl (every hook a no-op) is generated.
///
/// # Field Attributes
///
/// - `#[column(tag = "PRIMARY KEY")]` - Raw constraint text appended to the
///   column definition
/// - `#[column(skip)]` - The field is not mapped; it keeps its default value
///   when rows are read
#[proc_macro_derive(Record, attributes(record, column))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive_record_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

fn derive_record_impl(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let table_name = struct_name.to_string();
    let custom_hooks = has_custom_hooks(&input.attrs)?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Record derive only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Record derive only supports structs",
            ));
        }
    };

    let mut mapped: Vec<FieldInfo> = Vec::new();
    for field in fields {
        let attrs = parse_column_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        mapped.push(FieldInfo {
            column_name: ident.to_string(),
            ident,
            ty: field.ty.clone(),
            tag: attrs.tag.unwrap_or_default(),
        });
    }

    let descriptors: Vec<TokenStream2> = mapped
        .iter()
        .map(|info| {
            let name = &info.column_name;
            let ty = &info.ty;
            let tag = &info.tag;
            quote! {
                ::keel::schema::FieldDescriptor {
                    name: #name,
                    kind: <#ty as ::keel::value::SqlField>::KIND,
                    tag: #tag,
                }
            }
        })
        .collect();

    let value_arms: Vec<TokenStream2> = mapped
        .iter()
        .map(|info| {
            let name = &info.column_name;
            let ident = &info.ident;
            quote! {
                #name => ::core::option::Option::Some(
                    ::keel::value::ToSqlValue::to_sql_value(
                        ::core::clone::Clone::clone(&self.#ident),
                    ),
                ),
            }
        })
        .collect();

    let assign_arms: Vec<TokenStream2> = mapped
        .iter()
        .map(|info| {
            let name = &info.column_name;
            let ident = &info.ident;
            quote! {
                #name => {
                    self.#ident = ::keel::value::FromSqlValue::from_sql_value(value)?;
                }
            }
        })
        .collect();

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let hooks_impl = if custom_hooks {
        quote! {}
    } else {
        quote! {
            impl #impl_generics ::keel::Hooks for #struct_name #ty_generics #where_clause {}
        }
    };

    let expanded = quote! {
        impl #impl_generics ::keel::schema::Record for #struct_name #ty_generics #where_clause {
            const NAME: &'static str = #table_name;
            const FIELDS: &'static [::keel::schema::FieldDescriptor] = &[
                #(#descriptors),*
            ];

            fn value(&self, column: &str) -> ::core::option::Option<::keel::value::SqlValue> {
                match column {
                    #(#value_arms)*
                    _ => ::core::option::Option::None,
                }
            }

            fn assign(
                &mut self,
                column: &str,
                value: ::keel::value::SqlValue,
            ) -> ::core::result::Result<(), ::keel::value::ValueError> {
                match column {
                    #(#assign_arms)*
                    other => {
                        return ::core::result::Result::Err(
                            ::keel::value::ValueError::UnknownColumn(
                                ::std::string::ToString::to_string(other),
                            ),
                        );
                    }
                }
                ::core::result::Result::Ok(())
            }
        }

        #hooks_impl
    };

    Ok(expanded)
}

struct FieldInfo {
    ident: Ident,
    ty: Type,
    column_name: String,
    tag: String,
}

struct ColumnAttrs {
    tag: Option<String>,
    skip: bool,
}

fn has_custom_hooks(attrs: &[Attribute]) -> syn::Result<bool> {
    let mut hooks = false;
    for attr in attrs {
        if attr.path().is_ident("record") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("hooks") {
                    hooks = true;
                    Ok(())
                } else {
                    Err(meta.error("unsupported record attribute"))
                }
            })?;
        }
    }
    Ok(hooks)
}

fn parse_column_attrs(attrs: &[Attribute]) -> syn::Result<ColumnAttrs> {
    let mut result = ColumnAttrs {
        tag: None,
        skip: false,
    };

    for attr in attrs {
        if attr.path().is_ident("column") {
            // Handle empty attribute like #[column]
            if matches!(attr.meta, Meta::Path(_)) {
                continue;
            }

            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    result.skip = true;
                } else if meta.path.is_ident("tag") {
                    let value: Expr = meta.value()?.parse()?;
                    match value {
                        Expr::Lit(lit) => match lit.lit {
                            Lit::Str(s) => result.tag = Some(s.value()),
                            other => {
                                return Err(syn::Error::new_spanned(
                                    other,
                                    "column tag must be a string literal",
                                ));
                            }
                        },
                        other => {
                            return Err(syn::Error::new_spanned(
                                other,
                                "column tag must be a string literal",
                            ));
                        }
                    }
                } else {
                    return Err(meta.error("unsupported column attribute"));
                }
                Ok(())
            })?;
        }
    }

    Ok(result)
}
