//! Derive macros for the classconfig library
//!
//! This crate provides `#[derive(Configurable)]` for generating the attribute
//! registry and constructor of a configurable struct from its fields.
//!
//! # Usage
//!
//! ```text
//! use classconfig::DeriveConfigurable;
//!
//! #[derive(DeriveConfigurable)]
//! #[configurable(name = "Server")]
//! struct ServerConfig {
//!     #[config(desc = "Port to listen on", default = 8080, validator = MinValueIntegerValidator(1))]
//!     port: u16,
//!
//!     #[config(desc = "Storage backend", subclass, default_class = "DiskStorage")]
//!     storage: Box<dyn Storage>,
//!
//!     #[config(desc = "Database", factory, omit(password), delay_init)]
//!     database: Deferred<Database>,
//! }
//! ```

use proc_macro::TokenStream;
use quote::quote;
use syn::ext::IdentExt;
use syn::punctuated::Punctuated;
use syn::{
    Attribute, Data, DeriveInput, Expr, Fields, GenericArgument, Lit, Meta, PathArguments, Token,
    Type, parse_macro_input,
};

/// Derive macro for generating `Configurable` implementations.
///
/// Every named field becomes one attribute, in declaration order.
///
/// # Attributes
///
/// ## Container attributes (`#[configurable(...)]`)
/// - `name = "Name"` - Class name used in `cls` nodes (defaults to the type name)
///
/// ## Field attributes (`#[config(...)]`)
/// - `desc = "..."` - Description, written as the document comment
/// - `rename = "key"` - Attribute name (defaults to the field name)
/// - `default = <expr>` - Default value, converted with `json!`
/// - `validator = <expr>` - Validator applied after transformation
/// - `transform = <expr>` - Transformer applied before validation
/// - `factory` - Nested configurable object (`T` or `Deferred<T>`)
/// - `delay_init` - Build the nested object on demand (field type `Deferred<T>`)
/// - `omit(a, b)` - Hide attributes of the nested class
/// - `override_default(a = <expr>, ...)` - Replace defaults of the nested class
/// - `subclass` - Class selected by name (field type `Box<dyn Parent>`)
/// - `default_class = "Name"` - Default class of a subclass attribute
/// - `subclass_list` - Sequence of classes (field type `Vec<Box<dyn Parent>>`)
/// - `flatten` - Include all attributes of another configurable type
/// - `skip` - Not configurable; initialized with `Default::default()`
#[proc_macro_derive(Configurable, attributes(configurable, config))]
pub fn derive_configurable(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let container_attrs = parse_container_attrs(&input.attrs)?;

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    input,
                    "Configurable can only be derived for structs with named fields.\n\nExample:\n  #[derive(Configurable)]\n  struct MyConfig {\n      field: Type,\n  }",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                input,
                "Configurable can only be derived for structs.\n\nTry: #[derive(Configurable)] on a struct, not an enum or union.",
            ));
        }
    };

    let mut declarations = Vec::new();
    let mut initializers = Vec::new();

    for field in fields {
        let Some(field_name) = field.ident.as_ref() else {
            continue;
        };
        let field_type = &field.ty;
        let attrs = parse_field_attrs(&field.attrs)?;

        if attrs.skip {
            initializers.push(quote! { #field_name: ::core::default::Default::default() });
            continue;
        }

        if attrs.flatten {
            declarations.push(quote! {
                registry.extend(<#field_type as ::classconfig::Configurable>::attributes());
            });
            initializers.push(quote! {
                #field_name: <#field_type as ::classconfig::Configurable>::construct(args)?
            });
            continue;
        }

        let key = attrs
            .rename
            .clone()
            .unwrap_or_else(|| field_name.unraw().to_string());
        let desc = attrs.desc.clone().unwrap_or_default();

        let constructor = match attrs.kind {
            FieldKind::Value => quote! { ::classconfig::AttributeSpec::value(#key, #desc) },
            FieldKind::Factory => {
                let target = if attrs.delay_init {
                    generic_arg(field_type, "Deferred").ok_or_else(|| {
                        syn::Error::new_spanned(
                            field_type,
                            "#[config(delay_init)] fields must have type Deferred<T>",
                        )
                    })?
                } else {
                    field_type
                };
                quote! { ::classconfig::AttributeSpec::factory::<#target>(#key, #desc) }
            }
            FieldKind::Subclass => {
                let parent = generic_arg(field_type, "Box").ok_or_else(|| {
                    syn::Error::new_spanned(
                        field_type,
                        "#[config(subclass)] fields must have type Box<dyn Parent>",
                    )
                })?;
                quote! { ::classconfig::AttributeSpec::subclass::<#parent>(#key, #desc) }
            }
            FieldKind::SubclassList => {
                let parent = generic_arg(field_type, "Vec")
                    .and_then(|item| generic_arg(item, "Box"))
                    .ok_or_else(|| {
                        syn::Error::new_spanned(
                            field_type,
                            "#[config(subclass_list)] fields must have type Vec<Box<dyn Parent>>",
                        )
                    })?;
                quote! { ::classconfig::AttributeSpec::subclass_list::<#parent>(#key, #desc) }
            }
        };

        let mut modifiers = Vec::new();
        if let Some(default) = &attrs.default {
            modifiers.push(quote! {
                .default(::classconfig::__private::serde_json::json!(#default))
            });
        }
        if let Some(validator) = &attrs.validator {
            modifiers.push(quote! { .validator(#validator) });
        }
        if let Some(transform) = &attrs.transform {
            modifiers.push(quote! { .transform(#transform) });
        }
        if attrs.delay_init {
            modifiers.push(quote! { .delay_init() });
        }
        if !attrs.omit.is_empty() {
            let omitted = attrs.omit.iter().map(|name| quote! { .attribute(#name) });
            modifiers.push(quote! { .omit(::classconfig::Omit::new() #(#omitted)*) });
        }
        for (name, value) in &attrs.overrides {
            modifiers.push(quote! {
                .override_default(#name, ::classconfig::__private::serde_json::json!(#value))
            });
        }
        if let Some(cls) = &attrs.default_class {
            modifiers.push(quote! { .default_class(#cls) });
        }

        declarations.push(quote! {
            registry.declare(#constructor #(#modifiers)*);
        });

        let init = match attrs.kind {
            FieldKind::Value => quote! { #field_name: args.value(#key)? },
            _ => quote! { #field_name: args.object(#key)? },
        };
        initializers.push(init);
    }

    let class_name = container_attrs.name.map(|class_name| {
        quote! {
            fn class_name() -> &'static str {
                #class_name
            }
        }
    });

    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    Ok(quote! {
        impl #impl_generics ::classconfig::Configurable for #name #ty_generics #where_clause {
            #class_name

            fn attributes() -> ::classconfig::AttributeRegistry {
                let mut registry = ::classconfig::AttributeRegistry::new();
                #(#declarations)*
                registry
            }

            fn construct(args: &mut ::classconfig::Arguments) -> ::classconfig::Result<Self> {
                ::core::result::Result::Ok(Self {
                    #(#initializers),*
                })
            }
        }
    })
}

/// Container-level attributes from #[configurable(...)]
#[derive(Default)]
struct ContainerAttrs {
    name: Option<String>,
}

#[derive(Default, Clone, Copy, PartialEq)]
enum FieldKind {
    #[default]
    Value,
    Factory,
    Subclass,
    SubclassList,
}

/// Field-level attributes from #[config(...)]
#[derive(Default)]
struct FieldAttrs {
    desc: Option<String>,
    rename: Option<String>,
    default: Option<Expr>,
    validator: Option<Expr>,
    transform: Option<Expr>,
    kind: FieldKind,
    delay_init: bool,
    omit: Vec<String>,
    overrides: Vec<(String, Expr)>,
    default_class: Option<String>,
    flatten: bool,
    skip: bool,
}

fn parse_meta_list(attr: &Attribute) -> syn::Result<Punctuated<Meta, Token![,]>> {
    attr.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)
}

fn string_literal(expr: &Expr, what: &str) -> syn::Result<String> {
    if let Expr::Lit(lit) = expr {
        if let Lit::Str(s) = &lit.lit {
            return Ok(s.value());
        }
    }
    Err(syn::Error::new_spanned(
        expr,
        format!(
            "#[config({what})] must be a string literal.\n\nExample: #[config({what} = \"...\")]"
        ),
    ))
}

fn parse_container_attrs(attrs: &[Attribute]) -> syn::Result<ContainerAttrs> {
    let mut result = ContainerAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("configurable") {
            continue;
        }
        for meta in parse_meta_list(attr)? {
            match meta {
                Meta::NameValue(nv) if nv.path.is_ident("name") => {
                    result.name = Some(string_literal(&nv.value, "name")?);
                }
                other => {
                    return Err(syn::Error::new_spanned(
                        other,
                        "unknown #[configurable] option, expected `name = \"...\"`",
                    ));
                }
            }
        }
    }

    Ok(result)
}

fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut result = FieldAttrs::default();

    for attr in attrs {
        if !attr.path().is_ident("config") {
            continue;
        }
        for meta in parse_meta_list(attr)? {
            match meta {
                Meta::Path(path) => {
                    if path.is_ident("factory") {
                        result.kind = FieldKind::Factory;
                    } else if path.is_ident("subclass") {
                        result.kind = FieldKind::Subclass;
                    } else if path.is_ident("subclass_list") {
                        result.kind = FieldKind::SubclassList;
                    } else if path.is_ident("delay_init") {
                        result.delay_init = true;
                        result.kind = FieldKind::Factory;
                    } else if path.is_ident("flatten") {
                        result.flatten = true;
                    } else if path.is_ident("skip") {
                        result.skip = true;
                    } else {
                        return Err(syn::Error::new_spanned(path, "unknown #[config] flag"));
                    }
                }
                Meta::NameValue(nv) => {
                    if nv.path.is_ident("desc") {
                        result.desc = Some(string_literal(&nv.value, "desc")?);
                    } else if nv.path.is_ident("rename") {
                        result.rename = Some(string_literal(&nv.value, "rename")?);
                    } else if nv.path.is_ident("default_class") {
                        result.default_class = Some(string_literal(&nv.value, "default_class")?);
                    } else if nv.path.is_ident("default") {
                        result.default = Some(nv.value);
                    } else if nv.path.is_ident("validator") {
                        result.validator = Some(nv.value);
                    } else if nv.path.is_ident("transform") {
                        result.transform = Some(nv.value);
                    } else {
                        return Err(syn::Error::new_spanned(nv.path, "unknown #[config] option"));
                    }
                }
                Meta::List(list) => {
                    if list.path.is_ident("omit") {
                        let names = list.parse_args_with(
                            Punctuated::<syn::Ident, Token![,]>::parse_terminated,
                        )?;
                        result
                            .omit
                            .extend(names.iter().map(|name| name.unraw().to_string()));
                    } else if list.path.is_ident("override_default") {
                        let pairs = list.parse_args_with(
                            Punctuated::<syn::MetaNameValue, Token![,]>::parse_terminated,
                        )?;
                        for pair in pairs {
                            let name = pair.path.get_ident().ok_or_else(|| {
                                syn::Error::new_spanned(&pair.path, "expected an attribute name")
                            })?;
                            result.overrides.push((name.unraw().to_string(), pair.value));
                        }
                    } else {
                        return Err(syn::Error::new_spanned(list.path, "unknown #[config] option"));
                    }
                }
            }
        }
    }

    Ok(result)
}

/// First type argument of `ty` when its last path segment is `wrapper`
fn generic_arg<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    args.args.iter().find_map(|arg| match arg {
        GenericArgument::Type(ty) => Some(ty),
        _ => None,
    })
}
