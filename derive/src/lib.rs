//! Derive macro for `structconf::Settings`.
//!
//! ```ignore
//! #[derive(Settings, Default)]
//! struct Config {
//!     /// Port to listen on.
//!     #[config(default = 8080, short = "P")]
//!     port: u16,
//!
//!     #[config(nested, file = "db")]
//!     database: Database,
//! }
//! ```
//!
//! # Field attributes
//!
//! | attribute | effect |
//! |-----------|--------|
//! | `required`, `required = "true"` | must be supplied by a flag, the file or the environment |
//! | `env = "NAME"` / `env = "-"` | explicit environment variable / no environment binding |
//! | `flag = "name"` / `flag = "-"` | explicit long flag / no flag |
//! | `short = "c"` / `short = "-"` | short flag alias |
//! | `default = ...` | default literal (string, integer, float or bool) |
//! | `desc = "..."` | help text; defaults to the `///` doc comment |
//! | `ignored` | exclude the field from every source |
//! | `split_words` | split `CamelCase` names into `CAMEL_CASE` env names |
//! | `key = "a.b"` | explicit canonical key |
//! | `file = "name"`, `alias(tag = "name")` | format-specific rename |
//! | `nested` | the field is a record deriving `Settings` |
//! | `embed` | nested record whose fields join the parent's namespace |
//!
//! Annotation values are passed through as written; the walker interprets them
//! at run time so that malformed values are reported with the field name.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{
    Attribute, Data, DeriveInput, Expr, ExprLit, Fields, GenericArgument, Ident, Lit, LitStr,
    Meta, PathArguments, Result, Token, Type, ext::IdentExt, meta::ParseNestedMeta,
    parse_macro_input,
};

/// Implements `structconf::Settings` for a struct with named fields.
///
/// Tuple structs, unit structs and enums get an implementation whose schema is
/// rejected at run time with `ConfigError::InvalidSpecification`.
#[proc_macro_derive(Settings, attributes(config))]
pub fn derive_settings(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(&input)
        .unwrap_or_else(syn::Error::into_compile_error)
        .into()
}

fn expand(input: &DeriveInput) -> Result<TokenStream2> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Settings cannot be derived for generic types",
        ));
    }

    let ident = &input.ident;
    let name = ident.unraw().to_string();

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => &named.named,
            _ => return Ok(opaque_impl(ident, &name)),
        },
        _ => return Ok(opaque_impl(ident, &name)),
    };

    let mut specs = Vec::new();
    let mut assign_arms = Vec::new();
    let mut materialize = Vec::new();

    for field in fields {
        let Some(field_ident) = &field.ident else {
            continue;
        };
        let attrs = FieldAttrs::parse(&field.attrs)?;
        let field_name = field_ident.unraw().to_string();
        let (optional, inner_ty) = match option_inner(&field.ty) {
            Some(inner) => (true, inner),
            None => (false, &field.ty),
        };
        let ty = &field.ty;
        let is_nested = attrs.nested || attrs.embed;
        let ignored = attrs.ignored.as_deref().is_some_and(is_true);

        let (kind, nested) = if ignored {
            (quote!(::structconf::FieldKind::Opaque), quote!(None))
        } else if is_nested {
            (
                quote!(::structconf::FieldKind::Nested),
                quote!(Some(<#inner_ty as ::structconf::Settings>::schema as fn() -> ::structconf::Schema)),
            )
        } else {
            (
                quote!(<#ty as ::structconf::de::FieldValue>::KIND),
                quote!(None),
            )
        };

        if !ignored {
            if is_nested {
                let target = if optional {
                    quote!(self.#field_ident.get_or_insert_with(::core::default::Default::default))
                } else {
                    quote!(&mut self.#field_ident)
                };
                assign_arms.push(quote! {
                    [#field_name, rest @ ..] => ::structconf::Settings::assign(#target, rest, value),
                });
                materialize.push(quote! {
                    ::structconf::Settings::materialize(#target);
                });
            } else {
                assign_arms.push(quote! {
                    [#field_name] => {
                        self.#field_ident = <#ty as ::structconf::de::FieldValue>::from_value(value)?;
                        Ok(())
                    }
                });
            }
        }

        let doc = doc_comment(&field.attrs);
        let annotations = attrs.annotations_tokens();
        let embedded = attrs.embed;
        specs.push(quote! {
            ::structconf::FieldSpec {
                ident: #field_name,
                kind: #kind,
                optional: #optional,
                embedded: #embedded,
                nested: #nested,
                doc: #doc,
                annotations: #annotations,
            }
        });
    }

    Ok(quote! {
        impl ::structconf::Settings for #ident {
            fn schema() -> ::structconf::Schema {
                const FIELDS: &[::structconf::FieldSpec] = &[#(#specs),*];
                ::structconf::Schema::Record {
                    name: #name,
                    fields: FIELDS,
                }
            }

            #[allow(unused_variables)]
            fn assign(
                &mut self,
                path: &[&str],
                value: &::structconf::de::Value,
            ) -> ::core::result::Result<(), ::structconf::de::ValueError> {
                match path {
                    #(#assign_arms)*
                    _ => ::core::result::Result::Err(::structconf::de::ValueError::unknown_path(path)),
                }
            }

            fn materialize(&mut self) {
                #(#materialize)*
            }
        }
    })
}

fn opaque_impl(ident: &Ident, name: &str) -> TokenStream2 {
    quote! {
        impl ::structconf::Settings for #ident {
            fn schema() -> ::structconf::Schema {
                ::structconf::Schema::Opaque { name: #name }
            }

            fn assign(
                &mut self,
                path: &[&str],
                _value: &::structconf::de::Value,
            ) -> ::core::result::Result<(), ::structconf::de::ValueError> {
                ::core::result::Result::Err(::structconf::de::ValueError::unknown_path(path))
            }
        }
    }
}

/// Raw `#[config(...)]` values of one field.
#[derive(Default)]
struct FieldAttrs {
    required: Option<String>,
    env: Option<String>,
    flag: Option<String>,
    short: Option<String>,
    default: Option<String>,
    desc: Option<String>,
    ignored: Option<String>,
    split_words: Option<String>,
    key: Option<String>,
    aliases: Vec<(String, String)>,
    nested: bool,
    embed: bool,
}

impl FieldAttrs {
    fn parse(attrs: &[Attribute]) -> Result<Self> {
        let mut out = FieldAttrs::default();
        for attr in attrs.iter().filter(|a| a.path().is_ident("config")) {
            attr.parse_nested_meta(|meta| out.parse_item(&meta))?;
        }
        Ok(out)
    }

    fn parse_item(&mut self, meta: &ParseNestedMeta<'_>) -> Result<()> {
        let Some(name) = meta.path.get_ident().map(ToString::to_string) else {
            return Err(meta.error("expected a config attribute name"));
        };

        match name.as_str() {
            "nested" => self.nested = true,
            "embed" => self.embed = true,
            "required" => self.required = Some(flag_value(meta)?),
            "ignored" => self.ignored = Some(flag_value(meta)?),
            "split_words" => self.split_words = Some(flag_value(meta)?),
            "env" => self.env = Some(string_value(meta)?),
            "flag" => self.flag = Some(string_value(meta)?),
            "short" => self.short = Some(string_value(meta)?),
            "desc" => self.desc = Some(string_value(meta)?),
            "key" => self.key = Some(string_value(meta)?),
            "default" => self.default = Some(literal_value(meta)?),
            "file" => self.aliases.push(("file".into(), string_value(meta)?)),
            "alias" => meta.parse_nested_meta(|inner| {
                let tag = inner
                    .path
                    .get_ident()
                    .ok_or_else(|| inner.error("expected an alias tag name"))?
                    .to_string();
                self.aliases.push((tag, string_value(&inner)?));
                Ok(())
            })?,
            other => return Err(meta.error(format!("unknown config attribute `{other}`"))),
        }
        Ok(())
    }

    fn annotations_tokens(&self) -> TokenStream2 {
        let required = opt_tokens(&self.required);
        let env = opt_tokens(&self.env);
        let flag = opt_tokens(&self.flag);
        let short = opt_tokens(&self.short);
        let default = opt_tokens(&self.default);
        let desc = opt_tokens(&self.desc);
        let ignored = opt_tokens(&self.ignored);
        let split_words = opt_tokens(&self.split_words);
        let key = opt_tokens(&self.key);
        let aliases = self
            .aliases
            .iter()
            .map(|(tag, name)| quote!((#tag, #name)));
        quote! {
            ::structconf::Annotations {
                required: #required,
                env: #env,
                flag: #flag,
                short: #short,
                default: #default,
                desc: #desc,
                ignored: #ignored,
                split_words: #split_words,
                key: #key,
                aliases: &[#(#aliases),*],
            }
        }
    }
}

fn opt_tokens(value: &Option<String>) -> TokenStream2 {
    match value {
        Some(v) => quote!(Some(#v)),
        None => quote!(None),
    }
}

/// `name` alone means `"true"`; `name = "..."` or `name = true` keeps the value.
fn flag_value(meta: &ParseNestedMeta<'_>) -> Result<String> {
    if meta.input.peek(Token![=]) {
        literal_value(meta)
    } else {
        Ok("true".into())
    }
}

fn string_value(meta: &ParseNestedMeta<'_>) -> Result<String> {
    let lit: LitStr = meta.value()?.parse()?;
    Ok(lit.value())
}

/// A string, integer, float or bool literal, optionally negated, as text.
fn literal_value(meta: &ParseNestedMeta<'_>) -> Result<String> {
    let input = meta.value()?;
    let negative = input.peek(Token![-]);
    if negative {
        input.parse::<Token![-]>()?;
    }
    let lit: Lit = input.parse()?;
    let text = match &lit {
        Lit::Str(s) if !negative => s.value(),
        Lit::Int(i) => i.base10_digits().to_string(),
        Lit::Float(f) => f.base10_digits().to_string(),
        Lit::Bool(b) if !negative => b.value.to_string(),
        _ => return Err(syn::Error::new_spanned(lit, "unsupported literal")),
    };
    Ok(if negative { format!("-{text}") } else { text })
}

fn is_true(raw: &str) -> bool {
    matches!(raw.to_ascii_lowercase().as_str(), "1" | "t" | "true")
}

/// Collect `///` lines, trimmed and joined with `\n`.
fn doc_comment(attrs: &[Attribute]) -> String {
    attrs
        .iter()
        .filter(|a| a.path().is_ident("doc"))
        .filter_map(|a| match &a.meta {
            Meta::NameValue(nv) => match &nv.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(s), ..
                }) => Some(s.value().trim().to_string()),
                _ => None,
            },
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// `Option<T>` → `Some(T)`.
fn option_inner(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let segment = path.path.segments.last()?;
    if segment.ident != "Option" {
        return None;
    }
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        GenericArgument::Type(inner) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}
