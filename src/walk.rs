//! Field walker: turn a record's static [`Schema`] into the ordered list of
//! bindable [`FieldDescriptor`]s.
//!
//! The walk interprets every `#[config(...)]` annotation once, so the flag,
//! environment and file providers only ever see fully derived names:
//!
//! - ignored fields (and everything below them) are dropped;
//! - nested records are recursed into, their children spliced in place of the
//!   record field itself, in declaration order;
//! - embedded records reuse the parent's prefixes, plain nested records add
//!   their own key and environment name as a new prefix segment.

use std::collections::HashMap;

use serde::Serialize;

use crate::de::{self, is_true};
use crate::error::ConfigError;
use crate::names;
use crate::schema::{FieldKind, FieldSpec, Schema};

/// Annotation value that disables a flag, short flag or environment binding.
pub const SKIP: &str = "-";

/// Metadata for one bindable leaf field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDescriptor {
    /// Declared name (alias if one is configured for the active tag).
    pub name: String,
    /// Rust identifiers from the root record to this field.
    pub path: Vec<&'static str>,
    /// Canonical dotted key, unique within one walk.
    pub key: String,
    /// Environment variable, `None` when disabled.
    pub env: Option<String>,
    /// Bare uppercased alias consulted after `env`.
    pub env_fallback: Option<String>,
    /// Long flag name, `None` when disabled.
    pub flag: Option<String>,
    pub short: Option<char>,
    pub alias: Option<String>,
    pub description: String,
    pub required: bool,
    pub default: Option<String>,
    pub kind: FieldKind,
    pub optional: bool,
    /// Reached through an embedded record.
    pub embedded: bool,
}

impl FieldDescriptor {
    /// Dotted path of Rust identifiers, e.g. `nested.property`.
    pub fn field_path(&self) -> String {
        self.path.join(".")
    }
}

/// Walk `schema` and return its leaf descriptors.
///
/// `env_prefix` is the caller-supplied prefix (e.g. `"env_config"`); keys
/// start unprefixed. `file_tag` selects which `alias(..)` entry renames fields.
pub fn walk(
    schema: &Schema,
    env_prefix: &str,
    file_tag: &str,
) -> Result<Vec<FieldDescriptor>, ConfigError> {
    let mut out = Vec::new();
    walk_record(
        schema,
        &Scope {
            key_prefix: "",
            env_prefix,
            path: &[],
            embedded: false,
        },
        file_tag,
        &mut out,
    )?;
    check_unique_keys(&out)?;
    Ok(out)
}

struct Scope<'a> {
    key_prefix: &'a str,
    env_prefix: &'a str,
    path: &'a [&'static str],
    embedded: bool,
}

fn walk_record(
    schema: &Schema,
    scope: &Scope<'_>,
    file_tag: &str,
    out: &mut Vec<FieldDescriptor>,
) -> Result<(), ConfigError> {
    let Schema::Record { fields, .. } = schema else {
        return Err(ConfigError::InvalidSpecification {
            type_name: schema.name().to_string(),
        });
    };

    for field in *fields {
        if is_true(field.annotations.ignored) {
            continue;
        }

        let descriptor = describe(field, scope, file_tag)?;

        if field.kind == FieldKind::Nested {
            let nested = field.nested.ok_or_else(|| ConfigError::MalformedAnnotation {
                field: descriptor.field_path(),
                annotation: "nested",
                reason: "nested field has no record schema".into(),
            })?;

            let (key_prefix, env_prefix) = if field.embedded {
                (scope.key_prefix, scope.env_prefix)
            } else {
                (
                    descriptor.key.as_str(),
                    descriptor.env.as_deref().unwrap_or(scope.env_prefix),
                )
            };
            walk_record(
                &nested(),
                &Scope {
                    key_prefix,
                    env_prefix,
                    path: &descriptor.path,
                    embedded: scope.embedded || field.embedded,
                },
                file_tag,
                out,
            )?;
            continue;
        }

        if field.kind == FieldKind::Opaque {
            return Err(ConfigError::MalformedAnnotation {
                field: descriptor.field_path(),
                annotation: "type",
                reason: "field type cannot be bound; mark it ignored".into(),
            });
        }

        out.push(descriptor);
    }

    Ok(())
}

/// Derive the descriptor of one field from its annotations and scope.
fn describe(
    field: &FieldSpec,
    scope: &Scope<'_>,
    file_tag: &str,
) -> Result<FieldDescriptor, ConfigError> {
    let ann = &field.annotations;
    let mut path = scope.path.to_vec();
    path.push(field.ident);
    let field_path = path.join(".");

    let malformed = |annotation: &'static str, reason: String| ConfigError::MalformedAnnotation {
        field: field_path.clone(),
        annotation,
        reason,
    };

    let required = match ann.required {
        None | Some("") => false,
        Some(raw) => de::parse_bool(raw)
            .ok_or_else(|| malformed("required", format!("'{raw}' is not a boolean")))?,
    };

    let alias = ann.alias(file_tag);
    let name = alias.unwrap_or(field.ident);

    let key = match ann.key.filter(|k| !k.is_empty()) {
        Some(explicit) => explicit.to_lowercase(),
        None => names::join_key(scope.key_prefix, name),
    };

    let (env, env_fallback) = match ann.env.filter(|e| !e.is_empty()) {
        Some(SKIP) => (None, None),
        Some(explicit) => (Some(explicit.to_string()), None),
        None => {
            let word = names::split_words(name, is_true(ann.split_words));
            let env = names::join_env(scope.env_prefix, &word);
            let fallback = alias
                .map(str::to_uppercase)
                .filter(|bare| *bare != env);
            (Some(env), fallback)
        }
    };

    let flag = match ann.flag.filter(|f| !f.is_empty()) {
        Some(SKIP) => None,
        Some(explicit) => Some(explicit.to_string()),
        None => Some(names::flag_from_key(&key)),
    };

    let short = match ann.short {
        None | Some(SKIP) | Some("") => None,
        Some(raw) => {
            let mut chars = raw.chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) => Some(c),
                _ => {
                    return Err(malformed(
                        "short",
                        format!("'{raw}' must be a single character"),
                    ));
                }
            }
        }
    };

    let default = ann.default.filter(|d| !d.is_empty()).map(str::to_string);
    if field.kind.is_map()
        && let Some(literal) = &default
    {
        de::parse_pairs(literal).map_err(|e| malformed("default", e.to_string()))?;
    }

    let description = ann.desc.unwrap_or(field.doc).to_string();

    Ok(FieldDescriptor {
        name: name.to_string(),
        path,
        key,
        env,
        env_fallback,
        flag,
        short,
        alias: alias.map(str::to_string),
        description,
        required,
        default,
        kind: field.kind,
        optional: field.optional,
        embedded: scope.embedded || field.embedded,
    })
}

fn check_unique_keys(descriptors: &[FieldDescriptor]) -> Result<(), ConfigError> {
    let mut seen: HashMap<&str, &FieldDescriptor> = HashMap::new();
    for d in descriptors {
        if let Some(first) = seen.insert(&d.key, d) {
            return Err(ConfigError::NameCollision {
                name: d.key.clone(),
                first: first.field_path(),
                second: d.field_path(),
            });
        }
    }
    Ok(())
}
