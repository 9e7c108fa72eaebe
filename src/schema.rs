//! Static record shape produced by `#[derive(Settings)]`.
//!
//! The derive macro emits one [`FieldSpec`] per declared field, carrying the
//! raw `#[config(...)]` annotations as written. Interpreting them (parsing
//! `required`, deriving names, skipping ignored fields) is the walker's job,
//! so a malformed annotation surfaces as a [`ConfigError`](crate::ConfigError)
//! naming the field rather than as a compile error.

use serde::Serialize;

use crate::de::{Value, ValueError};

/// Semantic type tag of a field, used for flag shapes, zero values and
/// default-literal conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Bool,
    Int,
    Uint,
    Float,
    String,
    Duration,
    StringList,
    IntList,
    /// String keys to text-parsed values.
    StringMap,
    /// String keys to integer values.
    IntMap,
    /// A record marked `#[config(nested)]` or `#[config(embed)]`.
    Nested,
    /// A type the library cannot bind. Only emitted for ignored fields.
    Opaque,
}

impl FieldKind {
    pub fn is_list(self) -> bool {
        matches!(self, FieldKind::StringList | FieldKind::IntList)
    }

    pub fn is_map(self) -> bool {
        matches!(self, FieldKind::StringMap | FieldKind::IntMap)
    }
}

/// Raw `#[config(...)]` annotations of one field.
#[derive(Debug, Clone, Copy)]
pub struct Annotations {
    pub required: Option<&'static str>,
    pub env: Option<&'static str>,
    pub flag: Option<&'static str>,
    pub short: Option<&'static str>,
    pub default: Option<&'static str>,
    pub desc: Option<&'static str>,
    pub ignored: Option<&'static str>,
    pub split_words: Option<&'static str>,
    /// Explicit canonical key, replacing the derived one.
    pub key: Option<&'static str>,
    /// Format-specific aliases as `(tag, name)` pairs, e.g. `("file", "outer")`.
    pub aliases: &'static [(&'static str, &'static str)],
}

impl Annotations {
    /// The alias registered under `tag`, if any.
    pub fn alias(&self, tag: &str) -> Option<&'static str> {
        self.aliases
            .iter()
            .find(|(t, _)| *t == tag)
            .map(|(_, name)| *name)
    }
}

/// One declared field of a record.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    /// Rust identifier, `r#` stripped.
    pub ident: &'static str,
    pub kind: FieldKind,
    /// Declared as `Option<_>`.
    pub optional: bool,
    /// Marked `#[config(embed)]`: children join the parent's namespace.
    pub embedded: bool,
    /// Schema of the nested record for [`FieldKind::Nested`] fields.
    pub nested: Option<fn() -> Schema>,
    /// Collected `///` doc comment lines, joined with `\n`.
    pub doc: &'static str,
    pub annotations: Annotations,
}

/// Shape of a type handed to the resolver.
#[derive(Debug, Clone, Copy)]
pub enum Schema {
    /// A struct with named fields.
    Record {
        name: &'static str,
        fields: &'static [FieldSpec],
    },
    /// Anything else (tuple or unit struct, enum). Rejected by the walker.
    Opaque { name: &'static str },
}

impl Schema {
    pub fn name(&self) -> &'static str {
        match self {
            Schema::Record { name, .. } | Schema::Opaque { name } => name,
        }
    }
}

/// A record whose fields can be bound to configuration sources.
///
/// Implemented by `#[derive(Settings)]`; manual implementations must keep
/// [`assign`](Self::assign) consistent with [`schema`](Self::schema).
pub trait Settings {
    /// The static shape of this type.
    fn schema() -> Schema
    where
        Self: Sized;

    /// Decode `value` into the field addressed by `path` (declared identifiers
    /// from this record down to the leaf).
    fn assign(&mut self, path: &[&str], value: &Value) -> Result<(), ValueError>;

    /// Replace every `None` optional nested record with its `Default`, recursively.
    fn materialize(&mut self) {}
}
