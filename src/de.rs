//! Value decoding: from raw text (flags, environment, default literals) and
//! from native file values into typed fields.
//!
//! Every source hands the resolver a [`Value`]. Text sources produce
//! `Value::String`; config files produce whatever type the document holds.
//! [`FieldValue::from_value`] parses strings with the field's text rules and
//! accepts native values of the matching shape.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

pub use toml::Value;

use crate::schema::FieldKind;

/// Separator between sequence items and between map pairs.
pub const LIST_SEPARATOR: char = ',';
/// Separator between a map key and its value.
pub const PAIR_SEPARATOR: char = '=';

/// A value that could not be decoded into a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValueError(String);

impl ValueError {
    pub fn new(reason: impl Into<String>) -> Self {
        ValueError(reason.into())
    }

    pub fn unknown_path(path: &[&str]) -> Self {
        ValueError(format!("no field at path '{}'", path.join(".")))
    }

    fn unexpected(expected: &str, found: &Value) -> Self {
        ValueError(format!("expected {expected}, found {}", found.type_str()))
    }
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for ValueError {}

/// A type that can be bound to a single configuration field.
pub trait FieldValue: Sized {
    const KIND: FieldKind;

    /// Parse the textual form used by flags, environment variables and
    /// default literals.
    fn parse_text(raw: &str) -> Result<Self, ValueError>;

    /// Decode a non-string value read from a config file.
    fn from_native(value: &Value) -> Result<Self, ValueError> {
        Err(ValueError::new(format!(
            "unsupported {} value",
            value.type_str()
        )))
    }

    fn from_value(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::String(s) => Self::parse_text(s),
            other => Self::from_native(other),
        }
    }
}

/// Case-insensitive boolean tokens: `1`, `t`, `true`, `0`, `f`, `false`.
pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "t" | "true" => Some(true),
        "0" | "f" | "false" => Some(false),
        _ => None,
    }
}

/// Lenient form used for flags like `ignored`: anything unparsable is false.
pub fn is_true(raw: Option<&str>) -> bool {
    raw.and_then(parse_bool).unwrap_or(false)
}

/// Split `one=two,three=four` into pairs.
///
/// Empty input yields no pairs. A fragment without `=` or a repeated key is
/// rejected with an error naming the fragment.
pub fn parse_pairs(raw: &str) -> Result<Vec<(&str, &str)>, ValueError> {
    if raw.is_empty() {
        return Ok(Vec::new());
    }

    let mut pairs: Vec<(&str, &str)> = Vec::new();
    for fragment in raw.split(LIST_SEPARATOR) {
        let Some((key, value)) = fragment.split_once(PAIR_SEPARATOR) else {
            return Err(ValueError::new(format!(
                "{fragment} must be formatted as key{PAIR_SEPARATOR}value"
            )));
        };
        if pairs.iter().any(|(k, _)| *k == key) {
            return Err(ValueError::new(format!(
                "duplicate key '{key}' in {fragment}"
            )));
        }
        pairs.push((key, value));
    }
    Ok(pairs)
}

/// Split a sequence on `,`. Empty input is an empty sequence.
pub fn split_list(raw: &str) -> Vec<&str> {
    if raw.is_empty() {
        Vec::new()
    } else {
        raw.split(LIST_SEPARATOR).collect()
    }
}

impl FieldValue for bool {
    const KIND: FieldKind = FieldKind::Bool;

    fn parse_text(raw: &str) -> Result<Self, ValueError> {
        parse_bool(raw).ok_or_else(|| ValueError::new(format!("'{raw}' is not a boolean")))
    }

    fn from_native(value: &Value) -> Result<Self, ValueError> {
        value
            .as_bool()
            .ok_or_else(|| ValueError::unexpected("boolean", value))
    }
}

macro_rules! signed_field {
    ($($ty:ty),*) => {$(
        impl FieldValue for $ty {
            const KIND: FieldKind = FieldKind::Int;

            fn parse_text(raw: &str) -> Result<Self, ValueError> {
                raw.parse::<$ty>()
                    .map_err(|e| ValueError::new(format!("'{raw}' is not a valid {}: {e}", stringify!($ty))))
            }

            fn from_native(value: &Value) -> Result<Self, ValueError> {
                let i = value
                    .as_integer()
                    .ok_or_else(|| ValueError::unexpected("integer", value))?;
                <$ty>::try_from(i)
                    .map_err(|_| ValueError::new(format!("{i} is out of range for {}", stringify!($ty))))
            }
        }
    )*};
}

macro_rules! unsigned_field {
    ($($ty:ty),*) => {$(
        impl FieldValue for $ty {
            const KIND: FieldKind = FieldKind::Uint;

            fn parse_text(raw: &str) -> Result<Self, ValueError> {
                if raw.trim_start().starts_with('-') {
                    return Err(ValueError::new(format!("'{raw}' is negative, expected {}", stringify!($ty))));
                }
                raw.parse::<$ty>()
                    .map_err(|e| ValueError::new(format!("'{raw}' is not a valid {}: {e}", stringify!($ty))))
            }

            fn from_native(value: &Value) -> Result<Self, ValueError> {
                let i = value
                    .as_integer()
                    .ok_or_else(|| ValueError::unexpected("integer", value))?;
                <$ty>::try_from(i)
                    .map_err(|_| ValueError::new(format!("{i} is out of range for {}", stringify!($ty))))
            }
        }
    )*};
}

signed_field!(i8, i16, i32, i64, isize);
unsigned_field!(u8, u16, u32, u64, usize);

macro_rules! float_field {
    ($($ty:ty),*) => {$(
        impl FieldValue for $ty {
            const KIND: FieldKind = FieldKind::Float;

            fn parse_text(raw: &str) -> Result<Self, ValueError> {
                raw.parse::<$ty>()
                    .map_err(|e| ValueError::new(format!("'{raw}' is not a valid {}: {e}", stringify!($ty))))
            }

            #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
            fn from_native(value: &Value) -> Result<Self, ValueError> {
                match value {
                    Value::Float(f) => Ok(*f as $ty),
                    Value::Integer(i) => Ok(*i as $ty),
                    other => Err(ValueError::unexpected("float", other)),
                }
            }
        }
    )*};
}

float_field!(f32, f64);

impl FieldValue for String {
    const KIND: FieldKind = FieldKind::String;

    fn parse_text(raw: &str) -> Result<Self, ValueError> {
        Ok(raw.to_string())
    }

    fn from_native(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Integer(i) => Ok(i.to_string()),
            Value::Float(f) => Ok(f.to_string()),
            Value::Boolean(b) => Ok(b.to_string()),
            other => Err(ValueError::unexpected("string", other)),
        }
    }
}

impl FieldValue for PathBuf {
    const KIND: FieldKind = FieldKind::String;

    fn parse_text(raw: &str) -> Result<Self, ValueError> {
        Ok(PathBuf::from(raw))
    }
}

impl FieldValue for Duration {
    const KIND: FieldKind = FieldKind::Duration;

    fn parse_text(raw: &str) -> Result<Self, ValueError> {
        humantime::parse_duration(raw)
            .map_err(|e| ValueError::new(format!("'{raw}' is not a valid duration: {e}")))
    }
}

impl<T: FieldValue> FieldValue for Vec<T> {
    const KIND: FieldKind = match T::KIND {
        FieldKind::Int | FieldKind::Uint => FieldKind::IntList,
        _ => FieldKind::StringList,
    };

    fn parse_text(raw: &str) -> Result<Self, ValueError> {
        split_list(raw).into_iter().map(T::parse_text).collect()
    }

    fn from_native(value: &Value) -> Result<Self, ValueError> {
        match value {
            Value::Array(items) => items.iter().map(T::from_value).collect(),
            other => Err(ValueError::unexpected("array", other)),
        }
    }
}

macro_rules! map_field {
    ($($map:ident),*) => {$(
        impl<V: FieldValue> FieldValue for $map<String, V> {
            const KIND: FieldKind = match V::KIND {
                FieldKind::Int | FieldKind::Uint => FieldKind::IntMap,
                _ => FieldKind::StringMap,
            };

            fn parse_text(raw: &str) -> Result<Self, ValueError> {
                parse_pairs(raw)?
                    .into_iter()
                    .map(|(k, v)| -> Result<(String, V), ValueError> {
                        Ok((k.to_string(), V::parse_text(v)?))
                    })
                    .collect()
            }

            fn from_native(value: &Value) -> Result<Self, ValueError> {
                match value {
                    Value::Table(table) => table
                        .iter()
                        .map(|(k, v)| -> Result<(String, V), ValueError> {
                            Ok((k.clone(), V::from_value(v)?))
                        })
                        .collect(),
                    other => Err(ValueError::unexpected("table", other)),
                }
            }
        }
    )*};
}

map_field!(HashMap, BTreeMap);

impl<T: FieldValue> FieldValue for Option<T> {
    const KIND: FieldKind = T::KIND;

    fn parse_text(raw: &str) -> Result<Self, ValueError> {
        T::parse_text(raw).map(Some)
    }

    fn from_native(value: &Value) -> Result<Self, ValueError> {
        T::from_native(value).map(Some)
    }
}

/// The value a field of `kind` holds when nothing supplies one.
pub fn zero_value(kind: FieldKind) -> Option<Value> {
    let value = match kind {
        FieldKind::Bool => Value::Boolean(false),
        FieldKind::Int | FieldKind::Uint => Value::Integer(0),
        FieldKind::Float => Value::Float(0.0),
        FieldKind::String => Value::String(String::new()),
        FieldKind::Duration => Value::String("0s".into()),
        FieldKind::StringList | FieldKind::IntList => Value::Array(Vec::new()),
        FieldKind::StringMap | FieldKind::IntMap => Value::Table(toml::Table::new()),
        FieldKind::Nested | FieldKind::Opaque => return None,
    };
    Some(value)
}

/// Convert a default literal into the typed value a config file would hold.
pub fn typed_literal(kind: FieldKind, raw: &str) -> Result<Value, ValueError> {
    let value = match kind {
        FieldKind::Bool => Value::Boolean(bool::parse_text(raw)?),
        FieldKind::Int => Value::Integer(i64::parse_text(raw)?),
        FieldKind::Uint => {
            let u = u64::parse_text(raw)?;
            Value::Integer(
                i64::try_from(u).map_err(|_| ValueError::new(format!("{u} is too large")))?,
            )
        }
        FieldKind::Float => Value::Float(f64::parse_text(raw)?),
        FieldKind::String => Value::String(raw.to_string()),
        FieldKind::Duration => {
            Duration::parse_text(raw)?;
            Value::String(raw.to_string())
        }
        FieldKind::StringList => Value::Array(
            split_list(raw)
                .into_iter()
                .map(|s| Value::String(s.to_string()))
                .collect(),
        ),
        FieldKind::IntList => Value::Array(
            Vec::<i64>::parse_text(raw)?
                .into_iter()
                .map(Value::Integer)
                .collect(),
        ),
        FieldKind::StringMap => Value::Table(
            parse_pairs(raw)?
                .into_iter()
                .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                .collect(),
        ),
        FieldKind::IntMap => Value::Table(
            parse_pairs(raw)?
                .into_iter()
                .map(|(k, v)| Ok((k.to_string(), Value::Integer(i64::parse_text(v)?))))
                .collect::<Result<_, ValueError>>()?,
        ),
        FieldKind::Nested | FieldKind::Opaque => {
            return Err(ValueError::new("records have no literal form"));
        }
    };
    Ok(value)
}
