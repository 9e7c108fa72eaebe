//! Core resolution pipeline: pick one value per field and decode it into the
//! record.
//!
//! Operates on already-gathered provider data with no I/O, making the whole
//! precedence logic testable with synthetic inputs. Steps:
//!
//! 1. [`merge`]: for every descriptor, take the highest-priority value
//!    (flag > file > environment > default literal).
//! 2. [`check_required`]: a required field must have come from a flag, the
//!    file or the environment. Defaults do not count.
//! 3. [`apply`]: materialize optional nested records, then decode each merged
//!    value into its field. Fields no source supplied keep their current value.

use std::collections::HashMap;
use std::fmt;

use serde::Serialize;
use toml::Value;
use tracing::debug;

use crate::env::EnvSnapshot;
use crate::error::ConfigError;
use crate::file::ConfigFile;
use crate::schema::Settings;
use crate::walk::FieldDescriptor;

/// Which provider a field's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Flag,
    File,
    Env,
    Default,
    /// Nothing supplied a value; the record keeps what it holds.
    Unset,
}

impl Source {
    /// Flag, file and environment values satisfy `required`; defaults do not.
    pub fn is_live(self) -> bool {
        matches!(self, Source::Flag | Source::File | Source::Env)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Source::Flag => "flag",
            Source::File => "file",
            Source::Env => "env",
            Source::Default => "default",
            Source::Unset => "unset",
        };
        f.write_str(name)
    }
}

/// The winning value of one field.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolved {
    pub source: Source,
    pub value: Option<Value>,
    /// Where exactly the value came from: `--flag`, the file path, or the
    /// environment variable name.
    pub origin: Option<String>,
}

/// Provider data gathered for one resolution.
pub struct Layers<'a> {
    /// Canonical key to raw flag text, only for flags set on this invocation.
    pub flags: &'a HashMap<String, String>,
    pub file: Option<&'a ConfigFile>,
    pub env: &'a EnvSnapshot,
}

/// Merge the layers per descriptor. The result is parallel to `fields`.
pub fn merge(fields: &[FieldDescriptor], layers: &Layers<'_>) -> Vec<Resolved> {
    fields.iter().map(|field| merge_one(field, layers)).collect()
}

fn merge_one(field: &FieldDescriptor, layers: &Layers<'_>) -> Resolved {
    if let Some(raw) = layers.flags.get(&field.key) {
        return Resolved {
            source: Source::Flag,
            value: Some(Value::String(raw.clone())),
            origin: field.flag.as_ref().map(|flag| format!("--{flag}")),
        };
    }

    if let Some(file) = layers.file
        && let Some(value) = file.get(&field.key)
    {
        return Resolved {
            source: Source::File,
            value: Some(value.clone()),
            origin: Some(file.path.display().to_string()),
        };
    }

    if let Some((name, raw)) = layers.env.lookup(field) {
        debug!(key = %field.key, env = name, "value from environment");
        return Resolved {
            source: Source::Env,
            value: Some(Value::String(raw.to_string())),
            origin: Some(name.to_string()),
        };
    }

    if let Some(literal) = &field.default {
        return Resolved {
            source: Source::Default,
            value: Some(Value::String(literal.clone())),
            origin: None,
        };
    }

    Resolved {
        source: Source::Unset,
        value: None,
        origin: None,
    }
}

/// Fail on the first required field without a live value.
///
/// `hint` is the soft file condition of this resolution, if any; a missing
/// value is often explained by a config file that could not be read.
pub fn check_required(
    fields: &[FieldDescriptor],
    resolved: &[Resolved],
    hint: Option<&ConfigError>,
) -> Result<(), ConfigError> {
    for (field, resolved) in fields.iter().zip(resolved) {
        if field.required && !resolved.source.is_live() {
            return Err(ConfigError::MissingRequired {
                field: field.field_path(),
                key: field.key.clone(),
                hint: hint.map(ToString::to_string),
            });
        }
    }
    Ok(())
}

/// Decode every merged value into `target`.
pub fn apply<T: Settings>(
    target: &mut T,
    fields: &[FieldDescriptor],
    resolved: &[Resolved],
) -> Result<(), ConfigError> {
    target.materialize();
    for (field, resolved) in fields.iter().zip(resolved) {
        let Some(value) = &resolved.value else {
            continue;
        };
        target
            .assign(&field.path, value)
            .map_err(|e| ConfigError::DecodeFailure {
                field: field.field_path(),
                key: field.key.clone(),
                value: display_value(value),
                reason: e.to_string(),
            })?;
    }
    Ok(())
}

/// Format a value for messages and reports.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        other => other.to_string(),
    }
}
