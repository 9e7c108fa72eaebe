//! Default snapshot: the configuration a program gets when no source supplies
//! anything, used as a starter config file by `--default-config`. Rendered as
//! TOML, JSON or YAML.
//!
//! Every field maps to its default literal converted to the field's type, or
//! the zero value of its kind. Optional scalars without a default are left
//! out. Nothing is looked up and nothing is required.

use toml::{Table, Value};
use toml_edit::DocumentMut;

use crate::de;
use crate::error::ConfigError;
use crate::file::ConfigFormat;
use crate::walk::FieldDescriptor;

/// Build the nested default table for `fields`.
pub fn snapshot(fields: &[FieldDescriptor]) -> Result<Table, ConfigError> {
    let mut table = Table::new();
    for (field, value) in default_values(fields)? {
        insert_dotted(&mut table, &field.key, value);
    }
    Ok(table)
}

/// Render the snapshot as a config file of the named type.
///
/// TOML output carries each field's description as `#` comment lines above
/// the key.
pub fn render(fields: &[FieldDescriptor], config_type: &str) -> Result<String, ConfigError> {
    match ConfigFormat::from_name(config_type)? {
        ConfigFormat::Toml => render_toml(fields),
        ConfigFormat::Json => serde_json::to_string_pretty(&snapshot(fields)?)
            .map_err(|e| ConfigError::Render(e.to_string())),
        ConfigFormat::Yaml => serde_yaml::to_string(&snapshot(fields)?)
            .map_err(|e| ConfigError::Render(e.to_string())),
    }
}

fn default_values(
    fields: &[FieldDescriptor],
) -> Result<Vec<(&FieldDescriptor, Value)>, ConfigError> {
    let mut out = Vec::with_capacity(fields.len());
    for field in fields {
        let value = match &field.default {
            Some(literal) => Some(de::typed_literal(field.kind, literal).map_err(|e| {
                ConfigError::MalformedAnnotation {
                    field: field.field_path(),
                    annotation: "default",
                    reason: e.to_string(),
                }
            })?),
            None if field.optional => None,
            None => de::zero_value(field.kind),
        };
        if let Some(value) = value {
            out.push((field, value));
        }
    }
    Ok(out)
}

fn insert_dotted(table: &mut Table, key: &str, value: Value) {
    let mut segments: Vec<&str> = key.split('.').collect();
    let Some(leaf) = segments.pop() else {
        return;
    };
    let mut current = table;
    for segment in segments {
        let entry = current
            .entry(segment)
            .or_insert_with(|| Value::Table(Table::new()));
        let Value::Table(inner) = entry else {
            return;
        };
        current = inner;
    }
    current.insert(leaf.to_string(), value);
}

fn render_toml(fields: &[FieldDescriptor]) -> Result<String, ConfigError> {
    let mut doc = DocumentMut::new();

    'fields: for (field, value) in default_values(fields)? {
        let mut segments: Vec<&str> = field.key.split('.').collect();
        let Some(leaf) = segments.pop() else {
            continue;
        };

        let mut current = doc.as_table_mut();
        for segment in segments {
            let item = current
                .entry(segment)
                .or_insert_with(|| toml_edit::Item::Table(toml_edit::Table::new()));
            let Some(inner) = item.as_table_mut() else {
                continue 'fields;
            };
            current = inner;
        }

        let mut edit_value: toml_edit::Value = value
            .to_string()
            .parse()
            .map_err(|e: toml_edit::TomlError| ConfigError::Render(e.to_string()))?;
        edit_value.decor_mut().clear();
        current.insert(leaf, toml_edit::value(edit_value));

        if !field.description.is_empty()
            && let Some(mut key) = current.key_mut(leaf)
        {
            let comment: String = field
                .description
                .lines()
                .map(|line| format!("# {line}\n"))
                .collect();
            key.leaf_decor_mut().set_prefix(comment);
        }
    }

    Ok(doc.to_string())
}
