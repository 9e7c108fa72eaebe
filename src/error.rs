use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("specification must be a struct with named fields, got {type_name}")]
    InvalidSpecification { type_name: String },

    #[error("bad {annotation} annotation on field {field}: {reason}")]
    MalformedAnnotation {
        field: String,
        annotation: &'static str,
        reason: String,
    },

    #[error(
        "found redefined flag or embedded struct with same field names {name:?} ({first} and {second}) - define explicit and different names for them"
    )]
    NameCollision {
        name: String,
        first: String,
        second: String,
    },

    #[error("value for field {field}({key}) is required{}", .hint.as_deref().map(|h| format!(" ({h})")).unwrap_or_default())]
    MissingRequired {
        field: String,
        key: String,
        hint: Option<String>,
    },

    #[error("invalid value {value:?} for field {field}({key}): {reason}")]
    DecodeFailure {
        field: String,
        key: String,
        value: String,
        reason: String,
    },

    #[error("Failed to read {path}: {reason}")]
    SourceRead { path: PathBuf, reason: String },

    #[error("Config file '{name}' not found in {} search path(s)", .searched.len())]
    FileNotFound { name: String, searched: Vec<PathBuf> },

    #[error("Unknown key '{key}' in {path} (line {line})")]
    UnknownKey {
        key: String,
        path: PathBuf,
        line: usize,
    },

    #[error("Unsupported config type '{0}'")]
    UnsupportedFormat(String),

    #[error("Failed to render default config: {0}")]
    Render(String),

    #[error("{0}")]
    Flags(#[from] clap::Error),
}

impl ConfigError {
    /// Soft conditions are recorded by the resolver instead of failing the call.
    pub fn is_soft(&self) -> bool {
        matches!(
            self,
            ConfigError::SourceRead { .. }
                | ConfigError::FileNotFound { .. }
                | ConfigError::UnsupportedFormat(_)
        )
    }
}
