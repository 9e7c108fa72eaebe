//! Bind a plain struct to command-line flags, a config file, environment
//! variables and declared defaults. Define a struct, derive, and go.
//!
//! ```ignore
//! use structconf::Settings;
//!
//! #[derive(Settings, Default)]
//! struct AppConfig {
//!     /// Address to bind.
//!     #[config(default = "127.0.0.1")]
//!     host: String,
//!
//!     #[config(default = 8080, short = "P")]
//!     port: u16,
//!
//!     #[config(required)]
//!     token: String,
//!
//!     #[config(nested)]
//!     database: Database,
//! }
//!
//! let mut config = AppConfig::default();
//! structconf::process("myapp", &mut config)?;
//! ```
//!
//! That single call gives the program `--host`, `--port/-P`, `--token` and
//! `--database-url` flags, reads `MYAPP_HOST`, `MYAPP_PORT`, `MYAPP_TOKEN`
//! and `MYAPP_DATABASE_URL`, looks for `config.toml` in the working directory,
//! fills in defaults, and fails if nobody supplied `token`.
//!
//! # Design: struct as source of truth
//!
//! `#[derive(Settings)]` records the struct's shape and its `#[config(...)]`
//! annotations. Every run walks that shape once and derives, per field:
//!
//! - a **canonical key**: the field name, lowercased, dot-joined below its
//!   nested parents (`database.url`). This is the key in config files;
//! - an **environment name**: the prefix and the field path joined with `_`
//!   and uppercased (`MYAPP_DATABASE_URL`);
//! - a **flag name**: the key with dots replaced by hyphens
//!   (`--database-url`).
//!
//! All sources agree on what "the same setting" means because they all read
//! from the same descriptor list. See [`Resolver::describe`] to inspect it.
//!
//! # Layer precedence
//!
//! ```text
//! Value already in the struct    (Default::default() for a fresh one)
//!        ↑ overridden by
//! Default literal                #[config(default = ...)]
//!        ↑ overridden by
//! Environment variable           PREFIX_KEY, even when set to ""
//!        ↑ overridden by
//! Config file                    --config PATH, or {file_name}.{type} in the search paths
//!        ↑ overridden by
//! Command-line flag              --key value
//! ```
//!
//! `required` fields must be supplied by a flag, the file or the environment.
//! A default literal does not satisfy them.
//!
//! # Field annotations
//!
//! | annotation | effect |
//! |------------|--------|
//! | `required` | fail unless a live source supplies the field |
//! | `default = ..` | default literal |
//! | `desc = ".."` | help text; `///` doc comments are used otherwise |
//! | `env = "NAME"` | explicit environment variable, `"-"` disables it |
//! | `flag = "name"` | explicit long flag, `"-"` disables it |
//! | `short = "c"` | short flag |
//! | `ignored` | never bind this field |
//! | `split_words` | `MaxConns` becomes `MAX_CONNS` in the environment name |
//! | `key = "a.b"` | explicit canonical key |
//! | `file = ".."` | rename for config files (and the derived names) |
//! | `alias(tag = "..")` | rename under a custom tag, see [`ResolverBuilder::file_tag`] |
//! | `nested` | field is a struct deriving `Settings`, adds a key segment |
//! | `embed` | like `nested`, but the children join the parent's namespace |
//!
//! A field renamed with `file` (or the active alias tag) also answers to the
//! bare uppercased alias as an environment variable, after its qualified name.
//!
//! Supported field types are `bool`, the integer and float primitives,
//! `String`, `PathBuf`, `Duration` (`"2m"`, `"1h30m"`), `Vec<T>` (text split on
//! `,`), `HashMap`/`BTreeMap<String, T>` (text as `k=v,k2=v2`), and `Option`
//! of any of these. `Option<Nested>` records are filled with their `Default`
//! before values are applied.
//!
//! # Built-in flags
//!
//! | flag | effect |
//! |------|--------|
//! | `--config/-c PATH` | read this file instead of searching |
//! | `--config-type/-t TYPE` | file format: `toml` (default), `json` or `yaml` |
//! | `--default-config/-p` | print the default config and exit |
//! | `--config-debug/-d` | print where every value came from and exit |
//! | `--version/-V` | print the version and exit |
//!
//! # Config file
//!
//! A missing, unreadable or malformed config file does not fail the call. The
//! condition is logged and kept in [`Resolver::file_error`]; if it leaves a
//! required field unset, the [`ConfigError::MissingRequired`] message carries
//! it as a hint. Keys the struct does not know are logged, or rejected in
//! [`strict`](ResolverBuilder::strict) mode with the file path and line:
//!
//! ```text
//! Unknown key 'typo_key' in /srv/myapp/config.toml (line 5)
//! ```
//!
//! # Logging
//!
//! The library emits `tracing` events and installs no subscriber.

extern crate self as structconf;

pub mod error;
pub mod names;

#[doc(hidden)]
pub mod de;

mod builder;
mod cli;
mod env;
mod file;
mod report;
mod resolve;
mod schema;
mod snapshot;
mod walk;

#[cfg(test)]
mod fixtures;

pub use builder::{Outcome, Resolution, Resolver, ResolverBuilder};
pub use error::ConfigError;
pub use file::{ConfigFormat, SearchPath};
pub use report::{Report, ReportEntry};
pub use resolve::Source;
pub use schema::{Annotations, FieldKind, FieldSpec, Schema, Settings};
pub use snapshot::{render as render_snapshot, snapshot};
pub use structconf_derive::Settings;
pub use walk::{FieldDescriptor, walk};

/// Populate `target` with a default [`Resolver`] over the process arguments
/// and environment.
pub fn process<T: Settings>(prefix: &str, target: &mut T) -> Result<(), ConfigError> {
    Resolver::default().process(prefix, target)
}

/// Like [`process`], but panics on error.
pub fn must_process<T: Settings>(prefix: &str, target: &mut T) {
    Resolver::default().must_process(prefix, target)
}
