use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::cli::{self, BuiltinFlags, ParsedFlags};
use crate::env::EnvSnapshot;
use crate::error::ConfigError;
use crate::file::{self, ConfigFile, ConfigFormat, SearchPath};
use crate::report::Report;
use crate::resolve::{self, Layers};
use crate::schema::Settings;
use crate::snapshot;
use crate::walk::{self, FieldDescriptor};

/// Builder for a [`Resolver`].
///
/// Every option has a default, so `Resolver::builder().build()` is a working
/// resolver over the real process arguments and environment.
#[derive(Debug, Default)]
pub struct ResolverBuilder {
    app_name: Option<String>,
    version: Option<String>,
    config_type: Option<String>,
    file_name: Option<String>,
    file_tag: Option<String>,
    debug_flag: Option<String>,
    search_paths: Option<Vec<SearchPath>>,
    strict: bool,
    args: Option<Vec<OsString>>,
    env_vars: Option<Vec<(String, String)>>,
}

impl ResolverBuilder {
    /// Set the application name, used as the command name in help output and
    /// by [`SearchPath::Platform`] (default: the program's file name).
    pub fn app_name(mut self, name: &str) -> Self {
        self.app_name = Some(name.to_string());
        self
    }

    /// The string printed by `--version`.
    pub fn version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    /// Default config file format when `--config-type` is not given
    /// (default: `"toml"`).
    pub fn config_type(mut self, config_type: &str) -> Self {
        self.config_type = Some(config_type.to_string());
        self
    }

    /// Base name of the config file searched for, without extension
    /// (default: `"config"`).
    pub fn file_name(mut self, name: &str) -> Self {
        self.file_name = Some(name.to_string());
        self
    }

    /// Which `alias(tag = "..")` entries rename fields (default: `"file"`).
    pub fn file_tag(mut self, tag: &str) -> Self {
        self.file_tag = Some(tag.to_string());
        self
    }

    /// Long name of the flag that prints the resolution report
    /// (default: `"config-debug"`).
    pub fn debug_flag(mut self, flag: &str) -> Self {
        self.debug_flag = Some(flag.to_string());
        self
    }

    /// Replace the default search paths (`[Cwd]`).
    ///
    /// Paths are listed in **priority-ascending** order: the last entry has the
    /// highest priority.
    pub fn search_paths(mut self, paths: Vec<SearchPath>) -> Self {
        self.search_paths = Some(paths);
        self
    }

    /// Append a search path without replacing the defaults.
    pub fn add_search_path(mut self, path: SearchPath) -> Self {
        self.search_paths
            .get_or_insert_with(|| vec![SearchPath::Cwd])
            .push(path);
        self
    }

    /// Enable or disable strict mode (default: `false`).
    /// In strict mode, unknown keys in config files produce errors; otherwise
    /// they are logged.
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Command line to parse, program name first (default: the process
    /// arguments).
    pub fn args<I, T>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString>,
    {
        self.args = Some(args.into_iter().map(Into::into).collect());
        self
    }

    /// Environment to consult (default: the process environment).
    pub fn env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars = Some(
            vars.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    fn effective_args(&self) -> Vec<OsString> {
        match &self.args {
            Some(args) => args.clone(),
            None => std::env::args_os().collect(),
        }
    }

    /// Explicit name, else the program's file stem, else `"app"`.
    fn effective_app_name(&self, args: &[OsString]) -> String {
        if let Some(name) = &self.app_name {
            return name.clone();
        }
        args.first()
            .and_then(|program| Path::new(program).file_stem())
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "app".to_string())
    }

    fn effective_version(&self) -> String {
        self.version
            .clone()
            .unwrap_or_else(|| format!("built with structconf {}", env!("CARGO_PKG_VERSION")))
    }

    fn effective_search_paths(&self) -> Vec<SearchPath> {
        self.search_paths
            .clone()
            .unwrap_or_else(|| vec![SearchPath::Cwd])
    }

    fn effective_env(&self) -> EnvSnapshot {
        match &self.env_vars {
            Some(vars) => EnvSnapshot::from_vars(vars.iter().cloned()),
            None => EnvSnapshot::from_process(),
        }
    }

    /// Snapshot the arguments and environment and build the resolver.
    pub fn build(self) -> Resolver {
        let args = self.effective_args();
        Resolver {
            app_name: self.effective_app_name(&args),
            version: self.effective_version(),
            config_type: self.config_type.clone().unwrap_or_else(|| "toml".into()),
            file_name: self.file_name.clone().unwrap_or_else(|| "config".into()),
            file_tag: self.file_tag.clone().unwrap_or_else(|| "file".into()),
            debug_flag: self
                .debug_flag
                .clone()
                .unwrap_or_else(|| "config-debug".into()),
            search_paths: self.effective_search_paths(),
            strict: self.strict,
            env: self.effective_env(),
            args,
            file_error: None,
        }
    }
}

/// Binds records to flags, a config file, the environment and defaults.
///
/// A resolver may be reused: every call walks the record, builds the flag
/// parser and reads the file from scratch.
#[derive(Debug)]
pub struct Resolver {
    app_name: String,
    version: String,
    config_type: String,
    file_name: String,
    file_tag: String,
    debug_flag: String,
    search_paths: Vec<SearchPath>,
    strict: bool,
    args: Vec<OsString>,
    env: EnvSnapshot,
    file_error: Option<ConfigError>,
}

/// Result of [`Resolver::resolve`].
#[derive(Debug)]
pub enum Outcome {
    /// The record was populated.
    Loaded(Resolution),
    /// `--version` was given.
    Version(String),
    /// `--default-config` was given; the rendered default snapshot.
    DefaultConfig(String),
    /// The debug flag was given; the record was left untouched.
    Debug(Report),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Loaded(resolution) => write!(f, "{}", resolution.report),
            Outcome::Version(v) => write!(f, "{v}"),
            Outcome::DefaultConfig(text) => write!(f, "{text}"),
            Outcome::Debug(report) => write!(f, "{report}"),
        }
    }
}

/// Details of a successful resolution.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The config file that was read, if any.
    pub file: Option<PathBuf>,
    pub report: Report,
}

impl Default for Resolver {
    fn default() -> Self {
        Resolver::builder().build()
    }
}

impl Resolver {
    pub fn builder() -> ResolverBuilder {
        ResolverBuilder::default()
    }

    /// The soft file condition recorded by the last call, if the config file
    /// was missing, unreadable, malformed or of an unsupported type.
    pub fn file_error(&self) -> Option<&ConfigError> {
        self.file_error.as_ref()
    }

    /// Field descriptors of `T` under `prefix`, without consulting any source.
    pub fn describe<T: Settings>(&self, prefix: &str) -> Result<Vec<FieldDescriptor>, ConfigError> {
        walk::walk(&T::schema(), prefix, &self.file_tag)
    }

    /// Run the full pipeline and report what happened instead of printing.
    pub fn resolve<T: Settings>(
        &mut self,
        prefix: &str,
        target: &mut T,
    ) -> Result<Outcome, ConfigError> {
        self.file_error = None;

        let fields = self.describe::<T>(prefix)?;
        let command = cli::build_command(
            &self.app_name,
            &fields,
            &BuiltinFlags {
                debug: &self.debug_flag,
                config_type: &self.config_type,
            },
        )?;
        let flags = cli::parse(command, &fields, self.args.iter().cloned())?;

        if flags.version {
            return Ok(Outcome::Version(self.version.clone()));
        }
        if flags.default_config {
            return snapshot::render(&fields, &flags.config_type).map(Outcome::DefaultConfig);
        }

        let file = self.load_file(&flags);
        if let Some(file) = &file {
            let known: Vec<&str> = fields.iter().map(|f| f.key.as_str()).collect();
            file.check_unknown_keys(&known, self.strict)?;
        }

        let resolved = resolve::merge(
            &fields,
            &Layers {
                flags: &flags.values,
                file: file.as_ref(),
                env: &self.env,
            },
        );
        let file_path = file.map(|f| f.path);
        let report = Report::new(
            &fields,
            &resolved,
            file_path.clone(),
            self.file_error.as_ref(),
        );

        if flags.debug {
            return Ok(Outcome::Debug(report));
        }

        resolve::check_required(&fields, &resolved, self.file_error.as_ref())?;
        resolve::apply(target, &fields, &resolved)?;

        debug!(prefix, fields = fields.len(), "configuration resolved");
        Ok(Outcome::Loaded(Resolution {
            file: file_path,
            report,
        }))
    }

    /// Populate `target`.
    ///
    /// `--version`, `--default-config`, the debug flag and `--help` print their
    /// output and exit the process with status 0.
    pub fn process<T: Settings>(&mut self, prefix: &str, target: &mut T) -> Result<(), ConfigError> {
        use clap::error::ErrorKind;

        match self.resolve(prefix, target) {
            Ok(Outcome::Loaded(_)) => Ok(()),
            Ok(terminal) => {
                println!("{terminal}");
                std::process::exit(0)
            }
            Err(ConfigError::Flags(e))
                if matches!(
                    e.kind(),
                    ErrorKind::DisplayHelp
                        | ErrorKind::DisplayVersion
                        | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) =>
            {
                e.exit()
            }
            Err(e) => Err(e),
        }
    }

    /// Like [`process`](Self::process), but panics on error.
    pub fn must_process<T: Settings>(&mut self, prefix: &str, target: &mut T) {
        if let Err(e) = self.process(prefix, target) {
            panic!("structconf: {e}");
        }
    }

    /// Locate and read the config file, recording any failure as soft.
    fn load_file(&mut self, flags: &ParsedFlags) -> Option<ConfigFile> {
        let result = ConfigFormat::from_name(&flags.config_type).and_then(|format| {
            let path = file::locate(
                flags.config_path.as_deref(),
                &self.search_paths,
                &self.app_name,
                &self.file_name,
                format,
            )?;
            ConfigFile::read(&path, format)
        });

        match result {
            Ok(file) => Some(file),
            Err(e) => {
                if matches!(e, ConfigError::FileNotFound { .. }) && flags.config_path.is_none() {
                    debug!(error = %e, "no config file");
                } else {
                    warn!(error = %e, "config file ignored");
                }
                self.file_error = Some(e);
                None
            }
        }
    }
}
