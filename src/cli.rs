//! Clap adapter: one long flag per bindable field, plus the built-in flags
//! every resolver understands.
//!
//! The [`Command`] is assembled at run time from the walked
//! [`FieldDescriptor`]s, so nothing here is derived. Field arguments use the
//! field's canonical key as their clap id; built-in arguments use ids that can
//! never be a key.
//!
//! | flag | short | effect |
//! |------|-------|--------|
//! | `--config PATH` | `-c` | explicit config file |
//! | `--config-type TYPE` | `-t` | config file format (`toml`, `json`, `yaml`) |
//! | `--default-config` | `-p` | print the default snapshot and stop |
//! | `--config-debug` | `-d` | print the resolution report and stop |
//! | `--version` | `-V` | print the version string and stop |
//!
//! The debug flag's long name is configurable.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;

use clap::parser::ValueSource;
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};

use crate::de::LIST_SEPARATOR;
use crate::error::ConfigError;
use crate::schema::FieldKind;
use crate::walk::FieldDescriptor;

const CONFIG_ID: &str = "@config";
const CONFIG_TYPE_ID: &str = "@config-type";
const DEFAULT_CONFIG_ID: &str = "@default-config";
const DEBUG_ID: &str = "@debug";
const VERSION_ID: &str = "@version";

/// Names the built-in flags are registered under.
#[derive(Debug, Clone)]
pub struct BuiltinFlags<'a> {
    pub debug: &'a str,
    /// Default value of `--config-type`.
    pub config_type: &'a str,
}

/// What the command line supplied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedFlags {
    /// Canonical key to raw text, only for flags given on the command line.
    /// Repeated list and map flags are joined with `,`.
    pub values: HashMap<String, String>,
    pub config_path: Option<PathBuf>,
    pub config_type: String,
    pub default_config: bool,
    pub debug: bool,
    pub version: bool,
}

/// Build the command for `fields`, rejecting duplicate long or short flags.
pub fn build_command(
    app_name: &str,
    fields: &[FieldDescriptor],
    builtins: &BuiltinFlags<'_>,
) -> Result<Command, ConfigError> {
    let mut longs: HashMap<String, String> = HashMap::new();
    let mut shorts: HashMap<char, String> = HashMap::new();

    for (long, short) in [
        ("help", 'h'),
        ("config", 'c'),
        ("config-type", 't'),
        ("default-config", 'p'),
        (builtins.debug, 'd'),
        ("version", 'V'),
    ] {
        longs.insert(long.to_string(), format!("--{long}"));
        shorts.insert(short, format!("--{long}"));
    }

    let mut command = Command::new(app_name.to_string())
        .disable_version_flag(true)
        .arg(
            Arg::new(CONFIG_ID)
                .long("config")
                .short('c')
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .help("Config file to load instead of searching for one"),
        )
        .arg(
            Arg::new(CONFIG_TYPE_ID)
                .long("config-type")
                .short('t')
                .value_name("TYPE")
                .default_value(builtins.config_type.to_string())
                .help("Config file format"),
        )
        .arg(
            Arg::new(DEFAULT_CONFIG_ID)
                .long("default-config")
                .short('p')
                .action(ArgAction::SetTrue)
                .help("Print the default configuration and exit"),
        )
        .arg(
            Arg::new(DEBUG_ID)
                .long(builtins.debug.to_string())
                .short('d')
                .action(ArgAction::SetTrue)
                .help("Print where every value came from and exit"),
        )
        .arg(
            Arg::new(VERSION_ID)
                .long("version")
                .short('V')
                .action(ArgAction::SetTrue)
                .help("Print version and exit"),
        );

    for field in fields {
        let Some(flag) = &field.flag else {
            continue;
        };
        let owner = field.field_path();

        if let Some(first) = longs.insert(flag.clone(), owner.clone()) {
            return Err(ConfigError::NameCollision {
                name: flag.clone(),
                first,
                second: owner,
            });
        }
        if let Some(short) = field.short
            && let Some(first) = shorts.insert(short, owner.clone())
        {
            return Err(ConfigError::NameCollision {
                name: short.to_string(),
                first,
                second: owner,
            });
        }

        command = command.arg(field_arg(field, flag));
    }

    Ok(command)
}

fn field_arg(field: &FieldDescriptor, flag: &str) -> Arg {
    let mut arg = Arg::new(field.key.clone())
        .long(flag.to_string())
        .help(help_text(field));
    if let Some(short) = field.short {
        arg = arg.short(short);
    }

    match field.kind {
        FieldKind::Bool => arg
            .num_args(0..=1)
            .require_equals(true)
            .default_missing_value("true")
            .value_name("BOOL"),
        kind if kind.is_map() => arg.action(ArgAction::Append).value_name("KEY=VALUE"),
        kind if kind.is_list() => arg.action(ArgAction::Append).value_name("VALUE"),
        _ => arg.action(ArgAction::Set).value_name("VALUE"),
    }
}

/// `key: {key}, env: {env}, default: [{default}]` followed by the description.
pub fn help_text(field: &FieldDescriptor) -> String {
    let mut help = format!(
        "key: {}, env: {}, default: [{}]",
        field.key,
        field.env.as_deref().unwrap_or("-"),
        field.default.as_deref().unwrap_or_default(),
    );
    if !field.description.is_empty() {
        help.push('\n');
        help.push_str(&field.description);
    }
    help
}

/// Parse `args` (program name first) against a command from [`build_command`].
pub fn parse<I, T>(
    command: Command,
    fields: &[FieldDescriptor],
    args: I,
) -> Result<ParsedFlags, ConfigError>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = command.try_get_matches_from(args)?;

    let values = fields
        .iter()
        .filter(|field| field.flag.is_some())
        .filter_map(|field| given(&matches, &field.key).map(|raw| (field.key.clone(), raw)))
        .collect();

    Ok(ParsedFlags {
        values,
        config_path: matches.get_one::<PathBuf>(CONFIG_ID).cloned(),
        config_type: matches
            .get_one::<String>(CONFIG_TYPE_ID)
            .cloned()
            .unwrap_or_default(),
        default_config: matches.get_flag(DEFAULT_CONFIG_ID),
        debug: matches.get_flag(DEBUG_ID),
        version: matches.get_flag(VERSION_ID),
    })
}

/// The raw text of a flag that was given on the command line.
fn given(matches: &ArgMatches, id: &str) -> Option<String> {
    if matches.value_source(id) != Some(ValueSource::CommandLine) {
        return None;
    }
    let values: Vec<&str> = matches
        .get_many::<String>(id)?
        .map(String::as_str)
        .collect();
    Some(values.join(&LIST_SEPARATOR.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Settings;
    use crate::fixtures::test::{FlagClash, ReservedFlag, Specification, TestConfig};
    use crate::schema::Schema;
    use crate::walk::walk;

    const BUILTINS: BuiltinFlags<'static> = BuiltinFlags {
        debug: "config-debug",
        config_type: "toml",
    };

    fn fields(schema: Schema) -> Vec<FieldDescriptor> {
        walk(&schema, "app", "file").unwrap()
    }

    fn parse_args(schema: Schema, args: &[&str]) -> Result<ParsedFlags, ConfigError> {
        let fields = fields(schema);
        let command = build_command("app", &fields, &BUILTINS)?;
        let argv = std::iter::once("app").chain(args.iter().copied());
        parse(command, &fields, argv)
    }

    #[test]
    fn no_args_sets_nothing() {
        let parsed = parse_args(TestConfig::schema(), &[]).unwrap();
        assert!(parsed.values.is_empty());
        assert_eq!(parsed.config_type, "toml");
        assert!(!parsed.version && !parsed.debug && !parsed.default_config);
        assert_eq!(parsed.config_path, None);
    }

    #[test]
    fn scalar_and_nested_flags() {
        let parsed = parse_args(
            TestConfig::schema(),
            &["--host", "0.0.0.0", "--db-pool_size", "9"],
        )
        .unwrap();
        assert_eq!(parsed.values["host"], "0.0.0.0");
        assert_eq!(parsed.values["db.pool_size"], "9");
    }

    #[test]
    fn short_flag() {
        let parsed = parse_args(TestConfig::schema(), &["-P", "3000"]).unwrap();
        assert_eq!(parsed.values["port"], "3000");
    }

    #[test]
    fn bare_bool_flag_is_true() {
        let parsed = parse_args(TestConfig::schema(), &["--verbose"]).unwrap();
        assert_eq!(parsed.values["verbose"], "true");
    }

    #[test]
    fn bool_flag_takes_explicit_value() {
        let parsed = parse_args(TestConfig::schema(), &["--verbose=false"]).unwrap();
        assert_eq!(parsed.values["verbose"], "false");
    }

    #[test]
    fn repeated_list_flags_are_joined() {
        let parsed = parse_args(
            Specification::schema(),
            &["--admin_users", "John", "--admin_users", "Adam,Will"],
        )
        .unwrap();
        assert_eq!(parsed.values["admin_users"], "John,Adam,Will");
    }

    #[test]
    fn builtin_flags() {
        let parsed = parse_args(
            TestConfig::schema(),
            &["-c", "/etc/app.json", "-t", "json", "-p", "-d", "-V"],
        )
        .unwrap();
        assert_eq!(parsed.config_path, Some(PathBuf::from("/etc/app.json")));
        assert_eq!(parsed.config_type, "json");
        assert!(parsed.default_config && parsed.debug && parsed.version);
    }

    #[test]
    fn unknown_flag_is_an_error() {
        let err = parse_args(TestConfig::schema(), &["--nope", "1"]).unwrap_err();
        assert!(matches!(err, ConfigError::Flags(_)));
    }

    #[test]
    fn help_is_reported_as_clap_error() {
        let err = parse_args(TestConfig::schema(), &["--help"]).unwrap_err();
        match err {
            ConfigError::Flags(e) => assert_eq!(e.kind(), clap::error::ErrorKind::DisplayHelp),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn duplicate_long_flag() {
        let fields = fields(FlagClash::schema());
        let err = build_command("app", &fields, &BUILTINS).unwrap_err();
        match err {
            ConfigError::NameCollision {
                name,
                first,
                second,
            } => {
                assert_eq!(name, "mode");
                assert_eq!(first, "first");
                assert_eq!(second, "second");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn field_flag_cannot_shadow_builtin() {
        let fields = fields(ReservedFlag::schema());
        let err = build_command("app", &fields, &BUILTINS).unwrap_err();
        assert!(matches!(err, ConfigError::NameCollision { ref name, .. } if name == "version"));
    }

    #[test]
    fn disabled_flag_is_not_registered() {
        let mut fields = fields(TestConfig::schema());
        for field in &mut fields {
            if field.key == "host" {
                field.flag = None;
            }
        }
        let command = build_command("app", &fields, &BUILTINS).unwrap();
        assert!(parse(command, &fields, ["app", "--host", "x"]).is_err());
    }

    #[test]
    fn help_text_lists_key_env_and_default() {
        let fields = fields(TestConfig::schema());
        let host = fields.iter().find(|f| f.key == "host").unwrap();
        assert_eq!(
            help_text(host),
            "key: host, env: APP_HOST, default: [localhost]\nThe application host."
        );
    }
}
