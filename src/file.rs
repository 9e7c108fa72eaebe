//! Config file discovery and loading.
//!
//! # Discovery
//!
//! An explicit `--config PATH` always wins. Otherwise each [`SearchPath`] is
//! resolved to a directory and checked for `{file_name}.{ext}`, where `ext`
//! comes from the active [`ConfigFormat`]. The list is searched from the
//! **highest-priority end** (last entry) and the first file found is used.
//!
//! # Loading
//!
//! TOML documents are read as-is. JSON and YAML documents are converted to
//! TOML values so the resolver sees one value model; `null` members are
//! dropped, as if the key were absent.
//!
//! Every failure here is reported as a [`ConfigError`] that the resolver
//! treats as soft (see [`ConfigError::is_soft`]).

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use toml::{Table, Value};
use tracing::{debug, warn};

use crate::error::ConfigError;

/// A directory to look for the config file in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchPath {
    /// The platform config directory for the application name,
    /// e.g. `~/.config/{app_name}/` on Linux.
    Platform,
    /// A subdirectory of the user's home directory.
    Home(&'static str),
    /// The current working directory.
    Cwd,
    /// An explicit directory.
    Path(PathBuf),
}

/// Supported config file formats, selected by `--config-type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
    Yaml,
}

impl ConfigFormat {
    pub fn from_name(name: &str) -> Result<Self, ConfigError> {
        match name.to_ascii_lowercase().as_str() {
            "toml" => Ok(ConfigFormat::Toml),
            "json" => Ok(ConfigFormat::Json),
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            _ => Err(ConfigError::UnsupportedFormat(name.to_string())),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
            ConfigFormat::Yaml => "yaml",
        }
    }
}

/// Resolve a [`SearchPath`] to a concrete directory.
///
/// Returns `None` if the path cannot be resolved (e.g. no home directory found).
pub fn resolve_search_path(sp: &SearchPath, app_name: &str) -> Option<PathBuf> {
    match sp {
        SearchPath::Platform => {
            let proj = directories::ProjectDirs::from("", "", app_name)?;
            Some(proj.config_dir().to_path_buf())
        }
        SearchPath::Home(subdir) => {
            let user = directories::UserDirs::new()?;
            Some(user.home_dir().join(subdir))
        }
        SearchPath::Cwd => std::env::current_dir().ok(),
        SearchPath::Path(p) => Some(p.clone()),
    }
}

/// Find the config file to load.
pub fn locate(
    explicit: Option<&Path>,
    search_paths: &[SearchPath],
    app_name: &str,
    file_name: &str,
    format: ConfigFormat,
) -> Result<PathBuf, ConfigError> {
    if let Some(path) = explicit {
        return Ok(path.to_path_buf());
    }

    let name = format!("{file_name}.{}", format.extension());
    let searched: Vec<PathBuf> = search_paths
        .iter()
        .filter_map(|sp| resolve_search_path(sp, app_name))
        .map(|dir| dir.join(&name))
        .collect();

    match searched.iter().rev().find(|candidate| candidate.is_file()) {
        Some(found) => {
            debug!(path = %found.display(), "found config file");
            Ok(found.clone())
        }
        None => Err(ConfigError::FileNotFound { name, searched }),
    }
}

/// A parsed config file.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub path: PathBuf,
    pub format: ConfigFormat,
    pub content: String,
    pub table: Table,
}

impl ConfigFile {
    pub fn read(path: &Path, format: ConfigFormat) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound {
                    name: path.display().to_string(),
                    searched: vec![path.to_path_buf()],
                }
            } else {
                ConfigError::SourceRead {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                }
            }
        })?;

        let table = parse(&content, format).map_err(|reason| ConfigError::SourceRead {
            path: path.to_path_buf(),
            reason,
        })?;

        Ok(ConfigFile {
            path: path.to_path_buf(),
            format,
            content,
            table,
        })
    }

    /// The value stored under a dotted key, e.g. `database.url`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        table_get(&self.table, key)
    }

    /// Report keys in the file that no field binds.
    ///
    /// In strict mode the first unknown key is an error; otherwise each one is
    /// logged as a warning.
    pub fn check_unknown_keys(&self, known: &[&str], strict: bool) -> Result<(), ConfigError> {
        let known: HashSet<&str> = known.iter().copied().collect();
        let mut unknown = Vec::new();
        collect_unknown(&self.table, "", &known, &mut unknown);

        for key in unknown {
            let line = find_key_line(&self.content, &key, self.format);
            if strict {
                return Err(ConfigError::UnknownKey {
                    key,
                    path: self.path.clone(),
                    line,
                });
            }
            warn!(key = %key, path = %self.path.display(), line, "unknown key in config file");
        }
        Ok(())
    }
}

fn parse(content: &str, format: ConfigFormat) -> Result<Table, String> {
    match format {
        ConfigFormat::Toml => toml::from_str::<Table>(content).map_err(|e| e.to_string()),
        ConfigFormat::Json => {
            let json: serde_json::Value =
                serde_json::from_str(content).map_err(|e| e.to_string())?;
            match json_to_toml(json) {
                Some(Value::Table(table)) => Ok(table),
                _ => Err("top-level JSON value must be an object".into()),
            }
        }
        ConfigFormat::Yaml => {
            // An empty document is an empty mapping.
            if content.trim().is_empty() {
                return Ok(Table::new());
            }
            let yaml: serde_json::Value =
                serde_yaml::from_str(content).map_err(|e| e.to_string())?;
            match json_to_toml(yaml) {
                Some(Value::Table(table)) => Ok(table),
                _ => Err("top-level YAML value must be a mapping".into()),
            }
        }
    }
}

/// Convert a JSON (or JSON-shaped YAML) value to TOML. `null` has no TOML form and yields `None`.
fn json_to_toml(json: serde_json::Value) -> Option<Value> {
    use serde_json::Value as Json;

    let value = match json {
        Json::Null => return None,
        Json::Bool(b) => Value::Boolean(b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::Integer(i),
            None => Value::Float(n.as_f64()?),
        },
        Json::String(s) => Value::String(s),
        Json::Array(items) => Value::Array(items.into_iter().filter_map(json_to_toml).collect()),
        Json::Object(members) => Value::Table(
            members
                .into_iter()
                .filter_map(|(k, v)| json_to_toml(v).map(|v| (k, v)))
                .collect(),
        ),
    };
    Some(value)
}

/// Look up a dotted key in a nested table.
pub fn table_get<'a>(table: &'a Table, key: &str) -> Option<&'a Value> {
    let mut segments = key.split('.');
    let mut current = table.get(segments.next()?)?;
    for segment in segments {
        current = current.as_table()?.get(segment)?;
    }
    Some(current)
}

fn collect_unknown(table: &Table, prefix: &str, known: &HashSet<&str>, out: &mut Vec<String>) {
    for (name, value) in table {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}.{name}")
        };
        if known.contains(path.as_str()) {
            continue;
        }
        let section = format!("{path}.");
        match value {
            Value::Table(inner) if known.iter().any(|k| k.starts_with(&section)) => {
                collect_unknown(inner, &path, known, out);
            }
            _ => out.push(path),
        }
    }
}

/// Find the 1-indexed line number for a key in the file content.
///
/// For TOML and a dotted key like `"database.typo"`, tracks the current
/// `[section]` header while scanning and only matches the leaf key when inside
/// the correct section. For JSON, the first line holding the quoted leaf name;
/// for YAML, the first line starting with `leaf:`.
///
/// Best effort: quoted TOML keys and inline tables are not handled.
/// Returns 0 if the key cannot be located.
fn find_key_line(content: &str, dotted_key: &str, format: ConfigFormat) -> usize {
    let segments: Vec<&str> = dotted_key.split('.').collect();
    let leaf = segments.last().copied().unwrap_or(dotted_key);

    match format {
        ConfigFormat::Json => {
            let quoted = format!("\"{leaf}\"");
            return content
                .lines()
                .position(|line| line.contains(&quoted))
                .map_or(0, |i| i + 1);
        }
        ConfigFormat::Yaml => {
            let mapping = format!("{leaf}:");
            return content
                .lines()
                .position(|line| line.trim_start().starts_with(&mapping))
                .map_or(0, |i| i + 1);
        }
        ConfigFormat::Toml => {}
    }

    let expected_section = &segments[..segments.len() - 1];
    let mut current_section: Vec<String> = Vec::new();

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();

        if trimmed.starts_with('[') && !trimmed.starts_with("[[") {
            let header = trimmed.trim_start_matches('[').trim_end_matches(']').trim();
            current_section = header.split('.').map(|s| s.trim().to_string()).collect();
            continue;
        }

        let in_right_section = expected_section.len() == current_section.len()
            && expected_section
                .iter()
                .zip(&current_section)
                .all(|(a, b)| *a == b);

        if in_right_section
            && let Some(after_key) = trimmed.strip_prefix(leaf)
            && after_key.trim_start().starts_with('=')
        {
            return i + 1;
        }
    }
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn resolve_explicit_path() {
        let p = PathBuf::from("/tmp/myapp");
        let resolved = resolve_search_path(&SearchPath::Path(p.clone()), "ignored");
        assert_eq!(resolved, Some(p));
    }

    #[test]
    fn format_names() {
        assert_eq!(ConfigFormat::from_name("TOML").unwrap(), ConfigFormat::Toml);
        assert_eq!(ConfigFormat::from_name("json").unwrap(), ConfigFormat::Json);
        assert_eq!(ConfigFormat::from_name("yml").unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::Yaml.extension(), "yaml");
        assert!(matches!(
            ConfigFormat::from_name("ini"),
            Err(ConfigError::UnsupportedFormat(t)) if t == "ini"
        ));
    }

    #[test]
    fn explicit_path_is_not_searched() {
        let dir = TempDir::new().unwrap();
        let explicit = dir.path().join("custom.conf");
        let found = locate(Some(&explicit), &[], "app", "config", ConfigFormat::Toml).unwrap();
        assert_eq!(found, explicit);
    }

    #[test]
    fn locate_prefers_highest_priority() {
        let low = TempDir::new().unwrap();
        let high = TempDir::new().unwrap();
        fs::write(low.path().join("app.toml"), "host = \"low\"\n").unwrap();
        fs::write(high.path().join("app.toml"), "host = \"high\"\n").unwrap();

        let paths = vec![
            SearchPath::Path(low.path().to_path_buf()),
            SearchPath::Path(high.path().to_path_buf()),
        ];
        let found = locate(None, &paths, "test", "app", ConfigFormat::Toml).unwrap();
        assert_eq!(found, high.path().join("app.toml"));
    }

    #[test]
    fn locate_falls_back_to_lower_priority() {
        let low = TempDir::new().unwrap();
        let high = TempDir::new().unwrap();
        fs::write(low.path().join("app.toml"), "host = \"fallback\"\n").unwrap();

        let paths = vec![
            SearchPath::Path(low.path().to_path_buf()),
            SearchPath::Path(high.path().to_path_buf()),
        ];
        let found = locate(None, &paths, "test", "app", ConfigFormat::Toml).unwrap();
        assert_eq!(found, low.path().join("app.toml"));
    }

    #[test]
    fn locate_uses_format_extension() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.toml"), "").unwrap();
        let paths = vec![SearchPath::Path(dir.path().to_path_buf())];
        let err = locate(None, &paths, "test", "app", ConfigFormat::Json).unwrap_err();
        match err {
            ConfigError::FileNotFound { name, searched } => {
                assert_eq!(name, "app.json");
                assert_eq!(searched, vec![dir.path().join("app.json")]);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn read_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.toml");
        fs::write(&path, "port = 3000\n[database]\nurl = \"pg://\"\n").unwrap();
        let file = ConfigFile::read(&path, ConfigFormat::Toml).unwrap();
        assert_eq!(file.get("port"), Some(&Value::Integer(3000)));
        assert_eq!(
            file.get("database.url"),
            Some(&Value::String("pg://".into()))
        );
        assert_eq!(file.get("database.pool_size"), None);
        assert_eq!(file.get("port.inner"), None);
    }

    #[test]
    fn read_json_drops_nulls() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.json");
        fs::write(
            &path,
            r#"{"port": 3000, "rate": 0.5, "url": null, "tags": ["a", null, "b"], "db": {"size": 2}}"#,
        )
        .unwrap();
        let file = ConfigFile::read(&path, ConfigFormat::Json).unwrap();
        assert_eq!(file.get("port"), Some(&Value::Integer(3000)));
        assert_eq!(file.get("rate"), Some(&Value::Float(0.5)));
        assert_eq!(file.get("url"), None);
        assert_eq!(
            file.get("tags"),
            Some(&Value::Array(vec![
                Value::String("a".into()),
                Value::String("b".into())
            ]))
        );
        assert_eq!(file.get("db.size"), Some(&Value::Integer(2)));
    }

    #[test]
    fn read_yaml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.yaml");
        fs::write(
            &path,
            "port: 3000\nurl: ~\ntags:\n  - a\n  - b\ndb:\n  size: 2\n  name: main\n",
        )
        .unwrap();
        let file = ConfigFile::read(&path, ConfigFormat::Yaml).unwrap();
        assert_eq!(file.get("port"), Some(&Value::Integer(3000)));
        assert_eq!(file.get("url"), None);
        assert_eq!(file.get("tags").and_then(Value::as_array).map(Vec::len), Some(2));
        assert_eq!(file.get("db.name").and_then(Value::as_str), Some("main"));
    }

    #[test]
    fn empty_yaml_is_empty_table() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.yaml");
        fs::write(&path, "\n").unwrap();
        let file = ConfigFile::read(&path, ConfigFormat::Yaml).unwrap();
        assert!(file.table.is_empty());
    }

    #[test]
    fn yaml_must_be_a_mapping() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.yaml");
        fs::write(&path, "- 1\n- 2\n").unwrap();
        let err = ConfigFile::read(&path, ConfigFormat::Yaml).unwrap_err();
        assert!(matches!(err, ConfigError::SourceRead { .. }));
    }

    #[test]
    fn unknown_yaml_key_reports_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.yaml");
        fs::write(&path, "host: x\ndb:\n  url: pg\n  typo: 1\n").unwrap();
        let file = ConfigFile::read(&path, ConfigFormat::Yaml).unwrap();
        let err = file
            .check_unknown_keys(&["host", "db.url"], true)
            .unwrap_err();
        assert!(
            matches!(err, ConfigError::UnknownKey { ref key, line: 4, .. } if key == "db.typo")
        );
    }

    #[test]
    fn json_must_be_an_object() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.json");
        fs::write(&path, "[1, 2]").unwrap();
        let err = ConfigFile::read(&path, ConfigFormat::Json).unwrap_err();
        assert!(matches!(err, ConfigError::SourceRead { .. }));
        assert!(err.is_soft());
    }

    #[test]
    fn malformed_toml_is_source_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.toml");
        fs::write(&path, "port = [unclosed\n").unwrap();
        let err = ConfigFile::read(&path, ConfigFormat::Toml).unwrap_err();
        assert!(matches!(err, ConfigError::SourceRead { ref path, .. } if path.ends_with("app.toml")));
    }

    #[test]
    fn missing_explicit_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err =
            ConfigFile::read(&dir.path().join("gone.toml"), ConfigFormat::Toml).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_file_is_source_read() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.toml");
        fs::write(&path, "port = 1\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o000)).unwrap();

        // Root can read anything; only assert when the read actually fails.
        if let Err(err) = ConfigFile::read(&path, ConfigFormat::Toml) {
            assert!(matches!(err, ConfigError::SourceRead { .. }));
        }

        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();
    }

    fn file(content: &str) -> ConfigFile {
        ConfigFile {
            path: PathBuf::from("/test/config.toml"),
            format: ConfigFormat::Toml,
            content: content.to_string(),
            table: toml::from_str(content).unwrap(),
        }
    }

    #[test]
    fn known_keys_pass_strict_check() {
        let f = file("host = \"x\"\n[database]\nurl = \"pg://\"\n[labels]\nteam = \"a\"\n");
        assert!(
            f.check_unknown_keys(&["host", "database.url", "labels"], true)
                .is_ok()
        );
    }

    #[test]
    fn unknown_top_level_key() {
        let f = file("host = \"x\"\ntypo_key = 1\n");
        let err = f.check_unknown_keys(&["host"], true).unwrap_err();
        match err {
            ConfigError::UnknownKey { key, line, .. } => {
                assert_eq!(key, "typo_key");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn unknown_nested_key_reports_section_line() {
        let f = file("typo = 0\n[database]\nurl = \"pg://\"\ntypo = 1\n");
        let err = f
            .check_unknown_keys(&["typo", "database.url"], true)
            .unwrap_err();
        assert!(
            matches!(err, ConfigError::UnknownKey { ref key, line: 4, .. } if key == "database.typo")
        );
    }

    #[test]
    fn unknown_section_is_reported_whole() {
        let f = file("[cache]\nsize = 1\n");
        let err = f.check_unknown_keys(&["host"], true).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey { ref key, line: 0, .. } if key == "cache"));
    }

    #[test]
    fn lenient_mode_only_warns() {
        let f = file("typo_key = 1\n");
        assert!(f.check_unknown_keys(&["host"], false).is_ok());
    }

    #[test]
    fn find_key_line_json() {
        let content = "{\n  \"host\": \"x\",\n  \"typo\": 1\n}\n";
        assert_eq!(find_key_line(content, "typo", ConfigFormat::Json), 3);
        assert_eq!(find_key_line(content, "absent", ConfigFormat::Json), 0);
    }
}
