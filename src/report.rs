//! Per-field resolution listing, printed by the debug flag.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::ConfigError;
use crate::resolve::{Resolved, Source, display_value};
use crate::walk::FieldDescriptor;

/// Where one field's value came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportEntry {
    pub key: String,
    pub field: String,
    pub env: Option<String>,
    pub flag: Option<String>,
    pub source: Source,
    /// The flag, file path or environment variable that supplied the value.
    pub origin: Option<String>,
    pub value: Option<String>,
}

/// All fields of one resolution, in descriptor order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Report {
    pub file: Option<PathBuf>,
    /// The soft file condition, if the file could not be used.
    pub file_error: Option<String>,
    pub entries: Vec<ReportEntry>,
}

impl Report {
    pub fn new(
        fields: &[FieldDescriptor],
        resolved: &[Resolved],
        file: Option<PathBuf>,
        file_error: Option<&ConfigError>,
    ) -> Self {
        let entries = fields
            .iter()
            .zip(resolved)
            .map(|(field, resolved)| ReportEntry {
                key: field.key.clone(),
                field: field.field_path(),
                env: field.env.clone(),
                flag: field.flag.clone(),
                source: resolved.source,
                origin: resolved.origin.clone(),
                value: resolved.value.as_ref().map(display_value),
            })
            .collect();

        Report {
            file,
            file_error: file_error.map(ToString::to_string),
            entries,
        }
    }

    pub fn entry(&self, key: &str) -> Option<&ReportEntry> {
        self.entries.iter().find(|e| e.key == key)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.file, &self.file_error) {
            (Some(path), _) => writeln!(f, "# config file: {}", path.display())?,
            (None, Some(err)) => writeln!(f, "# config file: none ({err})")?,
            (None, None) => writeln!(f, "# config file: none")?,
        }
        for (i, entry) in self.entries.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            let value = entry.value.as_deref().unwrap_or("<not set>");
            write!(f, "{} = {value}  ({}", entry.key, entry.source)?;
            if let Some(origin) = &entry.origin {
                write!(f, ": {origin}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Settings;
    use crate::env::EnvSnapshot;
    use crate::fixtures::test::TestConfig;
    use crate::resolve::{Layers, merge};
    use crate::walk::walk;
    use std::collections::HashMap;

    fn report() -> Report {
        let fields = walk(&TestConfig::schema(), "app", "file").unwrap();
        let flags = HashMap::from([("verbose".to_string(), "true".to_string())]);
        let env = EnvSnapshot::from_vars([("APP_PORT".to_string(), "3000".to_string())]);
        let resolved = merge(
            &fields,
            &Layers {
                flags: &flags,
                file: None,
                env: &env,
            },
        );
        Report::new(&fields, &resolved, None, None)
    }

    #[test]
    fn entries_name_their_source() {
        let report = report();
        let port = report.entry("port").unwrap();
        assert_eq!(port.source, Source::Env);
        assert_eq!(port.origin.as_deref(), Some("APP_PORT"));
        assert_eq!(port.value.as_deref(), Some("3000"));
        assert_eq!(report.entry("host").unwrap().source, Source::Default);
        assert_eq!(report.entry("db.url").unwrap().source, Source::Unset);
    }

    #[test]
    fn display_lists_every_key() {
        let text = report().to_string();
        assert!(text.starts_with("# config file: none\n"));
        assert!(text.contains("port = 3000  (env: APP_PORT)"));
        assert!(text.contains("verbose = true  (flag: --verbose)"));
        assert!(text.contains("host = localhost  (default)"));
        assert!(text.contains("db.url = <not set>  (unset)"));
    }

    #[test]
    fn display_mentions_file_error() {
        let mut report = report();
        report.file_error = Some("Config file 'config.toml' not found in 1 search path(s)".into());
        assert!(report.to_string().starts_with("# config file: none (Config file"));
    }

    #[test]
    fn serializes_to_json() {
        let json = serde_json::to_value(report()).unwrap();
        assert_eq!(json["entries"][0]["key"], "host");
        assert_eq!(json["entries"][0]["source"], "default");
    }
}
