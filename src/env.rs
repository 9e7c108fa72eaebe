use std::collections::HashMap;

use crate::walk::FieldDescriptor;

/// A point-in-time copy of environment variables.
///
/// Built from an iterator so tests can pass synthetic data instead of
/// `std::env::vars()`.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    vars: HashMap<String, String>,
}

impl EnvSnapshot {
    pub fn from_process() -> Self {
        Self::from_vars(std::env::vars())
    }

    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        EnvSnapshot {
            vars: vars.into_iter().collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Look up the value bound to `field`.
    ///
    /// The field's own variable is consulted first, then its bare alias
    /// fallback. Returns the variable name that matched with its value. A
    /// variable that is present but empty still counts as set.
    pub fn lookup<'a>(&'a self, field: &'a FieldDescriptor) -> Option<(&'a str, &'a str)> {
        [field.env.as_deref(), field.env_fallback.as_deref()]
            .into_iter()
            .flatten()
            .find_map(|name| self.get(name).map(|value| (name, value)))
    }
}
