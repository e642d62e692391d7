// Configuration file loading and typed lookups

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// Read a TOML file into flat upper-case keys.
///
/// Nested tables are joined with `_`, so `[rate_limit] max = 3` becomes
/// `RATE_LIMIT_MAX = "3"`. Arrays are joined with `,`.
pub fn load_toml_file(path: impl AsRef<Path>) -> Result<HashMap<String, String>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| {
        ConfigError::LoadError(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let vars = parse_toml(&content)?;
    debug!(path = %path.display(), keys = vars.len(), "Loaded configuration file");
    Ok(vars)
}

/// Parse TOML text into flat upper-case keys
pub fn parse_toml(content: &str) -> Result<HashMap<String, String>> {
    let table: toml::Table = toml::from_str(content)?;
    let mut vars = HashMap::new();
    flatten(&table, "", &mut vars);
    Ok(vars)
}

fn flatten(table: &toml::Table, prefix: &str, out: &mut HashMap<String, String>) {
    for (key, value) in table {
        let key = if prefix.is_empty() {
            key.to_uppercase()
        } else {
            format!("{}_{}", prefix, key.to_uppercase())
        };
        match value {
            toml::Value::Table(inner) => flatten(inner, &key, out),
            other => {
                out.insert(key, scalar(other));
            }
        }
    }
}

fn scalar(value: &toml::Value) -> String {
    match value {
        toml::Value::String(s) => s.clone(),
        toml::Value::Array(items) => items.iter().map(scalar).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

/// Flat key/value configuration with typed accessors
#[derive(Debug, Clone, Default)]
pub struct ConfigVars {
    vars: HashMap<String, String>,
}

impl ConfigVars {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Layer `overrides` on top of the current values
    pub fn merge(mut self, overrides: HashMap<String, String>) -> Self {
        self.vars.extend(overrides);
        self
    }

    /// Set a single value
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(key.into().to_uppercase(), value.into());
        self
    }

    /// Raw value; blank values count as unset
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Required raw value
    pub fn require(&self, key: &str) -> Result<&str> {
        self.get(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))
    }

    /// String value or default
    pub fn string_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_string()
    }

    /// Parsed value or default when unset
    pub fn parse_or<T: FromStr>(&self, key: &str, default: T, expected: &'static str) -> Result<T> {
        match self.get(key) {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::parse(key, raw, expected)),
            None => Ok(default),
        }
    }

    /// Boolean value (`true/false/1/0/yes/no`) or default
    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool> {
        match self.get(key).map(str::to_lowercase).as_deref() {
            None => Ok(default),
            Some("true" | "1" | "yes" | "on") => Ok(true),
            Some("false" | "0" | "no" | "off") => Ok(false),
            Some(_) => Err(ConfigError::parse(
                key,
                self.get(key).unwrap_or_default(),
                "a boolean",
            )),
        }
    }

    /// Comma separated list, lower-cased, or default
    pub fn list_or(&self, key: &str, default: &[&str]) -> Vec<String> {
        match self.get(key) {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            None => default.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl From<HashMap<String, String>> for ConfigVars {
    fn from(vars: HashMap<String, String>) -> Self {
        Self { vars }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ConfigVars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |vars, (k, v)| vars.set(k, v))
    }
}
