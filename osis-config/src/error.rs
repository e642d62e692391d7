// Error types for configuration management

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration key not found: {0}")]
    KeyNotFound(String),

    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Invalid value for {key}: {value:?} (expected {expected})")]
    ParseError {
        key: String,
        value: String,
        expected: &'static str,
    },

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Environment variable error: {0}")]
    EnvError(#[from] std::env::VarError),
}

impl ConfigError {
    pub(crate) fn parse(key: &str, value: &str, expected: &'static str) -> Self {
        Self::ParseError {
            key: key.to_string(),
            value: value.to_string(),
            expected,
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
