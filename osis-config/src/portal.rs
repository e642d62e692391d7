//! Portal configuration

use crate::{ConfigError, ConfigValidator, ConfigVars, EnvLoader, Result, load_toml_file};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable naming an optional TOML configuration file
pub const CONFIG_FILE_VAR: &str = "OSIS_CONFIG_FILE";

/// File extensions the upload guard knows how to accept
pub const SUPPORTED_FILE_TYPES: &[&str] = &["jpg", "jpeg", "png", "pdf"];

const MB: u64 = 1024 * 1024;

/// How field-rule failures on a registration are handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    /// Any failure rejects the submission
    #[default]
    Strict,
    /// Field-rule failures are stored as review notes instead
    ManualReview,
}

impl FromStr for ValidationMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "strict" => Ok(Self::Strict),
            "manual_review" | "manual" => Ok(Self::ManualReview),
            _ => Err(ConfigError::parse(
                "VALIDATION_MODE",
                s,
                "strict or manual_review",
            )),
        }
    }
}

impl fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => f.write_str("strict"),
            Self::ManualReview => f.write_str("manual_review"),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human readable
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::parse("LOG_FORMAT", s, "pretty or json")),
        }
    }
}

/// A request budget over a sliding window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitSettings {
    /// Requests allowed per window
    pub max_requests: u64,
    /// Window length
    pub window: Duration,
}

/// Typed portal configuration
#[derive(Debug, Clone)]
pub struct PortalConfig {
    pub host: String,
    pub port: u16,
    /// Budget for `POST /api/register`
    pub registration_rate_limit: RateLimitSettings,
    /// Budget for every other endpoint
    pub rate_limit: RateLimitSettings,
    /// Largest accepted certificate, in bytes
    pub max_file_size: u64,
    /// Largest accepted photo, in bytes
    pub photo_max_file_size: u64,
    /// Lower-case extensions accepted for certificates
    pub allowed_file_types: Vec<String>,
    pub max_files: usize,
    pub validation_mode: ValidationMode,
    pub registration_open: bool,
    /// Bearer token required by admin endpoints when set
    pub admin_token: Option<String>,
    /// Peers whose `X-Forwarded-For` / `X-Real-IP` headers are believed
    pub trusted_proxies: Vec<IpAddr>,
    pub log_format: LogFormat,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            registration_rate_limit: RateLimitSettings {
                max_requests: 3,
                window: Duration::from_secs(3600),
            },
            rate_limit: RateLimitSettings {
                max_requests: 100,
                window: Duration::from_secs(900),
            },
            max_file_size: 5 * MB,
            photo_max_file_size: 2 * MB,
            allowed_file_types: SUPPORTED_FILE_TYPES.iter().map(|s| s.to_string()).collect(),
            max_files: 6,
            validation_mode: ValidationMode::Strict,
            registration_open: true,
            admin_token: None,
            trusted_proxies: Vec::new(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl PortalConfig {
    /// Load from `.env`, the optional TOML file and the process environment.
    ///
    /// Environment variables override file values, which override defaults.
    pub fn from_env() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!(path = %path.display(), "Loaded .env file");
        }

        let env = EnvLoader::default().load();
        let mut vars = ConfigVars::new();
        if let Some(path) = env.get(CONFIG_FILE_VAR).filter(|p| !p.trim().is_empty()) {
            vars = vars.merge(load_toml_file(path)?);
        }
        let config = Self::from_vars(&vars.merge(env))?;

        info!(
            addr = %config.socket_addr_string(),
            validation_mode = %config.validation_mode,
            registration_open = config.registration_open,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Build from flat variables, validating the result
    pub fn from_vars(vars: &ConfigVars) -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            host: vars.string_or("HOST", &defaults.host),
            port: vars.parse_or("PORT", defaults.port, "a port number")?,
            registration_rate_limit: RateLimitSettings {
                max_requests: vars.parse_or(
                    "REGISTRATION_RATE_LIMIT_MAX",
                    defaults.registration_rate_limit.max_requests,
                    "a positive integer",
                )?,
                window: Duration::from_secs(vars.parse_or(
                    "REGISTRATION_RATE_LIMIT_WINDOW_SECS",
                    defaults.registration_rate_limit.window.as_secs(),
                    "seconds",
                )?),
            },
            rate_limit: RateLimitSettings {
                max_requests: vars.parse_or(
                    "RATE_LIMIT_MAX",
                    defaults.rate_limit.max_requests,
                    "a positive integer",
                )?,
                window: Duration::from_secs(vars.parse_or(
                    "RATE_LIMIT_WINDOW_SECS",
                    defaults.rate_limit.window.as_secs(),
                    "seconds",
                )?),
            },
            max_file_size: vars.parse_or("MAX_FILE_SIZE", defaults.max_file_size, "bytes")?,
            photo_max_file_size: vars.parse_or(
                "PHOTO_MAX_FILE_SIZE",
                defaults.photo_max_file_size,
                "bytes",
            )?,
            allowed_file_types: vars.list_or("ALLOWED_FILE_TYPES", SUPPORTED_FILE_TYPES),
            max_files: vars.parse_or("MAX_FILES", defaults.max_files, "a positive integer")?,
            validation_mode: vars.parse_or(
                "VALIDATION_MODE",
                defaults.validation_mode,
                "strict or manual_review",
            )?,
            registration_open: vars.bool_or("REGISTRATION_OPEN", defaults.registration_open)?,
            admin_token: vars.get("ADMIN_TOKEN").map(String::from),
            trusted_proxies: vars
                .list_or("TRUSTED_PROXIES", &[])
                .iter()
                .map(|raw| {
                    raw.parse()
                        .map_err(|_| ConfigError::parse("TRUSTED_PROXIES", raw, "IP addresses"))
                })
                .collect::<Result<_>>()?,
            log_format: vars.parse_or("LOG_FORMAT", defaults.log_format, "pretty or json")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<()> {
        ConfigValidator::not_empty(&self.host, "HOST")?;
        ConfigValidator::is_port(self.port, "PORT")?;
        ConfigValidator::in_range(
            self.registration_rate_limit.max_requests,
            1,
            u64::MAX,
            "REGISTRATION_RATE_LIMIT_MAX",
        )?;
        ConfigValidator::in_range(self.rate_limit.max_requests, 1, u64::MAX, "RATE_LIMIT_MAX")?;
        ConfigValidator::in_range(
            self.registration_rate_limit.window.as_secs(),
            1,
            u64::MAX,
            "REGISTRATION_RATE_LIMIT_WINDOW_SECS",
        )?;
        ConfigValidator::in_range(
            self.rate_limit.window.as_secs(),
            1,
            u64::MAX,
            "RATE_LIMIT_WINDOW_SECS",
        )?;
        ConfigValidator::in_range(self.max_file_size, 1, 50 * MB, "MAX_FILE_SIZE")?;
        ConfigValidator::in_range(self.photo_max_file_size, 1, 50 * MB, "PHOTO_MAX_FILE_SIZE")?;
        ConfigValidator::in_range(self.max_files, 1, 20, "MAX_FILES")?;
        if self.allowed_file_types.is_empty() {
            return Err(ConfigError::ValidationError(
                "ALLOWED_FILE_TYPES cannot be empty".to_string(),
            ));
        }
        ConfigValidator::all_of(
            &self.allowed_file_types,
            SUPPORTED_FILE_TYPES,
            "ALLOWED_FILE_TYPES",
        )?;
        if let Some(token) = &self.admin_token {
            ConfigValidator::not_empty(token, "ADMIN_TOKEN")?;
        }
        Ok(())
    }

    /// `host:port` as configured
    pub fn socket_addr_string(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Parsed listen address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.socket_addr_string()
            .parse()
            .map_err(|_| ConfigError::parse("HOST", &self.host, "an IP address"))
    }

    /// Whether field-rule failures are stored for review instead of rejected
    pub fn is_manual_review(&self) -> bool {
        self.validation_mode == ValidationMode::ManualReview
    }
}
