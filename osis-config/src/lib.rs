//! Configuration for the OSIS registration portal
//!
//! Values come from three layers, later ones winning: built-in defaults, an
//! optional TOML file named by `OSIS_CONFIG_FILE`, and the process
//! environment (after loading `.env` with `dotenvy`).
//!
//! ```rust
//! use osis_config::{ConfigVars, PortalConfig, ValidationMode};
//!
//! let vars: ConfigVars = [("PORT", "8080"), ("VALIDATION_MODE", "manual_review")]
//!     .into_iter()
//!     .collect();
//! let config = PortalConfig::from_vars(&vars).unwrap();
//! assert_eq!(config.port, 8080);
//! assert_eq!(config.validation_mode, ValidationMode::ManualReview);
//! ```

pub mod env;
pub mod error;
pub mod loader;
pub mod portal;
pub mod validation;

pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigVars, load_toml_file, parse_toml};
pub use portal::{
    CONFIG_FILE_VAR, LogFormat, PortalConfig, RateLimitSettings, SUPPORTED_FILE_TYPES,
    ValidationMode,
};
pub use validation::ConfigValidator;
