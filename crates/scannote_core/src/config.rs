//! Environment-driven runtime configuration.
//!
//! # Responsibility
//! - Resolve storage path, logging and extraction settings from variables.
//! - Apply defaults for every unset variable.
//!
//! # Invariants
//! - Blank values are treated as unset.
//! - An unsupported log level is an error, never silently replaced.

use crate::extraction::GeminiConfig;
use crate::logging::{default_log_level, normalize_level};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "SCANNOTE_DB_PATH";
pub const ENV_LOG_DIR: &str = "SCANNOTE_LOG_DIR";
pub const ENV_LOG_LEVEL: &str = "SCANNOTE_LOG_LEVEL";
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
/// Fallback key variable used by earlier deployments.
pub const ENV_API_KEY: &str = "API_KEY";
pub const ENV_GEMINI_MODEL: &str = "GEMINI_MODEL";
pub const ENV_GEMINI_BASE_URL: &str = "GEMINI_BASE_URL";

const DEFAULT_DB_FILE_NAME: &str = "scannote.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidLogLevel(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLogLevel(message) => write!(f, "{ENV_LOG_LEVEL}: {message}"),
        }
    }
}

impl Error for ConfigError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    /// `None` disables file logging.
    pub log_dir: Option<PathBuf>,
    pub log_level: &'static str,
    pub gemini: GeminiConfig,
}

impl CoreConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads configuration through `lookup`, one variable name at a time.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let log_level = match get(ENV_LOG_LEVEL) {
            Some(raw) => normalize_level(&raw).map_err(ConfigError::InvalidLogLevel)?,
            None => default_log_level(),
        };

        let defaults = GeminiConfig::default();
        let gemini = GeminiConfig {
            api_key: get(ENV_GEMINI_API_KEY).or_else(|| get(ENV_API_KEY)),
            model: get(ENV_GEMINI_MODEL).unwrap_or(defaults.model),
            base_url: get(ENV_GEMINI_BASE_URL).unwrap_or(defaults.base_url),
        };

        Ok(Self {
            db_path: get(ENV_DB_PATH)
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE_NAME)),
            log_dir: get(ENV_LOG_DIR).map(PathBuf::from),
            log_level,
            gemini,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, CoreConfig};
    use crate::logging::default_log_level;
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = CoreConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.db_path, PathBuf::from("scannote.sqlite3"));
        assert_eq!(config.log_dir, None);
        assert_eq!(config.log_level, default_log_level());
        assert_eq!(config.gemini.api_key, None);
        assert_eq!(config.gemini.model, "gemini-2.5-flash");
    }

    #[test]
    fn gemini_key_wins_over_legacy_key_and_blank_is_unset() {
        let config = CoreConfig::from_lookup(lookup_from(&[
            ("GEMINI_API_KEY", "primary"),
            ("API_KEY", "legacy"),
        ]))
        .unwrap();
        assert_eq!(config.gemini.api_key.as_deref(), Some("primary"));

        let config = CoreConfig::from_lookup(lookup_from(&[
            ("GEMINI_API_KEY", "   "),
            ("API_KEY", "legacy"),
        ]))
        .unwrap();
        assert_eq!(config.gemini.api_key.as_deref(), Some("legacy"));
    }

    #[test]
    fn log_level_is_normalized_or_rejected() {
        let config =
            CoreConfig::from_lookup(lookup_from(&[("SCANNOTE_LOG_LEVEL", "WARNING")])).unwrap();
        assert_eq!(config.log_level, "warn");

        let err = CoreConfig::from_lookup(lookup_from(&[("SCANNOTE_LOG_LEVEL", "loud")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidLogLevel(_)));
    }
}
