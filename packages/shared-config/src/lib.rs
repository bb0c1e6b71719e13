//! Shared configuration types for Hearth services
//!
//! This crate provides the configuration types used by the server and its
//! background task processor, loaded from environment variables with
//! defaults suitable for a home installation.

mod error;
mod ui;

pub use error::{ConfigError, ConfigResult};
pub use ui::{parse_accounts, UiConfig};

use serde::Serialize;
use std::env;
use std::path::PathBuf;

/// Common configuration shared between all services
#[derive(Debug, Clone)]
pub struct CommonConfig {
    /// Root of the media library scanned by rescan tasks
    pub media_library_path: PathBuf,

    /// Environment mode (development, staging, production)
    pub environment: Environment,
}

/// Application environment mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl std::str::FromStr for Environment {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "staging" | "stage" => Self::Staging,
            _ => Self::Development,
        })
    }
}

impl Environment {
    /// Check if this is a production environment
    pub fn is_production(&self) -> bool {
        matches!(self, Self::Production)
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Staging => write!(f, "staging"),
            Self::Production => write!(f, "production"),
        }
    }
}

impl CommonConfig {
    /// Load common configuration from environment variables
    pub fn from_env() -> ConfigResult<Self> {
        Ok(Self {
            media_library_path: PathBuf::from(get_env_or_default("MEDIA_LIBRARY_PATH", "/media")),
            environment: get_env_or_default("ENVIRONMENT", "development")
                .parse()
                .unwrap_or_default(),
        })
    }
}

/// Helper function to get an optional environment variable with a default
pub fn get_env_or_default(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Helper function to parse an environment variable into a specific type
pub fn parse_env<T>(name: &str, default: T) -> ConfigResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val
            .trim()
            .parse()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("{}", e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("production", Environment::Production)]
    #[case("prod", Environment::Production)]
    #[case("PRODUCTION", Environment::Production)]
    #[case("staging", Environment::Staging)]
    #[case("stage", Environment::Staging)]
    #[case("development", Environment::Development)]
    #[case("anything", Environment::Development)]
    fn test_environment_parsing(#[case] input: &str, #[case] expected: Environment) {
        assert_eq!(input.parse::<Environment>().unwrap(), expected);
    }

    #[test]
    fn test_environment_display() {
        assert_eq!(format!("{}", Environment::Production), "production");
        assert_eq!(format!("{}", Environment::Staging), "staging");
        assert_eq!(format!("{}", Environment::Development), "development");
    }

    #[test]
    fn test_environment_checks() {
        assert!(Environment::Production.is_production());
        assert!(!Environment::Staging.is_production());
        assert!(!Environment::Development.is_production());
    }

    #[test]
    fn test_common_config_defaults() {
        temp_env::with_vars_unset(["MEDIA_LIBRARY_PATH", "ENVIRONMENT"], || {
            let config = CommonConfig::from_env().unwrap();
            assert_eq!(config.media_library_path, PathBuf::from("/media"));
            assert_eq!(config.environment, Environment::Development);
        });
    }

    #[test]
    fn test_parse_env_reports_variable_name() {
        temp_env::with_var("HEARTH_TEST_NUMBER", Some("twelve"), || {
            let err = parse_env::<u64>("HEARTH_TEST_NUMBER", 5).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue(ref name, _) if name == "HEARTH_TEST_NUMBER"));
        });
    }

    #[test]
    fn test_parse_env_default_when_unset() {
        temp_env::with_var_unset("HEARTH_TEST_NUMBER", || {
            assert_eq!(parse_env::<u64>("HEARTH_TEST_NUMBER", 5).unwrap(), 5);
        });
    }
}
