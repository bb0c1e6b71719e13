//! Server configuration

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use hearth_shared_config::{parse_env, CommonConfig, Environment, UiConfig};

/// Default HTTP port of the web UI
pub const DEFAULT_PORT: u16 = 49152;

/// Default delay between catalog refreshes in seconds
pub const DEFAULT_CATALOG_REFRESH_SECS: u64 = 3600;

/// Remote catalog mirrored into the library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Listing endpoint (`ONLINE_CATALOG_URL`)
    pub url: String,

    /// Seconds between scheduled refreshes; 0 refreshes at startup only
    pub refresh_secs: u64,
}

impl CatalogConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_secs)
    }
}

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Common configuration shared with the task processor
    pub common: CommonConfig,

    /// Web UI sessions and accounts
    pub ui: UiConfig,

    /// Server port (default: 49152)
    pub port: u16,

    /// CORS allowed origins (optional)
    pub cors_allowed_origins: Option<Vec<String>>,

    /// Remote catalog, enabled when `ONLINE_CATALOG_URL` is set
    pub catalog: Option<CatalogConfig>,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Running in production without `UI_ACCOUNTS_ENABLED` is allowed but
    /// logged, since anyone on the network can then use the UI.
    pub fn from_env() -> Result<Self> {
        let common = CommonConfig::from_env().context("Failed to load common config")?;
        let ui = UiConfig::from_env().context("Failed to load UI config")?;
        let catalog = match env::var("ONLINE_CATALOG_URL") {
            Ok(url) if !url.trim().is_empty() => Some(CatalogConfig {
                url: url.trim().to_string(),
                refresh_secs: parse_env("ONLINE_CATALOG_REFRESH", DEFAULT_CATALOG_REFRESH_SECS)
                    .context("Failed to load catalog config")?,
            }),
            _ => None,
        };

        if common.environment.is_production() && !ui.accounts_enabled {
            tracing::warn!(
                "UI accounts are disabled in production mode. \
                 Set UI_ACCOUNTS_ENABLED and UI_ACCOUNTS to require a login."
            );
        }

        Ok(Self {
            common,
            ui,
            port: env::var("HEARTH_PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .context("Invalid HEARTH_PORT value")?,
            cors_allowed_origins: env::var("CORS_ORIGINS").ok().map(|s| {
                s.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            }),
            catalog,
        })
    }

    /// Get environment mode
    pub fn environment(&self) -> Environment {
        self.common.environment
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.common.environment.is_production()
    }
}
