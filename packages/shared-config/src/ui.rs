//! Web UI session configuration

use std::collections::HashMap;
use std::fmt;

use crate::{get_env_or_default, parse_env, ConfigError, ConfigResult};

/// Default idle timeout for UI sessions (30 minutes)
pub const DEFAULT_SESSION_TIMEOUT_SECS: u64 = 30 * 60;

/// Default interval between expired-session sweeps
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60;

/// Default number of individual UI update ids tracked per session
pub const DEFAULT_MAX_UPDATE_IDS: usize = 10;

/// Configuration for the administrative web UI
#[derive(Clone)]
pub struct UiConfig {
    /// Idle time after which a session is evicted
    pub session_timeout_secs: u64,

    /// How often the session registry sweeps for expired sessions
    pub sweep_interval_secs: u64,

    /// Number of pending update ids at which a session switches to "refetch all"
    pub max_update_ids: usize,

    /// Whether logins are checked against `accounts`
    pub accounts_enabled: bool,

    /// Username to password mapping
    pub accounts: HashMap<String, String>,
}

impl UiConfig {
    /// Load UI configuration from environment variables
    ///
    /// `UI_ACCOUNTS` holds a comma-separated `user:password` list.
    pub fn from_env() -> ConfigResult<Self> {
        let config = Self {
            session_timeout_secs: parse_env("UI_SESSION_TIMEOUT", DEFAULT_SESSION_TIMEOUT_SECS)?,
            sweep_interval_secs: parse_env("UI_SESSION_SWEEP_INTERVAL", DEFAULT_SWEEP_INTERVAL_SECS)?,
            max_update_ids: parse_env("UI_MAX_UPDATE_IDS", DEFAULT_MAX_UPDATE_IDS)?,
            accounts_enabled: parse_env("UI_ACCOUNTS_ENABLED", false)?,
            accounts: parse_accounts(&get_env_or_default("UI_ACCOUNTS", ""))?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that cannot be expressed by parsing alone
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_update_ids == 0 {
            return Err(ConfigError::ValidationError(
                "UI_MAX_UPDATE_IDS must be at least 1".to_string(),
            ));
        }
        if self.sweep_interval_secs == 0 {
            return Err(ConfigError::ValidationError(
                "UI_SESSION_SWEEP_INTERVAL must be at least 1 second".to_string(),
            ));
        }
        if self.accounts_enabled && self.accounts.is_empty() {
            return Err(ConfigError::ValidationError(
                "UI_ACCOUNTS_ENABLED is set but UI_ACCOUNTS is empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Create a configuration with a custom session timeout (useful for testing)
    pub fn with_timeout(session_timeout_secs: u64) -> Self {
        Self {
            session_timeout_secs,
            ..Self::default()
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            session_timeout_secs: DEFAULT_SESSION_TIMEOUT_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
            max_update_ids: DEFAULT_MAX_UPDATE_IDS,
            accounts_enabled: false,
            accounts: HashMap::new(),
        }
    }
}

impl fmt::Debug for UiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut users: Vec<&String> = self.accounts.keys().collect();
        users.sort();
        f.debug_struct("UiConfig")
            .field("session_timeout_secs", &self.session_timeout_secs)
            .field("sweep_interval_secs", &self.sweep_interval_secs)
            .field("max_update_ids", &self.max_update_ids)
            .field("accounts_enabled", &self.accounts_enabled)
            .field("accounts", &users)
            .finish()
    }
}

/// Parse a `user:password,user2:password2` account list
///
/// Passwords may contain `:`; only the first one separates the user name.
/// Empty entries are skipped.
pub fn parse_accounts(raw: &str) -> ConfigResult<HashMap<String, String>> {
    let mut accounts = HashMap::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let (user, password) = entry
            .split_once(':')
            .ok_or_else(|| ConfigError::InvalidAccount(entry.to_string()))?;
        if user.trim().is_empty() {
            return Err(ConfigError::InvalidAccount(entry.to_string()));
        }
        accounts.insert(user.trim().to_string(), password.to_string());
    }
    Ok(accounts)
}
