//! Configuration management for Taskmirror
//!
//! This module handles loading, parsing, and validation of configuration files.

use crate::constants::{
    AUTO_REFRESH_MAX_MINUTES, DEFAULT_API_BASE_URL, DEFAULT_API_TOKEN_ENV,
    HTTP_TIMEOUT_MAX_SECONDS, HTTP_TIMEOUT_MIN_SECONDS,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub refresh: RefreshConfig,
    pub remote: RemoteConfig,
    pub logging: LoggingConfig,
    pub accounts: AccountsConfig,
}

/// Background refresh configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Auto-refresh interval in minutes (0 = disabled, manual refresh only)
    pub auto_refresh_interval_minutes: u64,
}

/// Remote service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the remote task service REST API
    pub api_base_url: String,
    /// Per-request timeout in seconds
    pub http_timeout_seconds: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LoggingConfig {
    /// Enable logging
    pub enabled: bool,
    /// Log file path; stderr when unset
    pub file: Option<PathBuf>,
}

/// Account configurations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountsConfig {
    /// Default account to use for new items
    pub default_account: String,
    /// Map of account_id -> account configuration
    /// This allows mirroring several accounts of the same service
    pub instances: HashMap<String, AccountInstanceConfig>,
}

/// Configuration for a single account instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountInstanceConfig {
    /// Human-readable name for this account
    pub name: String,
    /// Whether this account is enabled
    pub enabled: bool,
    /// Environment variable holding the account's API token
    pub api_token_env: String,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            auto_refresh_interval_minutes: 5,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            http_timeout_seconds: 30,
        }
    }
}

impl Default for AccountsConfig {
    fn default() -> Self {
        let mut instances = HashMap::new();
        instances.insert(
            "default".to_string(),
            AccountInstanceConfig {
                name: "Default account".to_string(),
                enabled: true,
                api_token_env: DEFAULT_API_TOKEN_ENV.to_string(),
            },
        );

        Self {
            default_account: "default".to_string(),
            instances,
        }
    }
}

impl Config {
    /// Load configuration from file or return defaults
    pub fn load() -> Result<Self> {
        let config_path = Self::find_config_file()?;

        if let Some(path) = config_path {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a specific file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        std::fs::write(&path, content)
            .with_context(|| format!("Failed to write config file: {}", path.as_ref().display()))
    }

    /// Find configuration file in order of precedence
    fn find_config_file() -> Result<Option<PathBuf>> {
        // 1. Check current directory
        let current_dir_config = PathBuf::from("taskmirror.toml");
        if current_dir_config.exists() {
            return Ok(Some(current_dir_config));
        }

        // 2. Check XDG config directory
        if let Some(config_dir) = dirs::config_dir() {
            let xdg_config = config_dir.join("taskmirror").join("config.toml");
            if xdg_config.exists() {
                return Ok(Some(xdg_config));
            }
        }

        Ok(None)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.refresh.auto_refresh_interval_minutes > AUTO_REFRESH_MAX_MINUTES {
            anyhow::bail!(
                "auto_refresh_interval_minutes cannot exceed {} (24 hours)",
                AUTO_REFRESH_MAX_MINUTES
            );
        }

        if self.remote.api_base_url.is_empty() {
            anyhow::bail!("api_base_url cannot be empty");
        }
        if self.remote.http_timeout_seconds < HTTP_TIMEOUT_MIN_SECONDS
            || self.remote.http_timeout_seconds > HTTP_TIMEOUT_MAX_SECONDS
        {
            anyhow::bail!(
                "http_timeout_seconds must be between {} and {}, got {}",
                HTTP_TIMEOUT_MIN_SECONDS,
                HTTP_TIMEOUT_MAX_SECONDS,
                self.remote.http_timeout_seconds
            );
        }

        self.validate_accounts()?;

        Ok(())
    }

    /// Validate account configurations
    fn validate_accounts(&self) -> Result<()> {
        let default_account = &self.accounts.default_account;
        match self.accounts.instances.get(default_account) {
            Some(instance) => {
                if !instance.enabled {
                    anyhow::bail!("default_account '{}' is disabled", default_account);
                }
            }
            None => {
                let mut available: Vec<&str> =
                    self.accounts.instances.keys().map(String::as_str).collect();
                available.sort_unstable();
                anyhow::bail!(
                    "default_account '{}' not found. Available accounts: {}",
                    default_account,
                    if available.is_empty() {
                        "none".to_string()
                    } else {
                        available.join(", ")
                    }
                );
            }
        }

        for (account_id, instance) in &self.accounts.instances {
            if instance.enabled {
                if instance.name.is_empty() {
                    anyhow::bail!("Account '{}': name cannot be empty", account_id);
                }
                if instance.api_token_env.is_empty() {
                    anyhow::bail!("Account '{}': api_token_env cannot be empty", account_id);
                }
            }
        }

        Ok(())
    }

    /// The configured instance for the default account.
    pub fn default_account_instance(&self) -> Option<&AccountInstanceConfig> {
        self.accounts.instances.get(&self.accounts.default_account)
    }
}
