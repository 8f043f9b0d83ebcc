//! TOML-based configuration persistence for the bridge.
//!
//! The default config file lives in the platform config directory:
//! - Windows:  `%APPDATA%\EidBridge\config.toml`
//! - Linux:    `~/.config/eid-bridge/config.toml`
//! - macOS:    `~/Library/Application Support/EidBridge/config.toml`
//!
//! A complete file looks like this; every key is optional:
//!
//! ```toml
//! [sdk]
//! peer_url = "ws://127.0.0.1:24727/eID-Kernel"
//! api_level = 2
//!
//! [auth]
//! tc_token_url = "https://service.example/tcToken"
//! await_timeout_secs = 120
//! cancel_on_timeout = true
//! auto_accept_access_rights = true
//!
//! [logging]
//! log_level = "info"
//! ```
//!
//! Missing keys fall back to the values of [`BridgeConfig::default`], so an
//! older file keeps working when new settings are added.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::config::{BridgeConfig, DEFAULT_PEER_URL, DEFAULT_TC_TOKEN_URL};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub sdk: SdkConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where and how to reach the eID SDK.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SdkConfig {
    /// WebSocket URL of the eID-Kernel endpoint.
    #[serde(default = "default_peer_url")]
    pub peer_url: String,
    /// API level announced at startup; omitted to keep the SDK default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_level: Option<u32>,
}

/// Authentication workflow settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthConfig {
    /// TC token URL of the service provider.
    #[serde(default = "default_tc_token_url")]
    pub tc_token_url: String,
    /// Seconds to wait for the next SDK message during a workflow; 0 waits
    /// indefinitely.
    #[serde(default = "default_await_timeout_secs")]
    pub await_timeout_secs: u64,
    #[serde(default = "default_true")]
    pub cancel_on_timeout: bool,
    #[serde(default = "default_true")]
    pub auto_accept_access_rights: bool,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_peer_url() -> String {
    DEFAULT_PEER_URL.to_string()
}
fn default_tc_token_url() -> String {
    DEFAULT_TC_TOKEN_URL.to_string()
}
fn default_await_timeout_secs() -> u64 {
    120
}
fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            peer_url: default_peer_url(),
            api_level: None,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            tc_token_url: default_tc_token_url(),
            await_timeout_secs: default_await_timeout_secs(),
            cancel_on_timeout: default_true(),
            auto_accept_access_rights: default_true(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl AppConfig {
    /// Converts the on-disk schema into the runtime configuration.
    pub fn into_bridge_config(self) -> BridgeConfig {
        BridgeConfig {
            peer_url: self.sdk.peer_url,
            tc_token_url: self.auth.tc_token_url,
            await_timeout: Duration::from_secs(self.auth.await_timeout_secs),
            cancel_on_timeout: self.auth.cancel_on_timeout,
            auto_accept_access_rights: self.auth.auto_accept_access_rights,
            api_level: self.sdk.api_level,
        }
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the full path of the default config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined from the environment.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("config.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("EidBridge"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("eid-bridge"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME")
            .map(|h| PathBuf::from(h).join("Library").join("Application Support").join("EidBridge"))
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
