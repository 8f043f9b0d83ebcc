//! Persistent storage.

pub mod config;

pub use config::{default_config_path, load_config, save_config, AppConfig, ConfigError};
