//! Application configuration.
//!
//! Sources, later ones winning:
//! 1. built-in defaults
//! 2. `config/galley.toml` (optional)
//! 3. `GALLEY__*` environment variables, e.g. `GALLEY__DATABASE__URL`

use std::path::PathBuf;

use ::config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

use crate::policy::InventoryPolicy;

pub const DEFAULT_CONFIG_FILE: &str = "config/galley.toml";
pub const ENV_PREFIX: &str = "GALLEY";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind_addr: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Postgres URL. Without one the in-memory store is used.
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ImagesConfig {
    /// Directory recipe images are written under.
    pub root: PathBuf,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./storage"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Filter used when `RUST_LOG` is not set.
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub log: LogConfig,
    pub database: DatabaseConfig,
    pub images: ImagesConfig,
    pub inventory: InventoryPolicy,
}

impl AppConfig {
    /// Load from `config/galley.toml` and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false))
            .add_source(env_source())
            .build()?
            .try_deserialize()
    }

    /// Load from TOML text alone (no file, no environment).
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX).separator("__").try_parsing(true)
}
