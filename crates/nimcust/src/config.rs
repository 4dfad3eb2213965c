//! Configuration loading and types

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

const CONFIG_ENV: &str = "NIMCUST_CONFIG";
const CONFIG_FILE: &str = "nimcust.toml";

/// Top-level configuration from `nimcust.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub nim: NimConfig,
    #[serde(default)]
    pub inventory: InventoryConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// How to invoke nim on the master
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NimConfig {
    /// nim program name or path
    #[serde(default = "default_nim_command")]
    pub command: String,
}

impl Default for NimConfig {
    fn default() -> Self {
        Self {
            command: default_nim_command(),
        }
    }
}

/// Where the inventory snapshot comes from
///
/// `command` wins over `path` when both are set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryConfig {
    /// JSON snapshot file
    #[serde(default = "default_inventory_path")]
    pub path: PathBuf,
    /// argv of a command printing the snapshot on stdout
    #[serde(default)]
    pub command: Option<Vec<String>>,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            path: default_inventory_path(),
            command: None,
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Layout of log lines
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

fn default_nim_command() -> String {
    nimcust_nim::cust::DEFAULT_NIM_COMMAND.to_string()
}

fn default_inventory_path() -> PathBuf {
    PathBuf::from("/var/lib/nimcust/inventory.json")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| eyre::eyre!("cannot read {}: {e}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| eyre::eyre!("invalid config {}: {e}", path.display()))?;
        Ok(config)
    }

    /// Load from an explicit path, the environment, or the default paths
    ///
    /// Falls back to built-in defaults when no file exists. The returned
    /// path is the file that was used, if any.
    ///
    /// # Errors
    /// Returns error if the chosen file cannot be read or parsed
    pub fn load_default(explicit: Option<&Path>) -> eyre::Result<(Self, Option<PathBuf>)> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }

        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            return Ok((Self::load(&path)?, Some(path)));
        }

        for path in Self::search_paths() {
            if path.exists() {
                return Ok((Self::load(&path)?, Some(path)));
            }
        }

        Ok((Config::default(), None))
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![
            PathBuf::from(CONFIG_FILE),
            PathBuf::from("/etc/nimcust").join(CONFIG_FILE),
        ];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("nimcust").join(CONFIG_FILE));
        }
        paths
    }
}
