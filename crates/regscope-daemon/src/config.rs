//! Configuration loading

use anyhow::Result;
use regscope_core::{DEFAULT_STORE_NAME, MAX_GENERATE_COUNT};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Bind address for web server
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Capacity of the change-event channel feeding WebSocket clients
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,
    /// Largest `count` accepted by the definition generator
    #[serde(default = "default_max_generate_count")]
    pub max_generate_count: usize,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            event_capacity: default_event_capacity(),
            max_generate_count: default_max_generate_count(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_event_capacity() -> usize {
    100
}

fn default_max_generate_count() -> usize {
    MAX_GENERATE_COUNT
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Directory holding persisted workspaces
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// Record name of the workspace within the data directory
    #[serde(default = "default_store_name")]
    pub name: String,
    /// Persist after every change (disable for a throwaway session)
    #[serde(default = "default_true")]
    pub autosave: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            name: default_store_name(),
            autosave: true,
        }
    }
}

fn default_data_dir() -> String {
    "./data".to_string()
}

fn default_store_name() -> String {
    DEFAULT_STORE_NAME.to_string()
}

fn default_true() -> bool {
    true
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = load_config(&temp_dir.path().join("regscope.toml")).unwrap();

        assert_eq!(config.daemon.bind, "127.0.0.1:8080");
        assert_eq!(config.store.name, "register-dump-storage");
        assert!(config.store.autosave);
    }

    #[test]
    fn test_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("regscope.toml");
        std::fs::write(
            &path,
            r#"
[store]
data_dir = "/var/lib/regscope"
autosave = false
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config.store.data_dir, "/var/lib/regscope");
        assert_eq!(config.store.name, "register-dump-storage");
        assert!(!config.store.autosave);
        assert_eq!(config.daemon.event_capacity, 100);
        assert_eq!(config.daemon.max_generate_count, 65_536);
    }

    #[test]
    fn test_invalid_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("regscope.toml");
        std::fs::write(&path, "[store\nname = ").unwrap();

        assert!(load_config(&path).is_err());
    }
}
