//! CLI configuration management.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Default worker count for local runs.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Default step timeout in seconds, if any.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
    /// Grace period before a cancelled step is killed.
    #[serde(default = "default_grace")]
    pub grace_seconds: u64,
}

fn default_workers() -> usize {
    2
}

fn default_grace() -> u64 {
    2
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            timeout_seconds: None,
            grace_seconds: default_grace(),
        }
    }
}

impl CliConfig {
    /// Load configuration from file.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let path = Self::config_path()?;
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            Ok(serde_yaml::from_str(&content)?)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to file.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_yaml::to_string(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the configuration file path.
    pub fn config_path() -> Result<PathBuf, Box<dyn std::error::Error>> {
        let dirs = directories::ProjectDirs::from("dev", "cinder", "cinder-cli")
            .ok_or("Could not determine config directory")?;
        Ok(dirs.config_dir().join("config.yaml"))
    }

    /// Set a configuration value.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), String> {
        match key {
            "workers" => {
                self.workers = value
                    .parse()
                    .map_err(|_| format!("Invalid worker count: {}", value))?;
            }
            "timeout_seconds" => {
                self.timeout_seconds = Some(
                    value
                        .parse()
                        .map_err(|_| format!("Invalid timeout: {}", value))?,
                );
            }
            "grace_seconds" => {
                self.grace_seconds = value
                    .parse()
                    .map_err(|_| format!("Invalid grace period: {}", value))?;
            }
            _ => return Err(format!("Unknown config key: {}", key)),
        }
        Ok(())
    }
}
