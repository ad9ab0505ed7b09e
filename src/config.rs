//! Configuration loading and management

use std::path::PathBuf;

use anyhow::{Context, Result};

/// Environment variable overriding the data directory
const DATA_DIR_ENV: &str = "LAYOUT_SWITCHER_DATA_DIR";

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for the control surface
    pub socket_path: PathBuf,

    /// Path to the persisted user settings
    pub settings_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let data_dir = match std::env::var_os(DATA_DIR_ENV) {
            Some(dir) => PathBuf::from(dir),
            None => {
                let home = std::env::var("HOME").context("HOME is not set")?;
                PathBuf::from(home)
                    .join(".local")
                    .join("share")
                    .join("layout-switcher")
            }
        };

        Ok(Self::with_data_dir(data_dir))
    }

    /// Configuration rooted at `data_dir`
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            socket_path: data_dir.join("daemon.sock"),
            settings_path: data_dir.join("settings.json"),
            data_dir,
        }
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        Ok(())
    }
}
