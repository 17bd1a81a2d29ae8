//! Application configuration management
//!
//! Settings live in the platform config directory and are created on first
//! run. An unreadable file is backed up and replaced with defaults instead
//! of failing startup.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{info, warn};

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Archive tool settings
    pub archiver: ArchiverConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Settings for the external 7-Zip binary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiverConfig {
    /// Binary invoked for extraction jobs, resolved against `PATH` unless
    /// an absolute path is given
    pub binary: String,
}

impl Default for ArchiverConfig {
    fn default() -> Self {
        Self {
            binary: default_binary().to_owned(),
        }
    }
}

#[cfg(windows)]
fn default_binary() -> &'static str {
    "7z.exe"
}

#[cfg(not(windows))]
fn default_binary() -> &'static str {
    "7z"
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,
    /// Enable console output
    pub console_output: bool,
    /// Enable file output
    pub file_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            console_output: true,
            file_output: true,
        }
    }
}

/// Loads and persists [`AppConfig`]
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join("unpakr");
        Ok(config_dir)
    }

    /// Create a new configuration manager
    pub fn new() -> Result<Self> {
        let config_path = Self::get_config_dir()?.join("unpakr_config.json");
        Ok(Self { config_path })
    }

    /// Initialize configuration on first run, or load the existing file
    pub async fn initialize_on_first_run(&self) -> Result<AppConfig> {
        let config_dir = self
            .config_path
            .parent()
            .context("Config path has no parent directory")?;

        if !config_dir.exists() {
            fs::create_dir_all(config_dir)
                .await
                .context("Failed to create config directory")?;
            info!("Created configuration directory: {:?}", config_dir);
        }

        if !self.config_path.exists() {
            info!("First run detected - initializing default configuration");
            let default_config = AppConfig::default();
            self.save_config(&default_config).await?;
            return Ok(default_config);
        }

        self.load_config().await
    }

    /// Load configuration from file, creating defaults if it doesn't exist
    pub async fn load_config(&self) -> Result<AppConfig> {
        if !self.config_path.exists() {
            info!(
                "Configuration file not found, creating default: {:?}",
                self.config_path
            );
            let default_config = AppConfig::default();
            self.save_config(&default_config).await?;
            return Ok(default_config);
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .context("Failed to read configuration file")?;

        match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => Ok(config),
            Err(parse_error) => {
                warn!(
                    "Configuration file unreadable ({}), resetting to defaults",
                    parse_error
                );
                let backup_path = self.config_path.with_extension("json.corrupted");
                if let Err(e) = fs::copy(&self.config_path, &backup_path).await {
                    warn!("Failed to back up corrupted config: {}", e);
                } else {
                    info!("Backed up corrupted config to: {:?}", backup_path);
                }
                let default_config = AppConfig::default();
                self.save_config(&default_config)
                    .await
                    .context("Failed to save default configuration")?;
                Ok(default_config)
            }
        }
    }

    /// Save configuration to file
    pub async fn save_config(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }
        let content =
            serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;
        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;
        info!("Saved configuration to: {:?}", self.config_path);
        Ok(())
    }
}
