//! JSON Configuration Management
//!
//! Handles reading and writing the engine configuration file.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use ecoaudit_core::CoreResult;

use crate::models::settings::AuditConfig;
use crate::utils::error::AuditResult;
use crate::utils::paths::{config_path, ensure_dir};

/// Configuration service for managing engine settings
#[derive(Debug)]
pub struct ConfigService {
    config_path: PathBuf,
    config: AuditConfig,
}

impl ConfigService {
    /// Load the config at the default location, creating defaults if missing
    pub fn new() -> AuditResult<Self> {
        Self::open(config_path()?)
    }

    /// Load the config at `path`, creating defaults if missing
    pub fn open(path: impl Into<PathBuf>) -> AuditResult<Self> {
        let config_path = path.into();
        if let Some(parent) = config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir(parent)?;
        }

        let config = if config_path.exists() {
            debug!(path = %config_path.display(), "Loading config");
            Self::load_from_file(&config_path)?
        } else {
            info!(path = %config_path.display(), "Writing default config");
            let default_config = AuditConfig::default();
            Self::save_to_file(&config_path, &default_config)?;
            default_config
        };

        Ok(Self {
            config_path,
            config,
        })
    }

    /// Load configuration from a file
    fn load_from_file(path: &Path) -> CoreResult<AuditConfig> {
        let content = fs::read_to_string(path)?;
        let config: AuditConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a file with pretty formatting
    fn save_to_file(path: &Path, config: &AuditConfig) -> CoreResult<()> {
        config.validate()?;
        let content = serde_json::to_string_pretty(config)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Get the current configuration
    pub fn get_config(&self) -> &AuditConfig {
        &self.config
    }

    /// Get a clone of the current configuration with environment overrides applied.
    ///
    /// Overrides are never written back to disk, so credentials from the
    /// environment stay out of the config file.
    pub fn effective_config(&self) -> AuditConfig {
        let mut config = self.config.clone();
        config.apply_env();
        config
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Save the current configuration to disk
    pub fn save(&self) -> AuditResult<()> {
        Self::save_to_file(&self.config_path, &self.config)?;
        Ok(())
    }

    /// Reload configuration from disk
    pub fn reload(&mut self) -> AuditResult<()> {
        self.config = Self::load_from_file(&self.config_path)?;
        Ok(())
    }

    /// Reset configuration to defaults
    pub fn reset(&mut self) -> AuditResult<()> {
        self.config = AuditConfig::default();
        self.save()?;
        Ok(())
    }
}
