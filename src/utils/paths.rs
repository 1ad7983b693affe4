//! Cross-Platform Path Utilities
//!
//! Functions for resolving the engine's configuration directory.

use std::path::{Path, PathBuf};

use crate::utils::error::{AuditError, AuditResult};

/// Get the EcoAudit config directory (`<config_dir>/ecoaudit/`)
pub fn ecoaudit_dir() -> AuditResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join("ecoaudit"))
        .ok_or_else(|| AuditError::config("Could not determine config directory"))
}

/// Get the config file path (`<config_dir>/ecoaudit/config.json`)
pub fn config_path() -> AuditResult<PathBuf> {
    Ok(ecoaudit_dir()?.join("config.json"))
}

/// Ensure a directory exists, creating it if necessary
pub fn ensure_dir(path: &Path) -> AuditResult<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}
