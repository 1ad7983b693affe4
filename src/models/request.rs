//! Audit Request Model
//!
//! Caller input for one audit: the source under audit, an optional
//! attachment, the hardware target, and the framing scope.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};

use crate::utils::error::{AuditError, AuditResult};

/// Category of the deployment target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HardwareKind {
    #[default]
    Gpu,
    Cpu,
    Tpu,
    Edge,
}

impl fmt::Display for HardwareKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HardwareKind::Gpu => write!(f, "gpu"),
            HardwareKind::Cpu => write!(f, "cpu"),
            HardwareKind::Tpu => write!(f, "tpu"),
            HardwareKind::Edge => write!(f, "edge"),
        }
    }
}

impl FromStr for HardwareKind {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gpu" => Ok(HardwareKind::Gpu),
            "cpu" => Ok(HardwareKind::Cpu),
            "tpu" => Ok(HardwareKind::Tpu),
            "edge" => Ok(HardwareKind::Edge),
            other => Err(AuditError::input(format!("Unknown hardware kind: {}", other))),
        }
    }
}

/// Deployment target, passed through to the backend unmodified
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HardwareTarget {
    pub name: String,
    pub kind: HardwareKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Grid intensity hint in gCO2/kWh
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f64>,
}

/// How the source should be framed to the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AuditScope {
    #[default]
    Snippet,
    Module,
}

impl FromStr for AuditScope {
    type Err = AuditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "snippet" => Ok(AuditScope::Snippet),
            "module" => Ok(AuditScope::Module),
            other => Err(AuditError::input(format!("Unknown scope: {}", other))),
        }
    }
}

/// Opaque binary attachment, already base64 encoded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub media_type: String,
    pub data_base64: String,
}

impl Attachment {
    /// Encode raw bytes
    pub fn from_bytes(media_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            media_type: media_type.into(),
            data_base64: BASE64.encode(bytes),
        }
    }

    /// Read and encode a file, guessing the media type from its extension
    pub fn from_path(path: &Path) -> AuditResult<Self> {
        let bytes = std::fs::read(path)?;
        Ok(Self::from_bytes(media_type_for(path), &bytes))
    }
}

fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "pdf" => "application/pdf",
        "txt" | "log" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

/// One audit request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRequest {
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attachment: Option<Attachment>,
    pub hardware: HardwareTarget,
    #[serde(default)]
    pub scope: AuditScope,
}

impl AuditRequest {
    pub fn new(source: impl Into<String>, hardware: HardwareTarget) -> Self {
        Self {
            source: source.into(),
            attachment: None,
            hardware,
            scope: AuditScope::default(),
        }
    }

    /// Fail fast on input that cannot produce a meaningful audit
    pub fn validate(&self) -> AuditResult<()> {
        if self.hardware.name.trim().is_empty() {
            return Err(AuditError::input("hardware target name is required"));
        }
        if self.source.trim().is_empty() && self.attachment.is_none() {
            return Err(AuditError::input("source text or an attachment is required"));
        }
        if let Some(intensity) = self.hardware.intensity {
            if !intensity.is_finite() || intensity < 0.0 {
                return Err(AuditError::input(format!(
                    "carbon intensity must be a non-negative number, got {}",
                    intensity
                )));
            }
        }
        Ok(())
    }
}
