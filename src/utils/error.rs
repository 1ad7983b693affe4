//! Error Handling
//!
//! Unified error types for the audit engine.
//! Uses thiserror for ergonomic error definitions.

use ecoaudit_core::CoreError;
use ecoaudit_llm::LlmError;
use thiserror::Error;

/// Engine-wide error type
#[derive(Error, Debug)]
pub enum AuditError {
    /// Missing or invalid caller input; raised before any network call
    #[error("Input error: {0}")]
    Input(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rate limiting or quota exhaustion at the backend
    #[error("Quota exceeded: {message}")]
    Quota { message: String, retryable: bool },

    /// 5xx or transport-level fault
    #[error("Transient backend failure: {message}")]
    Transient { message: String, retryable: bool },

    /// The final turn did not contain a parseable report
    #[error("Malformed output: {message}")]
    MalformedOutput { message: String, raw: String },

    /// The final turn produced nothing to extract
    #[error("No output produced")]
    NoOutput,

    /// The backend kept requesting tools past the round limit
    #[error("Tool loop exceeded {0} rounds")]
    ToolLoopExceeded(u32),

    /// Daily audit allowance is used up
    #[error("Daily audit limit of {0} reached")]
    DailyLimitReached(u32),

    /// Unclassified backend errors
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// File I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for audit errors
pub type AuditResult<T> = Result<T, AuditError>;

impl AuditError {
    /// Create an input error
    pub fn input(msg: impl Into<String>) -> Self {
        Self::Input(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a malformed-output error carrying the offending text
    pub fn malformed(msg: impl Into<String>, raw: impl Into<String>) -> Self {
        Self::MalformedOutput {
            message: msg.into(),
            raw: raw.into(),
        }
    }

    /// True for rate-limit/quota failures, which call for a "wait and retry" response.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, AuditError::Quota { .. })
    }

    /// Whether the retry policy may attempt the operation again.
    pub fn is_retryable(&self) -> bool {
        match self {
            AuditError::Quota { retryable, .. } | AuditError::Transient { retryable, .. } => {
                *retryable
            }
            AuditError::NoOutput => true,
            _ => false,
        }
    }

    /// Copy of this error with the retryable flag cleared, used once retries are spent.
    pub fn exhausted(self) -> Self {
        match self {
            AuditError::Quota { message, .. } => AuditError::Quota {
                message,
                retryable: false,
            },
            AuditError::Transient { message, .. } => AuditError::Transient {
                message,
                retryable: false,
            },
            other => other,
        }
    }
}

impl From<CoreError> for AuditError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Config(msg) => AuditError::Config(msg),
            CoreError::Io(e) => AuditError::Io(e),
            CoreError::Serialization(e) => AuditError::Serialization(e),
        }
    }
}

/// Convert AuditError to a string for display at the process boundary
impl From<AuditError> for String {
    fn from(err: AuditError) -> String {
        err.to_string()
    }
}
