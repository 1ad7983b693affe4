//! Tool Executor Core Types
//!
//! Result type shared by the local tools.

use serde::{Deserialize, Serialize};

/// Result of a tool execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the execution was successful
    pub success: bool,
    /// Structured output from the tool (if successful)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<serde_json::Value>,
    /// Error message (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResult {
    /// Create a successful result
    pub fn ok(output: serde_json::Value) -> Self {
        Self {
            success: true,
            output: Some(output),
            error: None,
        }
    }

    /// Create an error result
    pub fn err(error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: None,
            error: Some(error.into()),
        }
    }

    /// Convert to the payload sent back to the model
    pub fn to_content(&self) -> serde_json::Value {
        if self.success {
            self.output.clone().unwrap_or(serde_json::Value::Null)
        } else {
            serde_json::json!({
                "error": self.error.as_deref().unwrap_or("Unknown error")
            })
        }
    }
}
