//! LLM Provider Trait
//!
//! Defines the interface the audit session uses to reach the reasoning backend.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::{
    LlmError, LlmRequestOptions, LlmResponse, LlmResult, Message, ProviderConfig, ToolDefinition,
};
use ecoaudit_core::streaming::UnifiedStreamEvent;

/// Trait that all LLM providers must implement.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Returns the provider name for identification.
    fn name(&self) -> &'static str;

    /// Returns the default model being used.
    fn model(&self) -> &str;

    /// Get the configuration for this provider.
    fn config(&self) -> &ProviderConfig;

    /// Stream a message response via a channel.
    ///
    /// Text fragments are forwarded on `tx` as `TextDelta` events while the
    /// response is still arriving. Tool calls are collected and returned in
    /// the final `LlmResponse` rather than forwarded.
    ///
    /// # Arguments
    /// * `messages` - Conversation history
    /// * `system` - Optional system prompt
    /// * `tools` - Local tools the model may call
    /// * `tx` - Channel sender for streaming events
    ///
    /// # Returns
    /// Final complete response after streaming
    async fn stream_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        tools: Vec<ToolDefinition>,
        tx: mpsc::Sender<UnifiedStreamEvent>,
        request_options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse>;
}

/// Helper function to create an error for missing API key
pub fn missing_api_key_error(provider: &str) -> LlmError {
    LlmError::AuthenticationFailed {
        message: format!("API key not configured for {}", provider),
    }
}

/// Helper function to parse HTTP error status codes
pub fn parse_http_error(status: u16, body: &str, provider: &str) -> LlmError {
    match status {
        401 => LlmError::AuthenticationFailed {
            message: format!("{}: Invalid API key", provider),
        },
        403 => LlmError::AuthenticationFailed {
            message: format!("{}: Access denied", provider),
        },
        404 => LlmError::ModelNotFound {
            model: body.to_string(),
        },
        429 => LlmError::RateLimited {
            message: body.to_string(),
            retry_after: None,
        },
        400 => LlmError::InvalidRequest {
            message: body.to_string(),
        },
        500..=599 => LlmError::ServerError {
            message: body.to_string(),
            status: Some(status),
        },
        _ => LlmError::Other {
            message: format!("HTTP {}: {}", status, body),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_api_key_error() {
        let err = missing_api_key_error("gemini");
        match err {
            LlmError::AuthenticationFailed { message } => {
                assert!(message.contains("gemini"));
            }
            _ => panic!("Expected AuthenticationFailed"),
        }
    }

    #[test]
    fn test_parse_http_error() {
        let err = parse_http_error(401, "unauthorized", "gemini");
        assert!(matches!(err, LlmError::AuthenticationFailed { .. }));

        let err = parse_http_error(429, "RESOURCE_EXHAUSTED", "gemini");
        assert!(matches!(err, LlmError::RateLimited { .. }));

        let err = parse_http_error(503, "overloaded", "gemini");
        assert_eq!(err.status_code(), Some(503));

        let err = parse_http_error(418, "teapot", "gemini");
        assert!(matches!(err, LlmError::Other { .. }));
    }
}
