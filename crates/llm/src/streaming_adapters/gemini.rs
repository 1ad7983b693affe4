//! Gemini Adapter
//!
//! Handles the SSE format of `streamGenerateContent?alt=sse`. Each `data:` line
//! carries a complete `GenerateContentResponse` chunk whose parts are text
//! deltas or whole function calls.

use ecoaudit_core::streaming::{AdapterError, StreamAdapter, UnifiedStreamEvent};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Part {
    #[serde(default)]
    text: Option<String>,
    /// Thought summaries are not narration
    #[serde(default)]
    thought: bool,
    #[serde(default)]
    function_call: Option<FunctionCall>,
}

#[derive(Debug, Deserialize)]
struct FunctionCall {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    args: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: u32,
    #[serde(default)]
    candidates_token_count: u32,
    #[serde(default)]
    thoughts_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Adapter for Gemini SSE format
pub struct GeminiAdapter {
    /// Calls seen in this stream, used to mint ids Gemini leaves out
    call_count: usize,
}

impl GeminiAdapter {
    pub fn new() -> Self {
        Self { call_count: 0 }
    }
}

impl Default for GeminiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamAdapter for GeminiAdapter {
    fn provider_name(&self) -> &'static str {
        "gemini"
    }

    fn adapt(&mut self, input: &str) -> Result<Vec<UnifiedStreamEvent>, AdapterError> {
        let trimmed = input.trim();

        let json_str = if let Some(rest) = trimmed.strip_prefix("data:") {
            rest.trim_start()
        } else if trimmed.starts_with('{') {
            trimmed
        } else {
            // event:, id:, retry:, comments, blank lines
            return Ok(vec![]);
        };

        if json_str.is_empty() || json_str == "[DONE]" {
            return Ok(vec![]);
        }

        let chunk: GeminiChunk =
            serde_json::from_str(json_str).map_err(|e| AdapterError::ParseError(e.to_string()))?;

        if let Some(error) = chunk.error {
            let message = match error.status {
                Some(status) => format!("{} ({})", error.message, status),
                None => error.message,
            };
            return Ok(vec![UnifiedStreamEvent::Error {
                message,
                code: error.code.map(|c| c.to_string()),
            }]);
        }

        let mut events = Vec::new();
        let mut stop_reason = None;

        for candidate in chunk.candidates.into_iter().take(1) {
            if let Some(content) = candidate.content {
                for part in content.parts {
                    if let Some(text) = part.text {
                        if !part.thought {
                            events.push(UnifiedStreamEvent::TextDelta { content: text });
                        }
                    }
                    if let Some(call) = part.function_call {
                        let tool_id = call
                            .id
                            .unwrap_or_else(|| format!("call_{}", self.call_count));
                        self.call_count += 1;
                        events.push(UnifiedStreamEvent::ToolComplete {
                            tool_id,
                            tool_name: call.name,
                            arguments: call.args.to_string(),
                        });
                    }
                }
            }
            stop_reason = candidate.finish_reason;
        }

        if let Some(usage) = chunk.usage_metadata {
            events.push(UnifiedStreamEvent::Usage {
                input_tokens: usage.prompt_token_count,
                output_tokens: usage.candidates_token_count,
                thinking_tokens: usage.thoughts_token_count,
            });
        }

        if stop_reason.is_some() {
            events.push(UnifiedStreamEvent::Complete { stop_reason });
        }

        Ok(events)
    }

    fn reset(&mut self) {
        self.call_count = 0;
    }
}
