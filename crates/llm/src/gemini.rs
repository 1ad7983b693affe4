//! Gemini Provider
//!
//! Implementation of the LlmProvider trait for the Gemini
//! `streamGenerateContent` API with function calling.

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::http_client::build_http_client;
use crate::provider::{missing_api_key_error, parse_http_error, LlmProvider};
use crate::streaming_adapters::{GeminiAdapter, LineBuffer};
use crate::types::{
    LlmError, LlmRequestOptions, LlmResponse, LlmResult, Message, MessageContent, MessageRole,
    ProviderConfig, StopReason, ToolCall, ToolCallMode, ToolDefinition, UsageStats,
};
use ecoaudit_core::streaming::{StreamAdapter, UnifiedStreamEvent};

/// Default Gemini API endpoint
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini provider
pub struct GeminiProvider {
    config: ProviderConfig,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Create a new Gemini provider with the given configuration
    pub fn new(config: ProviderConfig) -> LlmResult<Self> {
        let client = build_http_client(config.proxy.as_deref())?;
        Ok(Self { config, client })
    }

    /// Streaming endpoint for a model
    fn stream_url(&self, model: &str) -> String {
        let base = self
            .config
            .base_url
            .as_deref()
            .unwrap_or(GEMINI_API_BASE)
            .trim_end_matches('/');
        format!("{}/models/{}:streamGenerateContent?alt=sse", base, model)
    }

    /// Build the request body for the API
    fn build_request_body(
        &self,
        messages: &[Message],
        system: Option<&str>,
        tools: &[ToolDefinition],
        request_options: &LlmRequestOptions,
    ) -> serde_json::Value {
        let contents: Vec<serde_json::Value> =
            messages.iter().map(|m| self.message_to_gemini(m)).collect();

        let mut generation_config = serde_json::json!({
            "maxOutputTokens": self.config.max_tokens,
            "temperature": request_options
                .temperature_override
                .unwrap_or(self.config.temperature),
        });
        if let Some(budget) = request_options.thinking_budget {
            generation_config["thinkingConfig"] = serde_json::json!({
                "thinkingBudget": budget,
                "includeThoughts": false,
            });
        }

        let mut body = serde_json::json!({
            "contents": contents,
            "generationConfig": generation_config,
        });

        if let Some(sys) = system {
            body["systemInstruction"] = serde_json::json!({
                "parts": [{ "text": sys }]
            });
        }

        let mut gemini_tools = Vec::new();
        if !tools.is_empty() && request_options.tool_call_mode != ToolCallMode::None {
            let declarations: Vec<serde_json::Value> = tools
                .iter()
                .map(|t| {
                    serde_json::json!({
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.input_schema,
                    })
                })
                .collect();
            gemini_tools.push(serde_json::json!({ "functionDeclarations": declarations }));

            let mode = match request_options.tool_call_mode {
                ToolCallMode::Required => "ANY",
                _ => "AUTO",
            };
            body["toolConfig"] = serde_json::json!({
                "functionCallingConfig": { "mode": mode }
            });
        }
        if request_options.enable_web_search {
            gemini_tools.push(serde_json::json!({ "googleSearch": {} }));
        }
        if request_options.enable_code_execution {
            gemini_tools.push(serde_json::json!({ "codeExecution": {} }));
        }
        if !gemini_tools.is_empty() {
            body["tools"] = serde_json::json!(gemini_tools);
        }

        body
    }

    /// Convert a message to Gemini `contents` format
    fn message_to_gemini(&self, message: &Message) -> serde_json::Value {
        let role = match message.role {
            MessageRole::User => "user",
            MessageRole::Assistant => "model",
        };

        let parts: Vec<serde_json::Value> = message
            .content
            .iter()
            .map(|c| match c {
                MessageContent::Text { text } => serde_json::json!({ "text": text }),
                MessageContent::Attachment { media_type, data } => serde_json::json!({
                    "inlineData": { "mimeType": media_type, "data": data }
                }),
                MessageContent::ToolUse { name, input, .. } => serde_json::json!({
                    "functionCall": { "name": name, "args": input }
                }),
                MessageContent::ToolResult {
                    tool_use_id,
                    name,
                    content,
                    is_error,
                } => {
                    let mut response = serde_json::json!({
                        "id": tool_use_id,
                        "result": content,
                    });
                    if let Some(true) = is_error {
                        response["error"] = serde_json::json!(true);
                    }
                    serde_json::json!({
                        "functionResponse": { "name": name, "response": response }
                    })
                }
            })
            .collect();

        serde_json::json!({ "role": role, "parts": parts })
    }
}

/// Turn an in-stream error event into a transport error.
fn stream_error(message: String, code: Option<String>) -> LlmError {
    match code.and_then(|c| c.parse::<u16>().ok()) {
        Some(status) => parse_http_error(status, &message, "gemini"),
        None => LlmError::Other { message },
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn config(&self) -> &ProviderConfig {
        &self.config
    }

    async fn stream_message(
        &self,
        messages: Vec<Message>,
        system: Option<String>,
        tools: Vec<ToolDefinition>,
        tx: mpsc::Sender<UnifiedStreamEvent>,
        request_options: LlmRequestOptions,
    ) -> LlmResult<LlmResponse> {
        let api_key = self
            .config
            .api_key
            .as_ref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| missing_api_key_error("gemini"))?;

        let model = request_options
            .model_override
            .clone()
            .unwrap_or_else(|| self.config.model.clone());
        let body =
            self.build_request_body(&messages, system.as_deref(), &tools, &request_options);

        debug!(model = %model, messages = messages.len(), "Opening Gemini stream");

        let response = self
            .client
            .post(self.stream_url(&model))
            .header("x-goog-api-key", api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let body_text = response.text().await.map_err(|e| LlmError::NetworkError {
                message: e.to_string(),
            })?;
            return Err(parse_http_error(status, &body_text, "gemini"));
        }

        // Process SSE stream
        let mut adapter = GeminiAdapter::new();
        let mut accumulated_content = String::new();
        let mut tool_calls = Vec::new();
        let mut usage = UsageStats::default();
        let mut stop_reason = StopReason::EndTurn;

        let mut stream = response.bytes_stream();
        let mut buffer = LineBuffer::new();
        let mut finished = false;

        while !finished {
            let line = match buffer.next_line() {
                Some(line) => line,
                None => match stream.next().await {
                    Some(chunk) => {
                        let chunk = chunk.map_err(|e| LlmError::NetworkError {
                            message: e.to_string(),
                        })?;
                        buffer.push(&chunk);
                        continue;
                    }
                    None => {
                        finished = true;
                        buffer.take_rest()
                    }
                },
            };

            if line.trim().is_empty() {
                continue;
            }

            let events = match adapter.adapt(&line) {
                Ok(events) => events,
                Err(e) => {
                    warn!(error = %e, "Skipping unparseable Gemini stream line");
                    continue;
                }
            };

            for event in events {
                match event {
                    UnifiedStreamEvent::TextDelta { content } => {
                        accumulated_content.push_str(&content);
                        let _ = tx.send(UnifiedStreamEvent::TextDelta { content }).await;
                    }
                    UnifiedStreamEvent::ToolComplete {
                        tool_id,
                        tool_name,
                        arguments,
                    } => match serde_json::from_str(&arguments) {
                        Ok(input) => tool_calls.push(ToolCall {
                            id: tool_id,
                            name: tool_name,
                            arguments: input,
                        }),
                        Err(e) => {
                            warn!(tool = %tool_name, error = %e, "Dropping tool call with invalid arguments")
                        }
                    },
                    UnifiedStreamEvent::Usage {
                        input_tokens,
                        output_tokens,
                        thinking_tokens,
                    } => {
                        // Gemini reports cumulative usage on every chunk
                        usage.input_tokens = input_tokens;
                        usage.output_tokens = output_tokens;
                        usage.thinking_tokens = thinking_tokens;
                    }
                    UnifiedStreamEvent::Complete {
                        stop_reason: Some(reason),
                    } => {
                        stop_reason = StopReason::from(reason.as_str());
                    }
                    UnifiedStreamEvent::Error { message, code } => {
                        return Err(stream_error(message, code));
                    }
                    _ => {}
                }
            }
        }

        if !tool_calls.is_empty() {
            stop_reason = StopReason::ToolUse;
        }

        Ok(LlmResponse {
            content: if accumulated_content.is_empty() {
                None
            } else {
                Some(accumulated_content)
            },
            tool_calls,
            stop_reason,
            usage,
            model,
        })
    }
}
