//! Scripted Provider
//!
//! An `LlmProvider` that replays canned turns instead of calling a backend.
//! Each call to `stream_message` pops the next turn: either a sequence of
//! stream events delivered in order, or an error returned before any event.
//! Every request is recorded so callers can inspect what was sent.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::provider::{parse_http_error, LlmProvider};
use crate::types::{
    LlmError, LlmRequestOptions, LlmResponse, LlmResult, Message, ProviderConfig, StopReason,
    ToolCall, ToolDefinition, UsageStats,
};
use ecoaudit_core::streaming::UnifiedStreamEvent;

/// One canned response.
#[derive(Debug, Clone)]
pub enum ScriptedTurn {
    /// Replay these events, then finish
    Events(Vec<UnifiedStreamEvent>),
    /// Fail the request
    Fail(LlmError),
}

impl ScriptedTurn {
    /// A turn made only of text fragments.
    pub fn text<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScriptedTurn::Events(
            fragments
                .into_iter()
                .map(|f| UnifiedStreamEvent::TextDelta { content: f.into() })
                .collect(),
        )
    }

    /// Append a tool call to an event turn.
    pub fn with_tool_call(
        self,
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        match self {
            ScriptedTurn::Events(mut events) => {
                events.push(UnifiedStreamEvent::ToolComplete {
                    tool_id: id.into(),
                    tool_name: name.into(),
                    arguments: arguments.to_string(),
                });
                ScriptedTurn::Events(events)
            }
            fail => fail,
        }
    }
}

/// A request as received by the scripted provider.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub messages: Vec<Message>,
    pub system: Option<String>,
    pub tools: Vec<ToolDefinition>,
    pub options: LlmRequestOptions,
}

/// Provider that replays a fixed script.
pub struct ScriptedProvider {
    config: ProviderConfig,
    turns: Mutex<VecDeque<ScriptedTurn>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedProvider {
    pub fn new(turns: Vec<ScriptedTurn>) -> Self {
        Self {
            config: ProviderConfig {
                model: "scripted".to_string(),
                ..ProviderConfig::default()
            },
            turns: Mutex::new(turns.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Number of `stream_message` calls so far.
    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    /// Turns not yet replayed.
    pub fn remaining(&self) -> usize {
        self.turns.lock().map(|t| t.len()).unwrap_or(0)
    }

    fn next_turn(&self) -> LlmResult<ScriptedTurn> {
        let mut turns = self.turns.lock().map_err(|_| LlmError::Other {
            message: "scripted provider lock poisoned".to_string(),
        })?;
        turns.pop_front().ok_or_else(|| LlmError::Other {
            message: "scripted provider has no turns left".to_string(),
        })
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
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
        let model = request_options
            .model_override
            .clone()
            .unwrap_or_else(|| self.config.model.clone());

        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                messages,
                system,
                tools,
                options: request_options,
            });
        }

        let events = match self.next_turn()? {
            ScriptedTurn::Events(events) => events,
            ScriptedTurn::Fail(err) => return Err(err),
        };

        let mut content = String::new();
        let mut tool_calls = Vec::new();
        let mut usage = UsageStats::default();

        for event in events {
            match event {
                UnifiedStreamEvent::TextDelta { content: delta } => {
                    content.push_str(&delta);
                    let _ = tx.send(UnifiedStreamEvent::TextDelta { content: delta }).await;
                }
                UnifiedStreamEvent::ToolComplete {
                    tool_id,
                    tool_name,
                    arguments,
                } => {
                    let arguments =
                        serde_json::from_str(&arguments).unwrap_or(serde_json::Value::Null);
                    tool_calls.push(ToolCall {
                        id: tool_id,
                        name: tool_name,
                        arguments,
                    });
                }
                UnifiedStreamEvent::Usage {
                    input_tokens,
                    output_tokens,
                    thinking_tokens,
                } => {
                    usage = UsageStats {
                        input_tokens,
                        output_tokens,
                        thinking_tokens,
                    };
                }
                UnifiedStreamEvent::Error { message, code } => {
                    return Err(match code.and_then(|c| c.parse::<u16>().ok()) {
                        Some(status) => parse_http_error(status, &message, "scripted"),
                        None => LlmError::Other { message },
                    });
                }
                _ => {}
            }
            // Let the consumer run between fragments as a real stream would
            tokio::task::yield_now().await;
        }

        let stop_reason = if tool_calls.is_empty() {
            StopReason::EndTurn
        } else {
            StopReason::ToolUse
        };

        Ok(LlmResponse {
            content: if content.is_empty() {
                None
            } else {
                Some(content)
            },
            tool_calls,
            stop_reason,
            usage,
            model,
        })
    }
}
