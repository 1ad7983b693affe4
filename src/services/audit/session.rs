//! Audit Session
//!
//! One run of the state machine
//! `Preamble -> Streaming -> (ToolExecuting -> Streaming)* -> Extracting -> Done | Failed`.
//!
//! Each turn streams from the provider while a consumer filters phase
//! markers out of the text and forwards narration to the observer. A turn
//! that asks for recognized tools runs them locally and feeds the results
//! back as the next turn; the first turn without tool calls is final and its
//! buffer is parsed into the report.

use std::sync::Arc;

use ecoaudit_core::streaming::UnifiedStreamEvent;
use ecoaudit_llm::{
    LlmProvider, LlmRequestOptions, LlmResponse, Message, MessageContent, MessageRole,
    ToolDefinition,
};
use ecoaudit_scanner::ScanFinding;
use ecoaudit_tools::{execute_tool_call, tool_definitions, ToolCallRequest, ToolCallResult};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::models::report::AuditReport;
use crate::models::request::AuditRequest;
use crate::models::settings::AuditConfig;
use crate::services::routing::RoutingDecision;
use crate::utils::error::{AuditError, AuditResult};

use super::extraction::extract_report;
use super::markers::{FilterEvent, MarkerFilter};
use super::observer::{SessionObserver, SessionState};
use super::preamble::build_preamble;

const STREAM_CHANNEL_CAPACITY: usize = 64;

/// Text and tool calls produced by one streamed turn.
struct TurnOutput {
    /// Narration with markers removed
    text: String,
    response: LlmResponse,
}

/// A single audit session. Not reusable: a retry starts a new one.
pub struct AuditSession<'a> {
    provider: Arc<dyn LlmProvider>,
    config: &'a AuditConfig,
    observer: &'a dyn SessionObserver,
    history: Vec<SessionState>,
    tool_rounds: u32,
}

impl<'a> AuditSession<'a> {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        config: &'a AuditConfig,
        observer: &'a dyn SessionObserver,
    ) -> Self {
        Self {
            provider,
            config,
            observer,
            history: Vec::new(),
            tool_rounds: 0,
        }
    }

    /// States entered so far, in order.
    pub fn history(&self) -> &[SessionState] {
        &self.history
    }

    /// Tool rounds executed so far.
    pub fn tool_rounds(&self) -> u32 {
        self.tool_rounds
    }

    fn transition(&mut self, state: SessionState) {
        info!(state = %state, "Session state");
        self.history.push(state);
        self.observer.on_state(state);
    }

    /// Drive the session to a report.
    pub async fn run(
        &mut self,
        finding: &ScanFinding,
        route: &RoutingDecision,
        request: &AuditRequest,
    ) -> AuditResult<AuditReport> {
        match self.run_inner(finding, route, request).await {
            Ok(report) => {
                self.transition(SessionState::Done);
                Ok(report)
            }
            Err(e) => {
                warn!(error = %e, "Session failed");
                self.transition(SessionState::Failed);
                Err(e)
            }
        }
    }

    async fn run_inner(
        &mut self,
        finding: &ScanFinding,
        route: &RoutingDecision,
        request: &AuditRequest,
    ) -> AuditResult<AuditReport> {
        self.transition(SessionState::Preamble);
        let preamble = build_preamble(
            finding,
            route,
            request,
            self.config.default_region.as_deref(),
        );
        let options = route.request_options(self.config);
        let tools = tool_definitions();
        let mut messages = vec![preamble.message];

        let buffer = loop {
            self.transition(SessionState::Streaming);
            let turn = self
                .stream_turn(&messages, &preamble.system, &tools, &options)
                .await?;

            if !turn.response.has_tool_calls() {
                break turn.text;
            }

            let requests: Vec<ToolCallRequest> = turn
                .response
                .tool_calls
                .iter()
                .map(|call| ToolCallRequest {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    arguments: call.arguments.clone(),
                })
                .collect();

            let results: Vec<ToolCallResult> = requests
                .iter()
                .filter_map(|req| {
                    let result = execute_tool_call(req);
                    if result.is_none() {
                        warn!(tool = %req.name, id = %req.id, "Ignoring unknown tool call");
                    }
                    result
                })
                .collect();

            if results.is_empty() {
                debug!("No recognized tool calls; treating turn as final");
                break turn.text;
            }

            if self.tool_rounds >= self.config.max_tool_rounds {
                return Err(AuditError::ToolLoopExceeded(self.config.max_tool_rounds));
            }
            self.tool_rounds += 1;
            self.transition(SessionState::ToolExecuting);

            // Tool work may suspend in other deployments
            tokio::task::yield_now().await;

            let answered: Vec<_> = turn
                .response
                .tool_calls
                .iter()
                .filter(|call| results.iter().any(|r| r.id == call.id))
                .cloned()
                .collect();
            messages.push(Message::assistant_with_tool_calls(&turn.text, &answered));
            messages.push(tool_results_message(&results));
        };

        self.transition(SessionState::Extracting);
        extract_report(&buffer)
    }

    /// Stream one request, forwarding filtered narration as it arrives.
    async fn stream_turn(
        &self,
        messages: &[Message],
        system: &str,
        tools: &[ToolDefinition],
        options: &LlmRequestOptions,
    ) -> AuditResult<TurnOutput> {
        let (tx, mut rx) = mpsc::channel::<UnifiedStreamEvent>(STREAM_CHANNEL_CAPACITY);
        let observer = self.observer;
        let mut filter = MarkerFilter::new();
        let mut text = String::new();

        let request = self.provider.stream_message(
            messages.to_vec(),
            Some(system.to_string()),
            tools.to_vec(),
            tx,
            options.clone(),
        );

        let consume = async {
            while let Some(event) = rx.recv().await {
                if let UnifiedStreamEvent::TextDelta { content } = event {
                    forward(observer, filter.push(&content), &mut text);
                }
            }
            forward(observer, filter.finish(), &mut text);
        };

        let (response, ()) = tokio::join!(request, consume);
        let response = response?;

        debug!(
            chars = text.len(),
            tool_calls = response.tool_calls.len(),
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "Turn complete"
        );

        Ok(TurnOutput { text, response })
    }
}

fn forward(observer: &dyn SessionObserver, events: Vec<FilterEvent>, buffer: &mut String) {
    for event in events {
        match event {
            FilterEvent::Text(t) => {
                if !t.is_empty() {
                    observer.on_narration(&t);
                    buffer.push_str(&t);
                }
            }
            FilterEvent::Phase(p) => observer.on_control_event(&p),
        }
    }
}

fn tool_results_message(results: &[ToolCallResult]) -> Message {
    Message {
        role: MessageRole::User,
        content: results
            .iter()
            .map(|r| MessageContent::ToolResult {
                tool_use_id: r.id.clone(),
                name: r.name.clone(),
                content: r.result_payload.clone(),
                is_error: r.result_payload.get("error").map(|_| true),
            })
            .collect(),
    }
}
