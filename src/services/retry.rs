//! Failure Classifier & Retry Policy
//!
//! Backend failures arrive in many shapes: a typed status, a serialized
//! error body, or a bare message that is itself a JSON document. The
//! classifier looks at each of those in turn to decide whether a failure is
//! a rate limit, a transient fault, or terminal. `RetryPolicy::run` retries
//! the first two kinds with exponential backoff and surfaces everything else.

use std::future::Future;
use std::sync::OnceLock;
use std::time::Duration;

use ecoaudit_llm::LlmError;
use regex::Regex;
use tracing::{debug, warn};

use crate::models::settings::RetryConfig;
use crate::utils::error::{AuditError, AuditResult};

const RATE_LIMIT_STATUS: u16 = 429;

const RATE_LIMIT_MARKERS: &[&str] = &[
    "resource_exhausted",
    "quota",
    "rate limit",
    "rate_limit",
    "ratelimit",
    "too many requests",
];

const TRANSPORT_MARKERS: &[&str] = &[
    "network",
    "connection reset",
    "connection refused",
    "connection closed",
    "timed out",
    "timeout",
    "fetch failed",
    "failed to fetch",
    "xhr error",
    "econnreset",
    "unavailable",
    "overloaded",
];

/// How a failure should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    RateLimited,
    Transient,
    Terminal,
}

/// `error.message` / `error.code` pulled out of a JSON error body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NestedError {
    pub message: Option<String>,
    pub code: Option<u16>,
}

/// Parse a message that is itself a serialized error object.
///
/// Accepts `{"error": {"code": .., "message": ..}}` as well as a flat
/// `{"code": .., "message": ..}`. Anything that does not parse yields `None`.
pub fn unwrap_nested_error(message: &str) -> Option<NestedError> {
    let trimmed = message.trim();
    if !trimmed.starts_with('{') {
        return None;
    }
    let value: serde_json::Value = serde_json::from_str(trimmed).ok()?;
    let body = value.get("error").unwrap_or(&value);

    let nested = NestedError {
        message: body
            .get("message")
            .and_then(|m| m.as_str())
            .map(String::from),
        code: body.get("code").and_then(|c| match c {
            serde_json::Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
            serde_json::Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }),
    };

    (nested.message.is_some() || nested.code.is_some()).then_some(nested)
}

fn class_for_status(status: u16) -> Option<FailureClass> {
    match status {
        RATE_LIMIT_STATUS => Some(FailureClass::RateLimited),
        500..=599 => Some(FailureClass::Transient),
        _ => None,
    }
}

fn status_token(re: &'static OnceLock<Option<Regex>>, pattern: &str, text: &str) -> bool {
    re.get_or_init(|| Regex::new(pattern).ok())
        .as_ref()
        .is_some_and(|re| re.is_match(text))
}

fn mentions_429(text: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    status_token(&RE, r"\b429\b", text)
}

fn mentions_503(text: &str) -> bool {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    status_token(&RE, r"\b503\b", text)
}

fn class_for_text(text: &str) -> Option<FailureClass> {
    let lower = text.to_lowercase();
    if mentions_429(&lower) || RATE_LIMIT_MARKERS.iter().any(|m| lower.contains(m)) {
        return Some(FailureClass::RateLimited);
    }
    if mentions_503(&lower) || TRANSPORT_MARKERS.iter().any(|m| lower.contains(m)) {
        return Some(FailureClass::Transient);
    }
    None
}

/// Classify a transport error.
///
/// Order: the status code (typed, or the code of a nested JSON body), then
/// the serialized error object, then the message text.
pub fn classify_llm_error(err: &LlmError) -> FailureClass {
    let nested = unwrap_nested_error(err.message());
    let status = err
        .status_code()
        .or_else(|| nested.as_ref().and_then(|n| n.code));
    if let Some(class) = status.and_then(class_for_status) {
        return class;
    }

    if let Ok(serialized) = serde_json::to_string(err) {
        if let Some(class) = class_for_text(&serialized) {
            return class;
        }
    }

    if let Some(class) = class_for_text(err.message()) {
        return class;
    }

    match err {
        LlmError::NetworkError { .. } => FailureClass::Transient,
        _ => FailureClass::Terminal,
    }
}

/// Classify an engine error.
pub fn classify_failure(err: &AuditError) -> FailureClass {
    match err {
        AuditError::Quota { retryable, .. } if *retryable => FailureClass::RateLimited,
        AuditError::Transient { retryable, .. } if *retryable => FailureClass::Transient,
        AuditError::NoOutput => FailureClass::Transient,
        AuditError::Llm(e) => classify_llm_error(e),
        _ => FailureClass::Terminal,
    }
}

/// Turn a raw transport error into the engine taxonomy, unwrapping a nested
/// JSON body for a clearer message.
pub fn surface_llm_error(err: LlmError, retryable: bool) -> AuditError {
    let class = classify_llm_error(&err);
    let message = unwrap_nested_error(err.message())
        .and_then(|n| n.message)
        .unwrap_or_else(|| err.message().to_string());

    match class {
        FailureClass::RateLimited => AuditError::Quota { message, retryable },
        FailureClass::Transient => AuditError::Transient { message, retryable },
        FailureClass::Terminal => {
            if message == err.message() {
                AuditError::Llm(err)
            } else {
                AuditError::Llm(err.with_message(message))
            }
        }
    }
}

/// Final form of a failure once no further attempt will be made.
fn surface(err: AuditError) -> AuditError {
    match err {
        AuditError::Llm(e) => surface_llm_error(e, false),
        other => other.exhausted(),
    }
}

/// Attempts left and the delay before the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryState {
    pub attempts_remaining: u32,
    pub current_delay: Duration,
}

/// Exponential backoff policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_delay: Duration) -> Self {
        Self {
            max_retries,
            initial_delay,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.initial_delay_ms),
        )
    }

    fn initial_state(&self) -> RetryState {
        RetryState {
            attempts_remaining: self.max_retries,
            current_delay: self.initial_delay,
        }
    }

    /// Run `operation`, retrying rate-limit and transient failures.
    pub async fn run<T, F, Fut>(&self, operation: F) -> AuditResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AuditResult<T>>,
    {
        self.run_observed(|_, _| {}, operation).await
    }

    /// Like `run`, calling `on_retry(attempt, delay)` before each backoff sleep.
    /// `attempt` is the 1-based number of the attempt about to start.
    pub async fn run_observed<T, F, Fut, R>(&self, mut on_retry: R, mut operation: F) -> AuditResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = AuditResult<T>>,
        R: FnMut(u32, Duration),
    {
        let mut state = self.initial_state();
        let mut attempt: u32 = 1;

        loop {
            let err = match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(attempt, "retry: succeeded");
                    }
                    return Ok(value);
                }
                Err(e) => e,
            };

            let class = classify_failure(&err);
            if class == FailureClass::Terminal {
                debug!(attempt, error = %err, "retry: terminal failure");
                return Err(surface(err));
            }
            if state.attempts_remaining == 0 {
                warn!(
                    attempt,
                    max = self.max_retries + 1,
                    error = %err,
                    "retry: attempts exhausted"
                );
                return Err(surface(err));
            }

            warn!(
                attempt,
                max = self.max_retries + 1,
                delay_ms = state.current_delay.as_millis() as u64,
                class = ?class,
                error = %err,
                "retry: backing off"
            );
            attempt += 1;
            on_retry(attempt, state.current_delay);
            tokio::time::sleep(state.current_delay).await;

            state = RetryState {
                attempts_remaining: state.attempts_remaining - 1,
                current_delay: state.current_delay.saturating_mul(2),
            };
        }
    }
}

/// Run `operation` under a policy built from plain numbers.
pub async fn with_retry<T, F, Fut>(
    operation: F,
    max_retries: u32,
    initial_delay_ms: u64,
) -> AuditResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AuditResult<T>>,
{
    RetryPolicy::new(max_retries, Duration::from_millis(initial_delay_ms))
        .run(operation)
        .await
}
