//! Failure Classifier & Retry Policy Integration Tests

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use ecoaudit::services::retry::{classify_llm_error, with_retry, FailureClass, RetryPolicy};
use ecoaudit::utils::error::{AuditError, AuditResult};
use ecoaudit_llm::{parse_http_error, LlmError};

#[tokio::test(start_paused = true)]
async fn test_nested_quota_error_surfaces_unwrapped_message() {
    let counter = AtomicU32::new(0);
    let calls = &counter;

    let result: AuditResult<()> = with_retry(
        move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AuditError::Llm(LlmError::Other {
                message: r#"{"error":{"code":429,"message":"quota"}}"#.to_string(),
            }))
        },
        1,
        2000,
    )
    .await;

    let err = result.unwrap_err();
    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert!(err.is_rate_limited());
    assert!(!err.is_retryable());
    match err {
        AuditError::Quota { message, .. } => assert_eq!(message, "quota"),
        other => panic!("expected quota error, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_transient_attempted_twice_after_delay() {
    let counter = AtomicU32::new(0);
    let calls = &counter;
    let start = tokio::time::Instant::now();

    let result: AuditResult<()> = with_retry(
        move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AuditError::Llm(LlmError::NetworkError {
                message: "error sending request: connection reset".to_string(),
            }))
        },
        1,
        2000,
    )
    .await;

    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert!(start.elapsed() >= Duration::from_millis(2000));
    match result {
        Err(AuditError::Transient { retryable, .. }) => assert!(!retryable),
        other => panic!("expected transient error, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_non_retryable_attempted_once() {
    let counter = AtomicU32::new(0);
    let calls = &counter;
    let start = tokio::time::Instant::now();

    let result: AuditResult<()> = RetryPolicy::new(1, Duration::from_millis(2000))
        .run(move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AuditError::Llm(LlmError::AuthenticationFailed {
                message: "API key not valid".to_string(),
            }))
        })
        .await;

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    assert!(start.elapsed() < Duration::from_millis(2000));
    assert!(matches!(
        result,
        Err(AuditError::Llm(LlmError::AuthenticationFailed { .. }))
    ));
}

#[test]
fn test_http_status_mapping_feeds_classifier() {
    let body = r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#;
    assert_eq!(
        classify_llm_error(&parse_http_error(429, body, "gemini")),
        FailureClass::RateLimited
    );
    assert_eq!(
        classify_llm_error(&parse_http_error(503, "overloaded", "gemini")),
        FailureClass::Transient
    );
    assert_eq!(
        classify_llm_error(&parse_http_error(400, "invalid argument", "gemini")),
        FailureClass::Terminal
    );
}
