//! Session Orchestrator Integration Tests
//!
//! Sessions run against a `ScriptedProvider`, which replays canned turns
//! and records every request it receives.

use std::sync::Arc;
use std::time::Duration;

use ecoaudit::models::settings::{AuditConfig, RetryConfig};
use ecoaudit::services::audit::{AuditEngine, AuditSession, SessionState};
use ecoaudit::services::routing::route;
use ecoaudit::services::usage::DailyUsageLimiter;
use ecoaudit::utils::error::AuditError;
use ecoaudit_core::streaming::UnifiedStreamEvent;
use ecoaudit_llm::{LlmError, MessageContent, MessageRole, ScriptedProvider, ScriptedTurn};
use ecoaudit_scanner::scan;

use crate::common::{t4_request, RecordingObserver, REPORT_JSON, SIMPLE_NET};

/// Split a report into uneven fragments the way a stream delivers it.
fn fragments(text: &str, size: usize) -> Vec<String> {
    text.chars()
        .collect::<Vec<_>>()
        .chunks(size)
        .map(|c| c.iter().collect())
        .collect()
}

fn engine(provider: Arc<ScriptedProvider>, config: AuditConfig) -> AuditEngine {
    AuditEngine::new(provider, config)
}

// ============================================================================
// Tool round trip
// ============================================================================

#[tokio::test]
async fn test_tool_round_trip() {
    let first = ScriptedTurn::text([
        "[[PHASE: analysis]]\n",
        "Draft estimate {\"joules\": 7200000}.\n",
    ])
    .with_tool_call(
        "call_0",
        "carbon_footprint",
        serde_json::json!({"energy_joules": 7_200_000.0, "region": "eu-west"}),
    );
    let mut second_parts = vec!["[[PHASE: report]]\nFinal report:\n".to_string()];
    second_parts.extend(fragments(REPORT_JSON, 37));
    let second = ScriptedTurn::text(second_parts);

    let provider = Arc::new(ScriptedProvider::new(vec![first, second]));
    let config = AuditConfig::default();
    let request = t4_request(SIMPLE_NET);
    let finding = scan(&request.source);
    let decision = route(&finding, &config.routing);
    let observer = RecordingObserver::default();

    let mut session = AuditSession::new(provider.clone(), &config, &observer);
    let report = session.run(&finding, &decision, &request).await.unwrap();

    assert_eq!(report.original_energy_joules, 1800.0);
    assert_eq!(
        session.history(),
        &[
            SessionState::Preamble,
            SessionState::Streaming,
            SessionState::ToolExecuting,
            SessionState::Streaming,
            SessionState::Extracting,
            SessionState::Done,
        ]
    );
    assert_eq!(observer.count_state(SessionState::Streaming), 2);
    assert_eq!(observer.count_state(SessionState::ToolExecuting), 1);
    assert_eq!(session.tool_rounds(), 1);
    assert_eq!(observer.phases(), vec!["analysis", "report"]);

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    let follow_up = &requests[1].messages;
    assert_eq!(follow_up.len(), 3);
    assert_eq!(follow_up[1].role, MessageRole::Assistant);
    assert!(follow_up[1]
        .content
        .iter()
        .any(|c| matches!(c, MessageContent::ToolUse { id, .. } if id == "call_0")));
    match &follow_up[2].content[0] {
        MessageContent::ToolResult {
            tool_use_id,
            content,
            is_error,
            ..
        } => {
            assert_eq!(tool_use_id, "call_0");
            assert_eq!(content["carbon_grams"], 600.0);
            assert_eq!(content["region"], "eu-west");
            assert_eq!(*is_error, None);
        }
        other => panic!("expected tool result, got {other:?}"),
    }
}

#[tokio::test]
async fn test_narration_never_contains_markers() {
    let turn = ScriptedTurn::text([
        "[[PHA",
        "SE: analysis]]\nLooking at the convolutions.\n  [[ phase :",
        " bench ]]\nComparing with MLPerf.\n[[PHASE: report]]\n",
        REPORT_JSON,
    ]);
    let provider = Arc::new(ScriptedProvider::new(vec![turn]));
    let observer = RecordingObserver::default();

    let outcome = engine(provider, AuditConfig::default())
        .audit(&t4_request(SIMPLE_NET), &observer)
        .await
        .unwrap();

    let narration = observer.narration_text();
    assert!(!narration.contains("[[PHASE:"));
    assert!(!narration.to_lowercase().contains("[[ phase"));
    assert!(narration.starts_with("Looking at the convolutions.\nComparing with MLPerf.\n"));
    assert_eq!(observer.phases(), vec!["analysis", "bench", "report"]);
    assert_eq!(outcome.attempts, 1);
}

#[tokio::test]
async fn test_unknown_tool_is_ignored_alongside_known_one() {
    let first = ScriptedTurn::text(["Checking.\n"])
        .with_tool_call("call_0", "lookup_weather", serde_json::json!({"city": "Oslo"}))
        .with_tool_call(
            "call_1",
            "carbon_footprint",
            serde_json::json!({"energy_kwh": 1.0}),
        );
    let second = ScriptedTurn::text([REPORT_JSON]);
    let provider = Arc::new(ScriptedProvider::new(vec![first, second]));
    let observer = RecordingObserver::default();

    engine(provider.clone(), AuditConfig::default())
        .audit(&t4_request(SIMPLE_NET), &observer)
        .await
        .unwrap();

    let follow_up = &provider.requests()[1].messages;
    let results: Vec<&MessageContent> = follow_up[2].content.iter().collect();
    assert_eq!(results.len(), 1);
    assert!(matches!(
        results[0],
        MessageContent::ToolResult { tool_use_id, .. } if tool_use_id == "call_1"
    ));
    let replayed_calls = follow_up[1]
        .content
        .iter()
        .filter(|c| matches!(c, MessageContent::ToolUse { .. }))
        .count();
    assert_eq!(replayed_calls, 1);
}

#[tokio::test]
async fn test_malformed_final_turn_is_not_retried() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        ScriptedTurn::text(["{\"a\":1"]),
        ScriptedTurn::text([REPORT_JSON]),
    ]));
    let observer = RecordingObserver::default();

    let err = engine(provider.clone(), AuditConfig::default())
        .audit(&t4_request(SIMPLE_NET), &observer)
        .await
        .unwrap_err();

    assert!(matches!(err, AuditError::MalformedOutput { .. }));
    assert_eq!(provider.call_count(), 1);
    assert_eq!(observer.states().last(), Some(&SessionState::Failed));
}

// ============================================================================
// Retries through the engine
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_transient_failure_restarts_session() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        ScriptedTurn::Events(vec![
            UnifiedStreamEvent::TextDelta {
                content: "Partial narration\n".to_string(),
            },
            UnifiedStreamEvent::Error {
                message: "The model is overloaded".to_string(),
                code: Some("503".to_string()),
            },
        ]),
        ScriptedTurn::text(["Second try.\n", REPORT_JSON]),
    ]));
    let observer = RecordingObserver::default();
    let start = tokio::time::Instant::now();

    let outcome = engine(provider.clone(), AuditConfig::default())
        .audit(&t4_request(SIMPLE_NET), &observer)
        .await
        .unwrap();

    assert_eq!(outcome.attempts, 2);
    assert_eq!(provider.call_count(), 2);
    assert!(start.elapsed() >= Duration::from_millis(2000));
    assert_eq!(
        *observer.retries.lock().unwrap(),
        vec![(2, Duration::from_millis(2000))]
    );
    assert_eq!(observer.count_state(SessionState::Preamble), 2);
    assert_eq!(observer.count_state(SessionState::Failed), 1);
    assert_eq!(observer.states().last(), Some(&SessionState::Done));

    // The second attempt starts over with only the preamble message
    assert_eq!(provider.requests()[1].messages.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_quota_exhaustion_is_distinct() {
    let quota = || {
        ScriptedTurn::Fail(LlmError::RateLimited {
            message: r#"{"error":{"code":429,"message":"Quota exceeded for requests per minute"}}"#
                .to_string(),
            retry_after: None,
        })
    };
    let provider = Arc::new(ScriptedProvider::new(vec![quota(), quota(), quota()]));
    let config = AuditConfig {
        retry: RetryConfig {
            max_retries: 2,
            initial_delay_ms: 500,
        },
        ..AuditConfig::default()
    };
    let observer = RecordingObserver::default();

    let err = engine(provider.clone(), config)
        .audit(&t4_request(SIMPLE_NET), &observer)
        .await
        .unwrap_err();

    assert!(err.is_rate_limited());
    assert_eq!(
        err.to_string(),
        "Quota exceeded: Quota exceeded for requests per minute"
    );
    assert_eq!(provider.call_count(), 3);
    assert_eq!(
        *observer.retries.lock().unwrap(),
        vec![
            (2, Duration::from_millis(500)),
            (3, Duration::from_millis(1000))
        ]
    );
}

// ============================================================================
// Input errors
// ============================================================================

#[tokio::test]
async fn test_missing_hardware_fails_before_network() {
    let provider = Arc::new(ScriptedProvider::new(vec![ScriptedTurn::text([REPORT_JSON])]));
    let mut request = t4_request(SIMPLE_NET);
    request.hardware.name = "  ".to_string();

    let err = engine(provider.clone(), AuditConfig::default())
        .audit(&request, &RecordingObserver::default())
        .await
        .unwrap_err();

    assert!(matches!(err, AuditError::Input(_)));
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_daily_limit_blocks_second_audit() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        ScriptedTurn::text([REPORT_JSON]),
        ScriptedTurn::text([REPORT_JSON]),
    ]));
    let engine = engine(provider.clone(), AuditConfig::default())
        .with_limiter(DailyUsageLimiter::in_memory(Some(1)));
    let observer = RecordingObserver::default();
    let request = t4_request(SIMPLE_NET);

    engine.audit(&request, &observer).await.unwrap();
    let err = engine.audit(&request, &observer).await.unwrap_err();

    assert!(matches!(err, AuditError::DailyLimitReached(1)));
    assert_eq!(provider.call_count(), 1);
}
