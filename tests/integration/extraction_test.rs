//! Report Extraction Integration Tests

use ecoaudit::services::audit::{extract_report, payload_slice, strip_markers};
use ecoaudit::utils::error::AuditError;

use crate::common::REPORT_JSON;

#[test]
fn test_recovers_payload_between_prose() {
    let prefix = "[[PHASE: report]]\nHere is the final audit.\n```json\n";
    let suffix = "\n```\nLet me know if you need more detail.";
    let buffer = format!("{}{}{}", prefix, REPORT_JSON, suffix);

    let cleaned = strip_markers(&buffer);
    assert_eq!(payload_slice(&cleaned), REPORT_JSON);

    let report = extract_report(&buffer).unwrap();
    assert_eq!(report.original_energy_joules, 1800.0);
    assert_eq!(report.recommendations.len(), 1);
    assert!(report.benchmark_data.is_none());
}

#[test]
fn test_markers_inside_payload_region_are_removed() {
    let (head, tail) = REPORT_JSON.split_at(REPORT_JSON.find("\"uncertaintyFactors\"").unwrap());
    let buffer = format!("{}[[PHASE: double-check]]\n{}", head, tail);
    let report = extract_report(&buffer).unwrap();
    assert_eq!(report.uncertainty_factors, vec!["batch size not stated"]);
}

#[test]
fn test_unbalanced_braces_are_malformed() {
    let err = extract_report(r#"{"a":1"#).unwrap_err();
    assert!(matches!(err, AuditError::MalformedOutput { .. }));
    assert!(!err.is_retryable());
}

#[test]
fn test_prose_only_is_malformed() {
    let err = extract_report("I could not complete the audit.").unwrap_err();
    assert!(matches!(err, AuditError::MalformedOutput { .. }));
}

#[test]
fn test_whitespace_only_is_no_output() {
    let err = extract_report("\n\n   \n").unwrap_err();
    assert!(matches!(err, AuditError::NoOutput));
    assert!(err.is_retryable());
}

#[test]
fn test_non_finite_number_rejected() {
    let bad = REPORT_JSON.replace("\"confidenceScore\": 0.64", "\"confidenceScore\": 1e999");
    assert!(matches!(
        extract_report(&bad),
        Err(AuditError::MalformedOutput { .. })
    ));
}
