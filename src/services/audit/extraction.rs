//! Payload Extraction
//!
//! Recovers the final report from the last turn's accumulated text, which
//! may wrap the JSON object in prose or code fences.

use tracing::error;

use crate::models::report::AuditReport;
use crate::utils::error::{AuditError, AuditResult};

use super::markers::strip_markers;

/// Slice from the first `{` to the last `}` inclusive, or the trimmed text
/// when there is no such pair.
pub fn payload_slice(text: &str) -> &str {
    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text.trim(),
    }
}

/// Parse the report out of a raw turn buffer.
pub fn extract_report(buffer: &str) -> AuditResult<AuditReport> {
    let cleaned = strip_markers(buffer);
    if cleaned.trim().is_empty() {
        return Err(AuditError::NoOutput);
    }

    let payload = payload_slice(&cleaned);
    let report: AuditReport = serde_json::from_str(payload).map_err(|e| {
        error!(error = %e, raw = %cleaned, "Final output is not a valid report");
        AuditError::malformed(e.to_string(), cleaned.as_str())
    })?;

    report.validate().map_err(|e| {
        error!(error = %e, raw = %cleaned, "Report failed validation");
        AuditError::malformed(e, cleaned.as_str())
    })?;

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"{
        "originalEnergyJoules": 100.0,
        "optimizedEnergyJoules": 60.0,
        "improvementPercentage": 40.0,
        "carbonSavedGrams": 0.004,
        "estimatedHourlyCost": 0.5,
        "costSavingsPer1MInference": 1.2,
        "energyErrorMargin": 20.0,
        "costErrorMargin": 15.0,
        "confidenceScore": 0.6,
        "tradeoffMetrics": {
            "performanceScore": 70,
            "costEfficiencyScore": 65,
            "carbonEfficiencyScore": 72,
            "accuracySafetyScore": 90
        }
    }"#;

    #[test]
    fn test_slice_between_outer_braces() {
        assert_eq!(payload_slice("Here you go: {\"a\": {\"b\": 1}} done"), "{\"a\": {\"b\": 1}}");
        assert_eq!(payload_slice("  no braces  "), "no braces");
        assert_eq!(payload_slice("} backwards {"), "} backwards {");
    }

    #[test]
    fn test_extract_with_prose_and_fences() {
        let buffer = format!("[[PHASE: report]]\nFinal report:\n```json\n{}\n```\n", REPORT);
        let report = extract_report(&buffer).unwrap();
        assert_eq!(report.original_energy_joules, 100.0);
        assert_eq!(report.tradeoff_metrics.accuracy_safety_score, 90.0);
    }

    #[test]
    fn test_empty_buffer_is_no_output() {
        assert!(matches!(extract_report(""), Err(AuditError::NoOutput)));
        assert!(matches!(
            extract_report("  [[PHASE: done]]\n  "),
            Err(AuditError::NoOutput)
        ));
    }

    #[test]
    fn test_unbalanced_braces_are_malformed() {
        match extract_report(r#"{"a":1"#) {
            Err(AuditError::MalformedOutput { raw, .. }) => assert_eq!(raw, r#"{"a":1"#),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_missing_numeric_field_is_malformed() {
        let partial = REPORT.replace("\"confidenceScore\": 0.6,", "");
        let err = extract_report(&partial).unwrap_err();
        assert!(matches!(err, AuditError::MalformedOutput { .. }));
        assert!(!err.is_retryable());
    }
}
