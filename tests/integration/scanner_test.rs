//! Pattern Scanner Integration Tests

use ecoaudit_scanner::{scan, ComplexityTier, PatternScanner};

use crate::common::SIMPLE_NET;

// ============================================================================
// Concrete scenarios
// ============================================================================

#[test]
fn test_two_convs_one_batch_norm() {
    let finding = scan(SIMPLE_NET);

    assert_eq!(finding.construct_counts.len(), 2);
    assert_eq!(finding.construct_counts.get("Conv"), Some(&2));
    assert_eq!(finding.construct_counts.get("BatchNorm"), Some(&1));
    assert_eq!(finding.complexity_tier, ComplexityTier::Low);
    assert!((finding.heuristic_cost_units - 1.01).abs() < 1e-9);
    assert!(finding.is_valid);
    assert!(!finding.low_confidence);
}

#[test]
fn test_factory_pattern_lowers_confidence() {
    let source = r#"
class Net(nn.Module):
    def __init__(self, cfg):
        super().__init__()
        self.layers = nn.ModuleList()
        for i in range(cfg.depth):
            self.layers.append(make_layer(cfg.hidden_dim))
"#;
    let finding = scan(source);
    assert!(finding.low_confidence);
    assert_eq!(finding.complexity_tier, ComplexityTier::High);
    assert!(!finding.low_confidence_reasons.is_empty());
}

#[test]
fn test_finding_serializes_camel_case() {
    let json = serde_json::to_value(scan(SIMPLE_NET)).unwrap();
    assert_eq!(json["isValid"], true);
    assert_eq!(json["constructCounts"]["Conv"], 2);
    assert_eq!(json["complexityTier"], "Low");
    assert!(json.get("heuristicCostUnits").is_some());
    assert!(json.get("structuralAnnotations").is_some());
    assert!(json.get("lowConfidenceReasons").is_some());
}

// ============================================================================
// Totality and idempotence
// ============================================================================

#[test]
fn test_scan_never_panics_on_odd_input() {
    let inputs = [
        "",
        "(((((",
        "))))]]]}}}",
        "nn.Conv2d(",
        "nn.Conv2d(stride=",
        "nn.Linear(,,,,)",
        "\u{0}\u{1}\u{2}",
        "日本語のテキスト nn.Conv2d(3, 64, 3)",
        "SELECT * FROM layers WHERE kind = 'Conv2d';",
    ];
    for input in inputs {
        let first = scan(input);
        let second = scan(input);
        assert_eq!(first, second, "scan not idempotent for {:?}", input);
    }
}

#[test]
fn test_unbalanced_input_reports_errors() {
    let finding = scan("x = nn.Conv2d(3, 64, 3\n");
    assert!(!finding.is_valid);
    assert!(!finding.errors.is_empty());
    assert_eq!(finding.count_of("Conv"), 1);
}

#[test]
fn test_low_tier_below_threshold() {
    for n in 1..=10 {
        let source = "self.fc = nn.Linear(16, 16)\n".repeat(n);
        let finding = scan(&source);
        assert_eq!(finding.complexity_tier, ComplexityTier::Low, "n = {}", n);
    }
}

#[test]
fn test_default_scanner_matches_free_function() {
    assert_eq!(PatternScanner::new().scan(SIMPLE_NET), scan(SIMPLE_NET));
}
