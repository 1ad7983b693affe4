//! Scanner Models
//!
//! Data structures produced by the pattern scanner. A `ScanFinding` is built
//! once per audit request and never mutated afterwards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Total construct count above which a scan is routed to the `Medium` tier.
pub const MEDIUM_TIER_THRESHOLD: usize = 10;

/// Coarse complexity classification used to pick the downstream model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComplexityTier {
    Low,
    Medium,
    High,
}

impl ComplexityTier {
    /// Derive the tier from the raw construct total and the confidence flag.
    pub fn classify(total_constructs: usize, low_confidence: bool) -> Self {
        if low_confidence {
            ComplexityTier::High
        } else if total_constructs > MEDIUM_TIER_THRESHOLD {
            ComplexityTier::Medium
        } else {
            ComplexityTier::Low
        }
    }

    /// Get human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            ComplexityTier::Low => "Low",
            ComplexityTier::Medium => "Medium",
            ComplexityTier::High => "High",
        }
    }
}

impl std::fmt::Display for ComplexityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// A named structural observation with the lines it applies to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralAnnotation {
    /// Rule label, e.g. "Strided Convolution"
    pub label: String,
    /// Sorted, deduplicated 1-based line numbers
    pub locations: Vec<usize>,
    /// Actionable advice for the reader
    pub advice: String,
}

/// Structured result of scanning one source text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanFinding {
    /// False when delimiter counts do not balance
    pub is_valid: bool,
    /// Syntax problems found during the balance check
    pub errors: Vec<String>,
    /// Occurrences per construct name (only constructs that matched)
    pub construct_counts: BTreeMap<String, usize>,
    /// Sum of per-occurrence weights
    pub heuristic_cost_units: f64,
    /// Argument-sensitive annotations grouped by label
    pub structural_annotations: Vec<StructuralAnnotation>,
    pub complexity_tier: ComplexityTier,
    /// Set when the real structure is likely hidden behind abstraction
    pub low_confidence: bool,
    pub low_confidence_reasons: Vec<String>,
    /// Training-loop call sites (informational only)
    #[serde(default)]
    pub training_signals: usize,
}

impl ScanFinding {
    /// Total number of construct occurrences across all names.
    pub fn total_constructs(&self) -> usize {
        self.construct_counts.values().sum()
    }

    /// Count for a single construct name (0 when absent).
    pub fn count_of(&self, construct: &str) -> usize {
        self.construct_counts.get(construct).copied().unwrap_or(0)
    }

    /// Find an annotation by label.
    pub fn annotation(&self, label: &str) -> Option<&StructuralAnnotation> {
        self.structural_annotations.iter().find(|a| a.label == label)
    }
}
