//! Pattern Scanner
//!
//! Turns raw source text into a `ScanFinding`. The scan is a surface-level
//! text pass: it counts known construct signatures, evaluates argument rules
//! on the matched calls, and flags idioms that hide model structure. It never
//! fails; text it does not understand simply produces an empty finding.

use std::collections::BTreeMap;

use tracing::debug;

use crate::catalog::{
    count_class_definitions, default_annotation_rules, default_constructs, detect_abstractions,
    AnnotationRule, CallArgs, ConstructPattern, TRAINING_SIGNATURES,
};
use crate::models::{ComplexityTier, ScanFinding, StructuralAnnotation};

const DELIMITERS: &[(char, char, &str)] = &[
    ('(', ')', "parentheses"),
    ('[', ']', "brackets"),
    ('{', '}', "braces"),
];

const HIDDEN_STRUCTURE_REASON: &str =
    "class definitions found but no known constructs matched";

/// Scanner over a construct catalog and a set of annotation rules.
pub struct PatternScanner {
    constructs: Vec<ConstructPattern>,
    rules: Vec<AnnotationRule>,
}

impl Default for PatternScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternScanner {
    /// Scanner with the built-in PyTorch/Keras catalog.
    pub fn new() -> Self {
        Self {
            constructs: default_constructs(),
            rules: default_annotation_rules(),
        }
    }

    /// Scanner with a custom catalog and no annotation rules.
    pub fn with_catalog(constructs: Vec<ConstructPattern>) -> Self {
        Self {
            constructs,
            rules: Vec::new(),
        }
    }

    /// Add an annotation rule.
    pub fn with_rule(mut self, rule: AnnotationRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Scan a source text.
    pub fn scan(&self, source: &str) -> ScanFinding {
        let errors = check_balance(source);

        let mut construct_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut heuristic_cost_units = 0.0;
        let mut annotations: Vec<StructuralAnnotation> = Vec::new();

        for pattern in &self.constructs {
            for (offset, _) in source.match_indices(pattern.signature) {
                *construct_counts.entry(pattern.name.to_string()).or_insert(0) += 1;
                heuristic_cost_units += pattern.weight;

                let line = line_of(source, offset);
                let args_start = offset + pattern.signature.len();
                let inner = if pattern.signature.ends_with('(') {
                    call_arguments(source, args_start)
                } else {
                    None
                };
                let args = inner.map(CallArgs::parse).unwrap_or_default();

                for rule in self
                    .rules
                    .iter()
                    .filter(|r| r.applies_to.contains(&pattern.name))
                {
                    if (rule.predicate)(&args) {
                        record_annotation(&mut annotations, rule, line);
                    }
                }
            }
        }

        for annotation in &mut annotations {
            annotation.locations.sort_unstable();
            annotation.locations.dedup();
        }

        let mut low_confidence_reasons: Vec<String> = detect_abstractions(source)
            .into_iter()
            .map(String::from)
            .collect();

        let total: usize = construct_counts.values().sum();
        if total == 0 && count_class_definitions(source) > 0 {
            low_confidence_reasons.push(HIDDEN_STRUCTURE_REASON.to_string());
        }
        let low_confidence = !low_confidence_reasons.is_empty();

        let training_signals = TRAINING_SIGNATURES
            .iter()
            .map(|sig| source.matches(sig).count())
            .sum();

        let complexity_tier = ComplexityTier::classify(total, low_confidence);

        debug!(
            constructs = total,
            cost = heuristic_cost_units,
            tier = %complexity_tier,
            low_confidence,
            "Scan complete"
        );

        ScanFinding {
            is_valid: errors.is_empty(),
            errors,
            construct_counts,
            heuristic_cost_units,
            structural_annotations: annotations,
            complexity_tier,
            low_confidence,
            low_confidence_reasons,
            training_signals,
        }
    }
}

/// Scan with the built-in catalog.
pub fn scan(source: &str) -> ScanFinding {
    PatternScanner::new().scan(source)
}

/// 1-based line of a byte offset.
fn line_of(source: &str, offset: usize) -> usize {
    source[..offset].matches('\n').count() + 1
}

/// Text between an opening paren (already consumed) and its matching close.
/// An unterminated call yields everything to the end of the text.
fn call_arguments(source: &str, start: usize) -> Option<&str> {
    let rest = source.get(start..)?;
    let mut depth = 1usize;
    for (idx, ch) in rest.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&rest[..idx]);
                }
            }
            _ => {}
        }
    }
    Some(rest)
}

fn record_annotation(annotations: &mut Vec<StructuralAnnotation>, rule: &AnnotationRule, line: usize) {
    match annotations.iter_mut().find(|a| a.label == rule.label) {
        Some(existing) => existing.locations.push(line),
        None => annotations.push(StructuralAnnotation {
            label: rule.label.to_string(),
            locations: vec![line],
            advice: rule.advice.to_string(),
        }),
    }
}

/// Compare opening and closing counts per delimiter kind.
fn check_balance(source: &str) -> Vec<String> {
    DELIMITERS
        .iter()
        .filter_map(|(open, close, name)| {
            let opened = source.matches(*open).count();
            let closed = source.matches(*close).count();
            (opened != closed).then(|| {
                format!(
                    "Unbalanced {}: {} '{}' vs {} '{}'",
                    name, opened, open, closed, close
                )
            })
        })
        .collect()
}
