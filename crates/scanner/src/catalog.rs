//! Pattern Catalog
//!
//! The fixed tables the scanner works from: construct signatures with their
//! per-occurrence cost weights, the argument-sensitive annotation rules that
//! run on matched occurrences, and the abstraction detectors that flag code
//! a surface scan cannot see through.
//!
//! Signatures are tuned for PyTorch (`nn.*`) and Keras (`layers.*`) model
//! definitions. Text from any other language simply matches nothing.

use regex::Regex;
use std::sync::OnceLock;

/// A textual signature counted as one occurrence of a named construct.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstructPattern {
    /// Name reported in `constructCounts`
    pub name: &'static str,
    /// Case-sensitive literal searched for, ending in the opening paren
    pub signature: &'static str,
    /// Heuristic cost added per occurrence
    pub weight: f64,
}

impl ConstructPattern {
    pub const fn new(name: &'static str, signature: &'static str, weight: f64) -> Self {
        Self {
            name,
            signature,
            weight,
        }
    }
}

/// Default construct catalog.
pub fn default_constructs() -> Vec<ConstructPattern> {
    vec![
        // PyTorch
        ConstructPattern::new("Conv", "nn.Conv2d(", 0.5),
        ConstructPattern::new("Conv1d", "nn.Conv1d(", 0.2),
        ConstructPattern::new("Conv3d", "nn.Conv3d(", 1.5),
        ConstructPattern::new("ConvTranspose", "nn.ConvTranspose2d(", 0.6),
        ConstructPattern::new("Linear", "nn.Linear(", 0.1),
        ConstructPattern::new("BatchNorm", "nn.BatchNorm", 0.01),
        ConstructPattern::new("LayerNorm", "nn.LayerNorm(", 0.01),
        ConstructPattern::new("LSTM", "nn.LSTM(", 0.8),
        ConstructPattern::new("GRU", "nn.GRU(", 0.6),
        ConstructPattern::new("Attention", "nn.MultiheadAttention(", 1.0),
        ConstructPattern::new("TransformerEncoder", "nn.TransformerEncoderLayer(", 2.0),
        ConstructPattern::new("TransformerDecoder", "nn.TransformerDecoderLayer(", 2.5),
        ConstructPattern::new("Embedding", "nn.Embedding(", 0.05),
        ConstructPattern::new("Pooling", "nn.MaxPool2d(", 0.02),
        ConstructPattern::new("Pooling", "nn.AvgPool2d(", 0.02),
        // Keras
        ConstructPattern::new("Conv", "layers.Conv2D(", 0.5),
        ConstructPattern::new("Linear", "layers.Dense(", 0.1),
        ConstructPattern::new("BatchNorm", "layers.BatchNormalization(", 0.01),
        ConstructPattern::new("LSTM", "layers.LSTM(", 0.8),
        ConstructPattern::new("Attention", "layers.MultiHeadAttention(", 1.0),
    ]
}

// ============================================================================
// Call arguments
// ============================================================================

/// Arguments of one matched call, split at top-level commas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs<'a> {
    pub positional: Vec<&'a str>,
    pub keywords: Vec<(&'a str, &'a str)>,
}

impl<'a> CallArgs<'a> {
    /// Parse the text between a call's parentheses.
    pub fn parse(inner: &'a str) -> Self {
        let mut args = CallArgs::default();
        for part in split_top_level(inner) {
            let part = part.trim();
            if part.is_empty() {
                continue;
            }
            match keyword_split(part) {
                Some((key, value)) => args.keywords.push((key, value)),
                None => args.positional.push(part),
            }
        }
        args
    }

    /// Keyword value by any of the given names.
    pub fn keyword(&self, names: &[&str]) -> Option<&'a str> {
        self.keywords
            .iter()
            .find(|(k, _)| names.contains(k))
            .map(|(_, v)| *v)
    }

    /// Keyword value, falling back to a positional slot.
    pub fn value(&self, names: &[&str], position: usize) -> Option<&'a str> {
        self.keyword(names)
            .or_else(|| self.positional.get(position).copied())
    }
}

/// Split on commas that are not nested inside brackets.
fn split_top_level(inner: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (idx, ch) in inner.char_indices() {
        match ch {
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(&inner[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&inner[start..]);
    parts
}

/// `name=value` at the top level; `==` comparisons are not keywords.
fn keyword_split(part: &str) -> Option<(&str, &str)> {
    let eq = part.find('=')?;
    if part[eq + 1..].starts_with('=') {
        return None;
    }
    let key = part[..eq].trim();
    if key.is_empty() || !key.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return None;
    }
    Some((key, part[eq + 1..].trim()))
}

/// First unsigned integer literal in a value such as `3`, `(7, 7)` or `[2,2]`.
pub fn leading_int(value: &str) -> Option<u64> {
    let digits: String = value
        .trim_start_matches(|c: char| c == '(' || c == '[' || c.is_whitespace())
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

// ============================================================================
// Annotation rules
// ============================================================================

/// Secondary rule evaluated against the arguments of a matched construct.
pub struct AnnotationRule {
    pub label: &'static str,
    /// Construct names this rule applies to
    pub applies_to: &'static [&'static str],
    pub advice: &'static str,
    pub predicate: fn(&CallArgs<'_>) -> bool,
}

fn is_strided(args: &CallArgs<'_>) -> bool {
    args.value(&["stride", "strides"], 3)
        .and_then(leading_int)
        .is_some_and(|s| s > 1)
}

fn is_grouped(args: &CallArgs<'_>) -> bool {
    match args.keyword(&["groups"]) {
        Some(value) => leading_int(value) != Some(1),
        None => false,
    }
}

fn has_large_kernel(args: &CallArgs<'_>) -> bool {
    args.value(&["kernel_size"], 2)
        .and_then(leading_int)
        .is_some_and(|k| k >= 7)
}

/// Widest of the first two positional arguments (in/out features or channels).
fn widest_dimension(args: &CallArgs<'_>) -> Option<u64> {
    args.positional.iter().take(2).filter_map(|v| leading_int(v)).max()
}

fn is_wide_conv(args: &CallArgs<'_>) -> bool {
    widest_dimension(args).is_some_and(|c| c >= 100)
}

fn is_wide_linear(args: &CallArgs<'_>) -> bool {
    widest_dimension(args).is_some_and(|c| c >= 1000)
}

fn is_bidirectional(args: &CallArgs<'_>) -> bool {
    args.keyword(&["bidirectional"]) == Some("True")
}

/// Default annotation rules.
pub fn default_annotation_rules() -> Vec<AnnotationRule> {
    vec![
        AnnotationRule {
            label: "Strided Convolution",
            applies_to: &["Conv", "Conv1d", "Conv3d"],
            advice: "Stride > 1 downsamples inside the convolution. Check the stride is \
                     intentional; moving it earlier in the network shrinks every later \
                     activation map and cuts downstream FLOPs.",
            predicate: is_strided,
        },
        AnnotationRule {
            label: "Grouped Convolution",
            applies_to: &["Conv", "Conv1d", "Conv3d"],
            advice: "Grouped and depthwise convolutions reduce FLOPs but are often \
                     memory-bound on GPUs. Benchmark against a dense convolution before \
                     assuming a speedup.",
            predicate: is_grouped,
        },
        AnnotationRule {
            label: "Large Kernel",
            applies_to: &["Conv", "Conv1d", "Conv3d"],
            advice: "Kernels of 7 or wider dominate FLOPs. Two stacked 3x3 kernels cover a \
                     5x5 receptive field at 72% of the cost.",
            predicate: has_large_kernel,
        },
        AnnotationRule {
            label: "Wide Layer",
            applies_to: &["Conv", "Conv3d"],
            advice: "Very wide layers dominate parameter count and memory traffic. Consider \
                     low-rank factorization, pruning, or mixed precision (FP16/BF16).",
            predicate: is_wide_conv,
        },
        AnnotationRule {
            label: "Wide Layer",
            applies_to: &["Linear"],
            advice: "Very wide layers dominate parameter count and memory traffic. Consider \
                     low-rank factorization, pruning, or mixed precision (FP16/BF16).",
            predicate: is_wide_linear,
        },
        AnnotationRule {
            label: "Bidirectional Recurrence",
            applies_to: &["LSTM", "GRU"],
            advice: "Bidirectional recurrence doubles sequential compute. Confirm the task \
                     needs future context, or replace the recurrence with attention.",
            predicate: is_bidirectional,
        },
    ]
}

// ============================================================================
// Abstraction detectors
// ============================================================================

/// Existence check for an idiom that hides structure from a text scan.
struct AbstractionDetector {
    reason: &'static str,
    regex: Regex,
}

const ABSTRACTION_PATTERNS: &[(&str, &str)] = &[
    (
        "factory method builds layers indirectly",
        r"(?m)^\s*def\s+_?(make|build|create|get)_\w*\s*\(",
    ),
    (
        "variadic *args/**kwargs forwarding",
        r"\*\*kwargs|\*args\b",
    ),
    (
        "layer shapes injected from configuration",
        r"\b(cfg|config|hparams|opt)\s*(\.\s*[A-Za-z_]|\[)|instantiate\(|getattr\(\s*nn\s*,",
    ),
    (
        "layers collected in a loop",
        r"(?m)^\s*for\s+[^\n]+:\s*\n\s+[\w\.]+\.append\(|nn\.(ModuleList|Sequential)\(\s*\*?\s*\[[^\]]*\bfor\b|nn\.Sequential\(\s*\*",
    ),
];

fn abstraction_detectors() -> &'static Vec<AbstractionDetector> {
    static DETECTORS: OnceLock<Vec<AbstractionDetector>> = OnceLock::new();
    DETECTORS.get_or_init(|| {
        ABSTRACTION_PATTERNS
            .iter()
            .filter_map(|(reason, pattern)| {
                Regex::new(pattern)
                    .ok()
                    .map(|regex| AbstractionDetector { reason, regex })
            })
            .collect()
    })
}

/// Reasons for every abstraction detector that fires, in catalog order.
pub fn detect_abstractions(source: &str) -> Vec<&'static str> {
    abstraction_detectors()
        .iter()
        .filter(|d| d.regex.is_match(source))
        .map(|d| d.reason)
        .collect()
}

fn class_definition_regex() -> Option<&'static Regex> {
    static CLASS_DEF: OnceLock<Option<Regex>> = OnceLock::new();
    CLASS_DEF
        .get_or_init(|| Regex::new(r"(?m)^\s*class\s+\w+\s*[\(:]").ok())
        .as_ref()
}

/// Number of class/module definitions in the source.
pub fn count_class_definitions(source: &str) -> usize {
    class_definition_regex()
        .map(|re| re.find_iter(source).count())
        .unwrap_or(0)
}

/// Training-loop call sites.
pub const TRAINING_SIGNATURES: &[&str] = &[
    ".backward()",
    "optimizer.step()",
    "model.fit(",
    "tf.GradientTape(",
    "optimizer.apply_gradients(",
];
