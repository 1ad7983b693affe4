//! Session Preamble
//!
//! Builds the system instruction and the first user turn from the scan
//! findings, the routing decision and the caller's request.

use std::fmt::Write;

use ecoaudit_llm::Message;
use ecoaudit_scanner::ScanFinding;
use ecoaudit_tools::{carbon_intensity, lookup_gpu_profile, CARBON_FOOTPRINT};

use crate::models::request::{AuditRequest, AuditScope, HardwareKind};
use crate::services::routing::RoutingDecision;

const REPORT_SCHEMA: &str = r#"{
  "originalEnergyJoules": number,
  "optimizedEnergyJoules": number,
  "improvementPercentage": number,
  "carbonSavedGrams": number,
  "estimatedHourlyCost": number,
  "costSavingsPer1MInference": number,
  "energyErrorMargin": number,
  "costErrorMargin": number,
  "confidenceScore": number,
  "uncertaintyFactors": [string],
  "citations": [string | {"title": string, "url": string}],
  "assumptions": [string],
  "recommendations": [{"title": string, "gain": string, "reasoning": string, "category": "High" | "Medium" | "Exploratory", "accuracyRisk": string, "estAccuracyDrop": string}],
  "breakdown": [{"component": string, "percentage": number, "joules": number, "color": string}],
  "strategyAnalysis": string,
  "bottleneckAnalysis": string,
  "impactAnalogy": string,
  "reasoning_trace": string,
  "energy_model": string,
  "optimizedCode": string,
  "tradeoffMetrics": {"performanceScore": number, "costEfficiencyScore": number, "carbonEfficiencyScore": number, "accuracySafetyScore": number},
  "benchmarkData": {"found": boolean, "source": string, "device": string, "metric": string, "value": number}
}"#;

/// Outbound context for the first turn.
#[derive(Debug, Clone)]
pub struct Preamble {
    pub system: String,
    pub message: Message,
}

/// Build the preamble.
pub fn build_preamble(
    finding: &ScanFinding,
    route: &RoutingDecision,
    request: &AuditRequest,
    default_region: Option<&str>,
) -> Preamble {
    let system = system_instruction();
    let text = user_text(finding, route, request, default_region);

    let message = match &request.attachment {
        Some(attachment) => Message::user_with_attachment(
            text,
            attachment.media_type.clone(),
            attachment.data_base64.clone(),
        ),
        None => Message::user(text),
    };

    Preamble { system, message }
}

fn system_instruction() -> String {
    format!(
        "You are an ML efficiency auditor. Estimate the energy, cost and carbon \
footprint of the code you are given on the stated hardware, then propose concrete \
optimizations.\n\n\
While you work, narrate your reasoning in short plain-text paragraphs. Before each \
stage of the work write a marker on its own line, for example `[[PHASE: analysis]]`, \
`[[PHASE: benchmarks]]`, `[[PHASE: optimization]]`, `[[PHASE: report]]`.\n\n\
To convert an energy figure into grams of CO2e, call the `{tool}` tool instead of \
computing it yourself.\n\n\
Finish with a single JSON object matching this shape, and nothing after it:\n{schema}\n\n\
Every numeric field is required and must be a finite number.",
        tool = CARBON_FOOTPRINT,
        schema = REPORT_SCHEMA,
    )
}

fn user_text(
    finding: &ScanFinding,
    route: &RoutingDecision,
    request: &AuditRequest,
    default_region: Option<&str>,
) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "## Static scan");
    let _ = writeln!(
        out,
        "Complexity tier: {} (model {}, thinking budget {})",
        route.tier, route.model, route.thinking_budget
    );
    if finding.construct_counts.is_empty() {
        let _ = writeln!(out, "Constructs: none recognized");
    } else {
        let counts: Vec<String> = finding
            .construct_counts
            .iter()
            .map(|(name, n)| format!("{} x{}", name, n))
            .collect();
        let _ = writeln!(out, "Constructs: {}", counts.join(", "));
    }
    let _ = writeln!(
        out,
        "Heuristic cost units: {:.2}",
        finding.heuristic_cost_units
    );
    if finding.training_signals > 0 {
        let _ = writeln!(
            out,
            "Training loop signals: {} (the code trains, not only infers)",
            finding.training_signals
        );
    }
    for annotation in &finding.structural_annotations {
        let lines: Vec<String> = annotation.locations.iter().map(|l| l.to_string()).collect();
        let _ = writeln!(
            out,
            "- {} (lines {}): {}",
            annotation.label,
            lines.join(", "),
            annotation.advice
        );
    }
    if finding.low_confidence {
        let _ = writeln!(
            out,
            "Low confidence: {}. Infer the architecture from the code itself.",
            finding.low_confidence_reasons.join("; ")
        );
    }
    if !finding.is_valid {
        let _ = writeln!(out, "Syntax warnings: {}", finding.errors.join("; "));
    }

    let _ = writeln!(out, "\n## Hardware target");
    let hardware = &request.hardware;
    let _ = writeln!(out, "Name: {}", hardware.name);
    let _ = writeln!(out, "Type: {}", hardware.kind);
    if hardware.kind == HardwareKind::Gpu {
        if let Some(profile) = lookup_gpu_profile(&hardware.name) {
            let _ = writeln!(
                out,
                "Reference profile: {} ({} FP16 TFLOPS, {} W TDP, ${:.2}/hour)",
                profile.name, profile.fp16_tflops, profile.tdp_watts, profile.hourly_cost_usd
            );
        }
    }
    let region = hardware.region.as_deref().or(default_region);
    let intensity = carbon_intensity(region);
    let _ = writeln!(
        out,
        "Grid region: {} ({} gCO2/kWh{})",
        intensity.region,
        intensity.grams_per_kwh,
        if intensity.used_default {
            ", default"
        } else {
            ""
        }
    );
    if let Some(hint) = hardware.intensity {
        let _ = writeln!(out, "Caller carbon intensity hint: {} gCO2/kWh", hint);
    }

    let _ = writeln!(out, "\n## Source");
    let framing = match request.scope {
        AuditScope::Snippet => "The following is a code snippet. Audit it in isolation.",
        AuditScope::Module => {
            "The following is a complete module. Consider how its parts interact end to end."
        }
    };
    let _ = writeln!(out, "{}", framing);
    let _ = writeln!(out, "```\n{}\n```", request.source);
    if request.attachment.is_some() {
        let _ = writeln!(out, "An attachment with supporting material is included.");
    }

    out
}
