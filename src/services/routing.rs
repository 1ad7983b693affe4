//! Routing Policy
//!
//! Maps a scan's complexity tier to the backend model and thinking budget
//! used for the session.

use serde::Serialize;

use ecoaudit_llm::LlmRequestOptions;
use ecoaudit_scanner::{ComplexityTier, ScanFinding};

use crate::models::settings::{AuditConfig, RoutingConfig};

/// Where a session is sent.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingDecision {
    pub tier: ComplexityTier,
    pub model: String,
    pub thinking_budget: u32,
}

impl RoutingDecision {
    /// Request options for every turn of a session routed here.
    pub fn request_options(&self, config: &AuditConfig) -> LlmRequestOptions {
        LlmRequestOptions {
            model_override: Some(self.model.clone()),
            thinking_budget: Some(self.thinking_budget),
            enable_web_search: config.enable_web_search,
            enable_code_execution: config.enable_code_execution,
            ..LlmRequestOptions::default()
        }
    }
}

/// Choose the route for a finding.
pub fn route(finding: &ScanFinding, routing: &RoutingConfig) -> RoutingDecision {
    let tier = finding.complexity_tier;
    let target = routing.route(tier);
    RoutingDecision {
        tier,
        model: target.model.clone(),
        thinking_budget: target.thinking_budget,
    }
}
