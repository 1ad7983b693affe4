//! Settings Models
//!
//! Engine configuration stored in config.json.

use serde::{Deserialize, Serialize};

use ecoaudit_core::{CoreError, CoreResult};
use ecoaudit_llm::ProviderConfig;
use ecoaudit_scanner::ComplexityTier;

/// Environment variable holding the backend credential
pub const ENV_API_KEY: &str = "GEMINI_API_KEY";
/// Environment variable overriding the default model
pub const ENV_MODEL: &str = "ECOAUDIT_MODEL";
/// Environment variable overriding the default grid region
pub const ENV_REGION: &str = "ECOAUDIT_REGION";

/// Model and thinking budget for one complexity tier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierRoute {
    pub model: String,
    /// Thinking budget in tokens (0 disables thinking)
    pub thinking_budget: u32,
}

impl TierRoute {
    fn new(model: &str, thinking_budget: u32) -> Self {
        Self {
            model: model.to_string(),
            thinking_budget,
        }
    }
}

/// Per-tier routing table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingConfig {
    pub low: TierRoute,
    pub medium: TierRoute,
    pub high: TierRoute,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            low: TierRoute::new("gemini-2.5-flash", 2048),
            medium: TierRoute::new("gemini-2.5-flash", 8192),
            high: TierRoute::new("gemini-2.5-pro", 24576),
        }
    }
}

impl RoutingConfig {
    /// Route for a tier
    pub fn route(&self, tier: ComplexityTier) -> &TierRoute {
        match tier {
            ComplexityTier::Low => &self.low,
            ComplexityTier::Medium => &self.medium,
            ComplexityTier::High => &self.high,
        }
    }
}

/// Retry settings for transient backend failures
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            initial_delay_ms: 2000,
        }
    }
}

/// Engine configuration stored in config.json
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Backend connection settings
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    /// Upper bound on tool rounds per session
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: u32,
    /// Attach the backend's web search
    #[serde(default = "default_true")]
    pub enable_web_search: bool,
    /// Attach the backend's sandboxed code execution
    #[serde(default)]
    pub enable_code_execution: bool,
    /// Audits allowed per calendar day (`None` = unlimited)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily_audit_limit: Option<u32>,
    /// Grid region used when a request gives none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_region: Option<String>,
}

fn default_max_tool_rounds() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            routing: RoutingConfig::default(),
            retry: RetryConfig::default(),
            max_tool_rounds: default_max_tool_rounds(),
            enable_web_search: true,
            enable_code_execution: false,
            daily_audit_limit: None,
            default_region: None,
        }
    }
}

impl AuditConfig {
    /// Apply environment overrides from the process environment
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply environment overrides from any lookup function
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup(ENV_API_KEY).filter(|v| !v.is_empty()) {
            self.provider.api_key = Some(key);
        }
        if let Some(model) = lookup(ENV_MODEL).filter(|v| !v.is_empty()) {
            self.provider.model = model.clone();
            self.routing.low.model = model.clone();
            self.routing.medium.model = model.clone();
            self.routing.high.model = model;
        }
        if let Some(region) = lookup(ENV_REGION).filter(|v| !v.is_empty()) {
            self.default_region = Some(region);
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> CoreResult<()> {
        if self.max_tool_rounds == 0 {
            return Err(CoreError::config("max_tool_rounds must be at least 1"));
        }

        if self.provider.model.trim().is_empty() {
            return Err(CoreError::config("provider.model must not be empty"));
        }

        for (tier, route) in [
            ("low", &self.routing.low),
            ("medium", &self.routing.medium),
            ("high", &self.routing.high),
        ] {
            if route.model.trim().is_empty() {
                return Err(CoreError::config(format!(
                    "routing.{}.model must not be empty",
                    tier
                )));
            }
        }

        if self.retry.initial_delay_ms == 0 {
            return Err(CoreError::config(
                "retry.initial_delay_ms must be greater than 0",
            ));
        }

        if !(0.0..=2.0).contains(&self.provider.temperature) {
            return Err(CoreError::config(format!(
                "Invalid temperature: {}. Must be between 0.0 and 2.0",
                self.provider.temperature
            )));
        }

        Ok(())
    }
}
