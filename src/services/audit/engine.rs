//! Audit Engine
//!
//! Entry point for one audit: validates the request, charges the daily
//! allowance, scans and routes the source, then runs sessions under the
//! retry policy until one produces a report or the failure is final.

use std::sync::Arc;

use ecoaudit_llm::{GeminiProvider, LlmProvider};
use ecoaudit_scanner::{scan, ScanFinding};
use serde::Serialize;
use tracing::info;

use crate::models::report::AuditReport;
use crate::models::request::AuditRequest;
use crate::models::settings::{AuditConfig, ENV_API_KEY};
use crate::services::retry::RetryPolicy;
use crate::services::routing::{route, RoutingDecision};
use crate::services::usage::DailyUsageLimiter;
use crate::utils::error::{AuditError, AuditResult};

use super::observer::SessionObserver;
use super::session::AuditSession;

/// Everything an audit produced.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditOutcome {
    pub finding: ScanFinding,
    pub route: RoutingDecision,
    pub report: AuditReport,
    /// Sessions started, including the successful one
    pub attempts: u32,
}

pub struct AuditEngine {
    provider: Arc<dyn LlmProvider>,
    config: AuditConfig,
    limiter: Option<DailyUsageLimiter>,
}

impl AuditEngine {
    /// Engine over any provider. A configured daily limit gets an in-memory counter.
    pub fn new(provider: Arc<dyn LlmProvider>, config: AuditConfig) -> Self {
        let limiter = config
            .daily_audit_limit
            .map(|limit| DailyUsageLimiter::in_memory(Some(limit)));
        Self {
            provider,
            config,
            limiter,
        }
    }

    /// Engine on the Gemini backend. Fails before any network call when
    /// no credential is configured.
    pub fn gemini(config: AuditConfig) -> AuditResult<Self> {
        let has_key = config
            .provider
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty());
        if !has_key {
            return Err(AuditError::input(format!(
                "no API key configured; set {} or provider.api_key",
                ENV_API_KEY
            )));
        }
        let provider = GeminiProvider::new(config.provider.clone())?;
        Ok(Self::new(Arc::new(provider), config))
    }

    /// Replace the usage limiter.
    pub fn with_limiter(mut self, limiter: DailyUsageLimiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    pub fn config(&self) -> &AuditConfig {
        &self.config
    }

    /// Run one audit.
    pub async fn audit(
        &self,
        request: &AuditRequest,
        observer: &dyn SessionObserver,
    ) -> AuditResult<AuditOutcome> {
        request.validate()?;
        if let Some(limiter) = &self.limiter {
            limiter.try_acquire()?;
        }

        let finding = scan(&request.source);
        let decision = route(&finding, &self.config.routing);
        info!(
            tier = %decision.tier,
            model = %decision.model,
            constructs = finding.total_constructs(),
            "Starting audit"
        );

        let policy = RetryPolicy::from_config(&self.config.retry);
        let provider = &self.provider;
        let config = &self.config;
        let finding_ref = &finding;
        let decision_ref = &decision;
        let mut attempts = 1;

        let report = policy
            .run_observed(
                |attempt, delay| {
                    attempts = attempt;
                    observer.on_retry(attempt, delay);
                },
                move || async move {
                    let mut session = AuditSession::new(provider.clone(), config, observer);
                    session.run(finding_ref, decision_ref, request).await
                },
            )
            .await?;

        info!(attempts, "Audit complete");
        Ok(AuditOutcome {
            finding,
            route: decision,
            report,
            attempts,
        })
    }
}
