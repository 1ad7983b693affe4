//! Audit Report Model
//!
//! The terminal artifact of a session. Field names are fixed by downstream
//! consumers, so most are camelCase while a few stay snake_case.

use serde::{Deserialize, Serialize};

/// Priority bucket for a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecommendationCategory {
    High,
    Medium,
    Exploratory,
}

/// One suggested optimization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub title: String,
    /// Expected gain, free text (e.g. "~35% energy")
    pub gain: String,
    pub reasoning: String,
    pub category: RecommendationCategory,
    #[serde(default)]
    pub accuracy_risk: String,
    #[serde(default)]
    pub est_accuracy_drop: String,
}

/// Share of energy attributed to one component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakdownEntry {
    pub component: String,
    pub percentage: f64,
    pub joules: f64,
    #[serde(default)]
    pub color: String,
}

/// Normalized 0-100 scores across the tradeoff axes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradeoffMetrics {
    pub performance_score: f64,
    pub cost_efficiency_score: f64,
    pub carbon_efficiency_score: f64,
    pub accuracy_safety_score: f64,
}

/// Published benchmark the backend found for the workload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkData {
    pub found: bool,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub device: String,
    #[serde(default)]
    pub metric: String,
    #[serde(default)]
    pub value: f64,
}

/// A citation as either bare text or a titled link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Citation {
    Text(String),
    Link {
        title: String,
        #[serde(default)]
        url: String,
    },
}

/// Final structured report of one audit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditReport {
    pub original_energy_joules: f64,
    pub optimized_energy_joules: f64,
    pub improvement_percentage: f64,
    pub carbon_saved_grams: f64,
    pub estimated_hourly_cost: f64,
    #[serde(rename = "costSavingsPer1MInference")]
    pub cost_savings_per_1m_inference: f64,
    pub energy_error_margin: f64,
    pub cost_error_margin: f64,
    pub confidence_score: f64,

    #[serde(default)]
    pub uncertainty_factors: Vec<String>,
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(default)]
    pub assumptions: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<Recommendation>,
    #[serde(default)]
    pub breakdown: Vec<BreakdownEntry>,

    #[serde(default)]
    pub strategy_analysis: String,
    #[serde(default)]
    pub bottleneck_analysis: String,
    #[serde(default)]
    pub impact_analogy: String,
    #[serde(rename = "reasoning_trace", default)]
    pub reasoning_trace: String,
    #[serde(rename = "energy_model", default)]
    pub energy_model: String,
    #[serde(default)]
    pub optimized_code: String,

    pub tradeoff_metrics: TradeoffMetrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benchmark_data: Option<BenchmarkData>,
}

impl AuditReport {
    /// Check that every numeric field is finite.
    ///
    /// Returns the name of the first offending field.
    pub fn validate(&self) -> Result<(), String> {
        let mut numbers: Vec<(&str, f64)> = vec![
            ("originalEnergyJoules", self.original_energy_joules),
            ("optimizedEnergyJoules", self.optimized_energy_joules),
            ("improvementPercentage", self.improvement_percentage),
            ("carbonSavedGrams", self.carbon_saved_grams),
            ("estimatedHourlyCost", self.estimated_hourly_cost),
            ("costSavingsPer1MInference", self.cost_savings_per_1m_inference),
            ("energyErrorMargin", self.energy_error_margin),
            ("costErrorMargin", self.cost_error_margin),
            ("confidenceScore", self.confidence_score),
            ("tradeoffMetrics.performanceScore", self.tradeoff_metrics.performance_score),
            ("tradeoffMetrics.costEfficiencyScore", self.tradeoff_metrics.cost_efficiency_score),
            ("tradeoffMetrics.carbonEfficiencyScore", self.tradeoff_metrics.carbon_efficiency_score),
            ("tradeoffMetrics.accuracySafetyScore", self.tradeoff_metrics.accuracy_safety_score),
        ];
        for entry in &self.breakdown {
            numbers.push(("breakdown.percentage", entry.percentage));
            numbers.push(("breakdown.joules", entry.joules));
        }
        if let Some(benchmark) = &self.benchmark_data {
            numbers.push(("benchmarkData.value", benchmark.value));
        }

        match numbers.into_iter().find(|(_, value)| !value.is_finite()) {
            Some((field, value)) => Err(format!("{} is not finite ({})", field, value)),
            None => Ok(()),
        }
    }
}
