//! Shared fixtures for integration tests.

use std::sync::Mutex;
use std::time::Duration;

use ecoaudit::models::request::{AuditRequest, HardwareKind, HardwareTarget};
use ecoaudit::services::audit::{SessionObserver, SessionState};

/// A complete, valid report body.
pub const REPORT_JSON: &str = r##"{
  "originalEnergyJoules": 1800.0,
  "optimizedEnergyJoules": 1100.0,
  "improvementPercentage": 38.9,
  "carbonSavedGrams": 0.058,
  "estimatedHourlyCost": 0.5,
  "costSavingsPer1MInference": 3.4,
  "energyErrorMargin": 25.0,
  "costErrorMargin": 20.0,
  "confidenceScore": 0.64,
  "uncertaintyFactors": ["batch size not stated"],
  "citations": ["NVIDIA T4 datasheet"],
  "assumptions": ["fp16 inference"],
  "recommendations": [{
    "title": "Fuse conv and batch norm",
    "gain": "~12% energy",
    "reasoning": "Removes one memory pass per block",
    "category": "High",
    "accuracyRisk": "None",
    "estAccuracyDrop": "0%"
  }],
  "breakdown": [{"component": "Conv", "percentage": 90.0, "joules": 1620.0, "color": "#10b981"}],
  "strategyAnalysis": "Fuse, then quantize",
  "bottleneckAnalysis": "Memory bound",
  "impactAnalogy": "A phone charge per million inferences",
  "reasoning_trace": "Counted two convolutions",
  "energy_model": "FLOPs x J/FLOP",
  "optimizedCode": "",
  "tradeoffMetrics": {
    "performanceScore": 78,
    "costEfficiencyScore": 71,
    "carbonEfficiencyScore": 74,
    "accuracySafetyScore": 96
  }
}"##;

pub const SIMPLE_NET: &str = r#"import torch.nn as nn

class SimpleNet(nn.Module):
    def __init__(self):
        super().__init__()
        self.conv1 = nn.Conv2d(3, 64, 3)
        self.conv2 = nn.Conv2d(64, 64, 3)
        self.bn = nn.BatchNorm2d(64)
"#;

pub fn t4_request(source: &str) -> AuditRequest {
    AuditRequest::new(
        source,
        HardwareTarget {
            name: "NVIDIA T4".to_string(),
            kind: HardwareKind::Gpu,
            region: Some("eu-west".to_string()),
            intensity: None,
        },
    )
}

/// Observer that records everything it is told.
#[derive(Default)]
pub struct RecordingObserver {
    pub narration: Mutex<Vec<String>>,
    pub phases: Mutex<Vec<String>>,
    pub states: Mutex<Vec<SessionState>>,
    pub retries: Mutex<Vec<(u32, Duration)>>,
}

impl RecordingObserver {
    pub fn narration_text(&self) -> String {
        self.narration.lock().unwrap().concat()
    }

    pub fn phases(&self) -> Vec<String> {
        self.phases.lock().unwrap().clone()
    }

    pub fn states(&self) -> Vec<SessionState> {
        self.states.lock().unwrap().clone()
    }

    pub fn count_state(&self, state: SessionState) -> usize {
        self.states().iter().filter(|s| **s == state).count()
    }
}

impl SessionObserver for RecordingObserver {
    fn on_narration(&self, text: &str) {
        self.narration.lock().unwrap().push(text.to_string());
    }

    fn on_control_event(&self, phase: &str) {
        self.phases.lock().unwrap().push(phase.to_string());
    }

    fn on_state(&self, state: SessionState) {
        self.states.lock().unwrap().push(state);
    }

    fn on_retry(&self, attempt: u32, delay: Duration) {
        self.retries.lock().unwrap().push((attempt, delay));
    }
}
