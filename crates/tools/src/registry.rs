//! Local Tool Registry
//!
//! The backend may ask for any tool name. Only names in the closed
//! `RecognizedTool` set are executed; anything else classifies as
//! `Unrecognized` and is skipped by the caller.

use std::collections::HashMap;

use ecoaudit_llm::{ParameterSchema, ToolDefinition};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::carbon::{carbon_footprint, CarbonFootprintArgs};
use crate::executor::ToolResult;

/// Registered name of the carbon conversion tool.
pub const CARBON_FOOTPRINT: &str = "carbon_footprint";

/// A tool invocation requested by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Result of running a recognized tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    pub id: String,
    pub name: String,
    pub result_payload: serde_json::Value,
}

/// Closed set of tools the engine knows how to run.
#[derive(Debug, Clone, PartialEq)]
pub enum RecognizedTool {
    CarbonFootprint(serde_json::Value),
    /// Name outside the registry
    Unrecognized(String),
}

impl RecognizedTool {
    /// Classify a request by name.
    pub fn classify(request: &ToolCallRequest) -> Self {
        match request.name.as_str() {
            CARBON_FOOTPRINT => RecognizedTool::CarbonFootprint(request.arguments.clone()),
            other => RecognizedTool::Unrecognized(other.to_string()),
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, RecognizedTool::Unrecognized(_))
    }

    /// Run the tool. `None` for unrecognized names.
    pub fn execute(&self) -> Option<ToolResult> {
        match self {
            RecognizedTool::CarbonFootprint(raw) => {
                let result = CarbonFootprintArgs::from_value(raw)
                    .and_then(|args| carbon_footprint(&args));
                Some(match result {
                    Ok(footprint) => match serde_json::to_value(&footprint) {
                        Ok(value) => ToolResult::ok(value),
                        Err(e) => ToolResult::err(e.to_string()),
                    },
                    Err(e) => ToolResult::err(e.to_string()),
                })
            }
            RecognizedTool::Unrecognized(_) => None,
        }
    }
}

/// Execute one request. Returns `None` when the name is not registered.
pub fn execute_tool_call(request: &ToolCallRequest) -> Option<ToolCallResult> {
    let tool = RecognizedTool::classify(request);
    let result = tool.execute()?;
    debug!(tool = %request.name, id = %request.id, success = result.success, "Tool executed");
    Some(ToolCallResult {
        id: request.id.clone(),
        name: request.name.clone(),
        result_payload: result.to_content(),
    })
}

/// Declarations advertised to the backend.
pub fn tool_definitions() -> Vec<ToolDefinition> {
    let mut properties = HashMap::new();
    properties.insert(
        "energy_joules".to_string(),
        ParameterSchema::number(Some("Energy consumed, in joules")),
    );
    properties.insert(
        "energy_kwh".to_string(),
        ParameterSchema::number(Some("Energy consumed, in kilowatt-hours (alternative to energy_joules)")),
    );
    properties.insert(
        "region".to_string(),
        ParameterSchema::string(Some(
            "Grid region: us-west, us-east, eu-west, eu-north, asia-east. Unknown values use a global default.",
        )),
    );

    vec![ToolDefinition {
        name: CARBON_FOOTPRINT.to_string(),
        description: "Convert an energy amount into grams of CO2e using the regional grid carbon intensity.".to_string(),
        input_schema: ParameterSchema::object(None, properties, vec![]),
    }]
}
