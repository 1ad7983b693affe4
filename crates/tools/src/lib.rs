//! EcoAudit Tools
//!
//! Local tools the reasoning backend can call mid-session, plus the
//! reference tables they draw on:
//! - `registry` - closed tool set, request/result records, declarations
//! - `carbon` - energy to CO2e conversion by grid region
//! - `hardware` - accelerator reference profiles
//! - `executor` - `ToolResult`

pub mod carbon;
pub mod executor;
pub mod hardware;
pub mod registry;

pub use carbon::{carbon_footprint, carbon_intensity, CarbonError, CarbonFootprint, CarbonFootprintArgs};
pub use executor::ToolResult;
pub use hardware::{lookup_gpu_profile, GpuProfile, GPU_PROFILES};
pub use registry::{
    execute_tool_call, tool_definitions, RecognizedTool, ToolCallRequest, ToolCallResult,
    CARBON_FOOTPRINT,
};
