//! EcoAudit LLM
//!
//! Transport to the reasoning backend:
//! - `provider` - the `LlmProvider` trait and HTTP error mapping
//! - `gemini` - streaming Gemini provider with function calling
//! - `scripted` - replay provider for tests and offline demos
//! - `streaming_adapters` - SSE line to unified event adapters
//! - `http_client` - reqwest client factory with proxy support

pub mod gemini;
pub mod http_client;
pub mod provider;
pub mod scripted;
pub mod streaming_adapters;
pub mod types;

// Re-export main types
pub use gemini::GeminiProvider;
pub use http_client::build_http_client;
pub use provider::{missing_api_key_error, parse_http_error, LlmProvider};
pub use scripted::{RecordedRequest, ScriptedProvider, ScriptedTurn};
pub use streaming_adapters::GeminiAdapter;
pub use types::*;
