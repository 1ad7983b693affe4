//! Data Models
//!
//! Request, report, and configuration types for the audit engine.

pub mod report;
pub mod request;
pub mod settings;

pub use report::*;
pub use request::*;
pub use settings::*;
