//! EcoAudit - hybrid efficiency audit engine
//!
//! A local pattern scan of ML model code feeds a streamed session with a
//! reasoning backend, which may call local tools before returning a
//! structured energy, cost and carbon report.
//! - `models` - request, report and settings types
//! - `services` - routing, session orchestration, retries, usage limits
//! - `storage` - config persistence
//! - `utils` - errors and paths

pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

pub use models::report::AuditReport;
pub use models::request::{AuditRequest, AuditScope, HardwareKind, HardwareTarget};
pub use models::settings::AuditConfig;
pub use services::{AuditEngine, AuditOutcome, SessionObserver, SessionState};
pub use utils::error::{AuditError, AuditResult};
