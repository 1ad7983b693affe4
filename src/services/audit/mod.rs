//! Audit Session Orchestration
//!
//! - `engine` - request validation, usage limit, scan, routing and retries
//! - `session` - the streaming state machine for one attempt
//! - `preamble` - first-turn context built from the scan
//! - `markers` - `[[PHASE: name]]` filtering over streamed text
//! - `extraction` - report recovery from the final turn
//! - `observer` - narration and state callbacks

pub mod engine;
pub mod extraction;
pub mod markers;
pub mod observer;
pub mod preamble;
pub mod session;

pub use engine::{AuditEngine, AuditOutcome};
pub use extraction::{extract_report, payload_slice};
pub use markers::{strip_markers, FilterEvent, MarkerFilter};
pub use observer::{ChannelObserver, NoopObserver, SessionObserver, SessionState};
pub use preamble::{build_preamble, Preamble};
pub use session::AuditSession;
