//! Services
//!
//! Engine logic on top of the scanner, transport and tool crates.

pub mod audit;
pub mod retry;
pub mod routing;
pub mod usage;

pub use audit::{AuditEngine, AuditOutcome, AuditSession, SessionObserver, SessionState};
pub use retry::{classify_failure, classify_llm_error, with_retry, FailureClass, RetryPolicy};
pub use routing::{route, RoutingDecision};
pub use usage::{Clock, DailyUsageLimiter, InMemoryUsageStore, SystemClock, UsageStore};
