//! Session Observation
//!
//! Callbacks a host passes into a session to receive narration, phase
//! markers, state transitions and retry notices as they happen.

use std::fmt;
use std::time::Duration;

use ecoaudit_core::streaming::UnifiedStreamEvent;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Orchestrator state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Preamble,
    Streaming,
    ToolExecuting,
    Extracting,
    Done,
    Failed,
}

impl SessionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Preamble => "preamble",
            SessionState::Streaming => "streaming",
            SessionState::ToolExecuting => "tool_executing",
            SessionState::Extracting => "extracting",
            SessionState::Done => "done",
            SessionState::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionState::Done | SessionState::Failed)
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver of session notifications.
pub trait SessionObserver: Send + Sync {
    /// Narration text with control markers already removed.
    fn on_narration(&self, text: &str);

    /// One `[[PHASE: name]]` marker, once per occurrence.
    fn on_control_event(&self, phase: &str);

    fn on_state(&self, _state: SessionState) {}

    /// A retry is about to start after `delay`.
    fn on_retry(&self, _attempt: u32, _delay: Duration) {}
}

/// Observer that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn on_narration(&self, _text: &str) {}
    fn on_control_event(&self, _phase: &str) {}
}

/// Observer that forwards notifications onto a stream-event channel.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<UnifiedStreamEvent>,
}

impl ChannelObserver {
    pub fn new(tx: mpsc::UnboundedSender<UnifiedStreamEvent>) -> Self {
        Self { tx }
    }

    /// Observer plus the receiving end of its channel.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<UnifiedStreamEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    fn send(&self, event: UnifiedStreamEvent) {
        // Receiver gone means nobody is listening any more
        let _ = self.tx.send(event);
    }
}

impl SessionObserver for ChannelObserver {
    fn on_narration(&self, text: &str) {
        self.send(UnifiedStreamEvent::TextDelta {
            content: text.to_string(),
        });
    }

    fn on_control_event(&self, phase: &str) {
        self.send(UnifiedStreamEvent::PhaseChange {
            phase: phase.to_string(),
        });
    }

    fn on_state(&self, state: SessionState) {
        self.send(UnifiedStreamEvent::SessionState {
            state: state.to_string(),
        });
    }

    fn on_retry(&self, attempt: u32, delay: Duration) {
        self.send(UnifiedStreamEvent::Retrying {
            attempt,
            delay_ms: delay.as_millis() as u64,
            message: format!("retrying in {}ms", delay.as_millis()),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_observer_maps_events() {
        let (observer, mut rx) = ChannelObserver::channel();
        observer.on_narration("hello");
        observer.on_control_event("analysis");
        observer.on_state(SessionState::ToolExecuting);
        observer.on_retry(2, Duration::from_millis(2000));

        assert_eq!(
            rx.try_recv().unwrap(),
            UnifiedStreamEvent::TextDelta {
                content: "hello".to_string()
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            UnifiedStreamEvent::PhaseChange {
                phase: "analysis".to_string()
            }
        );
        assert_eq!(
            rx.try_recv().unwrap(),
            UnifiedStreamEvent::SessionState {
                state: "tool_executing".to_string()
            }
        );
        match rx.try_recv().unwrap() {
            UnifiedStreamEvent::Retrying {
                attempt, delay_ms, ..
            } => {
                assert_eq!(attempt, 2);
                assert_eq!(delay_ms, 2000);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_closed_channel_is_ignored() {
        let (observer, rx) = ChannelObserver::channel();
        drop(rx);
        observer.on_narration("nobody listening");
    }

    #[test]
    fn test_terminal_states() {
        assert!(SessionState::Done.is_terminal());
        assert!(SessionState::Failed.is_terminal());
        assert!(!SessionState::Streaming.is_terminal());
    }
}
