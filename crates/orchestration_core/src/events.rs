use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// Event kinds emitted by the engine. Subscribers may also use arbitrary
/// new kind strings; nothing registers kinds up front.
pub const TASK_COMPLETED: &str = "task_completed";
pub const PLAN_COMPLETED: &str = "plan_completed";
pub const PLAN_FAILED: &str = "plan_failed";

/// Envelope handed to event handlers.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorEvent {
    pub kind: String,
    pub payload: Value,
    pub emitted_at: DateTime<Utc>,
}

impl OrchestratorEvent {
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
            emitted_at: Utc::now(),
        }
    }
}
