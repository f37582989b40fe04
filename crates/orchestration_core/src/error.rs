use thiserror::Error;

/// Errors produced by the orchestration engine.
///
/// Task-level failures (`AgentNotFound`, `Timeout`, `Execution`) are folded
/// into the owning task's outcome by the executor and never escape the
/// scheduler. Only `InvalidPlan` is surfaced to the `execute_plan` caller.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Task timeout after {0} seconds")]
    Timeout(u64),

    #[error("agent execution failed: {0}")]
    Execution(String),
}

/// Error returned by an agent's `run` capability.
///
/// Opaque to the engine: every `AgentRunError` is treated as a retryable
/// execution failure.
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct AgentRunError(pub String);

impl AgentRunError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<String> for AgentRunError {
    fn from(message: String) -> Self {
        Self(message)
    }
}

impl From<&str> for AgentRunError {
    fn from(message: &str) -> Self {
        Self(message.to_string())
    }
}
