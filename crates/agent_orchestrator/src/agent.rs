use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use orchestration_core::{AgentRunError, Parameters};

/// The single capability every registered agent must expose.
///
/// The engine treats `task_type` and `parameters` as opaque; any error the
/// agent returns counts as a retryable execution failure.
#[async_trait]
pub trait Agent: Send + Sync {
    async fn run(&self, task_type: &str, parameters: &Parameters)
        -> Result<Value, AgentRunError>;
}

pub type SharedAgent = Arc<dyn Agent>;
