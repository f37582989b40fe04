use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::json;
use tokio::time::{sleep, timeout};

use orchestration_core::{events, OrchestratorError, Task, TaskOutcome, TaskStatus};

use crate::notifier::EventNotifier;
use crate::registry::AgentRegistry;

/// Snapshot of the task currently (or last) occupying an agent. Kept after
/// the task finishes until the same agent starts its next one.
#[derive(Debug, Clone, Serialize)]
pub struct ActiveTask {
    pub task_id: String,
    pub agent_id: String,
    pub status: TaskStatus,
    pub started_at: DateTime<Utc>,
    pub timeout_secs: u64,
}

impl ActiveTask {
    /// Timeout-relative progress estimate, not a measurement of work done:
    /// capped at 99 while running, 100 once completed, 0 otherwise.
    pub fn progress(&self) -> f64 {
        match self.status {
            TaskStatus::Completed => 100.0,
            TaskStatus::Running => {
                let elapsed = (Utc::now() - self.started_at).num_milliseconds() as f64 / 1000.0;
                ((elapsed / self.timeout_secs as f64) * 100.0).min(99.0)
            }
            _ => 0.0,
        }
    }
}

/// Runs one task to completion, applying timeout and retry-with-backoff
/// policy and reporting the terminal status.
#[derive(Clone)]
pub struct TaskExecutor {
    registry: Arc<AgentRegistry>,
    notifier: Arc<EventNotifier>,
    active: Arc<DashMap<String, ActiveTask>>,
}

impl TaskExecutor {
    pub fn new(registry: Arc<AgentRegistry>, notifier: Arc<EventNotifier>) -> Self {
        Self {
            registry,
            notifier,
            active: Arc::new(DashMap::new()),
        }
    }

    /// Execute a task, retrying failed attempts with `2^retry_count` second
    /// backoff up to `max_retries`. Two failure classes are never retried:
    /// unknown agent id and timeout (a timed-out unit of work is unlikely
    /// to fit the same budget on the next attempt).
    pub async fn execute(&self, task: &mut Task) -> TaskOutcome {
        loop {
            task.mark_running();
            self.track(task);

            let Some(agent) = self.registry.get(&task.agent_id) else {
                let error = OrchestratorError::AgentNotFound(task.agent_id.clone()).to_string();
                task.mark_failed(error.clone());
                self.track(task);
                tracing::warn!(task_id = %task.id, agent_id = %task.agent_id, "agent not found");
                return TaskOutcome::Failed {
                    error,
                    retry_count: None,
                    execution_time: None,
                };
            };

            let budget = Duration::from_secs(task.timeout_secs);
            match timeout(budget, agent.run(&task.task_type, &task.parameters)).await {
                Ok(Ok(result)) => {
                    task.mark_completed(result.clone());
                    self.track(task);
                    tracing::debug!(task_id = %task.id, agent_id = %task.agent_id, "task completed");

                    self.notifier.emit(
                        events::TASK_COMPLETED,
                        json!({
                            "task_id": task.id,
                            "agent_id": task.agent_id,
                            "result": result,
                        }),
                    );

                    return TaskOutcome::Success {
                        result,
                        execution_time: task.execution_secs().unwrap_or_default(),
                    };
                }
                Err(_elapsed) => {
                    let error = OrchestratorError::Timeout(task.timeout_secs).to_string();
                    task.mark_failed(error.clone());
                    self.track(task);
                    tracing::warn!(task_id = %task.id, timeout_secs = task.timeout_secs, "task timed out");

                    return TaskOutcome::Failed {
                        error,
                        retry_count: None,
                        execution_time: Some(task.timeout_secs as f64),
                    };
                }
                Ok(Err(error)) => {
                    if task.retry_count < task.max_retries {
                        task.mark_retrying();
                        tracing::info!(
                            task_id = %task.id,
                            attempt = task.retry_count,
                            %error,
                            "retrying task"
                        );
                        sleep(Duration::from_secs(2u64.saturating_pow(task.retry_count))).await;
                        continue;
                    }

                    let error = OrchestratorError::Execution(error.to_string()).to_string();
                    task.mark_failed(error.clone());
                    self.track(task);
                    tracing::warn!(task_id = %task.id, %error, "task failed, retries exhausted");

                    return TaskOutcome::Failed {
                        error,
                        retry_count: Some(task.retry_count),
                        execution_time: None,
                    };
                }
            }
        }
    }

    /// Current (or most recent) task record for an agent.
    pub fn agent_status(&self, agent_id: &str) -> Option<ActiveTask> {
        self.active.get(agent_id).map(|entry| entry.value().clone())
    }

    /// Agents with a task currently in `Running` status.
    pub fn active_count(&self) -> usize {
        self.active
            .iter()
            .filter(|entry| entry.value().status == TaskStatus::Running)
            .count()
    }

    fn track(&self, task: &Task) {
        self.active.insert(
            task.agent_id.clone(),
            ActiveTask {
                task_id: task.id.clone(),
                agent_id: task.agent_id.clone(),
                status: task.status,
                started_at: task.started_at.unwrap_or_else(Utc::now),
                timeout_secs: task.timeout_secs,
            },
        );
    }
}
