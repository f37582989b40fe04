use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Opaque parameter map passed to an agent together with the task type.
pub type Parameters = serde_json::Map<String, Value>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Failed,
    /// Defined but never produced: no transition sets it until a pause
    /// capability exists.
    Paused,
}

/// One unit of work addressed to a registered agent.
///
/// Mutated only by the task executor while a plan runs; the engine does not
/// persist tasks after the plan's report is returned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    #[serde(default = "generate_id")]
    pub id: String,
    pub agent_id: String,
    pub task_type: String,
    #[serde(default)]
    pub parameters: Parameters,
    /// Only consulted by conditional plans. Ids are not validated against
    /// the plan; an unknown id simply never becomes satisfied.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Advisory only; the scheduler never reorders by priority.
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_max_retries() -> u32 {
    3
}

impl Task {
    pub fn new(agent_id: impl Into<String>, task_type: impl Into<String>) -> Self {
        Self {
            id: generate_id(),
            agent_id: agent_id.into(),
            task_type: task_type.into(),
            parameters: Parameters::new(),
            dependencies: Vec::new(),
            priority: 0,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_count: 0,
            status: TaskStatus::Idle,
            result: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }

    pub fn with_dependencies(mut self, dependencies: Vec<String>) -> Self {
        self.dependencies = dependencies;
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Transition to `Running` and stamp `started_at`.
    pub fn mark_running(&mut self) {
        self.status = TaskStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Terminal success: store the result and stamp `completed_at`.
    pub fn mark_completed(&mut self, result: Value) {
        self.status = TaskStatus::Completed;
        self.completed_at = Some(Utc::now());
        self.result = Some(result);
        self.error = None;
    }

    /// Terminal failure: record the error description.
    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = TaskStatus::Failed;
        self.error = Some(error.into());
        self.result = None;
    }

    /// Re-arm for another attempt after a retryable failure.
    pub fn mark_retrying(&mut self) {
        self.retry_count += 1;
        self.status = TaskStatus::Idle;
    }

    /// Wall-clock seconds between start and completion, when both are set.
    pub fn execution_secs(&self) -> Option<f64> {
        let started = self.started_at?;
        let completed = self.completed_at?;
        Some((completed - started).num_milliseconds() as f64 / 1000.0)
    }
}

/// Terminal per-task result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TaskOutcome {
    Success {
        result: Value,
        execution_time: f64,
    },
    Failed {
        error: String,
        /// Attempts consumed before giving up; absent for the
        /// never-retried failures (timeout, unknown agent).
        #[serde(skip_serializing_if = "Option::is_none")]
        retry_count: Option<u32>,
        #[serde(skip_serializing_if = "Option::is_none")]
        execution_time: Option<f64>,
    },
    Skipped {
        reason: String,
    },
}

impl TaskOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        TaskOutcome::Skipped {
            reason: reason.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TaskOutcome::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, TaskOutcome::Skipped { .. })
    }
}
