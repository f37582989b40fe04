use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::OrchestratorError;
use crate::report::ResultMap;
use crate::task::Task;

/// Scheduling topology for a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanMode {
    Sequential,
    Parallel,
    Pipeline,
    Conditional,
    Loop,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanStatus {
    #[default]
    Pending,
    Running,
    Completed,
    Failed,
}

/// A named, ordered collection of tasks plus a scheduling topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default = "generate_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub mode: PlanMode,
    #[serde(default)]
    pub tasks: Vec<Task>,
    /// Loosely-typed knobs consulted only by the loop topology
    /// (`max_loops`, `exit_condition`).
    #[serde(default)]
    pub conditions: serde_json::Map<String, Value>,
    /// Concurrency ceiling for parallel plans.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default)]
    pub status: PlanStatus,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

fn generate_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_max_concurrent() -> usize {
    5
}

impl Plan {
    pub fn new(name: impl Into<String>, mode: PlanMode) -> Self {
        Self {
            id: generate_id(),
            name: name.into(),
            description: String::new(),
            mode,
            tasks: Vec::new(),
            conditions: serde_json::Map::new(),
            max_concurrent: default_max_concurrent(),
            status: PlanStatus::Pending,
            created_at: Utc::now(),
        }
    }

    pub fn sequential(name: impl Into<String>, tasks: Vec<Task>) -> Self {
        Self::new(name, PlanMode::Sequential).with_tasks(tasks)
    }

    pub fn parallel(name: impl Into<String>, tasks: Vec<Task>, max_concurrent: usize) -> Self {
        Self::new(name, PlanMode::Parallel)
            .with_tasks(tasks)
            .with_max_concurrent(max_concurrent)
    }

    pub fn pipeline(name: impl Into<String>, tasks: Vec<Task>) -> Self {
        Self::new(name, PlanMode::Pipeline).with_tasks(tasks)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_tasks(mut self, tasks: Vec<Task>) -> Self {
        self.tasks = tasks;
        self
    }

    pub fn add_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    pub fn with_condition(mut self, key: impl Into<String>, value: Value) -> Self {
        self.conditions.insert(key.into(), value);
        self
    }
}

/// Exit condition for loop plans, checked after each full iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitCondition {
    AllSuccess,
    AnyFailure,
}

impl ExitCondition {
    pub fn satisfied(&self, results: &ResultMap) -> bool {
        match self {
            ExitCondition::AllSuccess => results.iter().all(|(_, outcome)| outcome.is_success()),
            ExitCondition::AnyFailure => results.iter().any(|(_, outcome)| outcome.is_failed()),
        }
    }
}

/// Loop controls parsed out of a plan's `conditions` map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopControls {
    pub max_loops: usize,
    pub exit: Option<ExitCondition>,
}

impl LoopControls {
    pub const DEFAULT_MAX_LOOPS: usize = 10;

    pub fn from_conditions(
        conditions: &serde_json::Map<String, Value>,
    ) -> Result<Self, OrchestratorError> {
        let max_loops = match conditions.get("max_loops") {
            None => Self::DEFAULT_MAX_LOOPS,
            Some(value) => value.as_u64().map(|count| count as usize).ok_or_else(|| {
                OrchestratorError::InvalidPlan(format!(
                    "max_loops must be a non-negative integer, got {value}"
                ))
            })?,
        };

        let exit = match conditions.get("exit_condition") {
            None => None,
            Some(Value::Object(settings)) => match settings.get("type").and_then(Value::as_str) {
                Some("all_success") => Some(ExitCondition::AllSuccess),
                Some("any_failure") => Some(ExitCondition::AnyFailure),
                // Unknown exit types never trigger an early exit.
                _ => None,
            },
            Some(other) => {
                return Err(OrchestratorError::InvalidPlan(format!(
                    "exit_condition must be an object, got {other}"
                )))
            }
        };

        Ok(Self { max_loops, exit })
    }
}
