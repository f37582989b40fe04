use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use crate::plan::PlanStatus;
use crate::task::TaskOutcome;

/// Insertion-ordered map from task id to outcome.
///
/// Result order must match execution order for sequential topologies, so
/// this is a small Vec-backed map rather than a hash map. Plans are small;
/// lookups are linear.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultMap {
    entries: Vec<(String, TaskOutcome)>,
}

impl ResultMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the outcome for a task id, keeping first-insert
    /// order. Duplicate task ids within a plan are undefined behavior per
    /// the data model; last write wins here.
    pub fn insert(&mut self, task_id: impl Into<String>, outcome: TaskOutcome) {
        let task_id = task_id.into();
        if let Some(entry) = self.entries.iter_mut().find(|(id, _)| *id == task_id) {
            entry.1 = outcome;
        } else {
            self.entries.push((task_id, outcome));
        }
    }

    pub fn get(&self, task_id: &str) -> Option<&TaskOutcome> {
        self.entries
            .iter()
            .find(|(id, _)| id == task_id)
            .map(|(_, outcome)| outcome)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TaskOutcome)> {
        self.entries
            .iter()
            .map(|(id, outcome)| (id.as_str(), outcome))
    }

    pub fn task_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(id, _)| id.as_str())
    }

    pub fn success_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, outcome)| outcome.is_success())
            .count()
    }
}

impl Serialize for ResultMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (id, outcome) in &self.entries {
            map.serialize_entry(id, outcome)?;
        }
        map.end()
    }
}

/// Aggregated scheduler output: per-task outcomes for the flat topologies,
/// per-iteration maps for loop plans.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanResults {
    Tasks(ResultMap),
    Iterations(Vec<ResultMap>),
}

impl PlanResults {
    pub fn task(&self, task_id: &str) -> Option<&TaskOutcome> {
        match self {
            PlanResults::Tasks(results) => results.get(task_id),
            PlanResults::Iterations(_) => None,
        }
    }

    pub fn as_tasks(&self) -> Option<&ResultMap> {
        match self {
            PlanResults::Tasks(results) => Some(results),
            PlanResults::Iterations(_) => None,
        }
    }

    pub fn iterations(&self) -> Option<&[ResultMap]> {
        match self {
            PlanResults::Tasks(_) => None,
            PlanResults::Iterations(iterations) => Some(iterations),
        }
    }

    /// Successful outcomes among the top-level task results; for loop
    /// plans, over the final iteration.
    pub fn success_count(&self) -> usize {
        match self {
            PlanResults::Tasks(results) => results.success_count(),
            PlanResults::Iterations(iterations) => iterations
                .last()
                .map(ResultMap::success_count)
                .unwrap_or_default(),
        }
    }
}

impl Serialize for PlanResults {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PlanResults::Tasks(results) => results.serialize(serializer),
            PlanResults::Iterations(iterations) => {
                let mut map = serializer.serialize_map(Some(iterations.len()))?;
                for (index, iteration) in iterations.iter().enumerate() {
                    map.serialize_entry(&format!("loop_{index}"), iteration)?;
                }
                map.end()
            }
        }
    }
}

/// Summary returned by `execute_plan`.
#[derive(Debug, Clone, Serialize)]
pub struct PlanReport {
    pub plan_id: String,
    pub status: PlanStatus,
    pub execution_time: f64,
    pub results: PlanResults,
    pub success_count: usize,
    pub total_tasks: usize,
}
