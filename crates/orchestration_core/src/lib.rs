//! orchestration_core - Value types for the task orchestration engine
//!
//! This crate holds the data model shared by the engine and its callers:
//! - Tasks and their status/retry state machine (`task`)
//! - Plans, scheduling modes and loop controls (`plan`)
//! - Per-task outcomes, ordered result maps and plan reports (`report`)
//! - Lifecycle event kinds and the event envelope (`events`)
//! - The engine error taxonomy (`error`)

pub mod error;
pub mod events;
pub mod plan;
pub mod report;
pub mod task;

pub use error::{AgentRunError, OrchestratorError};
pub use events::OrchestratorEvent;
pub use plan::{ExitCondition, LoopControls, Plan, PlanMode, PlanStatus};
pub use report::{PlanReport, PlanResults, ResultMap};
pub use task::{Parameters, Task, TaskOutcome, TaskStatus};
