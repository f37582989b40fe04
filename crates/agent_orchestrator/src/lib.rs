//! agent_orchestrator - Executes plans of interdependent tasks
//!
//! This crate is the heart of the orchestration engine, responsible for:
//! - Resolving tasks against registered agents (`registry`)
//! - Reporting lifecycle events without blocking the scheduler (`notifier`)
//! - Running one task with timeout and retry policy (`executor`)
//! - The five scheduling topologies (`scheduler`)
//! - The `execute_plan` facade and runtime stats (`orchestrator`)

pub mod agent;
pub mod executor;
pub mod notifier;
pub mod orchestrator;
pub mod registry;
pub mod scheduler;

// Re-exports
pub use agent::{Agent, SharedAgent};
pub use executor::{ActiveTask, TaskExecutor};
pub use notifier::{EventHandler, EventNotifier, SharedHandler};
pub use orchestrator::{AgentStatusReport, OrchestrationStats, Orchestrator, OrchestratorConfig};
pub use registry::{AgentRegistry, RegistryError};
pub use scheduler::PlanScheduler;
