use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use orchestration_core::{
    events, OrchestratorError, Plan, PlanReport, PlanStatus, TaskStatus,
};

use crate::agent::{Agent, SharedAgent};
use crate::executor::TaskExecutor;
use crate::notifier::{EventHandler, EventNotifier};
use crate::registry::{AgentRegistry, RegistryError};
use crate::scheduler::PlanScheduler;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Ceiling reported in stats; parallel plans size their own semaphore
    /// from `plan.max_concurrent`.
    #[serde(default = "default_max_concurrent_agents")]
    pub max_concurrent_agents: usize,
}

fn default_max_concurrent_agents() -> usize {
    10
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_concurrent_agents: default_max_concurrent_agents(),
        }
    }
}

/// Status report for the task currently (or last) occupying an agent.
#[derive(Debug, Clone, Serialize)]
pub struct AgentStatusReport {
    pub agent_id: String,
    pub status: TaskStatus,
    pub task_id: String,
    pub started_at: DateTime<Utc>,
    /// Timeout-relative estimate: capped at 99 while running, 100 once
    /// completed, 0 otherwise.
    pub progress: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrchestrationStats {
    pub total_agents: usize,
    pub active_agents: usize,
    pub max_concurrent: usize,
    pub plans_executed: u64,
    pub event_handlers: HashMap<String, usize>,
}

/// Facade composing the registry, notifier, executor and scheduler.
pub struct Orchestrator {
    registry: Arc<AgentRegistry>,
    notifier: Arc<EventNotifier>,
    executor: TaskExecutor,
    scheduler: PlanScheduler,
    config: OrchestratorConfig,
    plans_executed: AtomicU64,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new(OrchestratorConfig::default())
    }
}

impl Orchestrator {
    /// Must be called within a tokio runtime (the notifier spawns its
    /// dispatcher task).
    pub fn new(config: OrchestratorConfig) -> Self {
        let registry = Arc::new(AgentRegistry::new());
        let notifier = Arc::new(EventNotifier::new());
        let executor = TaskExecutor::new(Arc::clone(&registry), Arc::clone(&notifier));
        let scheduler = PlanScheduler::new(executor.clone());

        Self {
            registry,
            notifier,
            executor,
            scheduler,
            config,
            plans_executed: AtomicU64::new(0),
        }
    }

    pub fn register_agent<A>(
        &self,
        agent_id: impl Into<String>,
        agent: A,
    ) -> Result<(), RegistryError>
    where
        A: Agent + 'static,
    {
        self.registry.register(agent_id, agent)
    }

    pub fn register_shared_agent(
        &self,
        agent_id: impl Into<String>,
        agent: SharedAgent,
    ) -> Result<(), RegistryError> {
        self.registry.register_shared(agent_id, agent)
    }

    pub fn unregister_agent(&self, agent_id: &str) -> bool {
        self.registry.unregister(agent_id)
    }

    pub fn on<H>(&self, kind: impl Into<String>, handler: H)
    where
        H: EventHandler + 'static,
    {
        self.notifier.on(kind, handler);
    }

    pub fn on_fn<F, Fut>(&self, kind: impl Into<String>, handler: F)
    where
        F: Fn(orchestration_core::OrchestratorEvent) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.notifier.on_fn(kind, handler);
    }

    /// Run a plan to completion under its topology.
    ///
    /// Task failures are folded into the returned report; only a malformed
    /// plan comes back as an error, after the plan is marked failed and
    /// `plan_failed` is emitted.
    pub async fn execute_plan(&self, plan: &mut Plan) -> Result<PlanReport, OrchestratorError> {
        tracing::info!(plan_id = %plan.id, name = %plan.name, mode = ?plan.mode, "starting plan");

        plan.status = PlanStatus::Running;
        let started = Instant::now();

        match self.scheduler.run(plan).await {
            Ok(results) => {
                plan.status = PlanStatus::Completed;
                let report = PlanReport {
                    plan_id: plan.id.clone(),
                    status: PlanStatus::Completed,
                    execution_time: started.elapsed().as_secs_f64(),
                    success_count: results.success_count(),
                    total_tasks: plan.tasks.len(),
                    results,
                };
                self.plans_executed.fetch_add(1, Ordering::Relaxed);
                tracing::info!(
                    plan_id = %plan.id,
                    success_count = report.success_count,
                    total_tasks = report.total_tasks,
                    "plan completed"
                );

                self.notifier.emit(
                    events::PLAN_COMPLETED,
                    serde_json::to_value(&report).unwrap_or_default(),
                );
                Ok(report)
            }
            Err(error) => {
                plan.status = PlanStatus::Failed;
                self.plans_executed.fetch_add(1, Ordering::Relaxed);
                tracing::error!(plan_id = %plan.id, %error, "plan failed");

                self.notifier.emit(
                    events::PLAN_FAILED,
                    json!({
                        "plan_id": plan.id,
                        "status": "failed",
                        "error": error.to_string(),
                        "execution_time": started.elapsed().as_secs_f64(),
                    }),
                );
                Err(error)
            }
        }
    }

    pub fn agent_status(&self, agent_id: &str) -> Option<AgentStatusReport> {
        self.executor.agent_status(agent_id).map(|record| {
            let progress = record.progress();
            AgentStatusReport {
                agent_id: agent_id.to_string(),
                status: record.status,
                task_id: record.task_id,
                started_at: record.started_at,
                progress,
            }
        })
    }

    pub fn stats(&self) -> OrchestrationStats {
        OrchestrationStats {
            total_agents: self.registry.len(),
            active_agents: self.executor.active_count(),
            max_concurrent: self.config.max_concurrent_agents,
            plans_executed: self.plans_executed.load(Ordering::Relaxed),
            event_handlers: self.notifier.handler_counts(),
        }
    }
}
