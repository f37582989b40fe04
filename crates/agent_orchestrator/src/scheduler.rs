use std::sync::Arc;

use futures::future::join_all;
use serde_json::Value;
use tokio::sync::Semaphore;

use orchestration_core::{
    LoopControls, OrchestratorError, Plan, PlanMode, PlanResults, ResultMap, Task, TaskOutcome,
};

use crate::executor::TaskExecutor;

/// Dispatches a plan to the strategy matching its topology and aggregates
/// per-task outcomes. Task-level failures never escape as errors; only a
/// malformed plan does.
pub struct PlanScheduler {
    executor: TaskExecutor,
}

impl PlanScheduler {
    pub fn new(executor: TaskExecutor) -> Self {
        Self { executor }
    }

    pub async fn run(&self, plan: &mut Plan) -> Result<PlanResults, OrchestratorError> {
        match plan.mode {
            PlanMode::Sequential => Ok(PlanResults::Tasks(
                self.run_sequential(&mut plan.tasks).await,
            )),
            PlanMode::Parallel => self.run_parallel(plan).await.map(PlanResults::Tasks),
            PlanMode::Pipeline => Ok(PlanResults::Tasks(self.run_pipeline(&mut plan.tasks).await)),
            PlanMode::Conditional => Ok(PlanResults::Tasks(
                self.run_conditional(&mut plan.tasks).await,
            )),
            PlanMode::Loop => self.run_loop(plan).await.map(PlanResults::Iterations),
        }
    }

    /// Strict list order, stopping after the first terminal failure. The
    /// executor has already exhausted retries by the time an outcome comes
    /// back, so any failure here is final.
    async fn run_sequential(&self, tasks: &mut [Task]) -> ResultMap {
        let mut results = ResultMap::new();

        for task in tasks.iter_mut() {
            let outcome = self.executor.execute(task).await;
            let failed = outcome.is_failed();
            results.insert(task.id.clone(), outcome);

            if failed {
                tracing::info!(task_id = %task.id, "aborting sequential plan after failure");
                break;
            }
        }

        results
    }

    /// One spawned task per plan task, bounded by a counting semaphore.
    /// The join never short-circuits: a panicked task folds into a failed
    /// outcome instead of propagating.
    async fn run_parallel(&self, plan: &mut Plan) -> Result<ResultMap, OrchestratorError> {
        if plan.max_concurrent == 0 {
            return Err(OrchestratorError::InvalidPlan(
                "max_concurrent must be at least 1 for parallel plans".to_string(),
            ));
        }

        let semaphore = Arc::new(Semaphore::new(plan.max_concurrent));
        let tasks = std::mem::take(&mut plan.tasks);

        // Snapshots survive a panicked worker, so the plan keeps every
        // declared task either way.
        let handles: Vec<_> = tasks
            .into_iter()
            .map(|mut task| {
                let snapshot = task.clone();
                let semaphore = Arc::clone(&semaphore);
                let executor = self.executor.clone();
                let handle = tokio::spawn(async move {
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .expect("semaphore is never closed");
                    let outcome = executor.execute(&mut task).await;
                    (task, outcome)
                });
                (snapshot, handle)
            })
            .collect();

        let joined = join_all(
            handles
                .into_iter()
                .map(|(snapshot, handle)| async move { (snapshot, handle.await) }),
        )
        .await;

        let mut results = ResultMap::new();
        for (snapshot, join_result) in joined {
            match join_result {
                Ok((task, outcome)) => {
                    results.insert(task.id.clone(), outcome);
                    plan.tasks.push(task);
                }
                Err(join_error) => {
                    tracing::error!(task_id = %snapshot.id, %join_error, "parallel task aborted");
                    let mut task = snapshot;
                    task.mark_failed(join_error.to_string());
                    results.insert(
                        task.id.clone(),
                        TaskOutcome::Failed {
                            error: join_error.to_string(),
                            retry_count: None,
                            execution_time: None,
                        },
                    );
                    plan.tasks.push(task);
                }
            }
        }

        Ok(results)
    }

    /// Sequential, feeding each task's successful object result into the
    /// next task's parameters (same-named keys overwritten). A failed task
    /// passes nothing forward but never aborts the rest.
    async fn run_pipeline(&self, tasks: &mut [Task]) -> ResultMap {
        let mut results = ResultMap::new();
        let mut carry: Option<serde_json::Map<String, Value>> = None;

        for task in tasks.iter_mut() {
            if let Some(upstream) = carry.take() {
                for (key, value) in upstream {
                    task.parameters.insert(key, value);
                }
            }

            let outcome = self.executor.execute(task).await;

            if let TaskOutcome::Success {
                result: Value::Object(output),
                ..
            } = &outcome
            {
                carry = Some(output.clone());
            }

            results.insert(task.id.clone(), outcome);
        }

        results
    }

    /// A task with dependencies runs only once every listed id has a
    /// successful outcome among the already-collected results; otherwise
    /// it is recorded as skipped and its agent is never invoked.
    async fn run_conditional(&self, tasks: &mut [Task]) -> ResultMap {
        let mut results = ResultMap::new();

        for task in tasks.iter_mut() {
            if dependencies_satisfied(task, &results) {
                let outcome = self.executor.execute(task).await;
                results.insert(task.id.clone(), outcome);
            } else {
                tracing::debug!(task_id = %task.id, "skipping task, dependencies unsatisfied");
                results.insert(task.id.clone(), TaskOutcome::skipped("Condition not met"));
            }
        }

        results
    }

    /// Repeats the whole task list per iteration until `max_loops` or the
    /// exit condition, checked only after a full iteration. Task retry
    /// counters carry across iterations.
    async fn run_loop(&self, plan: &mut Plan) -> Result<Vec<ResultMap>, OrchestratorError> {
        let controls = LoopControls::from_conditions(&plan.conditions)?;
        let mut iterations = Vec::new();

        for iteration in 0..controls.max_loops {
            let mut loop_results = ResultMap::new();
            for task in plan.tasks.iter_mut() {
                let outcome = self.executor.execute(task).await;
                loop_results.insert(task.id.clone(), outcome);
            }

            let exit = controls
                .exit
                .is_some_and(|condition| condition.satisfied(&loop_results));
            tracing::debug!(iteration, exit, "loop iteration finished");
            iterations.push(loop_results);

            if exit {
                break;
            }
        }

        Ok(iterations)
    }
}

fn dependencies_satisfied(task: &Task, results: &ResultMap) -> bool {
    task.dependencies
        .iter()
        .all(|dependency| results.get(dependency).is_some_and(TaskOutcome::is_success))
}
