//! Main scheduler orchestration.

use crate::capability::{AnyEnvironment, CapabilityMatcher};
use crate::matrix::MatrixExpander;
use crate::pool::WorkerPool;
use crate::triggers::{TriggerEvent, TriggerMatcher};
use cinder_core::{Error, RunId};
use cinder_core::run::{
    InstanceResult, InstanceStatus, JobInstance, PipelineReport, RunState,
};
use cinder_core::workflow::WorkflowSpec;
use cinder_runner::JobRunner;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// The scheduler: gates a workflow on its trigger rules, expands it, and
/// drives every resulting instance to a terminal result.
///
/// Instances are independent; they run concurrently, bounded only by the
/// worker pool. A failing instance never cancels its siblings (fail-open),
/// and the scheduler always completes with a report, even when every
/// instance fails.
pub struct Scheduler {
    pool: WorkerPool,
    runner: Arc<JobRunner>,
    trigger_matcher: TriggerMatcher,
    matrix_expander: MatrixExpander,
    capabilities: Arc<dyn CapabilityMatcher>,
}

impl Scheduler {
    pub fn new(pool: WorkerPool, runner: Arc<JobRunner>) -> Self {
        Self {
            pool,
            runner,
            trigger_matcher: TriggerMatcher::new(),
            matrix_expander: MatrixExpander::new(),
            capabilities: Arc::new(AnyEnvironment),
        }
    }

    /// Replace the capability predicate.
    pub fn with_capabilities(mut self, capabilities: Arc<dyn CapabilityMatcher>) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Evaluate trigger rules without expanding or dispatching anything.
    pub fn trigger_matches(&self, spec: &WorkflowSpec, event: &TriggerEvent) -> bool {
        self.trigger_matcher.matches(spec, event)
    }

    /// Run a workflow for an event, suspending until every dispatched
    /// instance reports a terminal result or the run is cancelled.
    pub async fn run(
        &self,
        spec: &WorkflowSpec,
        event: &TriggerEvent,
        cancel: CancellationToken,
    ) -> PipelineReport {
        let started_at = chrono::Utc::now();
        let start = std::time::Instant::now();

        if !self.trigger_matcher.matches(spec, event) {
            info!(
                workflow = %spec.name,
                event = ?event.kind,
                branch = %event.branch,
                "Trigger rules did not match, skipping run"
            );
            return PipelineReport::skipped(&spec.name);
        }

        let run_id = RunId::new();
        let instances = self.matrix_expander.expand(spec);

        info!(
            run_id = %run_id,
            workflow = %spec.name,
            instances = instances.len(),
            workers = self.pool.capacity(),
            "Run started"
        );

        let mut indexed: Vec<(usize, InstanceResult)> = Vec::with_capacity(instances.len());
        let mut join_set = JoinSet::new();

        for (index, instance) in instances.into_iter().enumerate() {
            if !self.capabilities.can_run(&instance) {
                warn!(instance = %instance.name, "No capable execution environment");
                indexed.push((index, Self::incapable_result(&instance)));
                continue;
            }

            let pool = self.pool.clone();
            let runner = self.runner.clone();
            let token = cancel.child_token();

            join_set.spawn(async move {
                let _permit = pool.acquire().await;
                let result = runner.run(&instance, &token).await;
                (index, result)
            });
        }

        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, result)) => {
                    info!(
                        instance = %result.instance_name,
                        status = ?result.status,
                        "Instance finished"
                    );
                    indexed.push((index, result));
                }
                Err(e) => {
                    // A panicked instance task loses its result but must
                    // not take the run down with it
                    error!(error = %e, "Instance task failed to join");
                }
            }
        }

        // Report instances in expansion order, not completion order
        indexed.sort_by_key(|(index, _)| *index);
        let results: Vec<InstanceResult> = indexed.into_iter().map(|(_, r)| r).collect();

        let state = if cancel.is_cancelled() {
            RunState::Cancelled
        } else if results.iter().all(|r| r.passed()) {
            RunState::Succeeded
        } else {
            RunState::Failed
        };

        let duration_ms = start.elapsed().as_millis() as u64;

        info!(run_id = %run_id, workflow = %spec.name, state = ?state, duration_ms, "Run finished");

        PipelineReport {
            run_id,
            workflow_name: spec.name.clone(),
            state,
            instances: results,
            started_at,
            duration_ms,
        }
    }

    fn incapable_result(instance: &JobInstance) -> InstanceResult {
        InstanceResult {
            instance_name: instance.name.clone(),
            job_name: instance.job_name.clone(),
            status: InstanceStatus::Failed,
            failed_step: None,
            steps: vec![],
            error: Some(Error::NoCapableEnvironment(instance.name.clone()).to_string()),
            duration_ms: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::AxisValueMatcher;
    use async_trait::async_trait;
    use cinder_core::Result;
    use cinder_core::run::OutputLine;
    use cinder_core::workflow::{
        EventKind, JobDefinition, MatrixAxis, MatrixConfig, StepDefinition, TriggerRule,
    };
    use cinder_runner::{StepContext, StepResult, StepRunner};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Stub executor keyed on the command string: "fail" fails, "block"
    /// parks until cancelled, anything else passes.
    struct StubRunner {
        running: AtomicUsize,
        max_running: AtomicUsize,
    }

    impl StubRunner {
        fn new() -> Self {
            Self {
                running: AtomicUsize::new(0),
                max_running: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl StepRunner for StubRunner {
        async fn execute(
            &self,
            ctx: &StepContext,
            _output_tx: mpsc::Sender<OutputLine>,
            cancel: &CancellationToken,
        ) -> Result<StepResult> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_running.fetch_max(now, Ordering::SeqCst);

            let result = match ctx.command.as_str() {
                "fail" => Ok(StepResult {
                    exit_code: 1,
                    success: false,
                    duration_ms: 1,
                }),
                "block" => {
                    cancel.cancelled().await;
                    Err(Error::CancelledByRequest)
                }
                _ => {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok(StepResult {
                        exit_code: 0,
                        success: true,
                        duration_ms: 20,
                    })
                }
            };

            self.running.fetch_sub(1, Ordering::SeqCst);
            result
        }
    }

    fn make_job(name: &str, command: &str) -> JobDefinition {
        JobDefinition {
            name: name.to_string(),
            display_name: None,
            env: HashMap::new(),
            matrix: None,
            steps: vec![StepDefinition {
                name: "step".to_string(),
                run: command.to_string(),
                env: HashMap::new(),
                timeout_seconds: None,
            }],
        }
    }

    fn make_spec(jobs: Vec<JobDefinition>) -> WorkflowSpec {
        WorkflowSpec {
            name: "ci".to_string(),
            description: None,
            triggers: vec![],
            env: HashMap::new(),
            jobs,
        }
    }

    fn make_scheduler(workers: usize) -> (Scheduler, Arc<StubRunner>) {
        let stub = Arc::new(StubRunner::new());
        let runner = Arc::new(JobRunner::new(stub.clone(), PathBuf::from(".")));
        (Scheduler::new(WorkerPool::new(workers), runner), stub)
    }

    #[tokio::test]
    async fn test_fail_open_aggregate() {
        let (scheduler, _) = make_scheduler(3);
        let spec = make_spec(vec![
            make_job("a", "ok"),
            make_job("b", "fail"),
            make_job("c", "ok"),
        ]);

        let report = scheduler
            .run(&spec, &TriggerEvent::push("main"), CancellationToken::new())
            .await;

        assert_eq!(report.state, RunState::Failed);
        // All three results are present: the failure cancelled no sibling
        assert_eq!(report.instances.len(), 3);
        assert_eq!(report.instances[0].status, InstanceStatus::Passed);
        assert_eq!(report.instances[1].status, InstanceStatus::Failed);
        assert_eq!(report.instances[2].status, InstanceStatus::Passed);
    }

    #[tokio::test]
    async fn test_trigger_mismatch_skips_run() {
        let (scheduler, stub) = make_scheduler(3);
        let mut spec = make_spec(vec![make_job("a", "ok")]);
        spec.triggers = vec![TriggerRule {
            event: EventKind::Push,
            branches: vec!["main".to_string()],
        }];

        let report = scheduler
            .run(
                &spec,
                &TriggerEvent::push("feature"),
                CancellationToken::new(),
            )
            .await;

        assert_eq!(report.state, RunState::Skipped);
        assert!(report.instances.is_empty());
        assert!(!report.succeeded());
        assert_eq!(stub.max_running.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancellation_preserves_completed_results() {
        let (scheduler, _) = make_scheduler(3);
        let spec = make_spec(vec![
            make_job("fast", "ok"),
            make_job("slow-a", "block"),
            make_job("slow-b", "block"),
        ]);

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(150)).await;
            token.cancel();
        });

        let report = scheduler
            .run(&spec, &TriggerEvent::push("main"), cancel)
            .await;

        assert_eq!(report.state, RunState::Cancelled);
        assert_eq!(report.instances.len(), 3);
        assert_eq!(report.instances[0].status, InstanceStatus::Passed);
        assert_eq!(report.instances[1].status, InstanceStatus::Cancelled);
        assert_eq!(report.instances[2].status, InstanceStatus::Cancelled);
    }

    #[tokio::test]
    async fn test_worker_pool_bounds_concurrency() {
        let (scheduler, stub) = make_scheduler(2);
        let spec = make_spec(vec![
            make_job("a", "ok"),
            make_job("b", "ok"),
            make_job("c", "ok"),
            make_job("d", "ok"),
        ]);

        let report = scheduler
            .run(&spec, &TriggerEvent::push("main"), CancellationToken::new())
            .await;

        assert_eq!(report.state, RunState::Succeeded);
        assert!(stub.max_running.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_matrix_workflow_reports_every_cell() {
        let (scheduler, _) = make_scheduler(4);
        let mut spec = make_spec(vec![make_job("test", "ok")]);
        spec.jobs[0].matrix = Some(MatrixConfig {
            axes: vec![
                MatrixAxis {
                    name: "os".to_string(),
                    values: vec!["ubuntu".to_string(), "macos".to_string()],
                },
                MatrixAxis {
                    name: "toolchain".to_string(),
                    values: vec!["stable".to_string(), "beta".to_string()],
                },
            ],
        });

        let report = scheduler
            .run(&spec, &TriggerEvent::push("main"), CancellationToken::new())
            .await;

        assert_eq!(report.state, RunState::Succeeded);
        assert_eq!(report.instances.len(), 4);
        assert_eq!(report.instances[0].instance_name, "test-ubuntu-stable");
        assert_eq!(report.instances[3].instance_name, "test-macos-beta");
    }

    #[tokio::test]
    async fn test_incapable_instance_fails_without_running() {
        let (scheduler, stub) = make_scheduler(2);
        let scheduler = scheduler.with_capabilities(Arc::new(AxisValueMatcher::new(
            "os",
            vec!["ubuntu".to_string()],
        )));

        let mut spec = make_spec(vec![make_job("test", "ok")]);
        spec.jobs[0].matrix = Some(MatrixConfig {
            axes: vec![MatrixAxis {
                name: "os".to_string(),
                values: vec!["ubuntu".to_string(), "macos".to_string()],
            }],
        });

        let report = scheduler
            .run(&spec, &TriggerEvent::push("main"), CancellationToken::new())
            .await;

        assert_eq!(report.state, RunState::Failed);
        assert_eq!(report.instances.len(), 2);
        assert_eq!(report.instances[0].status, InstanceStatus::Passed);
        assert_eq!(report.instances[1].status, InstanceStatus::Failed);
        assert!(report.instances[1].error.is_some());
        assert!(report.instances[1].steps.is_empty());
        // Only the capable cell ever reached the executor
        assert_eq!(stub.max_running.load(Ordering::SeqCst), 1);
    }
}
