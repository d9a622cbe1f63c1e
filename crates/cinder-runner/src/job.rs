//! Sequential job-instance execution.

use crate::runner::{StepContext, StepRunner};
use cinder_core::Error;
use cinder_core::interpolation::InterpolationContext;
use cinder_core::overlay;
use cinder_core::run::{
    InstanceResult, InstanceStatus, JobInstance, StepRecord, StepStatus,
};
use cinder_core::workflow::StepDefinition;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Runs the steps of one `JobInstance` in declaration order.
///
/// The first non-zero exit aborts the remaining steps of this instance
/// only; skipped steps are absent from the result. No retries happen at
/// this layer. Every invocation yields an `InstanceResult` — a failing or
/// cancelled step is recorded, never propagated as an error.
pub struct JobRunner {
    runner: Arc<dyn StepRunner>,
    workdir: PathBuf,
}

impl JobRunner {
    pub fn new(runner: Arc<dyn StepRunner>, workdir: PathBuf) -> Self {
        Self { runner, workdir }
    }

    /// Execute an instance to a terminal result.
    pub async fn run(&self, instance: &JobInstance, cancel: &CancellationToken) -> InstanceResult {
        let start = std::time::Instant::now();

        info!(
            instance = %instance.name,
            steps = instance.steps.len(),
            "Starting job instance"
        );

        let mut records = Vec::new();
        let mut status = InstanceStatus::Passed;
        let mut failed_step = None;

        for (index, step) in instance.steps.iter().enumerate() {
            if cancel.is_cancelled() {
                warn!(instance = %instance.name, "Instance cancelled before step {}", step.name);
                status = InstanceStatus::Cancelled;
                break;
            }

            let record = self.run_step(instance, step, cancel).await;
            let step_status = record.status;
            records.push(record);

            match step_status {
                StepStatus::Passed => {}
                StepStatus::Failed => {
                    error!(
                        instance = %instance.name,
                        step = %step.name,
                        index,
                        "Step failed, skipping remaining steps"
                    );
                    status = InstanceStatus::Failed;
                    failed_step = Some(index);
                    break;
                }
                StepStatus::Cancelled => {
                    status = InstanceStatus::Cancelled;
                    break;
                }
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;

        info!(
            instance = %instance.name,
            status = ?status,
            duration_ms,
            "Job instance finished"
        );

        InstanceResult {
            instance_name: instance.name.clone(),
            job_name: instance.job_name.clone(),
            status,
            failed_step,
            steps: records,
            error: None,
            duration_ms,
        }
    }

    async fn run_step(
        &self,
        instance: &JobInstance,
        step: &StepDefinition,
        cancel: &CancellationToken,
    ) -> StepRecord {
        let started_at = chrono::Utc::now();

        // Step overlay wins over the instance's resolved environment
        let env = overlay::resolve([&instance.env, &step.env]);

        let mut interp = InterpolationContext::new();
        interp.env = env.clone();
        interp.matrix = instance.matrix_values();
        let command = interp.interpolate(&step.run);

        let ctx = StepContext {
            command,
            env,
            workdir: self.workdir.clone(),
            timeout: step.timeout_seconds.map(Duration::from_secs),
        };

        let (output_tx, mut output_rx) = mpsc::channel(256);
        let collector = tokio::spawn(async move {
            let mut lines = Vec::new();
            while let Some(line) = output_rx.recv().await {
                lines.push(line);
            }
            lines
        });

        let result = self.runner.execute(&ctx, output_tx, cancel).await;
        let output = collector.await.unwrap_or_default();

        match result {
            Ok(res) => StepRecord {
                name: step.name.clone(),
                status: if res.success {
                    StepStatus::Passed
                } else {
                    StepStatus::Failed
                },
                exit_code: Some(res.exit_code),
                output,
                error: None,
                started_at,
                duration_ms: res.duration_ms,
            },
            Err(Error::CancelledByRequest) => StepRecord {
                name: step.name.clone(),
                status: StepStatus::Cancelled,
                exit_code: None,
                output,
                error: None,
                started_at,
                duration_ms: (chrono::Utc::now() - started_at).num_milliseconds() as u64,
            },
            Err(e) => StepRecord {
                name: step.name.clone(),
                status: StepStatus::Failed,
                exit_code: None,
                output,
                error: Some(e.to_string()),
                started_at,
                duration_ms: (chrono::Utc::now() - started_at).num_milliseconds() as u64,
            },
        }
    }
}
