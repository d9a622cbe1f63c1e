//! Helpers for wiring a full engine in tests.

use cinder_runner::{JobRunner, RunnerConfig, ShellRunner};
use cinder_scheduler::{Scheduler, WorkerPool};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

/// Build a scheduler backed by a real shell runner with a short
/// cancellation grace period, running in the given workspace.
pub fn shell_scheduler(workers: usize, workspace: PathBuf) -> Scheduler {
    let shell = Arc::new(ShellRunner::new(RunnerConfig {
        default_timeout: Some(Duration::from_secs(60)),
        grace_period: Duration::from_millis(100),
    }));
    let runner = Arc::new(JobRunner::new(shell, workspace));
    Scheduler::new(WorkerPool::new(workers), runner)
}
