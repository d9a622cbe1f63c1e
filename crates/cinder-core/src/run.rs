//! Run and execution report types.

use crate::ids::{InstanceId, RunId};
use crate::workflow::StepDefinition;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A job bound to one concrete environment variant.
///
/// Produced by matrix expansion, consumed exactly once by the scheduler,
/// and discarded after its result is recorded.
#[derive(Debug, Clone)]
pub struct JobInstance {
    pub id: InstanceId,
    /// Name of the job template this instance was expanded from.
    pub job_name: String,
    /// Deterministic instance name: `<job-name>-<axis-value>...`.
    pub name: String,
    /// Axis assignments in declared axis order.
    pub variant: Vec<(String, String)>,
    /// Resolved environment: global < job < variant.
    pub env: HashMap<String, String>,
    pub steps: Vec<StepDefinition>,
}

impl JobInstance {
    /// Matrix values keyed by axis name, for interpolation.
    pub fn matrix_values(&self) -> HashMap<String, String> {
        self.variant.iter().cloned().collect()
    }
}

/// Pipeline run state machine: `Pending -> Running -> terminal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Pending,
    Running,
    Succeeded,
    Failed,
    Cancelled,
    /// Trigger rules did not match; nothing was expanded or dispatched.
    Skipped,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Succeeded | RunState::Failed | RunState::Cancelled | RunState::Skipped
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    Passed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// One captured line of step output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub content: String,
    pub line_number: u32,
    pub timestamp: DateTime<Utc>,
}

/// Record of one executed step.
///
/// Steps skipped after a failure are absent from the instance result, not
/// recorded with a skip marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    pub name: String,
    pub status: StepStatus,
    /// Exit code of the subprocess, if it ran to a wait status.
    pub exit_code: Option<i32>,
    pub output: Vec<OutputLine>,
    /// Executor error message, for steps that failed without an exit code.
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

/// Per-instance aggregate result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceResult {
    pub instance_name: String,
    pub job_name: String,
    pub status: InstanceStatus,
    /// Index of the first failing step, if any.
    pub failed_step: Option<usize>,
    pub steps: Vec<StepRecord>,
    /// Scheduler-level failure message, for instances that never ran.
    pub error: Option<String>,
    pub duration_ms: u64,
}

impl InstanceResult {
    pub fn passed(&self) -> bool {
        self.status == InstanceStatus::Passed
    }
}

/// The pipeline report: the sole artifact surfaced to external consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: RunId,
    pub workflow_name: String,
    pub state: RunState,
    pub instances: Vec<InstanceResult>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl PipelineReport {
    pub fn succeeded(&self) -> bool {
        self.state == RunState::Succeeded
    }

    /// Report for a workflow whose trigger rules did not match the event.
    pub fn skipped(workflow_name: impl Into<String>) -> Self {
        Self {
            run_id: RunId::new(),
            workflow_name: workflow_name.into(),
            state: RunState::Skipped,
            instances: Vec::new(),
            started_at: Utc::now(),
            duration_ms: 0,
        }
    }
}
