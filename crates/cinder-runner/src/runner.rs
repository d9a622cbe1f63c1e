//! Core runner trait and types.

use async_trait::async_trait;
use cinder_core::Result;
use cinder_core::run::OutputLine;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Context for a single step execution.
#[derive(Debug, Clone)]
pub struct StepContext {
    /// Command string, after interpolation.
    pub command: String,
    /// Fully resolved environment: global < job < variant < step.
    pub env: HashMap<String, String>,
    /// Working directory for the subprocess.
    pub workdir: PathBuf,
    /// Per-step timeout override. The runner's default applies when unset.
    pub timeout: Option<Duration>,
}

/// Result of step execution.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub exit_code: i32,
    pub success: bool,
    pub duration_ms: u64,
}

/// Trait for step execution.
///
/// The executor runs one command to completion and does not sandbox its
/// side effects. Cancellation is cooperative at the subprocess boundary:
/// the token is observed between process-level events only.
#[async_trait]
pub trait StepRunner: Send + Sync {
    /// Execute a step, streaming output to the provided channel.
    async fn execute(
        &self,
        ctx: &StepContext,
        output_tx: mpsc::Sender<OutputLine>,
        cancel: &CancellationToken,
    ) -> Result<StepResult>;
}

/// Configuration for step execution.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Timeout applied when a step declares none.
    pub default_timeout: Option<Duration>,
    /// Time a cancelled subprocess gets to exit before it is killed.
    pub grace_period: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            default_timeout: Some(Duration::from_secs(3600)), // 1 hour default
            grace_period: Duration::from_secs(2),
        }
    }
}
