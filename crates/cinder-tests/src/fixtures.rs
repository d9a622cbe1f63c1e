//! Test fixtures for creating sample workflows.

use cinder_core::workflow::{
    EventKind, JobDefinition, MatrixAxis, MatrixConfig, StepDefinition, TriggerRule, WorkflowSpec,
};
use std::collections::HashMap;

/// Factory for creating test workflows.
pub struct WorkflowFixture;

impl WorkflowFixture {
    /// Create a step running a shell command.
    pub fn step(name: &str, run: &str) -> StepDefinition {
        StepDefinition {
            name: name.to_string(),
            run: run.to_string(),
            env: HashMap::new(),
            timeout_seconds: None,
        }
    }

    /// Create a job without a matrix.
    pub fn job(name: &str, steps: Vec<StepDefinition>) -> JobDefinition {
        JobDefinition {
            name: name.to_string(),
            display_name: None,
            env: HashMap::new(),
            matrix: None,
            steps,
        }
    }

    /// Create a workflow from jobs, with no trigger rules (push on any
    /// branch).
    pub fn workflow(name: &str, jobs: Vec<JobDefinition>) -> WorkflowSpec {
        WorkflowSpec {
            name: name.to_string(),
            description: None,
            triggers: vec![],
            env: HashMap::new(),
            jobs,
        }
    }

    /// A single job with a single echo step.
    pub fn simple() -> WorkflowSpec {
        Self::workflow(
            "simple",
            vec![Self::job("hello", vec![Self::step("greet", "echo hello")])],
        )
    }

    /// One job fanned out over a two-value axis, echoing its cell.
    pub fn matrix() -> WorkflowSpec {
        let mut job = Self::job(
            "shout",
            vec![Self::step("shout", "echo cell-${{ matrix.variant }}")],
        );
        job.matrix = Some(MatrixConfig {
            axes: vec![MatrixAxis {
                name: "variant".to_string(),
                values: vec!["alpha".to_string(), "beta".to_string()],
            }],
        });
        Self::workflow("matrix", vec![job])
    }

    /// Three independent jobs where only the middle one fails.
    pub fn partial_failure() -> WorkflowSpec {
        Self::workflow(
            "partial",
            vec![
                Self::job("first", vec![Self::step("ok", "true")]),
                Self::job("broken", vec![Self::step("boom", "exit 1")]),
                Self::job("last", vec![Self::step("ok", "true")]),
            ],
        )
    }

    /// One fast job plus two jobs that sleep far longer than any test.
    pub fn slow_pair() -> WorkflowSpec {
        Self::workflow(
            "slow",
            vec![
                Self::job("fast", vec![Self::step("ok", "true")]),
                Self::job("sleepy-a", vec![Self::step("sleep", "sleep 60")]),
                Self::job("sleepy-b", vec![Self::step("sleep", "sleep 60")]),
            ],
        )
    }

    /// Workflow restricted to pushes on main.
    pub fn main_only() -> WorkflowSpec {
        let mut spec = Self::simple();
        spec.triggers = vec![TriggerRule {
            event: EventKind::Push,
            branches: vec!["main".to_string()],
        }];
        spec
    }
}
