//! Workflow definition types.
//!
//! These types represent the user-authored workflow YAML configuration.
//! A `WorkflowSpec` is immutable once parsed; the scheduler only ever
//! reads it.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSpec {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub triggers: Vec<TriggerRule>,
    /// Global environment overlay, lowest precedence.
    #[serde(default)]
    pub env: HashMap<String, String>,
    pub jobs: Vec<JobDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerRule {
    #[serde(rename = "type")]
    pub event: EventKind,
    /// Branch allow-list. Empty means all branches.
    #[serde(default)]
    pub branches: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Push,
    PullRequest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDefinition {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Job environment overlay, overrides global keys.
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub matrix: Option<MatrixConfig>,
    pub steps: Vec<StepDefinition>,
}

/// Environment-variant axes for a job, in declared order.
///
/// Expansion iterates row-major over this order: the first axis varies
/// slowest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixConfig {
    pub axes: Vec<MatrixAxis>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixAxis {
    pub name: String,
    pub values: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDefinition {
    pub name: String,
    pub run: String,
    /// Step environment overlay, highest precedence.
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

impl WorkflowSpec {
    /// Parse a workflow from YAML and validate its structure.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let spec: WorkflowSpec = serde_yaml::from_str(content)?;
        spec.validate()?;
        Ok(spec)
    }

    /// Validate structural invariants of the definition.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidWorkflow("workflow name is empty".into()));
        }
        if self.jobs.is_empty() {
            return Err(Error::InvalidWorkflow(
                "workflow declares no jobs".into(),
            ));
        }

        let mut job_names = HashSet::new();
        for job in &self.jobs {
            if !job_names.insert(job.name.as_str()) {
                return Err(Error::InvalidWorkflow(format!(
                    "duplicate job name: {}",
                    job.name
                )));
            }
            job.validate()?;
        }

        Ok(())
    }

    /// Look up a job by name.
    pub fn job(&self, name: &str) -> Option<&JobDefinition> {
        self.jobs.iter().find(|j| j.name == name)
    }
}

impl JobDefinition {
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::InvalidWorkflow("job name is empty".into()));
        }
        if self.steps.is_empty() {
            return Err(Error::InvalidWorkflow(format!(
                "job {} declares no steps",
                self.name
            )));
        }

        let mut step_names = HashSet::new();
        for step in &self.steps {
            if !step_names.insert(step.name.as_str()) {
                return Err(Error::InvalidWorkflow(format!(
                    "duplicate step name in job {}: {}",
                    self.name, step.name
                )));
            }
            if step.run.trim().is_empty() {
                return Err(Error::InvalidWorkflow(format!(
                    "step {} in job {} has an empty command",
                    step.name, self.name
                )));
            }
        }

        if let Some(matrix) = &self.matrix {
            let mut axis_names = HashSet::new();
            for axis in &matrix.axes {
                if !axis_names.insert(axis.name.as_str()) {
                    return Err(Error::InvalidWorkflow(format!(
                        "duplicate matrix axis in job {}: {}",
                        self.name, axis.name
                    )));
                }
                if axis.values.is_empty() {
                    return Err(Error::InvalidWorkflow(format!(
                        "matrix axis {} in job {} has no values",
                        axis.name, self.name
                    )));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
name: ci
triggers:
  - type: push
    branches: [main]
  - type: pull_request
env:
  CARGO_TERM_COLOR: always
jobs:
  - name: lints
    steps:
      - name: fmt
        run: cargo fmt --all -- --check
      - name: clippy
        run: cargo clippy -- -D warnings
  - name: test
    matrix:
      axes:
        - name: os
          values: [ubuntu, macos, windows]
        - name: toolchain
          values: [stable, beta]
    steps:
      - name: build
        run: cargo build --verbose
      - name: test
        run: cargo test --verbose
"#;

    #[test]
    fn test_parse_sample_workflow() {
        let spec = WorkflowSpec::from_yaml(SAMPLE).unwrap();
        assert_eq!(spec.name, "ci");
        assert_eq!(spec.triggers.len(), 2);
        assert_eq!(spec.triggers[0].event, EventKind::Push);
        assert_eq!(spec.triggers[0].branches, vec!["main"]);
        assert_eq!(spec.jobs.len(), 2);

        let matrix = spec.job("test").unwrap().matrix.as_ref().unwrap();
        assert_eq!(matrix.axes.len(), 2);
        assert_eq!(matrix.axes[0].name, "os");
        assert_eq!(matrix.axes[0].values.len(), 3);
    }

    #[test]
    fn test_rejects_empty_jobs() {
        let err = WorkflowSpec::from_yaml("name: empty\njobs: []").unwrap_err();
        assert!(err.to_string().contains("no jobs"));
    }

    #[test]
    fn test_rejects_duplicate_job_names() {
        let yaml = r#"
name: dup
jobs:
  - name: build
    steps:
      - name: a
        run: "true"
  - name: build
    steps:
      - name: b
        run: "true"
"#;
        let err = WorkflowSpec::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("duplicate job name"));
    }

    #[test]
    fn test_rejects_empty_axis() {
        let yaml = r#"
name: bad-matrix
jobs:
  - name: test
    matrix:
      axes:
        - name: os
          values: []
    steps:
      - name: t
        run: "true"
"#;
        let err = WorkflowSpec::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("no values"));
    }
}
