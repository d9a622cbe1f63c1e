//! Matrix expansion for parallel job-instance generation.

use cinder_core::InstanceId;
use cinder_core::overlay;
use cinder_core::run::JobInstance;
use cinder_core::workflow::{JobDefinition, MatrixAxis, WorkflowSpec};
use std::collections::HashMap;

/// Expander for environment-variant matrices.
///
/// Expansion is a pure function of the workflow definition: the same spec
/// always yields the same instances with the same names in the same order.
pub struct MatrixExpander;

impl MatrixExpander {
    pub fn new() -> Self {
        Self
    }

    /// Expand every job of a workflow, in declaration order.
    pub fn expand(&self, spec: &WorkflowSpec) -> Vec<JobInstance> {
        spec.jobs
            .iter()
            .flat_map(|job| self.expand_job(spec, job))
            .collect()
    }

    /// Expand one job template into its concrete instances.
    ///
    /// Iteration is row-major over the declared axis order: the first axis
    /// varies slowest. A job with no axes yields exactly one instance
    /// named after the job.
    pub fn expand_job(&self, spec: &WorkflowSpec, job: &JobDefinition) -> Vec<JobInstance> {
        let variants = match &job.matrix {
            Some(matrix) => Self::combinations(&matrix.axes),
            None => vec![Vec::new()],
        };

        variants
            .into_iter()
            .map(|variant| {
                let name = Self::instance_name(&job.name, &variant);
                let variant_env: HashMap<String, String> = variant.iter().cloned().collect();
                let env = overlay::resolve([&spec.env, &job.env, &variant_env]);

                JobInstance {
                    id: InstanceId::new(),
                    job_name: job.name.clone(),
                    name,
                    variant,
                    env,
                    steps: job.steps.clone(),
                }
            })
            .collect()
    }

    fn combinations(axes: &[MatrixAxis]) -> Vec<Vec<(String, String)>> {
        let mut result = vec![Vec::new()];

        for axis in axes {
            let mut next = Vec::with_capacity(result.len() * axis.values.len());

            for combination in &result {
                for value in &axis.values {
                    let mut entry = combination.clone();
                    entry.push((axis.name.clone(), value.clone()));
                    next.push(entry);
                }
            }

            result = next;
        }

        result
    }

    fn instance_name(job_name: &str, variant: &[(String, String)]) -> String {
        let mut name = job_name.to_string();
        for (_, value) in variant {
            name.push('-');
            name.push_str(value);
        }
        name
    }
}

impl Default for MatrixExpander {
    fn default() -> Self {
        Self::new()
    }
}
