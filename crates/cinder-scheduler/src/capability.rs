//! Execution-environment capability matching.

use cinder_core::run::JobInstance;

/// Predicate deciding which instances the pool's environments may run.
///
/// Resource matching is a deployment policy, not an engine concern, so it
/// is pluggable on the scheduler. The default accepts everything.
pub trait CapabilityMatcher: Send + Sync {
    fn can_run(&self, instance: &JobInstance) -> bool;
}

/// Matcher that lets any environment run any instance.
pub struct AnyEnvironment;

impl CapabilityMatcher for AnyEnvironment {
    fn can_run(&self, _instance: &JobInstance) -> bool {
        true
    }
}

/// Matcher restricting instances by the values of one matrix axis.
///
/// Useful for pools whose environments only cover some variants, e.g. a
/// fleet without macOS machines. Instances that do not carry the axis are
/// accepted.
pub struct AxisValueMatcher {
    axis: String,
    allowed: Vec<String>,
}

impl AxisValueMatcher {
    pub fn new(axis: impl Into<String>, allowed: Vec<String>) -> Self {
        Self {
            axis: axis.into(),
            allowed,
        }
    }
}

impl CapabilityMatcher for AxisValueMatcher {
    fn can_run(&self, instance: &JobInstance) -> bool {
        match instance.variant.iter().find(|(name, _)| *name == self.axis) {
            Some((_, value)) => self.allowed.contains(value),
            None => true,
        }
    }
}
