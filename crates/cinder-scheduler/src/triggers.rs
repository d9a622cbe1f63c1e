//! Trigger matching and evaluation.

use cinder_core::workflow::{EventKind, TriggerRule, WorkflowSpec};

/// Event supplied by the invoking environment at run time.
#[derive(Debug, Clone)]
pub struct TriggerEvent {
    pub kind: EventKind,
    pub branch: String,
}

impl TriggerEvent {
    pub fn push(branch: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Push,
            branch: branch.into(),
        }
    }

    pub fn pull_request(branch: impl Into<String>) -> Self {
        Self {
            kind: EventKind::PullRequest,
            branch: branch.into(),
        }
    }
}

/// Matcher for determining if a workflow should run for an event.
///
/// Evaluation is pure and side-effect-free; it never expands or
/// dispatches anything.
pub struct TriggerMatcher;

impl TriggerMatcher {
    pub fn new() -> Self {
        Self
    }

    /// Check if a workflow should be triggered by an event.
    pub fn matches(&self, spec: &WorkflowSpec, event: &TriggerEvent) -> bool {
        if spec.triggers.is_empty() {
            // Default: trigger on push to any branch
            return event.kind == EventKind::Push;
        }

        spec.triggers
            .iter()
            .any(|rule| self.rule_matches(rule, event))
    }

    fn rule_matches(&self, rule: &TriggerRule, event: &TriggerEvent) -> bool {
        rule.event == event.kind && self.branch_matches(&rule.branches, &event.branch)
    }

    fn branch_matches(&self, patterns: &[String], branch: &str) -> bool {
        if patterns.is_empty() {
            return true; // Match all branches if no patterns specified
        }
        patterns.iter().any(|p| self.glob_match(p, branch))
    }

    fn glob_match(&self, pattern: &str, text: &str) -> bool {
        if pattern == "*" || pattern == "**" {
            return true;
        }
        if let Some(prefix) = pattern.strip_suffix("/**") {
            return text.starts_with(prefix);
        }
        if let Some(prefix) = pattern.strip_suffix("/*") {
            let prefix_slash = format!("{}/", prefix);
            if text.starts_with(&prefix_slash) {
                return !text[prefix_slash.len()..].contains('/');
            }
            return false;
        }
        if pattern.contains('*') {
            let parts: Vec<&str> = pattern.split('*').collect();
            if parts.len() == 2 {
                return text.starts_with(parts[0]) && text.ends_with(parts[1]);
            }
        }
        pattern == text
    }
}

impl Default for TriggerMatcher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_with_rules(rules: Vec<TriggerRule>) -> WorkflowSpec {
        WorkflowSpec {
            name: "ci".to_string(),
            description: None,
            triggers: rules,
            env: Default::default(),
            jobs: vec![],
        }
    }

    fn rule(event: EventKind, branches: &[&str]) -> TriggerRule {
        TriggerRule {
            event,
            branches: branches.iter().map(|b| b.to_string()).collect(),
        }
    }

    #[test]
    fn test_branch_match_exact() {
        let matcher = TriggerMatcher::new();
        assert!(matcher.branch_matches(&["main".to_string()], "main"));
        assert!(!matcher.branch_matches(&["main".to_string()], "develop"));
    }

    #[test]
    fn test_branch_match_glob() {
        let matcher = TriggerMatcher::new();
        assert!(matcher.branch_matches(&["feature/*".to_string()], "feature/foo"));
        assert!(!matcher.branch_matches(&["feature/*".to_string()], "feature/foo/bar"));
        assert!(matcher.branch_matches(&["release/**".to_string()], "release/v1/hotfix"));
    }

    #[test]
    fn test_empty_patterns_match_all() {
        let matcher = TriggerMatcher::new();
        assert!(matcher.branch_matches(&[], "any-branch"));
    }

    #[test]
    fn test_restricted_workflow_ignores_other_branches() {
        let matcher = TriggerMatcher::new();
        let spec = spec_with_rules(vec![rule(EventKind::Push, &["main"])]);

        assert!(matcher.matches(&spec, &TriggerEvent::push("main")));
        assert!(!matcher.matches(&spec, &TriggerEvent::push("feature")));
    }

    #[test]
    fn test_event_kind_must_match() {
        let matcher = TriggerMatcher::new();
        let spec = spec_with_rules(vec![rule(EventKind::PullRequest, &[])]);

        assert!(matcher.matches(&spec, &TriggerEvent::pull_request("feature")));
        assert!(!matcher.matches(&spec, &TriggerEvent::push("feature")));
    }

    #[test]
    fn test_no_rules_defaults_to_push() {
        let matcher = TriggerMatcher::new();
        let spec = spec_with_rules(vec![]);

        assert!(matcher.matches(&spec, &TriggerEvent::push("anything")));
        assert!(!matcher.matches(&spec, &TriggerEvent::pull_request("anything")));
    }
}
