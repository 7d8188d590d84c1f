//! Per-test-case execution context.

use std::collections::HashMap;

use serde_json::{Map as JsonMap, Value};
use uuid::Uuid;

use caseflow_types::ActionResult;

/// Mutable state accompanying one test-case execution.
///
/// The context carries the test identity, the accumulated step results, and
/// the running test-success flag consulted by conditional guards. Callers may
/// attach arbitrary static variables through `vars`; the engine never reads or
/// writes them, but the resolver exposes them as placeholder roots.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Stable identifier for this run; a fresh UUID when the caller supplies none.
    pub test_case_id: String,
    /// Copy of the test case's name.
    pub test_case_name: String,
    /// Results of terminal steps, keyed by step id.
    pub step_results: HashMap<String, ActionResult>,
    /// Starts `true`; becomes `false` permanently the first time a step
    /// completes unsuccessfully.
    pub test_success: bool,
    /// Caller-supplied static variables, resolvable as placeholder roots.
    pub vars: JsonMap<String, Value>,
}

impl ExecutionContext {
    /// Creates a context for the named test case, minting an id if absent.
    pub fn new(test_case_name: impl Into<String>, test_case_id: Option<String>) -> Self {
        Self {
            test_case_id: test_case_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            test_case_name: test_case_name.into(),
            step_results: HashMap::new(),
            test_success: true,
            vars: JsonMap::new(),
        }
    }

    /// Attaches caller-supplied static variables.
    pub fn with_vars(mut self, vars: JsonMap<String, Value>) -> Self {
        self.vars = vars;
        self
    }

    /// Records a terminal step result, folding its success into the running
    /// flag. The flag is monotonic: once `false` it stays `false`.
    pub fn record_step_result(&mut self, step_id: &str, result: ActionResult) {
        if !result.success {
            self.test_success = false;
        }
        self.step_results.insert(step_id.to_string(), result);
    }

    /// Result of a completed step, if it reached a terminal state.
    pub fn step_result(&self, step_id: &str) -> Option<&ActionResult> {
        self.step_results.get(step_id)
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new("", None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mints_identifier_when_caller_supplies_none() {
        let first = ExecutionContext::new("demo", None);
        let second = ExecutionContext::new("demo", None);
        assert!(!first.test_case_id.is_empty());
        assert_ne!(first.test_case_id, second.test_case_id);
    }

    #[test]
    fn keeps_caller_supplied_identifier() {
        let context = ExecutionContext::new("demo", Some("run-42".into()));
        assert_eq!(context.test_case_id, "run-42");
    }

    #[test]
    fn test_success_is_monotonic() {
        let mut context = ExecutionContext::new("demo", None);
        assert!(context.test_success);

        context.record_step_result("a", ActionResult::ok(json!({})));
        assert!(context.test_success);

        context.record_step_result("b", ActionResult::failure("boom"));
        assert!(!context.test_success);

        context.record_step_result("c", ActionResult::ok(json!({})));
        assert!(!context.test_success, "flag must not recover after a failure");
    }
}
