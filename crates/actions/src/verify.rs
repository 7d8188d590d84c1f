//! Standalone assertion action.
//!
//! Parameters:
//! - `expect` (required): the declarative expected shape.
//! - `target` (optional): a context path (`stepId.output.field`) looked up
//!   raw, so structures survive unstringified.
//! - `actual` (optional): an inline value, already placeholder-resolved by
//!   the engine. Used when `target` is absent.

use anyhow::{Result, anyhow};
use serde_json::json;

use caseflow_engine::{Action, ExecutionContext, assertion, resolve};
use caseflow_types::{ActionResult, Step};

pub struct AssertAction;

impl Action for AssertAction {
    fn execute(&self, step: &Step, context: &ExecutionContext) -> Result<ActionResult> {
        let expect = step
            .params
            .get("expect")
            .ok_or_else(|| anyhow!("assert action requires an 'expect' parameter"))?;

        let target = match step.params.get("target") {
            Some(path) => {
                let path = path
                    .as_str()
                    .ok_or_else(|| anyhow!("assert 'target' must be a path string"))?;
                resolve::lookup_path(path.trim(), context)
            }
            None => step.params.get("actual").cloned(),
        };

        let results = assertion::evaluate(expect, target.as_ref(), context);
        let passed = assertion::all_passed(&results);
        Ok(ActionResult {
            success: passed,
            output: json!({ "passed": passed, "assertions": results }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caseflow_types::ActionResult;
    use serde_json::json;

    fn context() -> ExecutionContext {
        let mut context = ExecutionContext::new("verify", None);
        context.record_step_result("fetch", ActionResult::ok(json!({ "id": "abc", "tags": ["a", "b"] })));
        context
    }

    fn assert_step(params: serde_json::Value) -> Step {
        Step {
            id: "check".into(),
            name: "check".into(),
            kind: "assert".into(),
            params,
            ..Default::default()
        }
    }

    #[test]
    fn target_path_keeps_structure() {
        let step = assert_step(json!({
            "target": "fetch.output",
            "expect": { "id": "abc", "tags": ["shouldNotBeEmpty"] }
        }));
        let result = AssertAction.execute(&step, &context()).expect("execute");
        assert!(result.success, "assertions should pass: {}", result.output);
    }

    #[test]
    fn failing_expectation_fails_the_step_with_records() {
        let step = assert_step(json!({
            "target": "fetch.output",
            "expect": { "id": "zzz" }
        }));
        let result = AssertAction.execute(&step, &context()).expect("execute");
        assert!(!result.success);
        let records = result.output["assertions"].as_array().expect("assertion records");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0]["field"], "id");
    }

    #[test]
    fn missing_target_path_compares_against_absent() {
        let step = assert_step(json!({
            "target": "fetch.output.nothing",
            "expect": ["shouldBeNull"]
        }));
        let result = AssertAction.execute(&step, &context()).expect("execute");
        assert!(result.success);
    }

    #[test]
    fn missing_expect_parameter_is_an_error() {
        let step = assert_step(json!({ "target": "fetch.output" }));
        let error = AssertAction.execute(&step, &context()).expect_err("should reject");
        assert!(error.to_string().contains("'expect'"));
    }
}
