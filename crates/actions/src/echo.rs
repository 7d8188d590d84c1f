//! Echo action: reflects its resolved parameters back as output.

use anyhow::Result;
use caseflow_engine::{Action, ExecutionContext};
use caseflow_types::{ActionResult, Step};

/// Returns the step's resolved parameters unchanged. Handy for wiring checks
/// and for making resolved placeholder values visible to later steps.
pub struct EchoAction;

impl Action for EchoAction {
    fn execute(&self, step: &Step, _context: &ExecutionContext) -> Result<ActionResult> {
        Ok(ActionResult::ok(step.params.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reflects_params() {
        let step = Step {
            id: "e".into(),
            name: "echo".into(),
            kind: "echo".into(),
            params: json!({ "message": "hello" }),
            ..Default::default()
        };
        let result = EchoAction
            .execute(&step, &ExecutionContext::new("t", None))
            .expect("execute");
        assert!(result.success);
        assert_eq!(result.output, json!({ "message": "hello" }));
    }
}
