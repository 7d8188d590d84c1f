//! Deterministic failure stub.

use anyhow::Result;
use caseflow_engine::{Action, ExecutionContext};
use caseflow_types::{ActionResult, Step};
use serde_json::Value;

/// Always reports failure. The optional `message` parameter overrides the
/// default diagnostic, which makes failure-path tests readable.
pub struct FailAction;

impl Action for FailAction {
    fn execute(&self, step: &Step, _context: &ExecutionContext) -> Result<ActionResult> {
        let message = step
            .params
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("intentional failure");
        Ok(ActionResult::failure(message))
    }
}
