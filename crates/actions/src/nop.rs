//! No-op action.

use anyhow::Result;
use caseflow_engine::{Action, ExecutionContext};
use caseflow_types::{ActionResult, Step};
use serde_json::json;

/// Succeeds without side effects. Useful as a dependency anchor and in tests.
pub struct NopAction;

impl Action for NopAction {
    fn execute(&self, _step: &Step, _context: &ExecutionContext) -> Result<ActionResult> {
        Ok(ActionResult::ok(json!({ "status": "ok" })))
    }
}
