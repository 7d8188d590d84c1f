//! Reporter contract: a sink for test lifecycle events.
//!
//! The engine calls each operation synchronously and propagates any error to
//! the caller; implementations are free to buffer internally. In parallel
//! execution, events from concurrent steps interleave without any ordering
//! guarantee between branches, so implementations must be safe under
//! concurrent emission. `test_start` always precedes every step event, and
//! `test_end` follows them all.

use anyhow::Result;
use serde_json::Value;

pub trait Reporter: Send + Sync {
    /// Emitted once per test case, after validation and before any step.
    fn test_start(&self, test_case_id: &str, name: &str) -> Result<()>;

    /// Emitted just before an action is dispatched.
    fn step_start(&self, step_id: &str, name: &str, kind: &str) -> Result<()>;

    /// Emitted once a step reaches a terminal result, including results
    /// synthesized for dependency failures (which see no `step_start`).
    fn step_end(&self, step_id: &str, success: bool, output: &Value) -> Result<()>;

    /// Emitted for steps whose conditional guard excluded execution.
    fn step_skipped(&self, step_id: &str, name: &str, kind: &str, reason: &str) -> Result<()>;

    /// Emitted once per test case, last, with the aggregate verdict.
    fn test_end(&self, test_case_id: &str, success: bool) -> Result<()>;

    /// Flushes buffered results to external storage. Idempotent; invoked at
    /// the caller's request, outside the per-test lifecycle.
    fn generate_report(&self) -> Result<()>;
}

/// Reporter that drops every event. Useful for embedding and tests.
pub struct NullReporter;

impl Reporter for NullReporter {
    fn test_start(&self, _test_case_id: &str, _name: &str) -> Result<()> {
        Ok(())
    }

    fn step_start(&self, _step_id: &str, _name: &str, _kind: &str) -> Result<()> {
        Ok(())
    }

    fn step_end(&self, _step_id: &str, _success: bool, _output: &Value) -> Result<()> {
        Ok(())
    }

    fn step_skipped(&self, _step_id: &str, _name: &str, _kind: &str, _reason: &str) -> Result<()> {
        Ok(())
    }

    fn test_end(&self, _test_case_id: &str, _success: bool) -> Result<()> {
        Ok(())
    }

    fn generate_report(&self) -> Result<()> {
        Ok(())
    }
}
