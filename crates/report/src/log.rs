//! Structured-log reporter.

use anyhow::Result;
use serde_json::Value;
use tracing::{info, warn};

use caseflow_engine::Reporter;

/// Emits each lifecycle event as a structured tracing record. The default
/// sink for CLI runs.
pub struct LogReporter;

impl Reporter for LogReporter {
    fn test_start(&self, test_case_id: &str, name: &str) -> Result<()> {
        info!(test_case_id, test_case = name, "test started");
        Ok(())
    }

    fn step_start(&self, step_id: &str, name: &str, kind: &str) -> Result<()> {
        info!(step_id, step = name, kind, "step started");
        Ok(())
    }

    fn step_end(&self, step_id: &str, success: bool, output: &Value) -> Result<()> {
        if success {
            info!(step_id, "step finished");
        } else {
            warn!(step_id, output = %output, "step failed");
        }
        Ok(())
    }

    fn step_skipped(&self, step_id: &str, name: &str, _kind: &str, reason: &str) -> Result<()> {
        info!(step_id, step = name, reason, "step skipped");
        Ok(())
    }

    fn test_end(&self, test_case_id: &str, success: bool) -> Result<()> {
        if success {
            info!(test_case_id, "test finished");
        } else {
            warn!(test_case_id, "test failed");
        }
        Ok(())
    }

    fn generate_report(&self) -> Result<()> {
        Ok(())
    }
}
