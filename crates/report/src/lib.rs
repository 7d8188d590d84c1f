//! Reporter implementations for the caseflow engine.

use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;

use caseflow_engine::Reporter;

pub mod allure;
pub mod log;

pub use allure::AllureReporter;
pub use log::LogReporter;

/// Forwards every event to each wrapped reporter in order.
pub struct FanoutReporter {
    sinks: Vec<Arc<dyn Reporter>>,
}

impl FanoutReporter {
    pub fn new(sinks: Vec<Arc<dyn Reporter>>) -> Self {
        Self { sinks }
    }
}

impl Reporter for FanoutReporter {
    fn test_start(&self, test_case_id: &str, name: &str) -> Result<()> {
        for sink in &self.sinks {
            sink.test_start(test_case_id, name)?;
        }
        Ok(())
    }

    fn step_start(&self, step_id: &str, name: &str, kind: &str) -> Result<()> {
        for sink in &self.sinks {
            sink.step_start(step_id, name, kind)?;
        }
        Ok(())
    }

    fn step_end(&self, step_id: &str, success: bool, output: &Value) -> Result<()> {
        for sink in &self.sinks {
            sink.step_end(step_id, success, output)?;
        }
        Ok(())
    }

    fn step_skipped(&self, step_id: &str, name: &str, kind: &str, reason: &str) -> Result<()> {
        for sink in &self.sinks {
            sink.step_skipped(step_id, name, kind, reason)?;
        }
        Ok(())
    }

    fn test_end(&self, test_case_id: &str, success: bool) -> Result<()> {
        for sink in &self.sinks {
            sink.test_end(test_case_id, success)?;
        }
        Ok(())
    }

    fn generate_report(&self) -> Result<()> {
        for sink in &self.sinks {
            sink.generate_report()?;
        }
        Ok(())
    }
}
