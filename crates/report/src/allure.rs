//! Allure-compatible JSON report writer.
//!
//! Events are buffered in memory for the duration of the run; each completed
//! test case becomes one `<uuid>-result.json` document under the output
//! directory when `generate_report` flushes. Events from concurrent steps may
//! interleave, so all buffer access goes through one mutex and step records
//! are matched by id rather than position.

use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use caseflow_engine::Reporter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
enum AllureStatus {
    Passed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusDetails {
    message: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct AllureStep {
    name: String,
    status: AllureStatus,
    stage: &'static str,
    start: i64,
    stop: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_details: Option<StatusDetails>,
    #[serde(skip)]
    step_id: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct AllureTestResult {
    uuid: String,
    history_id: String,
    name: String,
    status: AllureStatus,
    stage: &'static str,
    start: i64,
    stop: i64,
    steps: Vec<AllureStep>,
}

#[derive(Debug)]
struct OpenTest {
    test_case_id: String,
    name: String,
    start: i64,
    steps: Vec<AllureStep>,
}

#[derive(Debug, Default)]
struct ReportBuffer {
    current: Option<OpenTest>,
    finished: Vec<AllureTestResult>,
}

/// Buffering reporter that serializes finished test cases into
/// Allure-compatible result files.
pub struct AllureReporter {
    output_dir: PathBuf,
    buffer: Mutex<ReportBuffer>,
}

impl AllureReporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            buffer: Mutex::new(ReportBuffer::default()),
        }
    }

    fn now_ms() -> i64 {
        Utc::now().timestamp_millis()
    }
}

impl Reporter for AllureReporter {
    fn test_start(&self, test_case_id: &str, name: &str) -> Result<()> {
        let mut buffer = self.buffer.lock().expect("report buffer lock");
        buffer.current = Some(OpenTest {
            test_case_id: test_case_id.to_string(),
            name: name.to_string(),
            start: Self::now_ms(),
            steps: Vec::new(),
        });
        Ok(())
    }

    fn step_start(&self, step_id: &str, name: &str, _kind: &str) -> Result<()> {
        let mut buffer = self.buffer.lock().expect("report buffer lock");
        if let Some(test) = buffer.current.as_mut() {
            test.steps.push(AllureStep {
                name: name.to_string(),
                status: AllureStatus::Failed,
                stage: "running",
                start: Self::now_ms(),
                stop: 0,
                status_details: None,
                step_id: step_id.to_string(),
            });
        }
        Ok(())
    }

    fn step_end(&self, step_id: &str, success: bool, output: &Value) -> Result<()> {
        let stop = Self::now_ms();
        let mut buffer = self.buffer.lock().expect("report buffer lock");
        let Some(test) = buffer.current.as_mut() else {
            return Ok(());
        };
        let status = if success { AllureStatus::Passed } else { AllureStatus::Failed };
        let details = (!success).then(|| StatusDetails {
            message: output.to_string(),
        });
        match test
            .steps
            .iter_mut()
            .find(|step| step.step_id == step_id && step.stage == "running")
        {
            Some(step) => {
                step.status = status;
                step.stage = "finished";
                step.stop = stop;
                step.status_details = details;
            }
            // A synthesized dependency failure ends without a matching start.
            None => test.steps.push(AllureStep {
                name: step_id.to_string(),
                status,
                stage: "finished",
                start: stop,
                stop,
                status_details: details,
                step_id: step_id.to_string(),
            }),
        }
        Ok(())
    }

    fn step_skipped(&self, step_id: &str, name: &str, _kind: &str, reason: &str) -> Result<()> {
        let now = Self::now_ms();
        let mut buffer = self.buffer.lock().expect("report buffer lock");
        if let Some(test) = buffer.current.as_mut() {
            test.steps.push(AllureStep {
                name: name.to_string(),
                status: AllureStatus::Skipped,
                stage: "finished",
                start: now,
                stop: now,
                status_details: Some(StatusDetails {
                    message: reason.to_string(),
                }),
                step_id: step_id.to_string(),
            });
        }
        Ok(())
    }

    fn test_end(&self, _test_case_id: &str, success: bool) -> Result<()> {
        let stop = Self::now_ms();
        let mut buffer = self.buffer.lock().expect("report buffer lock");
        if let Some(test) = buffer.current.take() {
            buffer.finished.push(AllureTestResult {
                uuid: Uuid::new_v4().to_string(),
                history_id: test.test_case_id,
                name: test.name,
                status: if success { AllureStatus::Passed } else { AllureStatus::Failed },
                stage: "finished",
                start: test.start,
                stop,
                steps: test.steps,
            });
        }
        Ok(())
    }

    fn generate_report(&self) -> Result<()> {
        let finished: Vec<AllureTestResult> = {
            let buffer = self.buffer.lock().expect("report buffer lock");
            buffer.finished.clone()
        };
        fs::create_dir_all(&self.output_dir).with_context(|| format!("create report dir {}", self.output_dir.display()))?;
        for result in &finished {
            let path = self.output_dir.join(format!("{}-result.json", result.uuid));
            let content = serde_json::to_string_pretty(result)?;
            fs::write(&path, content).with_context(|| format!("write report {}", path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn drive_one_case(reporter: &AllureReporter) {
        reporter.test_start("case-1", "checkout flow").expect("test_start");
        reporter.step_start("a", "create user", "http").expect("step_start");
        reporter.step_end("a", true, &json!({ "status_code": 201 })).expect("step_end");
        reporter
            .step_skipped("b", "cleanup", "nop", "condition success() not met")
            .expect("step_skipped");
        reporter.step_end("c", false, &json!({ "error": "Dependency 'a' failed" })).expect("step_end");
        reporter.test_end("case-1", false).expect("test_end");
    }

    #[test]
    fn writes_one_result_file_per_test_case() {
        let dir = tempfile::tempdir().expect("tempdir");
        let reporter = AllureReporter::new(dir.path());
        drive_one_case(&reporter);
        reporter.generate_report().expect("generate");

        let files: Vec<_> = fs::read_dir(dir.path())
            .expect("read dir")
            .map(|entry| entry.expect("entry").path())
            .collect();
        assert_eq!(files.len(), 1);

        let content = fs::read_to_string(&files[0]).expect("read result");
        let parsed: Value = serde_json::from_str(&content).expect("valid json");
        assert_eq!(parsed["name"], "checkout flow");
        assert_eq!(parsed["historyId"], "case-1");
        assert_eq!(parsed["status"], "failed");

        let steps = parsed["steps"].as_array().expect("steps");
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0]["status"], "passed");
        assert_eq!(steps[1]["status"], "skipped");
        assert_eq!(steps[2]["status"], "failed");
        assert!(
            steps[2]["statusDetails"]["message"]
                .as_str()
                .expect("message")
                .contains("Dependency 'a' failed")
        );
    }

    #[test]
    fn generate_report_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        let reporter = AllureReporter::new(dir.path());
        drive_one_case(&reporter);
        reporter.generate_report().expect("first");
        reporter.generate_report().expect("second");

        let count = fs::read_dir(dir.path()).expect("read dir").count();
        assert_eq!(count, 1, "repeated generation must not duplicate results");
    }
}
