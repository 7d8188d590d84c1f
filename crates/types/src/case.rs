//! Test-case document model.
//!
//! A test case is an ordered sequence of steps plus identity metadata. The
//! structures here deserialize from both YAML and JSON; declaration order of
//! steps is significant and preserved by the loader.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Document discriminator accepted by the loader.
pub const TEST_CASE_KIND: &str = "TestCase";

/// A complete test-case definition, immutable after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    /// Document discriminator; must equal `"TestCase"`.
    pub kind: String,
    /// Opaque document version string.
    pub version: String,
    /// Human-readable label for the test case.
    pub name: String,
    /// Ordered sequence of steps. Dependency validation relies on this order.
    #[serde(rename = "step", alias = "steps")]
    pub steps: Vec<Step>,
}

/// A single operation belonging to a test case.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Step {
    /// Unique identifier within the test case. The loader assigns
    /// `#<1-based-index>` when the document omits it.
    #[serde(default)]
    pub id: String,
    /// Human-readable label.
    pub name: String,
    /// Action-kind key resolved against the action registry at dispatch time.
    pub kind: String,
    /// Free-form nested parameters; placeholders may appear in any string.
    #[serde(default)]
    pub params: Value,
    /// Optional conditional guard: `always()`, `success()`, or `failure()`.
    /// Absent means `success()`.
    #[serde(default, rename = "if")]
    pub r#if: Option<String>,
    /// Step ids that must reach a terminal state before this step may start.
    /// Each referenced id must appear earlier in the declared order.
    #[serde(default)]
    pub depends_on: Vec<String>,
}

/// Outcome of one action invocation, persisted in the execution context for
/// the remainder of the run so later steps may reference it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActionResult {
    /// Whether the action considers itself successful.
    pub success: bool,
    /// Arbitrary JSON payload; conventionally a mapping.
    #[serde(default)]
    pub output: Value,
}

impl ActionResult {
    /// Successful result wrapping the given output.
    pub fn ok(output: Value) -> Self {
        Self { success: true, output }
    }

    /// Failed result carrying a single `error` field.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output: serde_json::json!({ "error": message.into() }),
        }
    }
}

/// Conditional guard selecting one of three dispatch policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Condition {
    /// Dispatch regardless of the running test-success flag.
    Always,
    /// Dispatch only while the test is still succeeding. The default.
    #[default]
    Success,
    /// Dispatch only after some earlier step has failed.
    Failure,
}

impl Condition {
    /// Parses an optional guard expression. Matching is case-insensitive and
    /// ignores surrounding whitespace; an absent expression means `success()`.
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        let Some(raw) = raw else {
            return Ok(Self::Success);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "always()" => Ok(Self::Always),
            "success()" => Ok(Self::Success),
            "failure()" => Ok(Self::Failure),
            _ => bail!(
                "unsupported conditional expression '{}'; expected always(), success(), or failure()",
                raw.trim()
            ),
        }
    }

    /// Canonical source form of the guard.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Always => "always()",
            Self::Success => "success()",
            Self::Failure => "failure()",
        }
    }
}

/// Loads a test case from a YAML (default) or JSON file, assigning fallback
/// step identifiers and checking the document discriminator.
pub fn load_test_case_from_file(path: impl AsRef<Path>) -> Result<TestCase> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let case: TestCase = if path.extension().and_then(|e| e.to_str()) == Some("json") {
        serde_json::from_str(&text).with_context(|| format!("parse test case json {}", path.display()))?
    } else {
        serde_yaml::from_str(&text).with_context(|| format!("parse test case yaml {}", path.display()))?
    };
    finalize_test_case(case)
}

/// Parses a test case from YAML text.
pub fn test_case_from_yaml(text: &str) -> Result<TestCase> {
    let case: TestCase = serde_yaml::from_str(text).context("parse test case yaml")?;
    finalize_test_case(case)
}

fn finalize_test_case(mut case: TestCase) -> Result<TestCase> {
    if case.kind != TEST_CASE_KIND {
        bail!("unsupported document kind '{}'; expected '{}'", case.kind, TEST_CASE_KIND);
    }
    for (index, step) in case.steps.iter_mut().enumerate() {
        if step.id.trim().is_empty() {
            step.id = format!("#{}", index + 1);
        }
    }
    Ok(case)
}
