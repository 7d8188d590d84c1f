//! Configuration accessor with environment-variable projection.
//!
//! A dotted key like `report.dir` first checks the environment variable
//! `REPORT_DIR` (uppercase, dots become underscores) and falls back to
//! walking the loaded configuration map. The engine itself never consults
//! configuration; action implementations and the CLI may.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_json::Value;

#[derive(Debug, Default, Clone)]
pub struct Config {
    values: serde_json::Map<String, Value>,
}

impl Config {
    /// Loads a YAML configuration file whose root is a mapping. A missing
    /// file yields the empty configuration; other I/O errors surface.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(error) => return Err(error).with_context(|| format!("read config {}", path.display())),
        };
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: Value = serde_yaml::from_str(&text).with_context(|| format!("parse config {}", path.display()))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(values) => Ok(Self { values }),
            other => bail!("configuration root must be a mapping, found {other}"),
        }
    }

    /// Resolves a dotted key: environment projection first, loaded map second.
    pub fn get(&self, key: &str) -> Option<String> {
        let projected = key.to_ascii_uppercase().replace('.', "_");
        if let Ok(value) = std::env::var(&projected) {
            return Some(value);
        }

        let mut current = self.values.get(key.split('.').next()?)?;
        for segment in key.split('.').skip(1) {
            current = current.as_object()?.get(segment)?;
        }
        Some(render_scalar(current))
    }
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> Config {
        Config::from_value(json!({
            "report": { "dir": "out/allure", "pretty": true },
            "timeout": 30
        }))
        .expect("config")
    }

    #[test]
    fn walks_dotted_paths_in_the_loaded_map() {
        let config = config();
        assert_eq!(config.get("report.dir").as_deref(), Some("out/allure"));
        assert_eq!(config.get("report.pretty").as_deref(), Some("true"));
        assert_eq!(config.get("timeout").as_deref(), Some("30"));
        assert_eq!(config.get("report.missing"), None);
        assert_eq!(config.get("absent"), None);
    }

    #[test]
    fn environment_projection_wins_over_the_map() {
        let config = config();
        // SAFETY: test-scoped variable, unique to this test.
        unsafe { std::env::set_var("CASEFLOW_TEST_REPORT_DIR", "/tmp/override") };
        assert_eq!(
            config.get("caseflow_test.report.dir").as_deref(),
            Some("/tmp/override"),
            "uppercased dotted key must project onto the environment"
        );
        unsafe { std::env::remove_var("CASEFLOW_TEST_REPORT_DIR") };
    }

    #[test]
    fn rejects_non_mapping_root() {
        let error = Config::from_value(json!([1, 2])).expect_err("should reject");
        assert!(error.to_string().contains("must be a mapping"));
    }
}
