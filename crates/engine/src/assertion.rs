//! Declarative assertion evaluation.
//!
//! Compares an expected shape against an actual value, producing one
//! [`AssertionResult`] per checked field. Evaluation walks the expected shape
//! recursively, carrying a dotted path, and reports every failure it finds
//! rather than stopping at the first.
//!
//! Expected primitives participate in placeholder resolution with the same
//! `{expr}` syntax the value resolver uses; the `"[expr]"` short form resolves
//! the path and compares against the raw value instead of its string form.
//! Expected sequences of exactly one reserved token (`shouldNotBeNull`,
//! `shouldBeNull`, `shouldBeEmpty`, `shouldNotBeEmpty`) assert on the actual
//! value's presence or emptiness; any other sequence compares positionally.

use serde::Serialize;
use serde_json::Value;

use crate::context::ExecutionContext;
use crate::resolve::{lookup_path, resolve_string};

/// Outcome of a single field-level comparison.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AssertionResult {
    /// Dotted path from the assertion root; empty at the root itself.
    pub field: String,
    /// Expected value after variable resolution.
    pub expected: Value,
    /// Actual value found at the path; `null` when absent.
    pub actual: Value,
    /// Whether this comparison passed.
    pub passed: bool,
    /// Diagnostic detail, present on failures that need one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Evaluates an expected shape against an actual value. `actual` is `None`
/// when the compared location is absent entirely.
pub fn evaluate(expected: &Value, actual: Option<&Value>, context: &ExecutionContext) -> Vec<AssertionResult> {
    let mut results = Vec::new();
    evaluate_node(expected, actual, "", context, &mut results);
    results
}

/// An assertion step succeeds iff every comparison passed.
pub fn all_passed(results: &[AssertionResult]) -> bool {
    results.iter().all(|result| result.passed)
}

fn evaluate_node(expected: &Value, actual: Option<&Value>, path: &str, context: &ExecutionContext, out: &mut Vec<AssertionResult>) {
    match expected {
        Value::Object(expected_map) => {
            let Some(Value::Object(actual_map)) = actual else {
                out.push(AssertionResult {
                    field: path.to_string(),
                    expected: expected.clone(),
                    actual: actual.cloned().unwrap_or(Value::Null),
                    passed: false,
                    message: Some("expected a mapping".to_string()),
                });
                return;
            };
            for (key, expected_child) in expected_map {
                let child_path = if path.is_empty() { key.clone() } else { format!("{path}.{key}") };
                evaluate_node(expected_child, actual_map.get(key), &child_path, context, out);
            }
        }
        Value::Array(expected_items) => {
            if let [Value::String(token)] = expected_items.as_slice()
                && let Some(result) = evaluate_reserved_token(token, actual, path)
            {
                out.push(result);
                return;
            }
            let Some(Value::Array(actual_items)) = actual else {
                out.push(AssertionResult {
                    field: path.to_string(),
                    expected: expected.clone(),
                    actual: actual.cloned().unwrap_or(Value::Null),
                    passed: false,
                    message: Some("expected a sequence".to_string()),
                });
                return;
            };
            for index in 0..expected_items.len().max(actual_items.len()) {
                let child_path = format!("{path}[{index}]");
                match expected_items.get(index) {
                    Some(expected_child) => {
                        evaluate_node(expected_child, actual_items.get(index), &child_path, context, out);
                    }
                    None => out.push(AssertionResult {
                        field: child_path,
                        expected: Value::Null,
                        actual: actual_items[index].clone(),
                        passed: false,
                        message: Some("unexpected element".to_string()),
                    }),
                }
            }
        }
        primitive => {
            let resolved = resolve_expected(primitive, context);
            let (passed, message) = match actual {
                Some(actual_value) => (*actual_value == resolved, None),
                None => (false, Some("value is absent".to_string())),
            };
            out.push(AssertionResult {
                field: path.to_string(),
                expected: resolved,
                actual: actual.cloned().unwrap_or(Value::Null),
                passed,
                message,
            });
        }
    }
}

/// Resolves variables in a primitive expected value. The `"[expr]"` short form
/// yields the referenced raw value; other strings go through placeholder
/// interpolation; non-string primitives pass through unchanged.
fn resolve_expected(expected: &Value, context: &ExecutionContext) -> Value {
    let Value::String(text) = expected else {
        return expected.clone();
    };
    if let Some(inner) = text.strip_prefix('[').and_then(|rest| rest.strip_suffix(']'))
        && let Some(resolved) = lookup_path(inner.trim(), context)
    {
        return resolved;
    }
    Value::String(resolve_string(text, context))
}

fn evaluate_reserved_token(token: &str, actual: Option<&Value>, path: &str) -> Option<AssertionResult> {
    let passed = match token {
        "shouldNotBeNull" => matches!(actual, Some(value) if !value.is_null()),
        "shouldBeNull" => matches!(actual, None | Some(Value::Null)),
        "shouldBeEmpty" => matches!(actual, Some(Value::String(s)) if s.is_empty()) || matches!(actual, Some(Value::Array(a)) if a.is_empty()),
        "shouldNotBeEmpty" => {
            matches!(actual, Some(Value::String(s)) if !s.is_empty()) || matches!(actual, Some(Value::Array(a)) if !a.is_empty())
        }
        _ => return None,
    };
    Some(AssertionResult {
        field: path.to_string(),
        expected: Value::String(token.to_string()),
        actual: actual.cloned().unwrap_or(Value::Null),
        passed,
        message: (!passed).then(|| format!("{token} check failed")),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use caseflow_types::ActionResult;
    use serde_json::json;

    fn context() -> ExecutionContext {
        let mut context = ExecutionContext::new("asserts", Some("case-1".into()));
        context.record_step_result("fetch", ActionResult::ok(json!({ "id": "abc", "count": 3 })));
        context
    }

    #[test]
    fn primitive_equality_passes_and_fails() {
        let context = context();
        let results = evaluate(&json!(200), Some(&json!(200)), &context);
        assert!(all_passed(&results));

        let results = evaluate(&json!(200), Some(&json!(404)), &context);
        assert!(!all_passed(&results));
        assert_eq!(results[0].expected, json!(200));
        assert_eq!(results[0].actual, json!(404));
    }

    #[test]
    fn short_form_resolves_raw_variable_value() {
        let context = context();
        let results = evaluate(&json!("[fetch.output.count]"), Some(&json!(3)), &context);
        assert!(all_passed(&results), "short form must compare the raw number: {results:?}");
        assert_eq!(results[0].expected, json!(3));
    }

    #[test]
    fn short_form_matches_resolver_output_for_same_path() {
        let context = context();
        let via_short_form = match &evaluate(&json!("[fetch.output.id]"), Some(&json!("abc")), &context)[0].expected {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        };
        let via_resolver = crate::resolve::resolve_string("{fetch.output.id}", &context);
        assert_eq!(via_short_form, via_resolver);
    }

    #[test]
    fn placeholder_in_expected_string_is_resolved() {
        let context = context();
        let results = evaluate(&json!("id={fetch.output.id}"), Some(&json!("id=abc")), &context);
        assert!(all_passed(&results));
    }

    #[test]
    fn mapping_ignores_keys_present_only_in_actual() {
        let context = context();
        let expected = json!({ "id": "abc" });
        let actual = json!({ "id": "abc", "extra": true });
        let results = evaluate(&expected, Some(&actual), &context);
        assert_eq!(results.len(), 1);
        assert!(all_passed(&results));
    }

    #[test]
    fn mapping_reports_one_failure_per_missing_or_mismatched_key() {
        let context = context();
        let expected = json!({ "id": "abc", "missing": 1, "wrong": "x" });
        let actual = json!({ "id": "abc", "wrong": "y" });
        let results = evaluate(&expected, Some(&actual), &context);
        assert_eq!(results.len(), 3);
        assert_eq!(results.iter().filter(|r| !r.passed).count(), 2);
        let missing = results.iter().find(|r| r.field == "missing").expect("missing entry");
        assert_eq!(missing.message.as_deref(), Some("value is absent"));
    }

    #[test]
    fn mapping_against_non_mapping_is_one_failure() {
        let context = context();
        let results = evaluate(&json!({ "id": "abc" }), Some(&json!([1, 2])), &context);
        assert_eq!(results.len(), 1);
        assert!(!results[0].passed);
        assert_eq!(results[0].message.as_deref(), Some("expected a mapping"));
    }

    #[test]
    fn nested_paths_are_dotted() {
        let context = context();
        let expected = json!({ "outer": { "inner": 1 } });
        let actual = json!({ "outer": { "inner": 2 } });
        let results = evaluate(&expected, Some(&actual), &context);
        assert_eq!(results[0].field, "outer.inner");
    }

    #[test]
    fn reserved_tokens_check_presence_and_emptiness() {
        let context = context();

        assert!(all_passed(&evaluate(&json!(["shouldNotBeNull"]), Some(&json!("x")), &context)));
        assert!(!all_passed(&evaluate(&json!(["shouldNotBeNull"]), Some(&Value::Null), &context)));
        assert!(!all_passed(&evaluate(&json!(["shouldNotBeNull"]), None, &context)));

        assert!(all_passed(&evaluate(&json!(["shouldBeNull"]), None, &context)));
        assert!(all_passed(&evaluate(&json!(["shouldBeNull"]), Some(&Value::Null), &context)));
        assert!(!all_passed(&evaluate(&json!(["shouldBeNull"]), Some(&json!(0)), &context)));

        assert!(all_passed(&evaluate(&json!(["shouldBeEmpty"]), Some(&json!("")), &context)));
        assert!(all_passed(&evaluate(&json!(["shouldBeEmpty"]), Some(&json!([])), &context)));
        assert!(!all_passed(&evaluate(&json!(["shouldBeEmpty"]), Some(&json!("x")), &context)));

        assert!(all_passed(&evaluate(&json!(["shouldNotBeEmpty"]), Some(&json!([1])), &context)));
        assert!(!all_passed(&evaluate(&json!(["shouldNotBeEmpty"]), Some(&json!([])), &context)));
    }

    #[test]
    fn positional_sequence_comparison_covers_length_mismatch() {
        let context = context();
        let expected = json!([1, 2, 3]);
        let actual = json!([1, 9]);
        let results = evaluate(&expected, Some(&actual), &context);
        assert_eq!(results.len(), 3);
        assert!(results[0].passed);
        assert!(!results[1].passed);
        assert!(!results[2].passed, "missing actual element compares against undefined");

        let results = evaluate(&json!([1]), Some(&json!([1, 2])), &context);
        assert_eq!(results.len(), 2);
        assert_eq!(results[1].message.as_deref(), Some("unexpected element"));
    }

    #[test]
    fn sequence_against_non_sequence_is_one_failure() {
        let context = context();
        let results = evaluate(&json!([1, 2]), Some(&json!("nope")), &context);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].message.as_deref(), Some("expected a sequence"));
    }
}
