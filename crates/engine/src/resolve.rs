//! Placeholder resolution over step parameters.
//!
//! Strings anywhere in a step's parameters may contain `{expr}` placeholders,
//! where `expr` is a dotted path with optional `[n]` sequence indices. Paths
//! root at `testCaseId`, `testCaseName`, a caller-supplied variable, or a
//! completed step id (which resolves to the JSON form of that step's full
//! result). Resolution happens just-in-time, per step, immediately before
//! dispatch, so a step observes every result its dependencies produced.
//!
//! A placeholder that does not resolve — unknown root, missing field,
//! out-of-range index, traversal into a scalar — is left literally unchanged.
//! The resolver never mutates its input and is deterministic for a given
//! context, which makes it idempotent over already-resolved structures.

use serde_json::Value;

use crate::context::ExecutionContext;

/// Recursively substitutes placeholders in a parameter structure, returning a
/// new value. Sequences recurse elementwise, mappings recurse on values with
/// keys preserved, and non-string scalars pass through unchanged.
pub fn resolve_value(value: &Value, context: &ExecutionContext) -> Value {
    match value {
        Value::String(text) => Value::String(resolve_string(text, context)),
        Value::Array(items) => Value::Array(items.iter().map(|item| resolve_value(item, context)).collect()),
        Value::Object(map) => {
            let mut resolved = serde_json::Map::new();
            for (key, nested) in map {
                resolved.insert(key.clone(), resolve_value(nested, context));
            }
            Value::Object(resolved)
        }
        _ => value.clone(),
    }
}

/// Substitutes every resolvable `{expr}` placeholder in a single string.
/// Unresolvable placeholders and unterminated braces are preserved as-is.
pub fn resolve_string(input: &str, context: &ExecutionContext) -> String {
    let mut output = String::new();
    let mut remainder = input;

    while let Some(start) = remainder.find('{') {
        let (before, after) = remainder.split_at(start);
        output.push_str(before);

        let Some(end) = after.find('}') else {
            output.push_str(after);
            return output;
        };

        match lookup_path(after[1..end].trim(), context) {
            Some(resolved) => output.push_str(&render_value(&resolved)),
            None => output.push_str(&after[..=end]),
        }
        remainder = &after[end + 1..];
    }

    output.push_str(remainder);
    output
}

/// Walks a dotted/bracketed path expression against the context.
///
/// Returns `None` on any miss so callers can preserve the original text. The
/// walker is shared with the assertion evaluator's `[var]` short form.
pub fn lookup_path(expression: &str, context: &ExecutionContext) -> Option<Value> {
    let mut segments = expression.split('.');
    let (root, root_indices) = split_indices(segments.next()?)?;

    let mut current = match root {
        "" => return None,
        "testCaseId" => Value::String(context.test_case_id.clone()),
        "testCaseName" => Value::String(context.test_case_name.clone()),
        _ => {
            if let Some(result) = context.step_results.get(root) {
                serde_json::to_value(result).ok()?
            } else if let Some(var) = context.vars.get(root) {
                var.clone()
            } else {
                return None;
            }
        }
    };
    current = apply_indices(current, &root_indices)?;

    for segment in segments {
        let (key, indices) = split_indices(segment)?;
        if key.is_empty() {
            return None;
        }
        current = match current {
            Value::Object(map) => map.get(key)?.clone(),
            _ => return None,
        };
        current = apply_indices(current, &indices)?;
    }

    Some(current)
}

/// Splits `key[0][2]` into the bare key and its indices. Returns `None` for
/// malformed bracket syntax, which callers treat as a path miss.
fn split_indices(segment: &str) -> Option<(&str, Vec<usize>)> {
    let key_end = segment.find('[').unwrap_or(segment.len());
    let key = &segment[..key_end];

    let mut indices = Vec::new();
    let mut rest = &segment[key_end..];
    while !rest.is_empty() {
        let inner = rest.strip_prefix('[')?;
        let close = inner.find(']')?;
        let index: usize = inner[..close].trim().parse().ok()?;
        indices.push(index);
        rest = &inner[close + 1..];
    }

    Some((key, indices))
}

fn apply_indices(mut current: Value, indices: &[usize]) -> Option<Value> {
    for &index in indices {
        current = match current {
            Value::Array(items) => items.into_iter().nth(index)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Embeds a resolved value into a string: scalars use their string form,
/// structures their compact JSON text.
fn render_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null => "null".to_string(),
        structured => structured.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caseflow_types::ActionResult;
    use serde_json::json;

    fn context_with_results() -> ExecutionContext {
        let mut context = ExecutionContext::new("login flow", Some("case-7".into()));
        context.record_step_result(
            "create",
            ActionResult::ok(json!({
                "id": "app-123",
                "items": [ { "name": "first" }, { "name": "second" } ]
            })),
        );
        context.vars.insert("region".into(), json!("us"));
        context
    }

    #[test]
    fn resolves_context_identity_keys() {
        let context = context_with_results();
        assert_eq!(resolve_string("{testCaseId}/{testCaseName}", &context), "case-7/login flow");
    }

    #[test]
    fn resolves_step_fields_and_indices() {
        let context = context_with_results();
        assert_eq!(resolve_string("{create.output.id}", &context), "app-123");
        assert_eq!(resolve_string("{create.output.items[1].name}", &context), "second");
        assert_eq!(resolve_string("{create.success}", &context), "true");
    }

    #[test]
    fn bare_step_reference_embeds_full_result_as_json() {
        let context = context_with_results();
        let resolved = resolve_string("{create}", &context);
        let parsed: Value = serde_json::from_str(&resolved).expect("embedded json");
        assert_eq!(parsed["success"], json!(true));
        assert_eq!(parsed["output"]["id"], json!("app-123"));
    }

    #[test]
    fn resolves_caller_variables() {
        let context = context_with_results();
        assert_eq!(resolve_string("deploy to {region}", &context), "deploy to us");
    }

    #[test]
    fn unresolvable_placeholders_are_preserved_literally() {
        let context = context_with_results();
        assert_eq!(resolve_string("{missing}", &context), "{missing}");
        assert_eq!(resolve_string("{create.output.absent}", &context), "{create.output.absent}");
        assert_eq!(resolve_string("{create.output.items[9]}", &context), "{create.output.items[9]}");
        assert_eq!(resolve_string("{create.output.id.deeper}", &context), "{create.output.id.deeper}");
    }

    #[test]
    fn unterminated_placeholder_is_preserved() {
        let context = context_with_results();
        assert_eq!(resolve_string("value: {create.output.id", &context), "value: {create.output.id");
    }

    #[test]
    fn resolution_is_idempotent() {
        let context = context_with_results();
        let value = json!({
            "full": "{create}",
            "field": "{create.output.id}",
            "miss": "{unknown.path}",
            "plain": 7
        });
        let once = resolve_value(&value, &context);
        let twice = resolve_value(&once, &context);
        assert_eq!(once, twice);
    }

    #[test]
    fn does_not_mutate_input_and_recurses_structures() {
        let context = context_with_results();
        let value = json!({
            "nested": { "id": "{create.output.id}" },
            "list": [ "{region}", 1, true ]
        });
        let resolved = resolve_value(&value, &context);
        assert_eq!(resolved["nested"]["id"], json!("app-123"));
        assert_eq!(resolved["list"], json!(["us", 1, true]));
        assert_eq!(value["nested"]["id"], json!("{create.output.id}"));
    }

    #[test]
    fn null_scalar_embeds_as_json_null() {
        let mut context = context_with_results();
        context.vars.insert("empty".into(), Value::Null);
        assert_eq!(resolve_string("<{empty}>", &context), "<null>");
    }

    #[test]
    fn lookup_path_rejects_malformed_segments() {
        let context = context_with_results();
        assert!(lookup_path("create.output.items[x]", &context).is_none());
        assert!(lookup_path("create..id", &context).is_none());
        assert!(lookup_path("", &context).is_none());
    }
}
