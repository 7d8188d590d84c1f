//! Static test-case validation.
//!
//! Run before any step executes; a violation is a configuration error that
//! surfaces to the caller with no steps run and no reporter events emitted.

use std::collections::HashMap;

use anyhow::{Context, Result, bail};

use caseflow_types::{Condition, TestCase};

/// Checks a test case, failing fast on the first violation:
///
/// 1. step identifiers are unique (the error names every duplicate),
/// 2. every `depends_on` target names a step in the case,
/// 3. dependencies reference steps declared earlier (which alone precludes
///    cycles, so no cycle detector is needed),
/// 4. conditional guards belong to the allowed set.
pub fn validate_test_case(case: &TestCase) -> Result<()> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut duplicates: Vec<&str> = Vec::new();
    for (index, step) in case.steps.iter().enumerate() {
        if positions.insert(step.id.as_str(), index).is_some() && !duplicates.contains(&step.id.as_str()) {
            duplicates.push(step.id.as_str());
        }
    }
    if !duplicates.is_empty() {
        bail!("duplicate step identifiers detected: '{}'", duplicates.join("', '"));
    }

    for step in &case.steps {
        for dependency in &step.depends_on {
            if !positions.contains_key(dependency.as_str()) {
                bail!("step '{}' depends on unknown step '{}'", step.id, dependency);
            }
        }
    }

    for (index, step) in case.steps.iter().enumerate() {
        for dependency in &step.depends_on {
            if positions[dependency.as_str()] >= index {
                bail!(
                    "step '{}' depends on step '{}' which is not declared earlier; dependencies may only reference preceding steps",
                    step.id,
                    dependency
                );
            }
        }
    }

    for step in &case.steps {
        Condition::parse(step.r#if.as_deref()).with_context(|| format!("invalid conditional on step '{}'", step.id))?;
    }

    Ok(())
}
