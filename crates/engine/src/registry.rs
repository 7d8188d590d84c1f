//! Action contract and registry.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;

use caseflow_types::{ActionResult, Step};

use crate::context::ExecutionContext;

/// A single executable operation behind a step.
///
/// The engine invokes `execute` with a fully resolved step (placeholders
/// already substituted) and a read-only snapshot of the execution context for
/// implementations that consult prior step results. A returned error is
/// recorded as a failed result; it does not halt the scheduler.
///
/// Implementations may block on I/O and may be invoked concurrently, so they
/// must either be reentrant or keep per-call state. Timeouts are the action's
/// own concern; the engine imposes none.
pub trait Action: Send + Sync {
    /// Runs the action for the given resolved step.
    fn execute(&self, step: &Step, context: &ExecutionContext) -> Result<ActionResult>;
}

/// Process-wide mapping from action kind to implementation.
///
/// Populated during process initialization and read-only for the duration of
/// test execution; the engine only ever looks kinds up.
#[derive(Default, Clone)]
pub struct ActionRegistry {
    actions: HashMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an action under the given kind, replacing any previous entry.
    pub fn register(&mut self, kind: impl Into<String>, action: Arc<dyn Action>) {
        self.actions.insert(kind.into(), action);
    }

    /// Looks up the action for a kind.
    pub fn get(&self, kind: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(kind).cloned()
    }

    /// Registered kinds in sorted order.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.actions.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }
}

impl std::fmt::Debug for ActionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionRegistry").field("kinds", &self.kinds()).finish()
    }
}
