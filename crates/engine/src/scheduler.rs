//! Test-case scheduler: sequential and dependency-driven parallel execution.
//!
//! `execute_test_case` validates the case, selects a mode, and drives every
//! step to a terminal state. When no step declares dependencies the steps run
//! one at a time in declared order; otherwise the scheduler repeatedly
//! launches every ready step concurrently and waits for at least one in-flight
//! step to finish before recomputing readiness.
//!
//! Both modes share the same per-step procedure: deep-copy the step, resolve
//! its parameters against the current context, evaluate the conditional
//! guard, dispatch through the registry, record the result, and report. Only
//! the execution context is shared between concurrent steps; it sits behind a
//! single mutex and reporter calls are issued outside the lock.

use std::mem;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context as _, Result, anyhow};
use indexmap::IndexMap;
use serde_json::{Value, json};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use caseflow_types::{ActionResult, Condition, Step, TestCase};

use crate::context::ExecutionContext;
use crate::registry::ActionRegistry;
use crate::report::Reporter;
use crate::resolve;
use crate::validate::validate_test_case;

/// Pause before re-checking readiness when an iteration launched nothing.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Lifecycle of a single step within one run. A step only ever progresses
/// `Pending → Running → {Finished, Failed, Skipped}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepState {
    Pending,
    Running,
    Finished,
    Failed,
    Skipped,
}

impl StepState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Finished | Self::Failed | Self::Skipped)
    }
}

/// Drives test cases to completion against a fixed registry and reporter.
pub struct Scheduler {
    registry: Arc<ActionRegistry>,
    reporter: Arc<dyn Reporter>,
}

impl Scheduler {
    pub fn new(registry: Arc<ActionRegistry>, reporter: Arc<dyn Reporter>) -> Self {
        Self { registry, reporter }
    }

    /// Executes a whole test case, returning the aggregate verdict: `true` iff
    /// every step ended in a success-equivalent terminal state (a skipped step
    /// counts as success).
    ///
    /// Validation failures surface as configuration errors before any step
    /// runs and before any reporter event. Step-level failures never abort the
    /// run; they flip the context's `test_success` flag and the verdict.
    pub async fn execute_test_case(&self, case: &TestCase, context: &mut ExecutionContext) -> Result<bool> {
        validate_test_case(case).with_context(|| format!("test case '{}' is invalid", case.name))?;
        context.test_case_name = case.name.clone();

        let mut states: IndexMap<String, StepState> =
            case.steps.iter().map(|step| (step.id.clone(), StepState::Pending)).collect();
        let parallel = case.steps.iter().any(|step| !step.depends_on.is_empty());

        info!(
            test_case = %case.name,
            test_case_id = %context.test_case_id,
            step_count = case.steps.len(),
            parallel,
            "test case execution started"
        );
        self.reporter.test_start(&context.test_case_id, &context.test_case_name)?;

        let test_case_id = context.test_case_id.clone();
        let shared = Arc::new(Mutex::new(mem::take(context)));
        let run_result = if parallel {
            self.run_dag(case, &shared, &mut states).await
        } else {
            self.run_sequential(case, &shared, &mut states).await
        };

        match Arc::try_unwrap(shared) {
            Ok(mutex) => *context = mutex.into_inner().expect("context lock"),
            Err(_) => {
                run_result?;
                return Err(anyhow!("execution context still shared after run"));
            }
        }
        run_result?;

        let verdict = states.values().all(|state| !matches!(state, StepState::Failed));
        self.reporter.test_end(&test_case_id, verdict)?;
        info!(test_case = %case.name, success = verdict, "test case execution finished");
        Ok(verdict)
    }

    /// Degenerate mode for cases without dependencies: one step at a time, in
    /// declared order, continuing regardless of outcome.
    async fn run_sequential(
        &self,
        case: &TestCase,
        shared: &Arc<Mutex<ExecutionContext>>,
        states: &mut IndexMap<String, StepState>,
    ) -> Result<()> {
        for step in &case.steps {
            let step_id = step.id.clone();
            states.insert(step_id.clone(), StepState::Running);
            let state = self.spawn_step(step.clone(), shared).await?;
            states.insert(step_id, state);
        }
        Ok(())
    }

    /// Dependency-driven mode: launch every ready step concurrently, waiting
    /// for at least one in-flight completion before reconsidering readiness.
    async fn run_dag(
        &self,
        case: &TestCase,
        shared: &Arc<Mutex<ExecutionContext>>,
        states: &mut IndexMap<String, StepState>,
    ) -> Result<()> {
        let mut in_flight: JoinSet<(String, Result<StepState>)> = JoinSet::new();

        loop {
            let ready: Vec<Step> = case
                .steps
                .iter()
                .filter(|step| {
                    states[step.id.as_str()] == StepState::Pending
                        && step.depends_on.iter().all(|dep| states[dep.as_str()].is_terminal())
                })
                .cloned()
                .collect();

            if ready.is_empty() && in_flight.is_empty() {
                break;
            }

            let mut progressed = false;
            for step in ready {
                states.insert(step.id.clone(), StepState::Running);
                progressed = true;

                if let Some(dependency_id) = self.failed_dependency(&step, states, shared) {
                    let result = ActionResult::failure(format!("Dependency '{dependency_id}' failed"));
                    warn!(step_id = %step.id, dependency = %dependency_id, "step not dispatched; dependency failed");
                    shared.lock().expect("context lock").record_step_result(&step.id, result.clone());
                    self.reporter.step_end(&step.id, false, &result.output)?;
                    states.insert(step.id.clone(), StepState::Failed);
                    continue;
                }

                let registry = Arc::clone(&self.registry);
                let reporter = Arc::clone(&self.reporter);
                let shared_context = Arc::clone(shared);
                in_flight.spawn_blocking(move || {
                    let state = run_step(&step, registry.as_ref(), reporter.as_ref(), &shared_context);
                    (step.id, state)
                });
            }

            if let Some(joined) = in_flight.join_next().await {
                let (step_id, state) = joined.context("step task terminated abnormally")?;
                states.insert(step_id, state?);
            } else if !progressed {
                tokio::time::sleep(IDLE_POLL_INTERVAL).await;
            }
        }

        Ok(())
    }

    async fn spawn_step(&self, step: Step, shared: &Arc<Mutex<ExecutionContext>>) -> Result<StepState> {
        let registry = Arc::clone(&self.registry);
        let reporter = Arc::clone(&self.reporter);
        let shared_context = Arc::clone(shared);
        tokio::task::spawn_blocking(move || run_step(&step, registry.as_ref(), reporter.as_ref(), &shared_context))
            .await
            .context("step task terminated abnormally")?
    }

    /// First declared dependency that ended unsuccessfully, if any.
    fn failed_dependency(&self, step: &Step, states: &IndexMap<String, StepState>, shared: &Mutex<ExecutionContext>) -> Option<String> {
        let context = shared.lock().expect("context lock");
        step.depends_on
            .iter()
            .find(|dep| {
                states[dep.as_str()] == StepState::Failed
                    || context.step_result(dep).is_some_and(|result| !result.success)
            })
            .cloned()
    }
}

/// Per-step procedure shared by both modes.
///
/// Resolution and guard evaluation happen under the context lock so the step
/// sees a consistent snapshot; the action itself runs outside the lock against
/// a read-only copy, and its result is recorded before `step_end` is emitted.
fn run_step(step: &Step, registry: &ActionRegistry, reporter: &dyn Reporter, shared: &Mutex<ExecutionContext>) -> Result<StepState> {
    let (resolved, guard, dispatch) = {
        let context = shared.lock().expect("context lock");
        let mut resolved = step.clone();
        resolved.params = resolve::resolve_value(&step.params, &context);
        let guard = Condition::parse(step.r#if.as_deref())?;
        let dispatch = match guard {
            Condition::Always => true,
            Condition::Success => context.test_success,
            Condition::Failure => !context.test_success,
        };
        (resolved, guard, dispatch)
    };

    if !dispatch {
        let reason = format!("condition {} not met", guard.as_str());
        debug!(step_id = %step.id, %reason, "step skipped");
        shared
            .lock()
            .expect("context lock")
            .record_step_result(&step.id, ActionResult::ok(Value::String("SKIPPED".into())));
        reporter.step_skipped(&step.id, &step.name, &step.kind, &reason)?;
        return Ok(StepState::Skipped);
    }

    reporter.step_start(&step.id, &step.name, &step.kind)?;
    debug!(step_id = %step.id, kind = %step.kind, "step execution started");

    let result = match registry.get(&step.kind) {
        Some(action) => {
            let snapshot = shared.lock().expect("context lock").clone();
            match action.execute(&resolved, &snapshot) {
                Ok(result) => result,
                Err(error) => ActionResult {
                    success: false,
                    output: json!({ "error": error.to_string(), "stack": format!("{error:?}") }),
                },
            }
        }
        None => ActionResult::failure(format!("unknown action kind '{}'", step.kind)),
    };

    let state = if result.success {
        debug!(step_id = %step.id, "step execution succeeded");
        StepState::Finished
    } else {
        warn!(step_id = %step.id, "step execution failed");
        StepState::Failed
    };

    shared.lock().expect("context lock").record_step_result(&step.id, result.clone());
    reporter.step_end(&step.id, result.success, &result.output)?;
    Ok(state)
}
