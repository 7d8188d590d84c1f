//! Built-in action implementations for the caseflow engine.
//!
//! Every action honors the [`Action`](caseflow_engine::Action) contract: it
//! receives a resolved step plus a read-only context snapshot and returns an
//! [`ActionResult`](caseflow_types::ActionResult). `builtin_registry` wires
//! the bundled set under its canonical kind names.

use std::sync::Arc;

use caseflow_engine::ActionRegistry;

pub mod echo;
pub mod fail;
pub mod http;
pub mod nop;
pub mod verify;

pub use echo::EchoAction;
pub use fail::FailAction;
pub use http::HttpAction;
pub use nop::NopAction;
pub use verify::AssertAction;

/// Registry pre-populated with the bundled actions.
pub fn builtin_registry() -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    registry.register("echo", Arc::new(EchoAction));
    registry.register("nop", Arc::new(NopAction));
    registry.register("fail", Arc::new(FailAction));
    registry.register("http", Arc::new(HttpAction::new()));
    registry.register("assert", Arc::new(AssertAction));
    registry
}
