//! Shared data model for caseflow test-case documents.

pub mod case;

pub use case::{ActionResult, Condition, Step, TestCase, load_test_case_from_file};
