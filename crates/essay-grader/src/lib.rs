//! essay-grader: the grading service seam and the submission flow.
//!
//! - `GradingService`: async evaluator interface
//! - `SimulatedGrader`: deterministic local evaluator with injectable failures
//! - `SubmissionFlow`: validate, grade (timeout, retry, cancellation), persist

pub mod error;
pub mod flow;
pub mod service;
pub mod simulated;
pub mod types;

/// Stable crate label used for bootstrap smoke tests.
pub fn crate_label() -> &'static str {
    "essay-grader"
}
