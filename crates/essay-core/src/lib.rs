//! essay-core: domain model, policies and view logic for the essay grader.
//!
//! Everything in here is transport-agnostic. Storage lives in `essay-db`,
//! grading in `essay-grader`, and the HTTP surface in `essay-web`; they all
//! meet at the [`store::RecordStore`] and [`session::SessionProvider`] seams.

pub mod annotation;
pub mod config;
pub mod grade_scale;
pub mod history;
pub mod hover;
pub mod models;
pub mod routes;
pub mod session;
pub mod store;
pub mod submission;

/// Crate identity label.
pub fn crate_label() -> &'static str {
    "essay-core"
}
