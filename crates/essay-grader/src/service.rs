//! Grading service trait.
//!
//! Implementations can call a remote evaluator or grade locally;
//! [`SimulatedGrader`](crate::simulated::SimulatedGrader) is the local one.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::GradingError;
use crate::types::{GradeReport, GradeRequest};

#[async_trait]
pub trait GradingService: Send + Sync {
    /// Evaluate one essay. May take seconds; callers bound it with a timeout.
    async fn grade(&self, request: &GradeRequest) -> Result<GradeReport, GradingError>;
}

#[async_trait]
impl<T: GradingService + ?Sized> GradingService for Arc<T> {
    async fn grade(&self, request: &GradeRequest) -> Result<GradeReport, GradingError> {
        (**self).grade(request).await
    }
}
