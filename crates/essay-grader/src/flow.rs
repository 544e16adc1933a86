//! Submission flow: validate the draft, grade it, persist the record.
//!
//! The flow owns the [`SubmissionState`] for one form. Grading is bounded by
//! a per-attempt timeout, retried per [`GradingPolicy`], and aborted as soon
//! as the cancellation token fires.

use std::time::Duration;

use essay_core::config::GradingConfig;
use essay_core::routes::{Navigation, Route};
use essay_core::session::SessionProvider;
use essay_core::store::{RecordStore, StoreError};
use essay_core::submission::{
    transition, SubmissionDraft, SubmissionEvent, SubmissionState, ValidationError,
};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::GradingError;
use crate::service::GradingService;
use crate::types::GradeRequest;

const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradingPolicy {
    pub timeout: Duration,
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl Default for GradingPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

impl GradingPolicy {
    pub fn from_config(cfg: &GradingConfig) -> Self {
        Self {
            timeout: cfg.timeout,
            max_attempts: cfg.max_attempts.max(1),
            retry_backoff: cfg.retry_backoff,
        }
    }

    /// Delay before retry number `attempt` (1-based): doubles each time, capped.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.retry_backoff.saturating_mul(factor).min(MAX_BACKOFF)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("sign in to submit an essay")]
    Unauthenticated,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("submission is {state}; reset before submitting again")]
    NotReady { state: &'static str },
    #[error("{0}")]
    Grading(GradingError),
    #[error("could not save graded essay: {0}")]
    Store(StoreError),
    #[error("submission cancelled")]
    Cancelled,
}

pub struct SubmissionFlow<'a> {
    grader: &'a dyn GradingService,
    policy: GradingPolicy,
    state: SubmissionState,
}

impl<'a> SubmissionFlow<'a> {
    pub fn new(grader: &'a dyn GradingService, policy: GradingPolicy) -> Self {
        Self {
            grader,
            policy,
            state: SubmissionState::Idle,
        }
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn policy(&self) -> &GradingPolicy {
        &self.policy
    }

    pub fn reset(&mut self) {
        self.apply(SubmissionEvent::Reset);
    }

    /// Runs one submission to completion.
    ///
    /// Validation failures leave the state `Idle` and never reach the grader.
    /// Cancellation returns the state to `Idle` without persisting anything.
    pub async fn submit<P, S>(
        &mut self,
        session: &P,
        draft: &SubmissionDraft,
        store: &S,
        cancel: &CancellationToken,
    ) -> Result<Navigation, SubmitError>
    where
        P: SessionProvider + ?Sized,
        S: RecordStore + ?Sized,
    {
        let identity = session
            .current_identity()
            .ok_or(SubmitError::Unauthenticated)?;
        let valid = draft.validate()?;

        if !self.apply(SubmissionEvent::Submit) {
            return Err(SubmitError::NotReady {
                state: self.state.as_str(),
            });
        }

        let request = GradeRequest {
            owner_id: identity.id,
            title: valid.title,
            body: valid.body,
        };
        info!(
            owner_id = %request.owner_id,
            words = draft.word_count(),
            "essay submitted for grading"
        );

        let report = match self.grade_with_retry(&request, cancel).await {
            Ok(report) => report,
            Err(GradingError::Cancelled) => {
                self.apply(SubmissionEvent::Cancelled);
                info!(owner_id = %request.owner_id, "grading cancelled");
                return Err(SubmitError::Cancelled);
            }
            Err(err) => {
                self.apply(SubmissionEvent::GradingFailed(err.to_string()));
                return Err(SubmitError::Grading(err));
            }
        };

        let record = match store.insert(report.into_new_essay(request)) {
            Ok(record) => record,
            Err(err) => {
                self.apply(SubmissionEvent::GradingFailed(err.to_string()));
                return Err(SubmitError::Store(err));
            }
        };

        info!(essay_id = %record.id, score = record.score, grade = %record.grade, "essay graded");
        self.apply(SubmissionEvent::GradingSucceeded(record.id.clone()));
        Ok(Navigation::to(Route::GradeResult(record.id)))
    }

    async fn grade_with_retry(
        &self,
        request: &GradeRequest,
        cancel: &CancellationToken,
    ) -> Result<crate::types::GradeReport, GradingError> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(GradingError::Cancelled),
                result = tokio::time::timeout(self.policy.timeout, self.grader.grade(request)) => {
                    match result {
                        Ok(outcome) => outcome,
                        Err(_) => Err(GradingError::Timeout { after: self.policy.timeout }),
                    }
                }
            };

            let err = match outcome {
                Ok(report) => return Ok(report),
                Err(err) => err,
            };
            if !err.is_retryable() || attempt >= self.policy.max_attempts {
                warn!(attempt, error = %err, "grading failed");
                return Err(err);
            }

            let delay = self.policy.backoff_for(attempt);
            warn!(
                attempt,
                max_attempts = self.policy.max_attempts,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "grading attempt failed; retrying"
            );
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(GradingError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    fn apply(&mut self, event: SubmissionEvent) -> bool {
        let (next, changed) = transition(&self.state, &event);
        self.state = next;
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = GradingPolicy {
            retry_backoff: Duration::from_millis(500),
            ..GradingPolicy::default()
        };
        assert_eq!(policy.backoff_for(1), Duration::from_millis(500));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(1000));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(2000));
        assert_eq!(policy.backoff_for(40), MAX_BACKOFF);
    }

    #[test]
    fn policy_from_config_requires_one_attempt() {
        let cfg = GradingConfig {
            max_attempts: 0,
            ..GradingConfig::default()
        };
        assert_eq!(GradingPolicy::from_config(&cfg).max_attempts, 1);
    }
}
