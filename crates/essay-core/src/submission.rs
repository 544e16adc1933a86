//! Essay submission: draft validation and the grading state machine.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("essay title is required")]
    EmptyTitle,
    #[error("essay body is required")]
    EmptyBody,
}

/// Form contents as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionDraft {
    pub title: String,
    pub body: String,
}

/// A draft that passed validation; fields are trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidSubmission {
    pub title: String,
    pub body: String,
}

impl SubmissionDraft {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn validate(&self) -> Result<ValidSubmission, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        let body = self.body.trim();
        if body.is_empty() {
            return Err(ValidationError::EmptyBody);
        }
        Ok(ValidSubmission {
            title: title.to_string(),
            body: body.to_string(),
        })
    }

    /// Whether the submit button is enabled.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        self.validate().is_ok()
    }

    #[must_use]
    pub fn word_count(&self) -> usize {
        word_count(&self.body)
    }
}

#[must_use]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubmissionState {
    #[default]
    Idle,
    Grading,
    Complete {
        essay_id: String,
    },
    Failed {
        reason: String,
    },
}

impl SubmissionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Grading => "grading",
            Self::Complete { .. } => "complete",
            Self::Failed { .. } => "failed",
        }
    }

    pub fn is_grading(&self) -> bool {
        matches!(self, Self::Grading)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionEvent {
    Submit,
    GradingSucceeded(String),
    GradingFailed(String),
    Cancelled,
    Reset,
}

pub fn next_state(current: &SubmissionState, event: &SubmissionEvent) -> SubmissionState {
    match (current, event) {
        (_, SubmissionEvent::Reset) => SubmissionState::Idle,
        (SubmissionState::Idle | SubmissionState::Failed { .. }, SubmissionEvent::Submit) => {
            SubmissionState::Grading
        }
        (SubmissionState::Grading, SubmissionEvent::GradingSucceeded(id)) => {
            SubmissionState::Complete {
                essay_id: id.clone(),
            }
        }
        (SubmissionState::Grading, SubmissionEvent::GradingFailed(reason)) => {
            SubmissionState::Failed {
                reason: reason.clone(),
            }
        }
        (SubmissionState::Grading, SubmissionEvent::Cancelled) => SubmissionState::Idle,
        (state, _) => state.clone(),
    }
}

pub fn transition(
    current: &SubmissionState,
    event: &SubmissionEvent,
) -> (SubmissionState, bool) {
    let next = next_state(current, event);
    let changed = &next != current;
    (next, changed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_title_blocks_submission() {
        let draft = SubmissionDraft::new("", "non-empty text");
        assert_eq!(draft.validate(), Err(ValidationError::EmptyTitle));
        assert!(!draft.can_submit());
    }

    #[test]
    fn whitespace_only_body_blocks_submission() {
        let draft = SubmissionDraft::new("Topic", "  \n\t ");
        assert_eq!(draft.validate(), Err(ValidationError::EmptyBody));
    }

    #[test]
    fn validate_trims_fields() {
        let draft = SubmissionDraft::new("  Topic ", " Some essay body\n");
        let valid = match draft.validate() {
            Ok(valid) => valid,
            Err(err) => panic!("validate: {err}"),
        };
        assert_eq!(valid.title, "Topic");
        assert_eq!(valid.body, "Some essay body");
    }

    #[test]
    fn word_count_splits_on_whitespace() {
        assert_eq!(word_count(""), 0);
        assert_eq!(word_count("   "), 0);
        assert_eq!(word_count("one two\nthree\t four"), 4);
    }

    #[test]
    fn happy_path_runs_idle_grading_complete() {
        let (grading, changed) = transition(&SubmissionState::Idle, &SubmissionEvent::Submit);
        assert!(changed);
        assert_eq!(grading, SubmissionState::Grading);

        let (done, changed) =
            transition(&grading, &SubmissionEvent::GradingSucceeded("e-1".into()));
        assert!(changed);
        assert_eq!(
            done,
            SubmissionState::Complete {
                essay_id: "e-1".into()
            }
        );
    }

    #[test]
    fn completion_events_ignored_outside_grading() {
        let idle = SubmissionState::Idle;
        assert_eq!(
            next_state(&idle, &SubmissionEvent::GradingSucceeded("e".into())),
            idle
        );
        let (_, changed) = transition(&SubmissionState::Grading, &SubmissionEvent::Submit);
        assert!(!changed);
    }

    #[test]
    fn cancel_and_failure_paths() {
        assert_eq!(
            next_state(&SubmissionState::Grading, &SubmissionEvent::Cancelled),
            SubmissionState::Idle
        );
        let failed = next_state(
            &SubmissionState::Grading,
            &SubmissionEvent::GradingFailed("timeout".into()),
        );
        assert_eq!(failed.as_str(), "failed");
        assert_eq!(
            next_state(&failed, &SubmissionEvent::Submit),
            SubmissionState::Grading
        );
        assert_eq!(
            next_state(&failed, &SubmissionEvent::Reset),
            SubmissionState::Idle
        );
    }
}
