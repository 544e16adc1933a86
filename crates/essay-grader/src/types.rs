//! Request and report types exchanged with a grading service.

use essay_core::models::{AnnotationMap, CriterionScore, NewEssay};

/// A validated essay handed to the evaluator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeRequest {
    pub owner_id: String,
    pub title: String,
    pub body: String,
}

/// Evaluation outcome; becomes an essay record once persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeReport {
    pub grade: String,
    pub score: u8,
    pub criteria: Vec<CriterionScore>,
    pub annotations: AnnotationMap,
}

impl GradeReport {
    pub fn into_new_essay(self, request: GradeRequest) -> NewEssay {
        NewEssay {
            owner_id: request.owner_id,
            title: request.title,
            body: request.body,
            grade: self.grade,
            score: self.score,
            criteria: self.criteria,
            annotations: self.annotations,
        }
    }
}
