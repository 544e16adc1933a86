//! Essay records and the pieces of a grading outcome.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Literal substring of an essay body mapped to a short feedback string.
pub type AnnotationMap = BTreeMap<String, String>;

/// Highest score a record may carry.
pub const MAX_SCORE: u8 = 100;

/// One graded criterion ("Content & Ideas", "Grammar & Mechanics", ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionScore {
    pub name: String,
    pub score: u8,
    pub feedback: String,
}

/// A persisted essay together with its evaluation outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EssayRecord {
    pub id: String,
    pub owner_id: String,
    pub title: String,
    pub body: String,
    pub grade: String,
    pub score: u8,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub criteria: Vec<CriterionScore>,
    #[serde(default)]
    pub annotations: AnnotationMap,
}

/// Creation payload; the store assigns `id` and `created_at`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewEssay {
    pub owner_id: String,
    pub title: String,
    pub body: String,
    pub grade: String,
    pub score: u8,
    pub criteria: Vec<CriterionScore>,
    pub annotations: AnnotationMap,
}

impl NewEssay {
    /// Checks the fields a store must refuse to persist.
    pub fn validate(&self) -> Result<(), String> {
        if self.owner_id.trim().is_empty() {
            return Err("owner_id is required".into());
        }
        if self.title.trim().is_empty() {
            return Err("title is required".into());
        }
        if self.body.trim().is_empty() {
            return Err("body is required".into());
        }
        if self.grade.trim().is_empty() {
            return Err("grade is required".into());
        }
        if self.score > MAX_SCORE {
            return Err(format!("score must be within 0..={MAX_SCORE}"));
        }
        for (i, criterion) in self.criteria.iter().enumerate() {
            if criterion.name.trim().is_empty() {
                return Err(format!("criteria[{i}].name is required"));
            }
            if criterion.score > MAX_SCORE {
                return Err(format!("criteria[{i}].score must be within 0..={MAX_SCORE}"));
            }
        }
        Ok(())
    }

    /// Materializes the record once the store has assigned identity fields.
    pub fn into_record(self, id: String, created_at: DateTime<Utc>) -> EssayRecord {
        EssayRecord {
            id,
            owner_id: self.owner_id,
            title: self.title.trim().to_owned(),
            body: self.body,
            grade: self.grade.trim().to_owned(),
            score: self.score,
            created_at,
            criteria: self.criteria,
            annotations: self.annotations,
        }
    }
}
