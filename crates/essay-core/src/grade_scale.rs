//! Letter grades, grade tiers and score tiers used by the views.

/// Coarse bucket for a letter grade, keyed by its leading letter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GradeTier {
    Excellent,
    Good,
    Fair,
    Other,
}

impl GradeTier {
    #[must_use]
    pub fn from_grade(grade: &str) -> Self {
        match grade.trim().chars().next() {
            Some('A') | Some('a') => Self::Excellent,
            Some('B') | Some('b') => Self::Good,
            Some('C') | Some('c') => Self::Fair,
            _ => Self::Other,
        }
    }

    /// Stable CSS class slug.
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Self::Excellent => "grade-excellent",
            Self::Good => "grade-good",
            Self::Fair => "grade-fair",
            Self::Other => "grade-other",
        }
    }
}

/// Bucket for a numeric score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreTier {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl ScoreTier {
    #[must_use]
    pub fn from_score(score: u8) -> Self {
        match score {
            90.. => Self::Excellent,
            80..=89 => Self::Good,
            70..=79 => Self::Fair,
            _ => Self::Poor,
        }
    }

    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Self::Excellent => "score-excellent",
            Self::Good => "score-good",
            Self::Fair => "score-fair",
            Self::Poor => "score-poor",
        }
    }
}

/// Letter grade for a 0-100 score.
#[must_use]
pub fn letter_grade(score: u8) -> &'static str {
    match score {
        93.. => "A",
        90..=92 => "A-",
        87..=89 => "B+",
        83..=86 => "B",
        80..=82 => "B-",
        77..=79 => "C+",
        73..=76 => "C",
        70..=72 => "C-",
        60..=69 => "D",
        _ => "F",
    }
}
