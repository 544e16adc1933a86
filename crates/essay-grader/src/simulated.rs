//! Local stand-in evaluator.
//!
//! Waits a configured delay, then scores the essay with fixed text
//! heuristics, so the same body always yields the same report. Calls are
//! recorded and failures can be queued for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use essay_core::grade_scale::{letter_grade, ScoreTier};
use essay_core::models::{AnnotationMap, CriterionScore};
use essay_core::submission::word_count;
use tracing::debug;

use crate::error::GradingError;
use crate::service::GradingService;
use crate::types::{GradeReport, GradeRequest};

pub const DEFAULT_DELAY: Duration = Duration::from_secs(3);

const MIN_CRITERION: u32 = 50;
const MAX_CRITERION: u32 = 98;

const EVIDENCE_MARKERS: &[&str] = &[
    "because",
    "for example",
    "for instance",
    "according to",
    "research",
    "study",
    "studies",
    "evidence",
    "data",
    "percent",
];

pub struct SimulatedGrader {
    delay: Duration,
    calls: Mutex<Vec<GradeRequest>>,
    failures: Mutex<VecDeque<GradingError>>,
}

impl Default for SimulatedGrader {
    fn default() -> Self {
        Self::new(DEFAULT_DELAY)
    }
}

impl SimulatedGrader {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            calls: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
        }
    }

    /// Queue an error; each queued error fails one call, in order.
    pub fn with_failure(self, err: GradingError) -> Self {
        match self.failures.lock() {
            Ok(mut queue) => queue.push_back(err),
            Err(poisoned) => poisoned.into_inner().push_back(err),
        }
        self
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Return all recorded requests.
    pub fn calls(&self) -> Vec<GradeRequest> {
        match self.calls.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn call_count(&self) -> usize {
        match self.calls.lock() {
            Ok(guard) => guard.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    fn record(&self, request: &GradeRequest) {
        match self.calls.lock() {
            Ok(mut guard) => guard.push(request.clone()),
            Err(poisoned) => poisoned.into_inner().push(request.clone()),
        }
    }

    fn take_failure(&self) -> Option<GradingError> {
        match self.failures.lock() {
            Ok(mut queue) => queue.pop_front(),
            Err(poisoned) => poisoned.into_inner().pop_front(),
        }
    }
}

#[async_trait]
impl GradingService for SimulatedGrader {
    async fn grade(&self, request: &GradeRequest) -> Result<GradeReport, GradingError> {
        self.record(request);

        if let Some(err) = self.take_failure() {
            return Err(err);
        }
        if request.body.trim().is_empty() {
            return Err(GradingError::InvalidArgument {
                message: "essay body is empty".into(),
            });
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let report = evaluate(&request.body);
        debug!(score = report.score, grade = %report.grade, "simulated grading finished");
        Ok(report)
    }
}

/// Scores `body` without any delay.
pub fn evaluate(body: &str) -> GradeReport {
    let sentences = sentences(body);
    let words = word_count(body) as u32;

    let criteria = vec![
        criterion("Content & Ideas", content_score(words)),
        criterion("Structure & Organization", structure_score(body, sentences.len())),
        criterion("Grammar & Mechanics", grammar_score(body, &sentences)),
        criterion("Style & Voice", style_score(body, words)),
        criterion("Evidence & Support", evidence_score(body)),
    ];

    let total: u32 = criteria.iter().map(|c| u32::from(c.score)).sum();
    let score = clamp_score((total + criteria.len() as u32 / 2) / criteria.len() as u32, 0, 100);

    GradeReport {
        grade: letter_grade(score).to_string(),
        score,
        criteria,
        annotations: annotations(&sentences),
    }
}

/// Sentences as trimmed slices of `body`.
fn sentences(body: &str) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0;
    for (idx, ch) in body.char_indices() {
        if matches!(ch, '.' | '!' | '?') {
            let end = idx + ch.len_utf8();
            push_sentence(&mut out, &body[start..end]);
            start = end;
        }
    }
    push_sentence(&mut out, &body[start..]);
    out
}

fn push_sentence<'a>(out: &mut Vec<&'a str>, raw: &'a str) {
    let trimmed = raw.trim();
    if trimmed.chars().any(char::is_alphanumeric) {
        out.push(trimmed);
    }
}

fn annotations(sentences: &[&str]) -> AnnotationMap {
    let mut map = AnnotationMap::new();
    let (Some(first), Some(last)) = (sentences.first(), sentences.last()) else {
        return map;
    };
    // Later inserts win when two roles land on the same sentence.
    if let Some(longest) = sentences.iter().max_by_key(|s| word_count(s)) {
        if word_count(longest) > 25 {
            map.insert(
                (*longest).to_string(),
                "Long sentence; consider splitting it for clarity.".to_string(),
            );
        } else {
            map.insert(
                (*longest).to_string(),
                "Well-developed point with clear detail.".to_string(),
            );
        }
    }
    map.insert(
        (*last).to_string(),
        "Closing sentence ties the argument together.".to_string(),
    );
    map.insert(
        (*first).to_string(),
        "Strong opening that introduces the topic.".to_string(),
    );
    map
}

fn content_score(words: u32) -> u8 {
    clamp_score(60 + words / 8, MIN_CRITERION, MAX_CRITERION)
}

fn structure_score(body: &str, sentence_count: usize) -> u8 {
    let paragraphs = body
        .split("\n\n")
        .filter(|p| !p.trim().is_empty())
        .count()
        .min(4) as u32;
    let flow_bonus = if sentence_count >= 3 { 4 } else { 0 };
    clamp_score(62 + 8 * paragraphs + flow_bonus, MIN_CRITERION, MAX_CRITERION)
}

fn grammar_score(body: &str, sentences: &[&str]) -> u8 {
    let lowercase_starts = sentences
        .iter()
        .filter(|s| s.chars().next().is_some_and(char::is_lowercase))
        .count() as u32;
    let double_spaces = body.matches("  ").count() as u32;
    let penalty = 4 * lowercase_starts + 2 * double_spaces;
    clamp_score(96_u32.saturating_sub(penalty), MIN_CRITERION, MAX_CRITERION)
}

fn style_score(body: &str, words: u32) -> u8 {
    if words == 0 {
        return clamp_score(MIN_CRITERION, MIN_CRITERION, MAX_CRITERION);
    }
    let mut vocabulary: Vec<String> = body
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase()
        })
        .filter(|w| !w.is_empty())
        .collect();
    vocabulary.sort();
    vocabulary.dedup();
    let unique = vocabulary.len() as u32;
    clamp_score(55 + unique * 43 / words, MIN_CRITERION, MAX_CRITERION)
}

fn evidence_score(body: &str) -> u8 {
    let lower = body.to_lowercase();
    let mut markers = EVIDENCE_MARKERS
        .iter()
        .filter(|marker| lower.contains(*marker))
        .count() as u32;
    if body.chars().any(|c| c.is_ascii_digit()) {
        markers += 1;
    }
    clamp_score(60 + 7 * markers, MIN_CRITERION, 97)
}

fn criterion(name: &str, score: u8) -> CriterionScore {
    let feedback = match (name, ScoreTier::from_score(score)) {
        ("Content & Ideas", ScoreTier::Excellent) => {
            "Excellent depth of analysis with a clear thesis."
        }
        ("Content & Ideas", _) => "Develop the central ideas further with more detail.",
        ("Structure & Organization", ScoreTier::Excellent | ScoreTier::Good) => {
            "Good logical flow with clear paragraphs."
        }
        ("Structure & Organization", _) => {
            "Break the essay into paragraphs with clear transitions."
        }
        ("Grammar & Mechanics", ScoreTier::Excellent) => {
            "Excellent command of language with few mechanical issues."
        }
        ("Grammar & Mechanics", _) => "Review capitalization and spacing between words.",
        ("Style & Voice", ScoreTier::Excellent | ScoreTier::Good) => {
            "Engaging style with varied vocabulary."
        }
        ("Style & Voice", _) => "Vary word choice and sentence structure for better flow.",
        (_, ScoreTier::Excellent) => "Compelling examples and credible support throughout.",
        (_, ScoreTier::Good | ScoreTier::Fair) => {
            "Some supporting evidence; add sources or concrete examples."
        }
        (_, ScoreTier::Poor) => "Support claims with evidence, data, or examples.",
    };
    CriterionScore {
        name: name.to_string(),
        score,
        feedback: feedback.to_string(),
    }
}

fn clamp_score(value: u32, min: u32, max: u32) -> u8 {
    u8::try_from(value.clamp(min, max)).unwrap_or(u8::MAX)
}
