//! Annotated essay bodies.
//!
//! An essay body plus an [`AnnotationMap`] becomes a flat list of
//! [`Segment`]s. Renderers escape each segment on output; nothing here ever
//! produces markup.
//!
//! Matching rules:
//! - keys are literal substrings; empty keys are ignored;
//! - each key marks at most its first occurrence;
//! - overlapping candidates resolve by earliest start, then longest match,
//!   then key order; the loser is dropped entirely.

use crate::models::AnnotationMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Plain(String),
    Annotated { text: String, feedback: String },
}

impl Segment {
    pub fn text(&self) -> &str {
        match self {
            Self::Plain(text) => text,
            Self::Annotated { text, .. } => text,
        }
    }

    pub fn is_annotated(&self) -> bool {
        matches!(self, Self::Annotated { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnnotatedBody {
    segments: Vec<Segment>,
}

impl AnnotatedBody {
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of marked spans.
    pub fn marked_count(&self) -> usize {
        self.segments.iter().filter(|s| s.is_annotated()).count()
    }

    /// Feedback for a marked span with exactly this text.
    pub fn feedback_for(&self, span_text: &str) -> Option<&str> {
        self.segments.iter().find_map(|segment| match segment {
            Segment::Annotated { text, feedback } if text == span_text => Some(feedback.as_str()),
            _ => None,
        })
    }

    pub fn is_marked(&self, span_text: &str) -> bool {
        self.feedback_for(span_text).is_some()
    }

    /// Reassembles the essay body.
    pub fn plain_text(&self) -> String {
        self.segments.iter().map(Segment::text).collect()
    }
}

#[derive(Debug, Clone, Copy)]
struct Candidate<'a> {
    start: usize,
    end: usize,
    key: &'a str,
    feedback: &'a str,
}

/// Splits `body` into plain and annotated segments.
#[must_use]
pub fn annotate(body: &str, annotations: &AnnotationMap) -> AnnotatedBody {
    let mut candidates: Vec<Candidate<'_>> = annotations
        .iter()
        .filter(|(key, _)| !key.is_empty())
        .filter_map(|(key, feedback)| {
            body.find(key.as_str()).map(|start| Candidate {
                start,
                end: start + key.len(),
                key: key.as_str(),
                feedback: feedback.as_str(),
            })
        })
        .collect();

    candidates.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then_with(|| b.end.cmp(&a.end))
            .then_with(|| a.key.cmp(b.key))
    });

    let mut accepted: Vec<Candidate<'_>> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let overlaps = accepted
            .last()
            .is_some_and(|prev| candidate.start < prev.end);
        if !overlaps {
            accepted.push(candidate);
        }
    }

    let mut segments = Vec::with_capacity(accepted.len() * 2 + 1);
    let mut cursor = 0usize;
    for span in accepted {
        if span.start > cursor {
            segments.push(Segment::Plain(body[cursor..span.start].to_string()));
        }
        segments.push(Segment::Annotated {
            text: body[span.start..span.end].to_string(),
            feedback: span.feedback.to_string(),
        });
        cursor = span.end;
    }
    if cursor < body.len() {
        segments.push(Segment::Plain(body[cursor..].to_string()));
    }

    AnnotatedBody { segments }
}
