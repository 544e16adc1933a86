//! Hover state for the annotated essay view.
//!
//! `Idle -> Hovering` on entering a marked span, `Hovering -> Idle` on leave.
//! Entering another marked span while hovering moves straight to that span,
//! since adjacent marks can be crossed without a leave event in between.
//! Entering unmarked text never changes the state.

use crate::annotation::AnnotatedBody;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HoverState {
    #[default]
    Idle,
    Hovering(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HoverEvent {
    PointerEnter(String),
    PointerLeave,
}

/// Computes the next state against the current rendering.
///
/// Entering text that is not a marked span leaves the state unchanged.
pub fn next_state(current: &HoverState, event: &HoverEvent, body: &AnnotatedBody) -> HoverState {
    match event {
        HoverEvent::PointerEnter(text) if body.is_marked(text) => {
            HoverState::Hovering(text.clone())
        }
        HoverEvent::PointerEnter(_) => current.clone(),
        HoverEvent::PointerLeave => HoverState::Idle,
    }
}

pub fn transition(
    current: &HoverState,
    event: &HoverEvent,
    body: &AnnotatedBody,
) -> (HoverState, bool) {
    let next = next_state(current, event, body);
    let changed = &next != current;
    (next, changed)
}

/// Annotation panel content; `None` hides the panel.
pub fn active_feedback<'a>(body: &'a AnnotatedBody, state: &HoverState) -> Option<&'a str> {
    match state {
        HoverState::Idle => None,
        HoverState::Hovering(text) => body.feedback_for(text),
    }
}
