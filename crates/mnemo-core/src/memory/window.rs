//! Dialogue window slicing and transcript rendering.
//!
//! Extraction prompts see a bounded tail of the dialogue history. Windows
//! are sliced in events but must open on a user-authored event so the model
//! always reads a complete turn; a window that would open mid-assistant-turn
//! is advanced forward to the next user event.

use mnemo_types::event::{EventRole, InteractionEvent};

/// The most recent `max_events` events, realigned to start on a user event.
///
/// May return an empty slice: a history with no user events inside the
/// window yields nothing to extract from.
pub fn tail_window(events: &[InteractionEvent], max_events: usize) -> &[InteractionEvent] {
    let start = events.len().saturating_sub(max_events);
    let tail = &events[start..];

    match tail.iter().position(|e| e.role == EventRole::User) {
        Some(offset) => &tail[offset..],
        None => &[],
    }
}

/// Number of user-authored events in the history.
///
/// This is the scheduler's turn counter: one user utterance = one turn,
/// regardless of how many assistant events follow it.
pub fn user_turn_count(events: &[InteractionEvent]) -> u32 {
    events.iter().filter(|e| e.role == EventRole::User).count() as u32
}

/// Render a window as role-prefixed transcript lines for prompt inclusion.
///
/// System events are skipped; they carry pipeline boilerplate, not
/// conversation content.
pub fn render_transcript(events: &[InteractionEvent]) -> String {
    let mut transcript = String::new();
    for event in events {
        let role = match event.role {
            EventRole::User => "User",
            EventRole::Assistant => "Assistant",
            EventRole::System => continue,
        };
        transcript.push_str(role);
        transcript.push_str(": ");
        transcript.push_str(&event.content);
        transcript.push('\n');
    }
    transcript
}
