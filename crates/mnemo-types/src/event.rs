//! Dialogue event types for Mnemo.
//!
//! An `InteractionEvent` is one entry in a session's ordered dialogue
//! history. The history itself is owned by the surrounding agent; this
//! subsystem only reads it when extracting memories.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Author of a dialogue event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventRole {
    User,
    Assistant,
    System,
}

impl fmt::Display for EventRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventRole::User => write!(f, "user"),
            EventRole::Assistant => write!(f, "assistant"),
            EventRole::System => write!(f, "system"),
        }
    }
}

impl FromStr for EventRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(EventRole::User),
            "assistant" => Ok(EventRole::Assistant),
            "system" => Ok(EventRole::System),
            other => Err(format!("invalid event role: '{other}'")),
        }
    }
}

/// A single entry in a session's dialogue history.
///
/// Read-only input to the extractors; never mutated by this subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub role: EventRole,
    pub content: String,
}

impl InteractionEvent {
    /// Convenience constructor for a user-authored event.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: EventRole::User,
            content: content.into(),
        }
    }

    /// Convenience constructor for an assistant-authored event.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: EventRole::Assistant,
            content: content.into(),
        }
    }
}
