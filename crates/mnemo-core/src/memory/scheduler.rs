//! Update scheduling: decides per turn which extractors run.
//!
//! The turn counter is derived, never stored: it is the count of
//! user-authored events in the session's dialogue history at update time
//! (see [`crate::memory::window::user_turn_count`]).

use mnemo_types::config::MemoryConfig;

/// What the current turn should trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdatePlan {
    pub run_flash: bool,
    pub run_long_term: bool,
}

impl UpdatePlan {
    /// Whether anything is due this turn.
    pub fn is_due(&self) -> bool {
        self.run_flash || self.run_long_term
    }
}

/// Pure turn-modulo scheduling. No side effects, no failure modes.
pub struct UpdateScheduler;

impl UpdateScheduler {
    /// Plan the update for user turn `turn`.
    ///
    /// An extractor is due when `turn > 0` and `turn` is a multiple of its
    /// interval. Turn 0 never triggers (an empty conversation has nothing
    /// to extract).
    pub fn plan(turn: u32, config: &MemoryConfig) -> UpdatePlan {
        UpdatePlan {
            run_flash: turn > 0 && config.flash_interval > 0 && turn % config.flash_interval == 0,
            run_long_term: turn > 0
                && config.long_term_interval > 0
                && turn % config.long_term_interval == 0,
        }
    }
}
