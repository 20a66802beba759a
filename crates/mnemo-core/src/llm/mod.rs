//! Completion provider abstraction for Mnemo.
//!
//! Extraction is the only consumer of completions, and it is strictly
//! one-shot, so the trait surface is a single `complete` call.

pub mod provider;
