//! Memory extraction, retrieval, and merge logic for Mnemo.
//!
//! This crate defines the "ports" (provider, embedder, and store traits)
//! that the infrastructure layer implements, plus the pure policies that
//! make up the memory pipeline: update scheduling, dialogue windowing,
//! flash and long-term extraction, similarity retrieval, and the bounded
//! deduplicating merge. It depends only on `mnemo-types` -- never on
//! `mnemo-infra` or any HTTP/IO crate.

pub mod llm;
pub mod memory;
