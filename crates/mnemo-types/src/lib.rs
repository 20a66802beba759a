//! Shared domain types for Mnemo.
//!
//! This crate contains the core domain types used across the Mnemo memory
//! subsystem: dialogue events, memory records and snapshots, configuration,
//! and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod error;
pub mod event;
pub mod llm;
pub mod memory;
