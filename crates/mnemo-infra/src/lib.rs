//! Infrastructure layer for Mnemo.
//!
//! Contains implementations of the trait seams defined in `mnemo-core`:
//! the file-backed snapshot store and the HTTP completion/embedding
//! clients.

pub mod llm;
pub mod snapshot;
