//! Observability setup for Mnemo.
//!
//! Hosts the tracing subscriber initialization so the embedding
//! application configures logging in one place.

pub mod tracing_setup;
