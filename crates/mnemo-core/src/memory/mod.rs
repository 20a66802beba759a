//! The Mnemo memory pipeline.
//!
//! Control flow per turn: session history -> [`scheduler`] -> (when due)
//! [`flash`] / [`longterm`] extraction -> [`merger`] -> snapshot store.
//! Independently, on every user utterance, [`retriever`] ranks stored
//! records against the utterance for prompt injection.

pub mod embedder;
pub mod flash;
pub mod longterm;
pub mod merger;
pub mod retriever;
pub mod scheduler;
pub mod service;
pub mod session;
pub mod similarity;
pub mod store;
pub mod window;
