//! Analysis modules.
//!
//! The orchestrator binds categories to chart strategies and runs the
//! fetch, normalize and chart pipeline for a subject or the whole dataset.

pub mod orchestrator;

pub use orchestrator::{Orchestrator, OrchestratorConfig};
