//! AI interpretation pipeline for divination records.
//!
//! [`orchestrator::AiOrchestrator`] is the entry point. Its collaborators are
//! injected as trait objects: a record store from `iching-core`, a
//! [`coordination::CoordinationStore`] (Redis in production) and a
//! [`model::ModelClient`].

pub mod clock;
pub mod config;
pub mod coordination;
pub mod error;
pub mod lock;
pub mod model;
pub mod orchestrator;
pub mod parse;
pub mod prompt;
pub mod records;

pub use error::{ModelError, OracleError};
pub use orchestrator::{AiOrchestrator, OrchestratorSettings};
