//! Shared types, configuration, and error taxonomy for the ingestion &
//! retrieval engine.

pub mod config;
pub mod error;
pub mod types;

pub use config::*;
pub use error::{EngineError, Result};
pub use types::*;
