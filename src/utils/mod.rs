//! Utility modules for configuration and error handling.

pub mod config;
pub mod error;

// Re-export commonly used types for convenience
pub use config::{AnalysisConfig, NestingPolicy};
pub use error::{CallGraphError, FlamegraphError, OutputError, ParseError};
