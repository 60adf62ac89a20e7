//! Interval dump parsing and report schema definitions.
//!
//! This module handles:
//! - Parsing interval dumps exported from the state history
//! - Validating the per-depth interval contract
//! - Defining output schema

pub mod interval_dump;
pub mod schema;

// Re-export main types
pub use interval_dump::{parse_trace_dump, read_trace_dump, validate_trace_dump, TraceDump};
pub use schema::{to_report, AggregateReport, FailureReport, GraphReport, ThreadReport};
