//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use thiserror::Error;

/// Errors raised by the call-tree and call-graph engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallGraphError {
    #[error("Invalid time range: end {end} is before start {start}")]
    InvalidRange { start: i64, end: i64 },

    #[error("Duration of [{start}, {end}) does not fit in a 64-bit integer")]
    DurationOverflow { start: i64, end: i64 },

    #[error("Unsupported identifier type: {0} (expected an integer or a string)")]
    UnsupportedIdentifierType(&'static str),

    #[error("Cannot compare a call against an absent value")]
    NullComparison,

    #[error("Malformed nesting in thread {thread_id}: interval [{start}, {end}) at depth {depth} has no enclosing call")]
    MalformedNesting {
        thread_id: i32,
        depth: u32,
        start: i64,
        end: i64,
    },

    #[error("Call tree of thread {found} cannot be merged into the graph of thread {expected}")]
    ThreadMismatch { expected: i32, found: i32 },
}

/// Errors that can occur while reading an interval dump
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("JSON deserialization failed: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid interval dump: {0}")]
    InvalidFormat(String),
}

/// Errors that can occur during flamegraph generation
#[derive(Error, Debug)]
pub enum FlamegraphError {
    #[error("Empty stack data")]
    EmptyStacks,

    #[error("Failed to render flamegraph: {0}")]
    RenderFailed(String),

    #[error("Rendered flamegraph is not valid UTF-8")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}
