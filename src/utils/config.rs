//! Configuration and constants for the engine and the CLI.

use serde::{Deserialize, Serialize};

/// Current output schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Default number of functions listed in hot-function tables
pub const DEFAULT_TOP_FUNCTIONS: usize = 20;

/// Upper bound accepted for `--top`
pub const MAX_TOP_FUNCTIONS: usize = 1000;

/// Default flamegraph title and width
pub const DEFAULT_FLAMEGRAPH_TITLE: &str = "Call Graph";
pub const DEFAULT_FLAMEGRAPH_WIDTH: usize = 1200;

/// Unit label used for weights in flamegraphs and summaries
pub const DEFAULT_COUNT_NAME: &str = "ns";

/// Outermost call-stack depth in an interval dump
pub const FIRST_DEPTH: u32 = 1;

/// What to do when a deeper interval is not contained in a shallower call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NestingPolicy {
    /// Exclude the interval from the tree and log a warning
    #[default]
    Drop,
    /// Abort reconstruction of the whole thread
    Reject,
}

/// Options for call-tree reconstruction
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalysisConfig {
    pub nesting: NestingPolicy,
}

impl AnalysisConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_nesting(mut self, nesting: NestingPolicy) -> Self {
        self.nesting = nesting;
        self
    }
}
