//! Call Graph Studio
//!
//! Rebuilds call trees from the per-depth state intervals recorded for each
//! thread of a trace, and aggregates them into statistical call graphs.
//!
//! This crate provides the core implementation for the `callgraph` CLI
//! tool, and the library pieces behind it:
//!
//! - [`model`]: call nodes, identifiers and the per-thread call-tree arena
//! - [`builder`]: reconstruction of call trees from interval sources
//! - [`aggregator`]: merging of call trees into per-thread graphs, collapsed
//!   stacks and hot-function tables
//! - [`parser`], [`output`], [`flamegraph`]: interval dumps in, reports and
//!   SVG out
//!
//! ## Getting Started
//!
//! ```bash
//! callgraph analyze --input dump.json --output report.json --flamegraph graph.svg
//! ```

pub mod aggregator;
pub mod builder;
pub mod commands;
pub mod flamegraph;
pub mod model;
pub mod output;
pub mod parser;
pub mod utils;
