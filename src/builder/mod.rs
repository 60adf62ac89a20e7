//! Call-tree reconstruction from depth-indexed interval sequences.
//!
//! This module turns the flattened per-depth state history of a thread back
//! into the nested calls that produced it:
//! - `source` describes the intervals we consume
//! - `call_tree_builder` rebuilds the forest, root by root

pub mod call_tree_builder;
pub mod source;

// Re-export main types and functions
pub use call_tree_builder::{build_call_tree, BuildReport, CallTreeBuilder};
pub use source::{Interval, IntervalSource, ThreadIntervals};
