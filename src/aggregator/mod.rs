//! Aggregation of call trees into call graphs, stacks and metrics.
//!
//! This module transforms rebuilt call trees into:
//! - Per-thread statistical call graphs (flame-graph aggregation)
//! - Collapsed stack format (for flamegraph generation)
//! - Hot function tables and time distribution statistics

pub mod call_graph;
pub mod graph_aggregator;
pub mod metrics;
pub mod stack_builder;

// Re-export main types and functions
pub use call_graph::{AggregateNode, AggregateVisitor, PreOrder, ThreadGraph, COMBINED_THREAD_ID};
pub use graph_aggregator::{
    analyze_threads, Analysis, CallGraphAggregator, CancellationToken, ThreadFailure,
};
pub use metrics::{calculate_hot_functions, calculate_time_distribution, HotFunction, TimeDistribution};
pub use stack_builder::{build_collapsed_stacks, collapse_graphs, thread_frame, CollapsedStack};
