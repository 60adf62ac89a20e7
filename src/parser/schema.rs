//! Output JSON schema definitions for call-graph reports.
//!
//! This module defines the structure of JSON files we write to disk.
//! Schema is versioned to allow future evolution.

use crate::aggregator::{AggregateNode, Analysis, HotFunction, ThreadGraph};
use crate::model::Identifier;
use crate::utils::config::SCHEMA_VERSION;
use serde::{Deserialize, Serialize};

/// Top-level report structure written to JSON
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphReport {
    /// Schema version for compatibility checking
    pub version: String,

    /// Timestamp when the report was generated
    pub generated_at: String,

    /// One aggregated graph per thread
    pub threads: Vec<ThreadReport>,

    /// Threads whose graph could not be built
    #[serde(default)]
    pub failures: Vec<FailureReport>,

    /// Flat profile across all threads
    #[serde(default)]
    pub hot_functions: Vec<HotFunction>,
}

/// Aggregated call graph of one thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadReport {
    pub process_id: i32,
    pub thread_id: i32,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Invocations merged into this graph
    pub total_calls: u64,

    /// Sum of the durations of all top-level calls
    pub total_duration: i64,

    pub roots: Vec<AggregateReport>,
}

/// One merged call site, with its callees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateReport {
    /// Display name (symbol, or hex address)
    pub function: String,

    /// Raw identifier: a number or a string
    pub identifier: Identifier,

    pub depth: usize,
    pub calls: u64,
    pub total_duration: i64,
    pub self_time: i64,
    pub min_duration: i64,
    pub max_duration: i64,
    pub mean_duration: f64,
    pub min_self_time: i64,
    pub max_self_time: i64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<AggregateReport>,
}

/// A thread that failed to build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
    pub process_id: i32,
    pub thread_id: i32,
    pub error: String,
}

impl From<&AggregateNode> for AggregateReport {
    fn from(node: &AggregateNode) -> Self {
        Self {
            function: node.identifier().label(),
            identifier: node.identifier().clone(),
            depth: node.depth(),
            calls: node.call_count(),
            total_duration: node.total_duration(),
            self_time: node.total_self_time(),
            min_duration: node.min_duration().unwrap_or(0),
            max_duration: node.max_duration().unwrap_or(0),
            mean_duration: node.mean_duration().unwrap_or(0.0),
            min_self_time: node.min_self_time().unwrap_or(0),
            max_self_time: node.max_self_time().unwrap_or(0),
            children: node.children().values().map(AggregateReport::from).collect(),
        }
    }
}

impl From<&ThreadGraph> for ThreadReport {
    fn from(graph: &ThreadGraph) -> Self {
        Self {
            process_id: graph.process_id(),
            thread_id: graph.thread_id(),
            name: graph.name().map(str::to_string),
            total_calls: graph.total_calls(),
            total_duration: graph.total_duration(),
            roots: graph.roots().values().map(AggregateReport::from).collect(),
        }
    }
}

/// Convert an analysis to output report format
///
/// **Public** - used by commands to create final output
pub fn to_report(analysis: &Analysis, hot_functions: Vec<HotFunction>) -> GraphReport {
    use chrono::Utc;

    GraphReport {
        version: SCHEMA_VERSION.to_string(),
        generated_at: Utc::now().to_rfc3339(),
        threads: analysis
            .aggregator
            .thread_graphs()
            .map(ThreadReport::from)
            .collect(),
        failures: analysis
            .failures
            .iter()
            .map(|f| FailureReport {
                process_id: f.process_id,
                thread_id: f.thread_id,
                error: f.error.to_string(),
            })
            .collect(),
        hot_functions,
    }
}
