//! Flat profiles and time-distribution statistics.
//!
//! Hot functions are the call sites that consume the most self time,
//! whichever path reached them. These are the primary targets for optimization.

use super::call_graph::{AggregateNode, AggregateVisitor, ThreadGraph};
use super::stack_builder::CollapsedStack;
use crate::model::Identifier;
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};

/// Totals for one call site over every position in the graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotFunction {
    /// Call site, as displayed in flamegraphs
    pub function: String,

    /// Number of invocations
    pub calls: u64,

    /// Inclusive time; recursive invocations are only counted at the outermost level
    pub total_time: i64,

    /// Exclusive time
    pub self_time: i64,

    /// Share of all self time
    pub self_percentage: f64,
}

#[derive(Default)]
struct FlatTotals {
    calls: u64,
    total_time: i64,
    self_time: i64,
}

struct FlatProfiler {
    totals: IndexMap<Identifier, FlatTotals>,
    active: Vec<Identifier>,
}

impl AggregateVisitor for FlatProfiler {
    fn enter(&mut self, node: &AggregateNode) {
        let recursive = self.active.contains(node.identifier());
        let entry = self.totals.entry(node.identifier().clone()).or_default();
        entry.calls += node.call_count();
        entry.self_time = entry.self_time.saturating_add(node.total_self_time());
        if !recursive {
            entry.total_time = entry.total_time.saturating_add(node.total_duration());
        }
        self.active.push(node.identifier().clone());
    }

    fn leave(&mut self, _node: &AggregateNode) {
        self.active.pop();
    }
}

/// Calculate the hottest functions across graphs
///
/// **Public** - main entry point for flat profiles
///
/// # Arguments
/// * `graphs` - Graphs to summarize together
/// * `top_n` - Number of functions to return
///
/// # Returns
/// Functions sorted by self time (descending)
pub fn calculate_hot_functions<'a>(
    graphs: impl IntoIterator<Item = &'a ThreadGraph>,
    top_n: usize,
) -> Vec<HotFunction> {
    let mut profiler = FlatProfiler {
        totals: IndexMap::new(),
        active: Vec::new(),
    };
    for graph in graphs {
        graph.accept(&mut profiler);
    }

    let all_self_time = profiler
        .totals
        .values()
        .map(|t| t.self_time)
        .fold(0, i64::saturating_add);
    debug!(
        "Flat profile over {} functions, {} total self time",
        profiler.totals.len(),
        all_self_time
    );

    let mut functions: Vec<HotFunction> = profiler
        .totals
        .into_iter()
        .map(|(identifier, totals)| HotFunction {
            function: identifier.label(),
            calls: totals.calls,
            total_time: totals.total_time,
            self_time: totals.self_time,
            self_percentage: percentage(totals.self_time, all_self_time),
        })
        .collect();

    functions.sort_by(|a, b| {
        b.self_time
            .cmp(&a.self_time)
            .then_with(|| a.function.cmp(&b.function))
    });
    functions.truncate(top_n);
    functions
}

fn percentage(part: i64, whole: i64) -> f64 {
    if whole > 0 {
        (part as f64 / whole as f64) * 100.0
    } else {
        0.0
    }
}

/// How self time is spread over collapsed stacks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeDistribution {
    /// Self time across all stacks
    pub total_time: u64,

    /// Number of unique stacks
    pub stack_count: usize,

    /// Mean self time per stack
    pub mean_time: u64,

    /// Median self time per stack
    pub median_time: u64,

    /// Self time of the heaviest tenth of stacks
    pub top_decile_time: u64,

    /// Percentage of total time in the heaviest tenth
    pub top_decile_percentage: f64,
}

/// Calculate time distribution statistics
///
/// **Public** - provides summary statistics
pub fn calculate_time_distribution(stacks: &[CollapsedStack]) -> TimeDistribution {
    if stacks.is_empty() {
        return TimeDistribution::default();
    }

    let mut weights: Vec<u64> = stacks.iter().map(|s| s.weight).collect();
    weights.sort_unstable_by(|a, b| b.cmp(a));

    let total = weights.iter().fold(0, |acc: u64, w| acc.saturating_add(*w));
    let count = weights.len();
    let decile = count.div_ceil(10);
    let top_decile_time = weights
        .iter()
        .take(decile)
        .fold(0, |acc: u64, w| acc.saturating_add(*w));

    TimeDistribution {
        total_time: total,
        stack_count: count,
        mean_time: total / count as u64,
        median_time: weights[count / 2],
        top_decile_time,
        top_decile_percentage: if total > 0 {
            (top_decile_time as f64 / total as f64) * 100.0
        } else {
            0.0
        },
    }
}

impl TimeDistribution {
    /// Returns true if the heaviest tenth of stacks holds more than 80% of the time
    pub fn is_highly_concentrated(&self) -> bool {
        self.top_decile_percentage > 80.0
    }

    /// Get human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "Total: {} | Stacks: {} | Mean: {} | Median: {} | Top 10%: {:.1}%",
            self.total_time,
            self.stack_count,
            self.mean_time,
            self.median_time,
            self.top_decile_percentage
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CallNode, CallTree};

    #[test]
    fn test_recursion_counts_inclusive_time_once() {
        let mut tree = CallTree::new(1);
        let outer = tree.add_root(CallNode::new(0, 100, 1, "fib", 1, None).unwrap());
        let inner = tree.add_child(outer, CallNode::new(10, 90, 2, "fib", 1, None).unwrap());
        tree.add_child(inner, CallNode::new(20, 30, 3, "add", 1, None).unwrap());

        let mut graph = ThreadGraph::new(1);
        graph.merge_tree(&tree).unwrap();
        let functions = calculate_hot_functions([&graph], 10);

        assert_eq!(functions[0].function, "fib");
        assert_eq!(functions[0].calls, 2);
        assert_eq!(functions[0].total_time, 100);
        assert_eq!(functions[0].self_time, 90);
        assert!((functions[0].self_percentage - 90.0).abs() < 1e-9);
        assert_eq!(functions[1].function, "add");
        assert_eq!(functions[1].self_time, 10);
    }

    #[test]
    fn test_top_n_truncates() {
        let mut tree = CallTree::new(1);
        for (i, name) in ["a", "b", "c"].iter().enumerate() {
            let start = i as i64 * 10;
            tree.add_root(CallNode::new(start, start + 5, 1, *name, 1, None).unwrap());
        }
        let mut graph = ThreadGraph::new(1);
        graph.merge_tree(&tree).unwrap();

        assert_eq!(calculate_hot_functions([&graph], 2).len(), 2);
    }

    #[test]
    fn test_calculate_time_distribution() {
        let stacks = vec![
            CollapsedStack::new("stack1".to_string(), 8500),
            CollapsedStack::new("stack2".to_string(), 1000),
            CollapsedStack::new("stack3".to_string(), 250),
            CollapsedStack::new("stack4".to_string(), 250),
        ];

        let dist = calculate_time_distribution(&stacks);

        assert_eq!(dist.total_time, 10000);
        assert_eq!(dist.stack_count, 4);
        assert_eq!(dist.mean_time, 2500);
        assert_eq!(dist.median_time, 250);
        assert_eq!(dist.top_decile_time, 8500);
        assert!(dist.is_highly_concentrated());
    }

    #[test]
    fn test_time_distribution_empty() {
        let dist = calculate_time_distribution(&[]);
        assert_eq!(dist.total_time, 0);
        assert_eq!(dist.stack_count, 0);
        assert!(!dist.is_highly_concentrated());
    }
}
