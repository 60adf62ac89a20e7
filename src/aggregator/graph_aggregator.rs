//! Per-thread aggregation driver.
//!
//! The aggregator keeps one [`ThreadGraph`] per thread id. Threads never share
//! state, so [`analyze_threads`] rebuilds and merges them in parallel, each
//! worker owning a private graph until the results are collected.

use super::call_graph::{ThreadGraph, COMBINED_THREAD_ID};
use crate::builder::{BuildReport, CallTreeBuilder, ThreadIntervals};
use crate::model::{CallTree, NodeId};
use crate::utils::config::AnalysisConfig;
use crate::utils::error::CallGraphError;
use log::{debug, info, warn};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared flag telling workers to stop between two merged roots
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Owns the aggregated graph of every thread seen so far
#[derive(Debug, Clone, Default)]
pub struct CallGraphAggregator {
    graphs: BTreeMap<i32, ThreadGraph>,
}

impl CallGraphAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn graph_for(&mut self, thread_id: i32) -> &mut ThreadGraph {
        self.graphs
            .entry(thread_id)
            .or_insert_with(|| ThreadGraph::new(thread_id))
    }

    /// Merge one root of `tree` into its thread's graph
    pub fn merge_root(&mut self, tree: &CallTree, root: NodeId) -> Result<(), CallGraphError> {
        self.graph_for(tree.thread_id()).merge_root(tree, root)
    }

    /// Merge every root of `tree` into its thread's graph
    pub fn merge_tree(&mut self, tree: &CallTree) -> Result<(), CallGraphError> {
        self.graph_for(tree.thread_id()).merge_tree(tree)
    }

    /// Add a graph built elsewhere, folding it into an existing one for the same thread
    pub fn insert_graph(&mut self, graph: ThreadGraph) {
        match self.graphs.get_mut(&graph.thread_id()) {
            Some(existing) => existing.absorb(&graph),
            None => {
                self.graphs.insert(graph.thread_id(), graph);
            }
        }
    }

    pub fn thread_graph(&self, thread_id: i32) -> Option<&ThreadGraph> {
        self.graphs.get(&thread_id)
    }

    /// Graphs ordered by thread id
    pub fn thread_graphs(&self) -> impl Iterator<Item = &ThreadGraph> + '_ {
        self.graphs.values()
    }

    pub fn into_thread_graphs(self) -> Vec<ThreadGraph> {
        self.graphs.into_values().collect()
    }

    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }

    /// Every thread merged into a single graph
    pub fn combined_graph(&self) -> ThreadGraph {
        let mut combined =
            ThreadGraph::new(COMBINED_THREAD_ID).with_name(Some("all threads".to_string()));
        for graph in self.graphs.values() {
            combined.absorb(graph);
        }
        combined
    }
}

/// A thread whose graph could not be produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadFailure {
    pub process_id: i32,
    pub thread_id: i32,
    pub error: CallGraphError,
}

/// Outcome of analysing a whole trace
#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub aggregator: CallGraphAggregator,
    pub reports: Vec<BuildReport>,
    pub failures: Vec<ThreadFailure>,

    /// Threads stopped by cancellation; their graphs are valid but incomplete
    pub cancelled: Vec<i32>,
}

struct ThreadOutcome {
    graph: ThreadGraph,
    report: BuildReport,
    cancelled: bool,
}

/// Rebuild and merge every thread, in parallel
///
/// **Public** - main entry point for whole-trace analysis
///
/// A thread that fails is reported in `failures` and leaves the others intact.
pub fn analyze_threads(
    threads: &[ThreadIntervals],
    config: AnalysisConfig,
    cancel: &CancellationToken,
) -> Analysis {
    info!("Analyzing {} threads", threads.len());

    let outcomes: Vec<(&ThreadIntervals, Result<ThreadOutcome, CallGraphError>)> = threads
        .par_iter()
        .map(|source| (source, analyze_thread(source, config, cancel)))
        .collect();

    let mut analysis = Analysis::default();
    for (source, outcome) in outcomes {
        match outcome {
            Ok(outcome) => {
                if outcome.cancelled {
                    analysis.cancelled.push(source.thread_id);
                }
                analysis.reports.push(outcome.report);
                analysis.aggregator.insert_graph(outcome.graph);
            }
            Err(error) => {
                warn!(
                    "Thread {} (process {}) failed: {}",
                    source.thread_id, source.process_id, error
                );
                analysis.failures.push(ThreadFailure {
                    process_id: source.process_id,
                    thread_id: source.thread_id,
                    error,
                });
            }
        }
    }

    info!(
        "Analysis finished: {} graphs, {} failures, {} cancelled",
        analysis.aggregator.len(),
        analysis.failures.len(),
        analysis.cancelled.len()
    );
    analysis
}

fn analyze_thread(
    source: &ThreadIntervals,
    config: AnalysisConfig,
    cancel: &CancellationToken,
) -> Result<ThreadOutcome, CallGraphError> {
    let mut graph = ThreadGraph::new(source.thread_id)
        .with_process(source.process_id)
        .with_name(source.name.clone());

    if cancel.is_cancelled() {
        return Ok(ThreadOutcome {
            graph,
            report: BuildReport {
                thread_id: source.thread_id,
                ..BuildReport::default()
            },
            cancelled: true,
        });
    }

    let mut merge_error = None;
    let mut cancelled = false;
    let report = CallTreeBuilder::new(source)
        .with_config(config)
        .build_streaming(|tree, root| {
            if cancel.is_cancelled() {
                cancelled = true;
                return ControlFlow::Break(());
            }
            match graph.merge_root(tree, root) {
                Ok(()) => ControlFlow::Continue(()),
                Err(e) => {
                    merge_error = Some(e);
                    ControlFlow::Break(())
                }
            }
        })?;

    if let Some(error) = merge_error {
        return Err(error);
    }

    debug!(
        "Thread {}: {} aggregate nodes from {} calls",
        source.thread_id,
        graph.node_count(),
        report.calls
    );
    Ok(ThreadOutcome {
        graph,
        report,
        cancelled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CallNode, Identifier};

    #[test]
    fn test_aggregator_shards_by_thread() {
        let mut aggregator = CallGraphAggregator::new();
        for thread_id in [3, 1, 2] {
            let mut tree = CallTree::new(thread_id);
            tree.add_root(CallNode::new(0, 5, 1, "main", thread_id, None).unwrap());
            aggregator.merge_tree(&tree).unwrap();
        }

        let ids: Vec<i32> = aggregator.thread_graphs().map(ThreadGraph::thread_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);

        let combined = aggregator.combined_graph();
        let main = combined.root(&Identifier::symbol("main")).unwrap();
        assert_eq!(main.call_count(), 3);
        assert_eq!(main.total_duration(), 15);
    }

    #[test]
    fn test_cancelled_before_start() {
        let threads = vec![ThreadIntervals::new(1, 1).call(1, 0, 10, "main")];
        let cancel = CancellationToken::new();
        cancel.cancel();

        let analysis = analyze_threads(&threads, AnalysisConfig::default(), &cancel);
        assert_eq!(analysis.cancelled, vec![1]);
        assert!(analysis.aggregator.thread_graph(1).unwrap().is_empty());
    }
}
