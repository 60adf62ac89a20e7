//! Build collapsed stack format from aggregated call graphs.
//!
//! Collapsed stacks are the input format for flamegraph generation.
//! Format: "parent;child;grandchild weight"
//!
//! Example: "main;parse;read_file 1000"
//! This means: main called parse which called read_file, and 1000 time units
//! were spent in read_file itself at that position of the graph.

use super::call_graph::{AggregateNode, AggregateVisitor, ThreadGraph};
use log::debug;

/// A single collapsed stack entry
///
/// **Public** - used by flamegraph generator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollapsedStack {
    /// Stack trace as semicolon-separated string
    pub stack: String,

    /// Weight (self time spent at the leaf of this stack)
    pub weight: u64,
}

impl CollapsedStack {
    /// Create a new collapsed stack
    pub fn new(stack: String, weight: u64) -> Self {
        Self { stack, weight }
    }

    /// Render as a line of folded-stack text
    pub fn to_line(&self) -> String {
        format!("{} {}", self.stack, self.weight)
    }

    /// Name of the innermost frame
    pub fn leaf(&self) -> &str {
        self.stack.rsplit(';').next().unwrap_or(&self.stack)
    }
}

/// Frame separators and line breaks cannot appear inside a frame name
fn frame_name(node: &AggregateNode) -> String {
    node.identifier().label().replace([';', '\n', '\r'], "_")
}

/// Frame prepended to every stack when threads are kept apart
pub fn thread_frame(graph: &ThreadGraph) -> String {
    match graph.name() {
        Some(name) => format!("{}-{}", name.replace([';', '\n', '\r'], "_"), graph.thread_id()),
        None => format!("thread-{}", graph.thread_id()),
    }
}

struct StackCollector {
    path: Vec<String>,
    stacks: Vec<CollapsedStack>,
}

impl AggregateVisitor for StackCollector {
    fn enter(&mut self, node: &AggregateNode) {
        self.path.push(frame_name(node));
        let weight = u64::try_from(node.total_self_time()).unwrap_or(0);
        if weight > 0 {
            self.stacks
                .push(CollapsedStack::new(self.path.join(";"), weight));
        }
    }

    fn leave(&mut self, _node: &AggregateNode) {
        self.path.pop();
    }
}

/// Build collapsed stacks from one thread's graph
///
/// **Public** - main entry point for stack building
///
/// # Arguments
/// * `graph` - Aggregated graph of a thread
/// * `with_thread_frame` - Prefix every stack with a frame naming the thread
///
/// # Returns
/// One stack per aggregate node with positive self time, heaviest first
pub fn build_collapsed_stacks(graph: &ThreadGraph, with_thread_frame: bool) -> Vec<CollapsedStack> {
    let mut collector = StackCollector {
        path: Vec::new(),
        stacks: Vec::new(),
    };
    if with_thread_frame {
        collector.path.push(thread_frame(graph));
    }
    graph.accept(&mut collector);

    let mut stacks = collector.stacks;
    sort_stacks(&mut stacks);

    debug!(
        "Built {} collapsed stacks for thread {}",
        stacks.len(),
        graph.thread_id()
    );
    stacks
}

/// Build collapsed stacks across several graphs
///
/// Identical stacks coming from different graphs are summed.
pub fn collapse_graphs<'a>(
    graphs: impl IntoIterator<Item = &'a ThreadGraph>,
    with_thread_frame: bool,
) -> Vec<CollapsedStack> {
    let mut merged: indexmap::IndexMap<String, u64> = indexmap::IndexMap::new();
    for graph in graphs {
        for stack in build_collapsed_stacks(graph, with_thread_frame) {
            let weight = merged.entry(stack.stack).or_insert(0);
            *weight = weight.saturating_add(stack.weight);
        }
    }

    let mut stacks: Vec<CollapsedStack> = merged
        .into_iter()
        .map(|(stack, weight)| CollapsedStack::new(stack, weight))
        .collect();
    sort_stacks(&mut stacks);
    stacks
}

fn sort_stacks(stacks: &mut [CollapsedStack]) {
    stacks.sort_by(|a, b| b.weight.cmp(&a.weight).then_with(|| a.stack.cmp(&b.stack)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CallNode, CallTree};

    fn graph() -> ThreadGraph {
        let mut tree = CallTree::new(9);
        let main = tree.add_root(CallNode::new(0, 100, 1, "main", 9, None).unwrap());
        let parse = tree.add_child(main, CallNode::new(10, 60, 2, "parse", 9, None).unwrap());
        tree.add_child(parse, CallNode::new(20, 60, 3, "read;file", 9, None).unwrap());
        tree.add_child(main, CallNode::new(60, 70, 2, 0x10i64, 9, None).unwrap());

        let mut graph = ThreadGraph::new(9);
        graph.merge_tree(&tree).unwrap();
        graph
    }

    #[test]
    fn test_collapsed_stack_to_line() {
        let stack = CollapsedStack::new("main;execute;read".to_string(), 1000);
        assert_eq!(stack.to_line(), "main;execute;read 1000");
        assert_eq!(stack.leaf(), "read");
    }

    #[test]
    fn test_weights_are_self_times() {
        let stacks = build_collapsed_stacks(&graph(), false);
        let lines: Vec<String> = stacks.iter().map(CollapsedStack::to_line).collect();

        assert_eq!(
            lines,
            vec![
                "main 40".to_string(),
                "main;parse;read_file 40".to_string(),
                "main;0x10 10".to_string(),
                "main;parse 10".to_string(),
            ]
        );
        let total: u64 = stacks.iter().map(|s| s.weight).sum();
        assert_eq!(total, 100);
    }

    #[test]
    fn test_thread_frame_prefix() {
        let named = graph().with_name(Some("worker".to_string()));
        let stacks = build_collapsed_stacks(&named, true);
        assert!(stacks.iter().all(|s| s.stack.starts_with("worker-9;main")));
    }

    #[test]
    fn test_collapse_graphs_sums_identical_stacks() {
        let g = graph();
        let stacks = collapse_graphs([&g, &g], false);
        assert_eq!(stacks[0].to_line(), "main 80");
        assert_eq!(stacks.len(), 4);
    }

    #[test]
    fn test_symbol_spelled_like_address_stays_separate() {
        let mut tree = CallTree::new(9);
        let main = tree.add_root(CallNode::new(0, 30, 1, "main", 9, None).unwrap());
        tree.add_child(main, CallNode::new(0, 10, 2, 0x10i64, 9, None).unwrap());
        tree.add_child(main, CallNode::new(10, 30, 2, "0x10", 9, None).unwrap());
        let mut graph = ThreadGraph::new(9);
        graph.merge_tree(&tree).unwrap();

        let lines: Vec<String> = collapse_graphs([&graph], false)
            .iter()
            .map(CollapsedStack::to_line)
            .collect();
        assert_eq!(
            lines,
            vec!["main;'0x10' 20".to_string(), "main;0x10 10".to_string()]
        );
    }
}
