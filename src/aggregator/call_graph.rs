//! Weighted statistical call graphs.
//!
//! Every invocation of the same call site under the same aggregate parent is
//! merged into one [`AggregateNode`]. The same call site reached through a
//! different caller stays a distinct node, which is exactly what a flame graph
//! draws.

use crate::model::{CallTree, Identifier, NodeId};
use crate::utils::error::CallGraphError;
use indexmap::IndexMap;

/// Thread id used for the graph that merges every thread together
pub const COMBINED_THREAD_ID: i32 = -1;

/// Merged statistics for one call site at one position of the call graph
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateNode {
    identifier: Identifier,
    depth: usize,
    call_count: u64,
    total_duration: i64,
    total_self_time: i64,
    min_duration: i64,
    max_duration: i64,
    min_self_time: i64,
    max_self_time: i64,
    children: IndexMap<Identifier, AggregateNode>,
}

impl AggregateNode {
    /// Empty bucket; becomes meaningful once a call is merged into it
    pub fn new(identifier: Identifier, depth: usize) -> Self {
        Self {
            identifier,
            depth,
            call_count: 0,
            total_duration: 0,
            total_self_time: 0,
            min_duration: 0,
            max_duration: 0,
            min_self_time: 0,
            max_self_time: 0,
            children: IndexMap::new(),
        }
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    /// Position in the aggregate tree, 0 for roots
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn call_count(&self) -> u64 {
        self.call_count
    }

    pub fn total_duration(&self) -> i64 {
        self.total_duration
    }

    pub fn total_self_time(&self) -> i64 {
        self.total_self_time
    }

    pub fn children(&self) -> &IndexMap<Identifier, AggregateNode> {
        &self.children
    }

    pub fn child(&self, identifier: &Identifier) -> Option<&AggregateNode> {
        self.children.get(identifier)
    }

    pub fn min_duration(&self) -> Option<i64> {
        (self.call_count > 0).then_some(self.min_duration)
    }

    pub fn max_duration(&self) -> Option<i64> {
        (self.call_count > 0).then_some(self.max_duration)
    }

    pub fn min_self_time(&self) -> Option<i64> {
        (self.call_count > 0).then_some(self.min_self_time)
    }

    pub fn max_self_time(&self) -> Option<i64> {
        (self.call_count > 0).then_some(self.max_self_time)
    }

    pub fn mean_duration(&self) -> Option<f64> {
        (self.call_count > 0).then(|| self.total_duration as f64 / self.call_count as f64)
    }

    pub fn mean_self_time(&self) -> Option<f64> {
        (self.call_count > 0).then(|| self.total_self_time as f64 / self.call_count as f64)
    }

    /// Pre-order walk of this subtree, starting with `self`
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder { stack: vec![self] }
    }

    fn record(&mut self, duration: i64, self_time: i64) {
        if self.call_count == 0 {
            self.min_duration = duration;
            self.max_duration = duration;
            self.min_self_time = self_time;
            self.max_self_time = self_time;
        } else {
            self.min_duration = self.min_duration.min(duration);
            self.max_duration = self.max_duration.max(duration);
            self.min_self_time = self.min_self_time.min(self_time);
            self.max_self_time = self.max_self_time.max(self_time);
        }
        self.call_count += 1;
        self.total_duration = self.total_duration.saturating_add(duration);
        self.total_self_time = self.total_self_time.saturating_add(self_time);
    }

    fn child_entry(&mut self, identifier: &Identifier) -> &mut AggregateNode {
        let depth = self.depth + 1;
        self.children
            .entry(identifier.clone())
            .or_insert_with(|| AggregateNode::new(identifier.clone(), depth))
    }

    /// Fold one call and its whole subtree into this bucket
    fn merge_call(&mut self, tree: &CallTree, id: NodeId) {
        let call = tree.node(id);
        self.record(call.duration(), call.self_time());

        for &child_id in call.children() {
            let child = tree.node(child_id);
            self.child_entry(child.identifier()).merge_call(tree, child_id);
        }
    }

    /// Fold another aggregate (same identifier) into this one
    pub fn absorb(&mut self, other: &AggregateNode) {
        if other.call_count > 0 {
            if self.call_count == 0 {
                self.min_duration = other.min_duration;
                self.max_duration = other.max_duration;
                self.min_self_time = other.min_self_time;
                self.max_self_time = other.max_self_time;
            } else {
                self.min_duration = self.min_duration.min(other.min_duration);
                self.max_duration = self.max_duration.max(other.max_duration);
                self.min_self_time = self.min_self_time.min(other.min_self_time);
                self.max_self_time = self.max_self_time.max(other.max_self_time);
            }
        }
        self.call_count += other.call_count;
        self.total_duration = self.total_duration.saturating_add(other.total_duration);
        self.total_self_time = self.total_self_time.saturating_add(other.total_self_time);

        for (identifier, child) in &other.children {
            self.child_entry(identifier).absorb(child);
        }
    }
}

/// Callbacks for a pre-order walk of a call graph
pub trait AggregateVisitor {
    fn enter(&mut self, node: &AggregateNode);

    fn leave(&mut self, _node: &AggregateNode) {}
}

/// Pre-order iterator over aggregate nodes
pub struct PreOrder<'a> {
    stack: Vec<&'a AggregateNode>,
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a AggregateNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.values().rev());
        Some(node)
    }
}

fn walk<V: AggregateVisitor + ?Sized>(node: &AggregateNode, visitor: &mut V) {
    visitor.enter(node);
    for child in node.children.values() {
        walk(child, visitor);
    }
    visitor.leave(node);
}

/// Aggregated call graph of one thread
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadGraph {
    thread_id: i32,
    process_id: i32,
    name: Option<String>,
    roots: IndexMap<Identifier, AggregateNode>,
}

impl ThreadGraph {
    pub fn new(thread_id: i32) -> Self {
        Self {
            thread_id,
            process_id: -1,
            name: None,
            roots: IndexMap::new(),
        }
    }

    pub fn with_process(mut self, process_id: i32) -> Self {
        self.process_id = process_id;
        self
    }

    pub fn with_name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    pub fn thread_id(&self) -> i32 {
        self.thread_id
    }

    pub fn process_id(&self) -> i32 {
        self.process_id
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn roots(&self) -> &IndexMap<Identifier, AggregateNode> {
        &self.roots
    }

    pub fn root(&self, identifier: &Identifier) -> Option<&AggregateNode> {
        self.roots.get(identifier)
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Merge one top-level call and its subtree
    ///
    /// # Errors
    /// * `CallGraphError::ThreadMismatch` - the tree belongs to another thread
    pub fn merge_root(&mut self, tree: &CallTree, root: NodeId) -> Result<(), CallGraphError> {
        if tree.thread_id() != self.thread_id {
            return Err(CallGraphError::ThreadMismatch {
                expected: self.thread_id,
                found: tree.thread_id(),
            });
        }

        let call = tree.node(root);
        self.roots
            .entry(call.identifier().clone())
            .or_insert_with(|| AggregateNode::new(call.identifier().clone(), 0))
            .merge_call(tree, root);
        Ok(())
    }

    /// Merge every root of `tree`
    pub fn merge_tree(&mut self, tree: &CallTree) -> Result<(), CallGraphError> {
        for &root in tree.roots() {
            self.merge_root(tree, root)?;
        }
        Ok(())
    }

    /// Fold another graph's statistics into this one, whatever its thread
    pub fn absorb(&mut self, other: &ThreadGraph) {
        for (identifier, node) in &other.roots {
            self.roots
                .entry(identifier.clone())
                .or_insert_with(|| AggregateNode::new(identifier.clone(), 0))
                .absorb(node);
        }
    }

    /// Pre-order walk over every aggregate node, root by root
    pub fn iter(&self) -> PreOrder<'_> {
        PreOrder {
            stack: self.roots.values().rev().collect(),
        }
    }

    /// Drive `visitor` over the graph in pre-order
    pub fn accept<V: AggregateVisitor + ?Sized>(&self, visitor: &mut V) {
        for root in self.roots.values() {
            walk(root, visitor);
        }
    }

    pub fn node_count(&self) -> usize {
        self.iter().count()
    }

    /// Sum of root durations
    pub fn total_duration(&self) -> i64 {
        self.roots
            .values()
            .map(AggregateNode::total_duration)
            .fold(0, i64::saturating_add)
    }

    /// Sum of self times over every node; equals `total_duration` for well-nested input
    pub fn total_self_time(&self) -> i64 {
        self.iter()
            .map(AggregateNode::total_self_time)
            .fold(0, i64::saturating_add)
    }

    pub fn total_calls(&self) -> u64 {
        self.iter().map(AggregateNode::call_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CallNode;

    fn call(start: i64, end: i64, depth: i32, name: &str) -> CallNode {
        CallNode::new(start, end, depth, name, 7, None).unwrap()
    }

    #[test]
    fn test_merge_root_creates_and_accumulates() {
        let mut tree = CallTree::new(7);
        let first = tree.add_root(call(0, 10, 1, "main"));
        tree.add_child(first, call(2, 4, 2, "work"));
        let second = tree.add_root(call(20, 26, 1, "main"));

        let mut graph = ThreadGraph::new(7);
        graph.merge_root(&tree, first).unwrap();
        graph.merge_root(&tree, second).unwrap();

        let main = graph.root(&Identifier::symbol("main")).unwrap();
        assert_eq!(main.call_count(), 2);
        assert_eq!(main.total_duration(), 16);
        assert_eq!(main.total_self_time(), 14);
        assert_eq!(main.min_duration(), Some(6));
        assert_eq!(main.max_duration(), Some(10));
        assert_eq!(main.min_self_time(), Some(6));
        assert_eq!(main.max_self_time(), Some(8));
        assert_eq!(main.mean_duration(), Some(8.0));

        let work = main.child(&Identifier::symbol("work")).unwrap();
        assert_eq!(work.depth(), 1);
        assert_eq!(work.call_count(), 1);
    }

    #[test]
    fn test_totals_saturate_instead_of_overflowing() {
        let mut tree = CallTree::new(7);
        let first = tree.add_root(call(0, i64::MAX, 1, "huge"));
        let second = tree.add_root(call(0, i64::MAX, 1, "huge"));

        let mut graph = ThreadGraph::new(7);
        graph.merge_root(&tree, first).unwrap();
        graph.merge_root(&tree, second).unwrap();
        let copy = graph.clone();
        graph.absorb(&copy);

        let huge = graph.root(&Identifier::symbol("huge")).unwrap();
        assert_eq!(huge.call_count(), 4);
        assert_eq!(huge.total_duration(), i64::MAX);
        assert_eq!(huge.total_self_time(), i64::MAX);
        assert_eq!(graph.total_duration(), i64::MAX);
        assert_eq!(graph.total_self_time(), i64::MAX);
    }

    #[test]
    fn test_same_identifier_under_different_parents_stays_distinct() {
        let mut tree = CallTree::new(7);
        let a = tree.add_root(call(0, 10, 1, "a"));
        tree.add_child(a, call(1, 2, 2, "leaf"));
        let b = tree.add_root(call(10, 20, 1, "b"));
        tree.add_child(b, call(11, 15, 2, "leaf"));

        let mut graph = ThreadGraph::new(7);
        graph.merge_tree(&tree).unwrap();

        let under_a = graph.root(&Identifier::symbol("a")).unwrap();
        let under_b = graph.root(&Identifier::symbol("b")).unwrap();
        assert_eq!(under_a.child(&Identifier::symbol("leaf")).unwrap().total_duration(), 1);
        assert_eq!(under_b.child(&Identifier::symbol("leaf")).unwrap().total_duration(), 4);
        assert_eq!(graph.node_count(), 4);
    }

    #[test]
    fn test_thread_mismatch() {
        let mut tree = CallTree::new(3);
        let root = tree.add_root(CallNode::new(0, 1, 1, "x", 3, None).unwrap());
        let mut graph = ThreadGraph::new(4);

        assert_eq!(
            graph.merge_root(&tree, root).unwrap_err(),
            CallGraphError::ThreadMismatch { expected: 4, found: 3 }
        );
        assert!(graph.is_empty());
    }

    #[test]
    fn test_preorder_and_visitor_agree() {
        struct Names(Vec<String>);
        impl AggregateVisitor for Names {
            fn enter(&mut self, node: &AggregateNode) {
                self.0.push(node.identifier().to_string());
            }
        }

        let mut tree = CallTree::new(7);
        let a = tree.add_root(call(0, 10, 1, "a"));
        let b = tree.add_child(a, call(1, 5, 2, "b"));
        tree.add_child(b, call(2, 3, 3, "c"));
        tree.add_child(a, call(6, 8, 2, "d"));
        tree.add_root(call(10, 12, 1, "e"));

        let mut graph = ThreadGraph::new(7);
        graph.merge_tree(&tree).unwrap();

        let mut visitor = Names(Vec::new());
        graph.accept(&mut visitor);
        let iterated: Vec<String> = graph.iter().map(|n| n.identifier().to_string()).collect();

        assert_eq!(visitor.0, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(iterated, visitor.0);
    }

    #[test]
    fn test_absorb_sums_statistics() {
        let mut tree = CallTree::new(7);
        let root = tree.add_root(call(0, 10, 1, "main"));
        tree.add_child(root, call(0, 3, 2, "io"));

        let mut one = ThreadGraph::new(7);
        one.merge_tree(&tree).unwrap();
        let mut combined = ThreadGraph::new(COMBINED_THREAD_ID);
        combined.absorb(&one);
        combined.absorb(&one);

        let main = combined.root(&Identifier::symbol("main")).unwrap();
        assert_eq!(main.call_count(), 2);
        assert_eq!(main.total_self_time(), 14);
        assert_eq!(main.child(&Identifier::symbol("io")).unwrap().call_count(), 2);
        assert_eq!(combined.total_self_time(), combined.total_duration());
    }
}
