//! Concrete call records and the per-thread arena that owns them.
//!
//! A [`CallNode`] is one stack frame instance: a time range, a depth and the
//! call site that was active. Nodes live in a [`CallTree`]; children are owned
//! through the tree and `parent` is a plain index back into it, so there is
//! never a reference cycle.

use super::identifier::{Identifier, RawValue};
use crate::utils::error::CallGraphError;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Handle to a node inside the [`CallTree`] that issued it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A single invocation of a call site
#[derive(Debug, Clone)]
pub struct CallNode {
    start: i64,
    end: i64,
    depth: i32,
    identifier: Identifier,
    thread_id: i32,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    self_time: i64,
}

impl CallNode {
    /// Create a call record
    ///
    /// # Errors
    /// * `CallGraphError::InvalidRange` - `end` is before `start`
    /// * `CallGraphError::DurationOverflow` - `end - start` does not fit in an `i64`
    /// * `CallGraphError::UnsupportedIdentifierType` - the value is neither an integer nor a string
    pub fn new(
        start: i64,
        end: i64,
        depth: i32,
        raw_value: impl Into<RawValue>,
        thread_id: i32,
        parent: Option<NodeId>,
    ) -> Result<Self, CallGraphError> {
        if end < start {
            return Err(CallGraphError::InvalidRange { start, end });
        }
        let duration = end
            .checked_sub(start)
            .ok_or(CallGraphError::DurationOverflow { start, end })?;
        let identifier = Identifier::try_from(raw_value.into())?;

        Ok(Self {
            start,
            end,
            depth,
            identifier,
            thread_id,
            parent,
            children: Vec::new(),
            self_time: duration,
        })
    }

    pub fn start(&self) -> i64 {
        self.start
    }

    pub fn end(&self) -> i64 {
        self.end
    }

    pub fn duration(&self) -> i64 {
        // cannot overflow: `new` rejects ranges wider than i64::MAX
        self.end.wrapping_sub(self.start)
    }

    /// Time spent in this call excluding its children
    pub fn self_time(&self) -> i64 {
        self.self_time
    }

    pub fn depth(&self) -> i32 {
        self.depth
    }

    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    pub fn thread_id(&self) -> i32 {
        self.thread_id
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Order by start time
    ///
    /// Comparing against an absent call is an error rather than sorting first or last.
    pub fn compare(&self, other: Option<&CallNode>) -> Result<Ordering, CallGraphError> {
        let other = other.ok_or(CallGraphError::NullComparison)?;
        Ok(self.start.cmp(&other.start))
    }

    fn key(&self) -> (i64, i64, i32, &Identifier, i32) {
        (self.start, self.end, self.depth, &self.identifier, self.thread_id)
    }
}

impl PartialEq for CallNode {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for CallNode {}

impl Hash for CallNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Display for CallNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {}] Duration: {}, Self Time: {}",
            self.start,
            self.end,
            self.duration(),
            self.self_time
        )
    }
}

/// Arena holding the call forest of one thread
#[derive(Debug, Clone, Default)]
pub struct CallTree {
    thread_id: i32,
    nodes: Vec<CallNode>,
    roots: Vec<NodeId>,
}

impl CallTree {
    pub fn new(thread_id: i32) -> Self {
        Self {
            thread_id,
            nodes: Vec::new(),
            roots: Vec::new(),
        }
    }

    pub fn thread_id(&self) -> i32 {
        self.thread_id
    }

    /// Take ownership of a top-level call
    pub fn add_root(&mut self, mut node: CallNode) -> NodeId {
        node.parent = None;
        let id = self.push(node);
        self.roots.push(id);
        id
    }

    /// Attach `child` under `parent`
    ///
    /// The parent's self time shrinks by the child's duration. Children of one
    /// parent are expected in chronological order.
    ///
    /// # Panics
    /// If `parent` was issued by another tree.
    pub fn add_child(&mut self, parent: NodeId, mut child: CallNode) -> NodeId {
        child.parent = Some(parent);
        let duration = child.duration();
        let id = self.push(child);

        let parent_node = &mut self.nodes[parent.0];
        parent_node.children.push(id);
        parent_node.self_time = parent_node.self_time.saturating_sub(duration);
        id
    }

    fn push(&mut self, node: CallNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&CallNode> {
        self.nodes.get(id.0)
    }

    /// # Panics
    /// If `id` was issued by another tree.
    pub fn node(&self, id: NodeId) -> &CallNode {
        &self.nodes[id.0]
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn root_nodes(&self) -> impl Iterator<Item = &CallNode> + '_ {
        self.roots.iter().map(move |id| self.node(*id))
    }

    pub fn children_of(&self, id: NodeId) -> impl Iterator<Item = &CallNode> + '_ {
        self.node(id).children.iter().map(move |c| self.node(*c))
    }

    pub fn parent_of(&self, id: NodeId) -> Option<&CallNode> {
        self.node(id).parent.map(|p| self.node(p))
    }

    /// All nodes, in creation order
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &CallNode)> + '_ {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
