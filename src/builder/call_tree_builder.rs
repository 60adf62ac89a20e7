//! Rebuild nested call trees from per-depth interval sequences.
//!
//! The interval store flattens a thread's call stack into one sequence per
//! depth. Rebuilding walks depth 1, and for every active call recurses into
//! the next depth restricted to that call's time window:
//!
//! ```text
//! depth 1:  [op1 ............)    [op4 ........)
//! depth 2:     [op2 .....)
//! depth 3:        [op3)
//! ```
//!
//! Intervals that do not fit inside their caller are handled according to
//! [`NestingPolicy`].

use super::source::{Interval, IntervalSource};
use crate::model::{CallNode, CallTree, NodeId};
use crate::utils::config::{AnalysisConfig, NestingPolicy, FIRST_DEPTH};
use crate::utils::error::CallGraphError;
use log::{debug, warn};
use serde::Serialize;
use std::collections::HashSet;
use std::ops::ControlFlow;

/// Half-open time range `[start, end)` a level is restricted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TimeWindow {
    start: i64,
    end: i64,
}

impl TimeWindow {
    const UNBOUNDED: TimeWindow = TimeWindow {
        start: i64::MIN,
        end: i64::MAX,
    };

    fn of(node: &CallNode) -> Self {
        Self {
            start: node.start(),
            end: node.end(),
        }
    }

    fn of_interval(interval: &Interval) -> Self {
        Self {
            start: interval.start,
            end: interval.end,
        }
    }

    /// A zero-length interval at the window's end belongs to whatever follows,
    /// unless the window itself is zero-length
    fn contains(&self, interval: &Interval) -> bool {
        interval.start >= self.start
            && interval.end <= self.end
            && (interval.start < self.end || self.start == self.end)
    }

    fn overlaps(&self, interval: &Interval) -> bool {
        interval.start < self.end && interval.end > self.start
    }
}

/// Counters collected while rebuilding one thread
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub thread_id: i32,

    /// Top-level calls produced
    pub roots: usize,

    /// Calls produced at every depth
    pub calls: usize,

    /// Intervals refused by the call constructor
    pub skipped: usize,

    /// Intervals excluded because they did not nest inside a caller, each counted once
    pub nesting_violations: usize,
}

/// Rebuilds the call forest of one thread
pub struct CallTreeBuilder<'a, S: IntervalSource + ?Sized> {
    source: &'a S,
    config: AnalysisConfig,
    report: BuildReport,
    /// `(depth, start, end)` of intervals already reported as misnested
    misnested: HashSet<(u32, i64, i64)>,
}

impl<'a, S: IntervalSource + ?Sized> CallTreeBuilder<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            config: AnalysisConfig::default(),
            report: BuildReport {
                thread_id: source.thread_id(),
                ..BuildReport::default()
            },
            misnested: HashSet::new(),
        }
    }

    pub fn with_config(mut self, config: AnalysisConfig) -> Self {
        self.config = config;
        self
    }

    /// Rebuild the whole forest into a single tree
    ///
    /// # Errors
    /// * `CallGraphError::MalformedNesting` - only under `NestingPolicy::Reject`
    pub fn build(mut self) -> Result<(CallTree, BuildReport), CallGraphError> {
        let thread_id = self.source.thread_id();
        debug!("Rebuilding call tree for thread {}", thread_id);

        let mut tree = CallTree::new(thread_id);
        for interval in self.select(FIRST_DEPTH, TimeWindow::UNBOUNDED)? {
            let Some(node) = self.make_node(FIRST_DEPTH, interval, None) else {
                continue;
            };
            let window = TimeWindow::of(&node);
            let root = tree.add_root(node);
            self.attach_children(&mut tree, root, FIRST_DEPTH + 1, window)?;
            self.report.roots += 1;
        }

        debug!(
            "Thread {}: {} roots, {} calls, {} skipped",
            thread_id, self.report.roots, self.report.calls, self.report.skipped
        );
        Ok((tree, self.report))
    }

    /// Rebuild root by root, handing each finished subtree to `on_root`
    ///
    /// Every root gets a fresh tree, so memory stays bounded by the largest
    /// subtree. Returning `ControlFlow::Break` from `on_root` stops the scan.
    pub fn build_streaming<F>(mut self, mut on_root: F) -> Result<BuildReport, CallGraphError>
    where
        F: FnMut(&CallTree, NodeId) -> ControlFlow<()>,
    {
        let thread_id = self.source.thread_id();

        for interval in self.select(FIRST_DEPTH, TimeWindow::UNBOUNDED)? {
            let Some(node) = self.make_node(FIRST_DEPTH, interval, None) else {
                continue;
            };
            let window = TimeWindow::of(&node);
            let mut tree = CallTree::new(thread_id);
            let root = tree.add_root(node);
            self.attach_children(&mut tree, root, FIRST_DEPTH + 1, window)?;
            self.report.roots += 1;

            if on_root(&tree, root).is_break() {
                debug!("Thread {}: stream stopped after {} roots", thread_id, self.report.roots);
                break;
            }
        }

        Ok(self.report)
    }

    fn attach_children(
        &mut self,
        tree: &mut CallTree,
        parent: NodeId,
        depth: u32,
        window: TimeWindow,
    ) -> Result<(), CallGraphError> {
        for interval in self.select(depth, window)? {
            let Some(node) = self.make_node(depth, interval, Some(parent)) else {
                continue;
            };
            let child_window = TimeWindow::of(&node);
            let child = tree.add_child(parent, node);
            if let Some(next) = depth.checked_add(1) {
                self.attach_children(tree, child, next, child_window)?;
            }
        }
        Ok(())
    }

    /// Active intervals at `depth` that lie inside `window`, in time order
    fn select(&mut self, depth: u32, window: TimeWindow) -> Result<Vec<&'a Interval>, CallGraphError> {
        let source = self.source;
        let Some(intervals) = source.intervals(depth) else {
            self.check_uncovered(depth, window, &[])?;
            return Ok(Vec::new());
        };

        // `<=` keeps zero-length intervals sitting at the end of the window
        let lo = intervals.partition_point(|iv| iv.end < window.start);
        let hi = intervals.partition_point(|iv| iv.start <= window.end);
        let candidates = intervals.get(lo..hi).unwrap_or_default();

        let mut selected = Vec::with_capacity(candidates.len());
        let mut previous_end = i64::MIN;
        for interval in candidates.iter().filter(|iv| !iv.is_gap()) {
            if window.contains(interval) && interval.start >= previous_end {
                selected.push(interval);
            } else if window.overlaps(interval) || window.contains(interval) {
                self.nesting_violation(depth, interval)?;
            }
            previous_end = previous_end.max(interval.end);
        }

        self.check_uncovered(depth, window, &selected)?;
        Ok(selected)
    }

    /// Active calls below `depth` in a part of `window` that no selected call covers
    ///
    /// Such calls have no caller at `depth`, whether that time is an explicit gap
    /// or was never recorded. Every deeper depth is scanned, not only the next one.
    fn check_uncovered(
        &mut self,
        depth: u32,
        window: TimeWindow,
        selected: &[&'a Interval],
    ) -> Result<(), CallGraphError> {
        let source = self.source;
        let max_depth = source.max_depth();
        if depth >= max_depth {
            return Ok(());
        }

        let mut spans = Vec::with_capacity(selected.len() + 1);
        let mut cursor = window.start;
        for call in selected {
            spans.push(TimeWindow {
                start: cursor,
                end: call.start,
            });
            cursor = cursor.max(call.end);
        }
        spans.push(TimeWindow {
            start: cursor,
            end: window.end,
        });

        for span in spans.into_iter().filter(|span| span.start < span.end) {
            for deeper in depth + 1..=max_depth {
                let Some(intervals) = source.intervals(deeper) else {
                    continue;
                };
                let lo = intervals.partition_point(|iv| iv.end < span.start);
                let orphans = intervals[lo..]
                    .iter()
                    .take_while(|iv| iv.start < span.end)
                    .filter(|iv| !iv.is_gap())
                    .filter(|iv| iv.end > span.start || iv.start >= span.start)
                    .filter(|iv| {
                        !selected
                            .iter()
                            .any(|call| TimeWindow::of_interval(call).contains(iv))
                    });
                for orphan in orphans {
                    self.nesting_violation(deeper, orphan)?;
                }
            }
        }
        Ok(())
    }

    fn nesting_violation(&mut self, depth: u32, interval: &Interval) -> Result<(), CallGraphError> {
        if !self.misnested.insert((depth, interval.start, interval.end)) {
            return Ok(());
        }

        let thread_id = self.source.thread_id();
        match self.config.nesting {
            NestingPolicy::Drop => {
                warn!(
                    "Thread {}: dropping interval [{}, {}) at depth {}, not nested in a caller",
                    thread_id, interval.start, interval.end, depth
                );
                self.report.nesting_violations += 1;
                Ok(())
            }
            NestingPolicy::Reject => Err(CallGraphError::MalformedNesting {
                thread_id,
                depth,
                start: interval.start,
                end: interval.end,
            }),
        }
    }

    fn make_node(&mut self, depth: u32, interval: &Interval, parent: Option<NodeId>) -> Option<CallNode> {
        let value = interval.value.clone()?;
        let thread_id = self.source.thread_id();
        let node_depth = i32::try_from(depth).unwrap_or(i32::MAX);

        match CallNode::new(interval.start, interval.end, node_depth, value, thread_id, parent) {
            Ok(node) => {
                self.report.calls += 1;
                Some(node)
            }
            Err(e) => {
                warn!(
                    "Thread {}: skipping interval [{}, {}) at depth {}: {}",
                    thread_id, interval.start, interval.end, depth, e
                );
                self.report.skipped += 1;
                None
            }
        }
    }
}

/// Rebuild the call forest of one thread
///
/// **Public** - main entry point for reconstruction
pub fn build_call_tree<S: IntervalSource + ?Sized>(
    source: &S,
    config: AnalysisConfig,
) -> Result<(CallTree, BuildReport), CallGraphError> {
    CallTreeBuilder::new(source).with_config(config).build()
}
