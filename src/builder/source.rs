//! Per-depth interval sequences consumed by the call-tree builder.
//!
//! The history store that records these sequences is an external
//! collaborator; [`IntervalSource`] is the seam, and [`ThreadIntervals`] is
//! the in-memory form read from interval dumps.

use crate::model::RawValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One state interval `[start, end)` at a given stack depth
///
/// `value` is `None` when no call was active at that depth.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub start: i64,
    pub end: i64,
    #[serde(default)]
    pub value: Option<RawValue>,
}

impl Interval {
    pub fn new(start: i64, end: i64, value: Option<RawValue>) -> Self {
        Self { start, end, value }
    }

    pub fn is_gap(&self) -> bool {
        self.value.is_none()
    }
}

/// Access to the depth-indexed intervals of one thread
///
/// Each depth yields intervals ordered by start time, non-overlapping, with
/// gaps present as `None` intervals. Depth 1 is the outermost call level.
pub trait IntervalSource {
    fn thread_id(&self) -> i32;

    /// Intervals recorded at `depth`, or `None` if nothing was recorded there
    fn intervals(&self, depth: u32) -> Option<&[Interval]>;

    /// Deepest depth holding any interval; 0 when the thread is empty
    fn max_depth(&self) -> u32;
}

/// All intervals recorded for one thread
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreadIntervals {
    #[serde(default = "unknown_process")]
    pub process_id: i32,

    pub thread_id: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default)]
    pub depths: BTreeMap<u32, Vec<Interval>>,
}

fn unknown_process() -> i32 {
    -1
}

impl ThreadIntervals {
    pub fn new(process_id: i32, thread_id: i32) -> Self {
        Self {
            process_id,
            thread_id,
            name: None,
            depths: BTreeMap::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Append an active call at `depth`
    pub fn call(mut self, depth: u32, start: i64, end: i64, value: impl Into<RawValue>) -> Self {
        self.depths
            .entry(depth)
            .or_default()
            .push(Interval::new(start, end, Some(value.into())));
        self
    }

    /// Append a gap at `depth`
    pub fn gap(mut self, depth: u32, start: i64, end: i64) -> Self {
        self.depths
            .entry(depth)
            .or_default()
            .push(Interval::new(start, end, None));
        self
    }

    pub fn max_depth(&self) -> u32 {
        self.depths.keys().next_back().copied().unwrap_or(0)
    }

    pub fn interval_count(&self) -> usize {
        self.depths.values().map(Vec::len).sum()
    }
}

impl IntervalSource for ThreadIntervals {
    fn thread_id(&self) -> i32 {
        self.thread_id
    }

    fn intervals(&self, depth: u32) -> Option<&[Interval]> {
        self.depths.get(&depth).map(Vec::as_slice)
    }

    fn max_depth(&self) -> u32 {
        ThreadIntervals::max_depth(self)
    }
}
