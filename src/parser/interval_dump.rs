//! Reader for interval dumps.
//!
//! An interval dump is the JSON export of the state history: for every
//! thread, the intervals recorded at each call-stack depth. Two layouts are
//! accepted, an object with a `threads` array or the bare array itself.

use crate::builder::ThreadIntervals;
use crate::utils::config::FIRST_DEPTH;
use crate::utils::error::ParseError;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Every thread of a trace
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TraceDump {
    #[serde(default)]
    pub threads: Vec<ThreadIntervals>,
}

impl TraceDump {
    pub fn interval_count(&self) -> usize {
        self.threads.iter().map(ThreadIntervals::interval_count).sum()
    }
}

/// Parse an interval dump from JSON text
///
/// **Public** - main entry point for parsing
///
/// # Errors
/// * `ParseError::JsonError` - Invalid JSON structure
/// * `ParseError::InvalidFormat` - Dump violates the interval contract
pub fn parse_trace_dump(json: &str) -> Result<TraceDump, ParseError> {
    let raw: serde_json::Value = serde_json::from_str(json)?;
    from_value(raw)
}

/// Read and parse an interval dump file
pub fn read_trace_dump(path: impl AsRef<Path>) -> Result<TraceDump, ParseError> {
    let path = path.as_ref();
    debug!("Reading interval dump from: {}", path.display());

    let reader = BufReader::new(File::open(path)?);
    let raw: serde_json::Value = serde_json::from_reader(reader)?;
    from_value(raw)
}

fn from_value(raw: serde_json::Value) -> Result<TraceDump, ParseError> {
    let dump = match raw {
        serde_json::Value::Object(_) => serde_json::from_value::<TraceDump>(raw)?,
        serde_json::Value::Array(_) => {
            debug!("Dump is a bare thread array");
            TraceDump {
                threads: serde_json::from_value(raw)?,
            }
        }
        _ => {
            return Err(ParseError::InvalidFormat(
                "Dump must be a JSON object or array".to_string(),
            ))
        }
    };

    validate_trace_dump(&dump)?;
    debug!(
        "Parsed {} threads, {} intervals",
        dump.threads.len(),
        dump.interval_count()
    );
    Ok(dump)
}

/// Check the structural contract the call-tree builder relies on
///
/// Intervals with `end < start` are only logged: the builder refuses them one
/// by one without losing the rest of the thread.
pub fn validate_trace_dump(dump: &TraceDump) -> Result<(), ParseError> {
    let mut seen = HashSet::new();

    for thread in &dump.threads {
        if !seen.insert(thread.thread_id) {
            return Err(ParseError::InvalidFormat(format!(
                "Thread {} appears more than once",
                thread.thread_id
            )));
        }

        for (&depth, intervals) in &thread.depths {
            if depth < FIRST_DEPTH {
                return Err(ParseError::InvalidFormat(format!(
                    "Thread {}: depth {} is below the outermost depth {}",
                    thread.thread_id, depth, FIRST_DEPTH
                )));
            }

            if let Some(pair) = intervals.windows(2).find(|w| w[1].start < w[0].start) {
                return Err(ParseError::InvalidFormat(format!(
                    "Thread {}: intervals at depth {} are not sorted ({} after {})",
                    thread.thread_id, depth, pair[1].start, pair[0].start
                )));
            }

            for interval in intervals.iter().filter(|iv| iv.end < iv.start) {
                warn!(
                    "Thread {}: interval [{}, {}) at depth {} ends before it starts",
                    thread.thread_id, interval.start, interval.end, depth
                );
            }
        }
    }

    Ok(())
}
