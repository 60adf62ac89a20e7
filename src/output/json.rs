//! JSON report output writer.
//!
//! Writes GraphReport structs to JSON files with proper formatting.

use super::prepare_output_path;
use crate::parser::schema::GraphReport;
use crate::utils::error::OutputError;
use log::{debug, info};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

/// Write a report to a JSON file
///
/// **Public** - main entry point for JSON output
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path cannot be created or is invalid
///
/// # Example
/// ```ignore
/// let report = to_report(&analysis, hot_functions);
/// write_report(&report, "report.json")?;
/// ```
pub fn write_report(report: &GraphReport, output_path: impl AsRef<Path>) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing report to: {}", output_path.display());
    prepare_output_path(output_path)?;

    let writer = BufWriter::new(File::create(output_path)?);
    serde_json::to_writer_pretty(writer, report)?;

    info!(
        "Report written successfully ({} threads, {} bytes)",
        report.threads.len(),
        file_size(output_path)
    );
    Ok(())
}

/// Serialize a report to a JSON string
pub fn report_to_string(report: &GraphReport) -> Result<String, OutputError> {
    Ok(serde_json::to_string_pretty(report)?)
}

fn file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Read a report from a JSON file
///
/// **Public** - useful for validation and testing
///
/// # Errors
/// * `OutputError::WriteFailed` - File read error (reusing WriteFailed for I/O)
/// * `OutputError::SerializationFailed` - JSON parse error
pub fn read_report(input_path: impl AsRef<Path>) -> Result<GraphReport, OutputError> {
    let input_path = input_path.as_ref();

    debug!("Reading report from: {}", input_path.display());

    let reader = BufReader::new(File::open(input_path)?);
    let report: GraphReport = serde_json::from_reader(reader)?;

    debug!(
        "Report loaded: version {}, {} threads",
        report.version,
        report.threads.len()
    );
    Ok(report)
}
