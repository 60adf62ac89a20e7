//! Validate, schema and version commands.

use crate::output::read_report;
use crate::parser::read_trace_dump;
use crate::utils::config::SCHEMA_VERSION;
use anyhow::{Context, Result};
use std::path::Path;

/// Validate an interval dump file
pub fn validate_dump_file(file_path: &Path) -> Result<()> {
    println!("Validating interval dump: {}", file_path.display());

    let dump = read_trace_dump(file_path)
        .with_context(|| format!("Invalid interval dump {}", file_path.display()))?;

    println!("✓ Valid interval dump");
    println!("  Threads: {}", dump.threads.len());
    println!("  Intervals: {}", dump.interval_count());
    for thread in &dump.threads {
        println!(
            "  - thread {} (process {}): {} depths, {} intervals",
            thread.thread_id,
            thread.process_id,
            thread.max_depth(),
            thread.interval_count()
        );
    }

    Ok(())
}

/// Validate a report JSON file written by `analyze`
pub fn validate_report_file(file_path: &Path) -> Result<()> {
    println!("Validating report: {}", file_path.display());

    let report = read_report(file_path)
        .with_context(|| format!("Invalid report {}", file_path.display()))?;

    if report.version != SCHEMA_VERSION {
        anyhow::bail!(
            "Report schema v{} does not match supported v{}",
            report.version,
            SCHEMA_VERSION
        );
    }

    println!("✓ Valid report JSON");
    println!("  Version: {}", report.version);
    println!("  Generated: {}", report.generated_at);
    println!("  Threads: {}", report.threads.len());
    println!("  Failed Threads: {}", report.failures.len());
    println!("  Hot Functions: {}", report.hot_functions.len());

    Ok(())
}

/// Display schema information
pub fn display_schema(show_details: bool) {
    println!("Call Graph Report Schema");
    println!("Current Version: {}", SCHEMA_VERSION);
    println!();

    if show_details {
        println!("Schema Structure:");
        println!("  version: string            - Schema version (e.g., '1.0.0')");
        println!("  generated_at: string       - RFC 3339 timestamp");
        println!("  threads: array             - One aggregated graph per thread");
        println!("    process_id: number       - Owning process (-1 if unknown)");
        println!("    thread_id: number        - Thread id");
        println!("    name: string?            - Thread name");
        println!("    total_calls: number      - Calls merged into the graph");
        println!("    total_duration: number   - Inclusive time of the roots");
        println!("    roots: array             - Aggregated call sites");
        println!("      function: string       - Display name of the identifier");
        println!("      identifier: num|string - Call-site identifier");
        println!("      depth: number          - 0 for roots");
        println!("      calls: number          - Invocations merged");
        println!("      total_duration: number - Sum of durations");
        println!("      self_time: number      - Sum of self times");
        println!("      min/max/mean_duration  - Duration statistics");
        println!("      min/max_self_time      - Self time statistics");
        println!("      children: array        - Nested call sites");
        println!("  failures: array            - Threads that could not be built");
        println!("  hot_functions: array       - Flat profile by self time");
    } else {
        println!("Use --show for detailed schema information");
    }
}

/// Display version information
pub fn display_version() {
    println!("Call Graph Studio v{}", env!("CARGO_PKG_VERSION"));
    println!("Report Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Rebuilds call trees from per-depth state intervals and");
    println!("aggregates them into call graphs and flamegraphs.");
}
