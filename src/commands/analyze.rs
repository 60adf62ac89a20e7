//! Analyze command implementation.
//!
//! The analyze command:
//! 1. Reads the interval dump
//! 2. Rebuilds call trees and merges them into per-thread graphs
//! 3. Builds collapsed stacks
//! 4. Calculates hot functions
//! 5. Generates flamegraph
//! 6. Writes output files

use crate::aggregator::{
    analyze_threads, calculate_hot_functions, calculate_time_distribution, collapse_graphs,
    CancellationToken,
};
use crate::flamegraph::{generate_flamegraph, generate_text_summary, FlamegraphConfig};
use crate::output::{write_collapsed_stacks, write_report, write_svg};
use crate::parser::{read_trace_dump, to_report};
use crate::utils::config::{AnalysisConfig, NestingPolicy, DEFAULT_TOP_FUNCTIONS, MAX_TOP_FUNCTIONS};
use anyhow::{Context, Result};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::time::Instant;

/// Arguments for the analyze command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct AnalyzeArgs {
    /// Interval dump to analyze
    pub input: PathBuf,

    /// Output path for JSON report
    pub output_json: PathBuf,

    /// Output path for SVG flamegraph (optional)
    pub output_svg: Option<PathBuf>,

    /// Output path for folded stacks (optional)
    pub output_collapsed: Option<PathBuf>,

    /// Number of hot functions to include in the report
    pub top_functions: usize,

    /// How malformed nesting is handled
    pub nesting: NestingPolicy,

    /// Keep one root frame per thread in stacks and flamegraph
    pub per_thread_roots: bool,

    /// Flamegraph configuration
    pub flamegraph_config: Option<FlamegraphConfig>,

    /// Print text summary to stdout
    pub print_summary: bool,
}

impl Default for AnalyzeArgs {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output_json: PathBuf::from("callgraph.json"),
            output_svg: None,
            output_collapsed: None,
            top_functions: DEFAULT_TOP_FUNCTIONS,
            nesting: NestingPolicy::default(),
            per_thread_roots: false,
            flamegraph_config: None,
            print_summary: false,
        }
    }
}

/// Execute the analyze command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Unreadable or invalid interval dump
/// * Flamegraph rendering failures
/// * File write errors
///
/// Threads that fail to build do not fail the command; they are listed in the
/// report's `failures`.
pub fn execute_analyze(args: AnalyzeArgs) -> Result<()> {
    let start_time = Instant::now();

    info!("Starting analysis of: {}", args.input.display());

    info!("Step 1/6: Reading interval dump...");
    let dump = read_trace_dump(&args.input)
        .with_context(|| format!("Failed to read interval dump {}", args.input.display()))?;
    debug!(
        "Dump holds {} threads, {} intervals",
        dump.threads.len(),
        dump.interval_count()
    );

    info!("Step 2/6: Building call graphs (nesting policy: {:?})...", args.nesting);
    let config = AnalysisConfig::new().with_nesting(args.nesting);
    let analysis = analyze_threads(&dump.threads, config, &CancellationToken::new());

    let skipped: usize = analysis.reports.iter().map(|r| r.skipped).sum();
    let violations: usize = analysis.reports.iter().map(|r| r.nesting_violations).sum();
    if skipped > 0 || violations > 0 {
        warn!(
            "{} intervals skipped, {} nesting violations dropped",
            skipped, violations
        );
    }

    info!("Step 3/6: Building collapsed stacks...");
    let stacks = collapse_graphs(analysis.aggregator.thread_graphs(), args.per_thread_roots);
    let distribution = calculate_time_distribution(&stacks);
    info!("Time distribution: {}", distribution.summary());

    info!("Step 4/6: Calculating top {} hot functions...", args.top_functions);
    let hot_functions =
        calculate_hot_functions(analysis.aggregator.thread_graphs(), args.top_functions);
    for (i, function) in hot_functions.iter().take(3).enumerate() {
        debug!(
            "  {}. {} self {} ({:.1}%)",
            i + 1,
            function.function,
            function.self_time,
            function.self_percentage
        );
    }

    let svg_content = match &args.output_svg {
        Some(_) if stacks.is_empty() => {
            warn!("Step 5/6: No self time recorded, skipping flamegraph");
            None
        }
        Some(_) => {
            info!("Step 5/6: Generating flamegraph...");
            let svg = generate_flamegraph(&stacks, args.flamegraph_config.as_ref())
                .context("Failed to generate flamegraph")?;
            Some(svg)
        }
        None => {
            info!("Step 5/6: Skipping flamegraph generation (not requested)");
            None
        }
    };

    info!("Step 6/6: Writing output files...");
    let summary = args
        .print_summary
        .then(|| generate_text_summary(&hot_functions, &distribution, 10));
    let report = to_report(&analysis, hot_functions);

    write_report(&report, &args.output_json).context("Failed to write report JSON")?;
    info!("✓ Report written to: {}", args.output_json.display());

    if let (Some(svg), Some(svg_path)) = (svg_content, &args.output_svg) {
        write_svg(&svg, svg_path).context("Failed to write flamegraph SVG")?;
        info!("✓ Flamegraph written to: {}", svg_path.display());
    }

    if let Some(collapsed_path) = &args.output_collapsed {
        write_collapsed_stacks(&stacks, collapsed_path)
            .context("Failed to write collapsed stacks")?;
        info!("✓ Collapsed stacks written to: {}", collapsed_path.display());
    }

    if let Some(summary) = summary {
        println!("\n{}", "=".repeat(80));
        println!("CALL GRAPH SUMMARY");
        println!("{}", "=".repeat(80));
        println!("Input:         {}", args.input.display());
        println!("Threads:       {}", report.threads.len());
        println!("Failed:        {}", report.failures.len());
        println!("Unique Stacks: {}", stacks.len());
        println!("\n{}", summary);
        println!("{}", "=".repeat(80));
    }

    info!(
        "Analysis completed in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Validate analyze arguments
///
/// **Public** - can be called before execute_analyze for early validation
pub fn validate_args(args: &AnalyzeArgs) -> Result<()> {
    if args.input.as_os_str().is_empty() {
        anyhow::bail!("Input path cannot be empty");
    }

    if !args.input.is_file() {
        anyhow::bail!("Input file not found: {}", args.input.display());
    }

    if args.top_functions == 0 {
        anyhow::bail!("top must be greater than 0");
    }

    if args.top_functions > MAX_TOP_FUNCTIONS {
        anyhow::bail!("top is too large (max {})", MAX_TOP_FUNCTIONS);
    }

    if let Some(config) = &args.flamegraph_config {
        if config.width == 0 {
            anyhow::bail!("Flamegraph width must be greater than 0");
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn args_for(input: &NamedTempFile) -> AnalyzeArgs {
        AnalyzeArgs {
            input: input.path().to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validate_args_valid() {
        let input = NamedTempFile::new().unwrap();
        assert!(validate_args(&args_for(&input)).is_ok());
    }

    #[test]
    fn test_validate_args_empty_input() {
        assert!(validate_args(&AnalyzeArgs::default()).is_err());
    }

    #[test]
    fn test_validate_args_missing_input() {
        let args = AnalyzeArgs {
            input: PathBuf::from("/definitely/not/here.json"),
            ..Default::default()
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_top_zero() {
        let input = NamedTempFile::new().unwrap();
        let args = AnalyzeArgs {
            top_functions: 0,
            ..args_for(&input)
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_top_too_large() {
        let input = NamedTempFile::new().unwrap();
        let args = AnalyzeArgs {
            top_functions: MAX_TOP_FUNCTIONS + 1,
            ..args_for(&input)
        };
        assert!(validate_args(&args).is_err());
    }

    #[test]
    fn test_validate_args_zero_width() {
        let input = NamedTempFile::new().unwrap();
        let args = AnalyzeArgs {
            flamegraph_config: Some(FlamegraphConfig::new().with_width(0)),
            ..args_for(&input)
        };
        assert!(validate_args(&args).is_err());
    }
}
