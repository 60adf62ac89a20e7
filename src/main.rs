//! Call Graph Studio CLI
//!
//! Rebuilds call trees from per-depth state intervals and aggregates them
//! into per-thread call graphs, reports and flamegraphs.

use anyhow::Result;
use callgraph_studio::commands::{
    display_schema, display_version, execute_analyze, validate_args, validate_dump_file,
    validate_report_file, AnalyzeArgs,
};
use callgraph_studio::flamegraph::FlamegraphConfig;
use callgraph_studio::utils::config::{
    NestingPolicy, DEFAULT_COUNT_NAME, DEFAULT_FLAMEGRAPH_WIDTH, DEFAULT_TOP_FUNCTIONS,
};
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::PathBuf;

/// Call Graph Studio - call-graph analysis of state-interval traces
#[derive(Parser, Debug)]
#[command(name = "callgraph")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Build call graphs from an interval dump
    Analyze {
        /// Interval dump (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output path for JSON report
        #[arg(short, long, default_value = "callgraph.json")]
        output: PathBuf,

        /// Output path for SVG flamegraph (optional)
        #[arg(short, long)]
        flamegraph: Option<PathBuf>,

        /// Output path for folded stacks (optional)
        #[arg(long)]
        collapsed: Option<PathBuf>,

        /// Number of hot functions to include
        #[arg(long, default_value_t = DEFAULT_TOP_FUNCTIONS)]
        top: usize,

        /// Handling of calls that do not nest inside their caller
        #[arg(long, value_enum, env = "CALLGRAPH_NESTING", default_value_t = NestingPolicy::Drop)]
        nesting: NestingPolicy,

        /// Keep one root frame per thread in stacks and flamegraph
        #[arg(long)]
        per_thread_roots: bool,

        /// Flamegraph title
        #[arg(long)]
        title: Option<String>,

        /// Flamegraph width in pixels
        #[arg(long, default_value_t = DEFAULT_FLAMEGRAPH_WIDTH)]
        width: usize,

        /// Time unit shown in flamegraph tooltips
        #[arg(long, default_value = DEFAULT_COUNT_NAME)]
        unit: String,

        /// Draw the flamegraph as an icicle graph
        #[arg(long)]
        inverted: bool,

        /// Print text summary to stdout
        #[arg(long)]
        summary: bool,
    },

    /// Validate an interval dump or a report
    Validate {
        /// Path to the JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Treat the file as a report written by `analyze`
        #[arg(long)]
        report: bool,
    },

    /// Display schema information
    Schema {
        /// Show full schema details
        #[arg(long)]
        show: bool,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Analyze {
            input,
            output,
            flamegraph,
            collapsed,
            top,
            nesting,
            per_thread_roots,
            title,
            width,
            unit,
            inverted,
            summary,
        } => {
            let fg_config = flamegraph.as_ref().map(|_| {
                let mut config = FlamegraphConfig::new()
                    .with_width(width)
                    .with_count_name(unit)
                    .with_inverted(inverted);
                if let Some(title) = title {
                    config = config.with_title(title);
                }
                config
            });

            let args = AnalyzeArgs {
                input,
                output_json: output,
                output_svg: flamegraph,
                output_collapsed: collapsed,
                top_functions: top,
                nesting,
                per_thread_roots,
                flamegraph_config: fg_config,
                print_summary: summary,
            };

            validate_args(&args)?;
            execute_analyze(args)?;
        }

        Commands::Validate { file, report } => {
            if report {
                validate_report_file(&file)?;
            } else {
                validate_dump_file(&file)?;
            }
        }

        Commands::Schema { show } => {
            display_schema(show);
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
