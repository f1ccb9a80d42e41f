//! plandiff command-line interface.
//!
//! Loads a plan and the provider schemas it was made against, diffs every
//! change and prints the result. Exits 0 when nothing changes, 1 when
//! something does and 2 on error.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use plandiff_rs::{
    diff_plan, format_diff, logging, parse_plan_file, parse_schemas_file, OutputFormat,
    OutputOptions, PlanDiffConfig,
};
use std::path::PathBuf;
use std::process;
use tracing::debug;

/// plandiff - Structured before/after diffs of infrastructure plans
///
/// Renders each resource and output of a JSON plan before and after the
/// change and shows the difference as a unified diff.
#[derive(Parser)]
#[command(name = "plandiff")]
#[command(version)]
#[command(about = "Structured before/after diffs of infrastructure plans", long_about = None)]
struct Cli {
    /// Plan JSON file
    #[arg(value_name = "PLAN")]
    plan: PathBuf,

    /// Provider schemas JSON file
    #[arg(value_name = "SCHEMAS")]
    schemas: PathBuf,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "terminal")]
    format: OutputFormatArg,

    /// Unchanged lines shown around each change
    #[arg(short = 'c', long, default_value = "3")]
    context: usize,

    /// Stop at the first resource that cannot be diffed
    #[arg(long)]
    fail_fast: bool,

    /// Also show resources and outputs with no planned changes
    #[arg(long)]
    include_no_op: bool,

    /// Suppress the summary line
    #[arg(long)]
    no_summary: bool,

    /// Verbose logging on stderr
    #[arg(short, long)]
    verbose: bool,
}

/// Output format argument for clap
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum OutputFormatArg {
    /// Colored terminal output
    Terminal,
    /// JSON report
    Json,
    /// Plain text (no colors)
    Plain,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Terminal => OutputFormat::Terminal,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Plain => OutputFormat::Plain,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(cli) {
        Ok(exit_code) => process::exit(exit_code),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            process::exit(2);
        }
    }
}

fn run(cli: Cli) -> Result<i32> {
    debug!(path = %cli.plan.display(), "parsing plan");
    let plan = parse_plan_file(&cli.plan)
        .with_context(|| format!("Failed to load plan: {}", cli.plan.display()))?;

    debug!(path = %cli.schemas.display(), "parsing provider schemas");
    let schemas = parse_schemas_file(&cli.schemas)
        .with_context(|| format!("Failed to load provider schemas: {}", cli.schemas.display()))?;

    let config = PlanDiffConfig {
        context_radius: cli.context,
        fail_fast: cli.fail_fast,
        include_no_op: cli.include_no_op,
    };
    let diff = diff_plan(&plan, &schemas, &config).context("Failed to diff plan")?;

    let options = OutputOptions {
        color: std::env::var_os("NO_COLOR").is_none(),
        show_summary: !cli.no_summary,
    };
    let output_format: OutputFormat = cli.format.into();
    let output = format_diff(&diff, &output_format, &options).context("Failed to format diff output")?;
    println!("{}", output);

    if diff.has_changes() {
        Ok(1)
    } else {
        Ok(0)
    }
}
