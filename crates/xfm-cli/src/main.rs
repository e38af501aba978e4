//! xfm - lazy spatial transform planner
//!
//! Reads a YAML pipeline, predicts the shape after every operation and shows
//! how the pending operations collapse into resampling passes.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod pipeline;

#[derive(Parser)]
#[command(name = "xfm")]
#[command(author, version, about = "Lazy spatial transform planner")]
#[command(long_about = "
Plans chains of spatial transforms on channel-first images without touching
pixels. Every operation is turned into a homogeneous matrix or sampling grid,
shapes are predicted along the chain, and consecutive matrices are composed
into a single resampling pass.

Examples:
  xfm plan pipeline.yaml                # Shapes and resampling passes
  xfm plan pipeline.yaml --matrices     # Also print composed matrices
  xfm plan pipeline.yaml --seed 7       # Override the elastic seed
  xfm ops                               # List operations and their keys
")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Number of threads (0 = auto)
    #[arg(short = 'j', long, global = true, default_value = "0")]
    threads: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Predict shapes and resampling passes for a pipeline file
    #[command(visible_alias = "p")]
    Plan(PlanArgs),

    /// List supported operations
    Ops,
}

#[derive(Args)]
struct PlanArgs {
    /// Pipeline file (YAML)
    input: PathBuf,

    /// Print the composed matrix of every pass
    #[arg(short, long)]
    matrices: bool,

    /// Seed for elastic offsets, overrides the file
    #[arg(long)]
    seed: Option<u64>,
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Configure thread pool
    if cli.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(cli.threads)
            .build_global()
            .context("Failed to configure thread pool")?;
    }

    match cli.command {
        Commands::Plan(args) => commands::plan::run(args, cli.verbose),
        Commands::Ops => commands::ops::run(cli.verbose),
    }
}
