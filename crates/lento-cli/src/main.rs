//! Lento CLI - Command-line interface for the lento smoothing engine.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "lento")]
#[command(author, version, about = "Lento parameter smoothing CLI", long_about = None)]
struct Cli {
    /// Log engine lifecycle at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a scenario file through the engine
    Render(commands::render::RenderArgs),

    /// Validate and lint scenario or settings files
    Check(commands::check::CheckArgs),

    /// Inspect the slowness-to-slope model
    Slope(commands::slope::SlopeArgs),

    /// Create and inspect persisted state files
    State(commands::state::StateArgs),
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Render(args) => commands::render::run(args),
        Commands::Check(args) => commands::check::run(args),
        Commands::Slope(args) => commands::slope::run(args),
        Commands::State(args) => commands::state::run(args),
    }
}
