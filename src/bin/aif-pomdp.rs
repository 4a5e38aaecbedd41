//! aif-pomdp CLI - discrete POMDP active inference simulations
//!
//! This CLI provides:
//! - Multi-agent simulations from presets or scenario files
//! - The design-tool user simulation
//! - CSV/JSON/JSONL trace export

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "aif-pomdp")]
#[command(version, about = "Active inference agents in discrete POMDPs", long_about = None)]
struct Cli {
    /// Log debug events (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a multi-agent simulation
    Simulate(aif_pomdp::cli::commands::simulate::SimulateArgs),

    /// Simulate a design-tool user from precision, curiosity and prediction
    Design(aif_pomdp::cli::commands::design::DesignArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    aif_pomdp::cli::init_logging(cli.verbose);

    match cli.command {
        Commands::Simulate(args) => aif_pomdp::cli::commands::simulate::execute(args),
        Commands::Design(args) => aif_pomdp::cli::commands::design::execute(args),
    }
}
