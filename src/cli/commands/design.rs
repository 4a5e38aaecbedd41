//! Design command - run the design-tool user simulation

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use crate::{
    cli::output::print_section,
    design::{DEFAULT_STEPS, simulate_user},
};

#[derive(Parser, Debug)]
#[command(about = "Simulate a user of the design tool")]
pub struct DesignArgs {
    /// Belief precision in (0, 1]
    #[arg(long, default_value_t = 1.0)]
    pub precision: f64,

    /// Curiosity bonus in [0, 1]
    #[arg(long, default_value_t = 0.0)]
    pub curiosity: f64,

    /// Weight of the expected-user prior in [0, 1]
    #[arg(long, default_value_t = 0.0)]
    pub prediction: f64,

    /// Number of steps
    #[arg(long, short = 's', default_value_t = DEFAULT_STEPS)]
    pub steps: usize,

    /// Random seed for reproducibility
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write the trace to this JSON file
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,
}

pub fn execute(args: DesignArgs) -> Result<()> {
    let run = simulate_user(
        args.precision,
        args.curiosity,
        args.prediction,
        args.steps,
        args.seed,
    )?;

    print_section("Design Simulation");
    print!("{}", run.summary);

    if let Some(path) = &args.output {
        run.trace.write_json(path)?;
        println!("\nTrace written to {}", path.display());
    }
    Ok(())
}
