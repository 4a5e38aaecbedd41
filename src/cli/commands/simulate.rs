//! Simulate command - run a preset or scenario file and export the trace

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, ValueEnum};

use crate::{
    cli::output::{print_context_summary, print_kv, print_section, print_trace_summary},
    observers::{JsonlObserver, ProgressObserver},
    presets::{self, PRESET_NAMES},
    simulation::{Scenario, Simulation},
    trace::SimulationTrace,
    transition::MatchContext,
};

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum Pressure {
    Normal,
    High,
}

impl From<Pressure> for MatchContext {
    fn from(pressure: Pressure) -> Self {
        match pressure {
            Pressure::Normal => MatchContext::Normal,
            Pressure::High => MatchContext::HighPressure,
        }
    }
}

#[derive(Parser, Debug)]
#[command(about = "Run a multi-agent simulation")]
pub struct SimulateArgs {
    /// Built-in model (tennis-basic, tennis-match, design-triad)
    #[arg(long, short = 'p', default_value = "tennis-match", conflicts_with = "scenario")]
    pub preset: String,

    /// Scenario JSON file to run instead of a preset
    #[arg(long)]
    pub scenario: Option<PathBuf>,

    /// Number of steps (defaults to the scenario's own setting)
    #[arg(long, short = 's')]
    pub steps: Option<usize>,

    /// Random seed for reproducibility
    #[arg(long)]
    pub seed: Option<u64>,

    /// Match pressure applied to every step
    #[arg(long, value_enum)]
    pub pressure: Option<Pressure>,

    /// Write the trace to this file (.csv or .json)
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    /// Stream records to this JSONL file while running
    #[arg(long)]
    pub jsonl: Option<PathBuf>,

    /// Save the resolved scenario as JSON and exit
    #[arg(long)]
    pub save_scenario: Option<PathBuf>,

    /// Hide the progress bar
    #[arg(long)]
    pub quiet: bool,
}

pub fn execute(args: SimulateArgs) -> Result<()> {
    let mut scenario = match &args.scenario {
        Some(path) => Scenario::load(path)
            .with_context(|| format!("failed to load scenario {}", path.display()))?,
        None => match presets::by_name(&args.preset) {
            Some(scenario) => scenario,
            None => bail!(
                "unknown preset '{}', expected one of: {}",
                args.preset,
                PRESET_NAMES.join(", ")
            ),
        },
    };
    if let Some(steps) = args.steps {
        scenario.simulation.steps = steps;
    }
    if let Some(seed) = args.seed {
        scenario.simulation.seed = Some(seed);
    }
    if let Some(pressure) = args.pressure {
        scenario.simulation.pressure = pressure.into();
    }

    if let Some(path) = &args.save_scenario {
        scenario.save(path)?;
        println!("Scenario saved to {}", path.display());
        return Ok(());
    }

    print_section("Simulation");
    print_kv("Agents", &scenario.agents.len().to_string());
    print_kv("Steps", &scenario.simulation.steps.to_string());
    if let Some(seed) = scenario.simulation.seed {
        print_kv("Seed", &seed.to_string());
    }

    let design_triad = args.scenario.is_none() && args.preset == "design-triad";
    let mut simulation = Simulation::from_scenario(scenario)?;
    if !args.quiet {
        simulation = simulation.with_observer(Box::new(ProgressObserver::new()));
    }
    if let Some(path) = &args.jsonl {
        simulation = simulation.with_observer(Box::new(JsonlObserver::new(path)?));
    }
    let trace = simulation.run()?;

    print_trace_summary(&trace);
    print_context_summary(simulation.context(), design_triad);
    if let Some(path) = &args.output {
        write_trace(&trace, path)?;
        println!("\nTrace written to {}", path.display());
    }
    Ok(())
}

fn write_trace(trace: &SimulationTrace, path: &Path) -> Result<()> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("csv") => trace.write_csv(path)?,
        Some("json") => trace.write_json(path)?,
        _ => bail!(
            "cannot infer trace format from {}, use a .csv or .json extension",
            path.display()
        ),
    }
    Ok(())
}
