//! Entry point for the interactive design tool
//!
//! The tool exposes three sliders and runs a bounded single-agent simulation
//! of a user with them, reporting the trace and a short textual summary.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    presets::user_agent,
    simulation::{OpponentPairing, Simulation, SimulationConfig},
    trace::SimulationTrace,
};

/// Default number of steps of [`simulate_user`].
pub const DEFAULT_STEPS: usize = 100;

/// The three tunable parameters of the design tool
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DesignParameters {
    /// Belief precision, in `(0, 1]`
    pub precision: f64,
    /// Curiosity bonus, in `[0, 1]`
    pub curiosity: f64,
    /// Weight of the expected-user prior, in `[0, 1]`
    pub prediction: f64,
}

impl DesignParameters {
    pub fn new(precision: f64, curiosity: f64, prediction: f64) -> Result<Self> {
        if !(precision > 0.0 && precision <= 1.0) {
            return Err(Error::invalid_config(format!(
                "precision must lie in (0, 1], got {precision}"
            )));
        }
        for (name, value) in [("curiosity", curiosity), ("prediction", prediction)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::invalid_config(format!(
                    "{name} must lie in [0, 1], got {value}"
                )));
            }
        }
        Ok(Self {
            precision,
            curiosity,
            prediction,
        })
    }
}

/// Final free energies of a design run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DesignSummary {
    pub parameters: DesignParameters,
    pub final_vfe: f64,
    pub final_efe: f64,
}

impl fmt::Display for DesignSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Precision: {:.2}", self.parameters.precision)?;
        writeln!(f, "Curiosity: {:.2}", self.parameters.curiosity)?;
        writeln!(f, "Prediction: {:.2}", self.parameters.prediction)?;
        writeln!(f, "Final VFE: {:.2}", self.final_vfe)?;
        writeln!(f, "Final EFE: {:.2}", self.final_efe)
    }
}

/// Trace and summary of [`simulate_user`]
#[derive(Debug, Clone)]
pub struct DesignRun {
    pub trace: SimulationTrace,
    pub summary: DesignSummary,
}

/// Simulate one user agent for `steps` steps under the given parameters.
///
/// # Errors
///
/// [`Error::InvalidConfiguration`] when a parameter is out of range or
/// `steps` is zero.
pub fn simulate_user(
    precision: f64,
    curiosity: f64,
    prediction: f64,
    steps: usize,
    seed: Option<u64>,
) -> Result<DesignRun> {
    let parameters = DesignParameters::new(precision, curiosity, prediction)?;
    if steps == 0 {
        return Err(Error::invalid_config("a design run needs at least one step"));
    }

    let mut config = SimulationConfig::default()
        .with_steps(steps)
        .with_pairing(OpponentPairing::Isolated);
    config.seed = seed;
    let agent = user_agent(precision, curiosity, prediction);
    let id = agent.id.clone();
    let trace = Simulation::new(config, vec![agent])?.run()?;

    let last = trace
        .last_for(&id)
        .ok_or_else(|| Error::invalid_config("design run produced no records"))?;
    let summary = DesignSummary {
        parameters,
        final_vfe: last.vfe,
        final_efe: last.efe,
    };
    Ok(DesignRun { trace, summary })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameters_are_range_checked() {
        assert!(DesignParameters::new(0.0, 0.5, 0.5).is_err());
        assert!(DesignParameters::new(1.0, 1.5, 0.5).is_err());
        assert!(DesignParameters::new(1.0, 0.5, -0.1).is_err());
        assert!(DesignParameters::new(f64::NAN, 0.5, 0.5).is_err());
        assert!(DesignParameters::new(1.0, 0.0, 1.0).is_ok());
    }

    #[test]
    fn summary_uses_two_decimals() {
        let summary = DesignSummary {
            parameters: DesignParameters::new(0.5, 0.25, 0.1).unwrap(),
            final_vfe: 1.23456,
            final_efe: -0.5,
        };
        assert_eq!(
            summary.to_string(),
            "Precision: 0.50\nCuriosity: 0.25\nPrediction: 0.10\nFinal VFE: 1.23\nFinal EFE: -0.50\n"
        );
    }

    #[test]
    fn run_has_one_record_per_step() {
        let run = simulate_user(0.9, 0.1, 0.3, 25, Some(8)).unwrap();
        assert_eq!(run.trace.len(), 25);
        assert_eq!(run.summary.final_vfe, run.trace.records()[24].step.vfe);
    }
}
