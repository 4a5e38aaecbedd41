//! Observer port - abstraction for watching a simulation run
//!
//! This port decouples the simulation driver from progress reporting and
//! streaming exports.

use crate::{
    Result,
    simulation::SharedContext,
    trace::{SimulationTrace, TraceRecord},
};

/// Observer trait for monitoring a simulation
///
/// Observers can be composed to collect different kinds of data during a run,
/// e.g. a progress bar for user feedback or a JSONL stream for analysis.
///
/// # Event Sequence
///
/// 1. `on_simulation_start(total_steps, agent_ids)` - once
/// 2. For each step:
///    - `on_agent_step(record)` - once per agent, in stepping order
///    - `on_step_end(step, context)` - after the shared context is updated
/// 3. `on_simulation_end(trace)` - once
///
/// # Examples
///
/// ```
/// use aif_pomdp::{ports::Observer, trace::TraceRecord};
///
/// struct VfeSum(f64);
///
/// impl Observer for VfeSum {
///     fn on_agent_step(&mut self, record: &TraceRecord) -> aif_pomdp::Result<()> {
///         self.0 += record.step.vfe;
///         Ok(())
///     }
/// }
/// ```
pub trait Observer: Send {
    /// Called before the first step.
    fn on_simulation_start(&mut self, _total_steps: usize, _agent_ids: &[String]) -> Result<()> {
        Ok(())
    }

    /// Called after each agent finishes its step.
    fn on_agent_step(&mut self, _record: &TraceRecord) -> Result<()> {
        Ok(())
    }

    /// Called once every agent has stepped and the shared observables are
    /// refreshed.
    fn on_step_end(&mut self, _step: usize, _context: &SharedContext) -> Result<()> {
        Ok(())
    }

    /// Called after the last step with the complete trace.
    fn on_simulation_end(&mut self, _trace: &SimulationTrace) -> Result<()> {
        Ok(())
    }
}
