//! Discrete-state POMDP active inference
//!
//! This crate provides:
//! - Probability helpers with a logged uniform fallback for degenerate vectors
//! - Action-conditioned transition models with fatigue and match pressure
//! - Static or progress-adjusted observation likelihoods
//! - A one-step Bayesian belief filter scored by variational free energy
//! - Expected free energy scoring and a brute-force multi-step planner
//! - Agents, a multi-agent simulation driver and trace export
//!
//! # Examples
//!
//! ```
//! use aif_pomdp::{Simulation, SimulationConfig, presets};
//!
//! let config = SimulationConfig::default().with_steps(10).with_seed(7);
//! let mut simulation = Simulation::new(config, vec![presets::tennis_basic("player")]).unwrap();
//! let trace = simulation.run().unwrap();
//! assert_eq!(trace.vfe_series("player").len(), 10);
//! ```

pub mod agent;
pub mod beliefs;
pub mod cli;
pub mod design;
pub mod efe;
pub mod error;
pub mod observation;
pub mod observers;
pub mod opponents;
pub mod planner;
pub mod ports;
pub mod preferences;
pub mod presets;
pub mod probability;
pub mod simulation;
pub mod space;
pub mod trace;
pub mod transition;

pub use agent::{Agent, AgentConfig, ObservationSpec, OpponentView, StepRecord, TransitionSpec};
pub use beliefs::{Belief, BeliefFilter, FilterConfig, FilterUpdate, compute_vfe};
pub use efe::expected_free_energy;
pub use error::{Error, Result};
pub use observation::{LikelihoodAdjustment, ObservationMatrix, ObservationModel};
pub use opponents::{FixedOpponent, OpponentKind, OpponentModel, UniformOpponent};
pub use planner::{Plan, PlanRequest, Planner, PlannerConfig};
pub use preferences::Preferences;
pub use simulation::{OpponentPairing, Scenario, SharedContext, Simulation, SimulationConfig};
pub use space::{ActionSpace, LabelSpace, ObservationSpace, SpaceKind, StateSpace};
pub use trace::{SimulationTrace, TraceRecord};
pub use transition::{
    FatigueRule, InteractionFactors, MatchContext, TransitionMatrix, TransitionModel,
    TransitionRule,
};
