//! Simulation driver coupling several agents through a shared context
//!
//! Agents step in their configured order. Within a step an agent sees the
//! completed-step snapshot of its paired opponent, which for later agents
//! already reflects this step. Shared observables are refreshed by the
//! driver only after every agent has stepped.
//!
//! Agents never read the observables back: all cross-agent coupling goes
//! through the opponent view. The observables and their aggregates are
//! outputs for observers and callers.

use std::path::Path;

use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    Error, Result,
    agent::{Agent, AgentConfig},
    ports::Observer,
    trace::{SimulationTrace, TraceRecord},
    transition::MatchContext,
};

/// Cross-agent state read by every agent during a step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SharedContext {
    pub step: usize,
    /// `step / total_steps`, in `[0, 1)`
    pub match_progress: f64,
    pub pressure: MatchContext,
    /// Each agent's predicted observation distribution after the previous
    /// step, in agent order; empty before the first step completes
    pub observables: Vec<Vec<f64>>,
}

impl SharedContext {
    /// Element-wise mean of the observables, when they all have the same size.
    pub fn engagement(&self) -> Option<Vec<f64>> {
        let all: Vec<usize> = (0..self.observables.len()).collect();
        self.mean_of(&all)
    }

    /// Element-wise mean of the observables of the agents at `agents`.
    ///
    /// `None` when the selection is empty, an index is out of range or the
    /// selected observables differ in size.
    pub fn mean_of(&self, agents: &[usize]) -> Option<Vec<f64>> {
        let selected = agents
            .iter()
            .map(|&index| self.observables.get(index))
            .collect::<Option<Vec<_>>>()?;
        let first = selected.first()?;
        if selected.iter().any(|o| o.len() != first.len()) {
            return None;
        }
        let n = selected.len() as f64;
        let mut mean = vec![0.0; first.len()];
        for observable in &selected {
            for (acc, value) in mean.iter_mut().zip(observable.iter()) {
                *acc += value / n;
            }
        }
        Some(mean)
    }
}

/// Which agent each agent models as its opponent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpponentPairing {
    /// The agent before it in stepping order (wrapping); two agents face
    /// each other
    #[default]
    Previous,
    /// No agent sees another
    Isolated,
}

impl OpponentPairing {
    fn opponent_of(self, agent: usize, agents: usize) -> Option<usize> {
        match self {
            OpponentPairing::Previous if agents > 1 => Some((agent + agents - 1) % agents),
            _ => None,
        }
    }
}

/// Run-level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub steps: usize,
    /// Random seed; `None` seeds from the operating system
    pub seed: Option<u64>,
    pub pressure: MatchContext,
    pub pairing: OpponentPairing,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            steps: 100,
            seed: None,
            pressure: MatchContext::Normal,
            pairing: OpponentPairing::Previous,
        }
    }
}

impl SimulationConfig {
    pub fn with_steps(mut self, steps: usize) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_pressure(mut self, pressure: MatchContext) -> Self {
        self.pressure = pressure;
        self
    }

    pub fn with_pairing(mut self, pairing: OpponentPairing) -> Self {
        self.pairing = pairing;
        self
    }
}

/// A complete, serialisable simulation description
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub simulation: SimulationConfig,
    pub agents: Vec<AgentConfig>,
}

impl Scenario {
    /// Save scenario to JSON file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = std::fs::File::create(path)
            .map_err(|e| Error::io(format!("create scenario {}", path.display()), e))?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Load scenario from JSON file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .map_err(|e| Error::io(format!("open scenario {}", path.display()), e))?;
        let scenario = serde_json::from_reader(file)?;
        Ok(scenario)
    }
}

/// Steps a fixed set of agents and records the trace
pub struct Simulation {
    config: SimulationConfig,
    agents: Vec<Agent>,
    context: SharedContext,
    rng: StdRng,
    observers: Vec<Box<dyn Observer>>,
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("config", &self.config)
            .field("agents", &self.agents)
            .field("context", &self.context)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl Simulation {
    /// Build every agent from its configuration, in order.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidConfiguration`] without agents or with duplicate agent
    /// ids, plus any error from [`Agent::new`].
    pub fn new(config: SimulationConfig, agents: Vec<AgentConfig>) -> Result<Self> {
        if agents.is_empty() {
            return Err(Error::invalid_config("a simulation needs at least one agent"));
        }
        for (index, agent) in agents.iter().enumerate() {
            if agents[..index].iter().any(|a| a.id == agent.id) {
                return Err(Error::invalid_config(format!(
                    "duplicate agent id '{}'",
                    agent.id
                )));
            }
        }

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let agents = agents
            .into_iter()
            .map(|agent| Agent::new(agent, &mut rng))
            .collect::<Result<Vec<_>>>()?;
        let context = SharedContext {
            pressure: config.pressure,
            ..SharedContext::default()
        };

        Ok(Self {
            config,
            agents,
            context,
            rng,
            observers: Vec::new(),
        })
    }

    pub fn from_scenario(scenario: Scenario) -> Result<Self> {
        Self::new(scenario.simulation, scenario.agents)
    }

    /// Add an observer to the simulation
    pub fn with_observer(mut self, observer: Box<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn context(&self) -> &SharedContext {
        &self.context
    }

    /// Run `config.steps` steps and return their records.
    ///
    /// A second call continues from the agents' current state.
    pub fn run(&mut self) -> Result<SimulationTrace> {
        let total = self.config.steps;
        let ids: Vec<String> = self.agents.iter().map(|a| a.id().to_string()).collect();
        info!(steps = total, agents = ids.len(), seed = ?self.config.seed, "simulation started");
        for observer in &mut self.observers {
            observer.on_simulation_start(total, &ids)?;
        }

        let mut trace = SimulationTrace::new();
        for step in 0..total {
            self.context.step = step;
            self.context.match_progress = step as f64 / total as f64;

            for index in 0..self.agents.len() {
                let view = self
                    .config
                    .pairing
                    .opponent_of(index, self.agents.len())
                    .map(|other| self.agents[other].view());
                let record =
                    self.agents[index].step(view.as_ref(), &self.context, &mut self.rng)?;
                let record = TraceRecord {
                    step_index: step,
                    agent_id: ids[index].clone(),
                    step: record,
                };
                for observer in &mut self.observers {
                    observer.on_agent_step(&record)?;
                }
                trace.push(record);
            }

            self.context.observables = self
                .agents
                .iter()
                .map(|agent| agent.predicted_observations(&self.context))
                .collect::<Result<_>>()?;
            for observer in &mut self.observers {
                observer.on_step_end(step, &self.context)?;
            }
        }

        for observer in &mut self.observers {
            observer.on_simulation_end(&trace)?;
        }
        info!(records = trace.len(), "simulation finished");
        Ok(trace)
    }
}
