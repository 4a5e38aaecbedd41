//! Multi-step expected free energy planning
//!
//! Every candidate action is scored by a Monte Carlo rollout of `horizon`
//! simulated steps. Each step draws an aggregate observation from the
//! belief-marginalised likelihoods, corrects both the agent's simulated
//! belief and a parallel opponent belief track with it, and accumulates the
//! expected free energy of the corrected agent belief. The action with the
//! lowest cumulative score wins; ties go to the earlier action.

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    Error, Result,
    beliefs::{Belief, compute_vfe},
    efe::expected_free_energy,
    observation::ObservationMatrix,
    opponents::OpponentModel,
    preferences::Preferences,
    probability::{LOG_EPSILON, sample_categorical},
    space::ActionSpace,
    transition::TransitionMatrix,
};

/// Tunables of the planner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Simulated steps per candidate action, at least 1
    pub horizon: usize,
    /// Weight of the opponent track's free energy in the score; 0 ignores it
    pub opponent_weight: f64,
    /// Advance simulated beliefs through the transition matrix before each
    /// simulated observation (agent track by the candidate action, opponent
    /// track by the sampled opponent action)
    pub use_transitions: bool,
    pub log_epsilon: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            horizon: 3,
            opponent_weight: 0.0,
            use_transitions: false,
            log_epsilon: LOG_EPSILON,
        }
    }
}

impl PlannerConfig {
    pub fn with_horizon(mut self, horizon: usize) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_opponent_weight(mut self, weight: f64) -> Self {
        self.opponent_weight = weight;
        self
    }

    pub fn with_transitions(mut self, enabled: bool) -> Self {
        self.use_transitions = enabled;
        self
    }

    pub fn with_log_epsilon(mut self, log_epsilon: f64) -> Self {
        self.log_epsilon = log_epsilon;
        self
    }
}

/// Everything one planning call reads
pub struct PlanRequest<'a> {
    pub actions: &'a ActionSpace,
    pub belief: &'a Belief,
    pub opponent_belief: &'a Belief,
    pub likelihoods: &'a ObservationMatrix,
    pub preferences: &'a Preferences,
    /// Only consulted when [`PlannerConfig::use_transitions`] is set
    pub transitions: Option<&'a TransitionMatrix>,
    pub opponent: &'a dyn OpponentModel,
}

/// Result of a planning call
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    /// Index of the chosen action
    pub action: usize,
    /// Cumulative expected free energy per action, in action order
    pub cumulative_efe: Vec<f64>,
    /// Per-step expected free energy per action, in action order
    pub efe_trace: Vec<Vec<f64>>,
}

impl Plan {
    /// Score of the chosen action.
    pub fn best_efe(&self) -> f64 {
        self.cumulative_efe[self.action]
    }
}

/// Brute-force rollout planner
#[derive(Debug, Clone)]
pub struct Planner {
    config: PlannerConfig,
}

impl Planner {
    pub fn new(config: PlannerConfig) -> Result<Self> {
        if config.horizon == 0 {
            return Err(Error::invalid_config("planning horizon must be at least 1"));
        }
        if !config.opponent_weight.is_finite() || config.opponent_weight < 0.0 {
            return Err(Error::invalid_config(format!(
                "opponent weight must be non-negative and finite, got {}",
                config.opponent_weight
            )));
        }
        if !config.log_epsilon.is_finite() || config.log_epsilon <= 0.0 {
            return Err(Error::invalid_config("log epsilon must be positive"));
        }
        Ok(Self { config })
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Choose the action with the lowest cumulative expected free energy.
    ///
    /// # Errors
    ///
    /// - [`Error::NoActionsAvailable`] for an empty action space
    /// - [`Error::PlanningDiverged`] when no action scores a finite value
    /// - [`Error::DimensionMismatch`] when beliefs, likelihoods, preferences
    ///   or transitions disagree in size
    pub fn plan_multi_step<R: Rng>(&self, request: &PlanRequest<'_>, rng: &mut R) -> Result<Plan> {
        if request.actions.is_empty() {
            return Err(Error::NoActionsAvailable);
        }
        self.check_request(request)?;

        let transitions = request
            .transitions
            .filter(|_| self.config.use_transitions);
        let mut cumulative_efe = Vec::with_capacity(request.actions.len());
        let mut efe_trace = Vec::with_capacity(request.actions.len());

        for action in 0..request.actions.len() {
            let steps = self.rollout(request, action, transitions, rng)?;
            cumulative_efe.push(steps.iter().sum::<f64>());
            efe_trace.push(steps);
        }

        let mut best: Option<(usize, f64)> = None;
        for (action, &score) in cumulative_efe.iter().enumerate() {
            if !score.is_finite() {
                continue;
            }
            match best {
                Some((_, top)) if top <= score => {}
                _ => best = Some((action, score)),
            }
        }
        let Some((action, score)) = best else {
            return Err(Error::PlanningDiverged {
                candidates: cumulative_efe.len(),
            });
        };

        debug!(
            action = request.actions.label(action).unwrap_or_default(),
            efe = score,
            "planned action"
        );
        Ok(Plan {
            action,
            cumulative_efe,
            efe_trace,
        })
    }

    fn check_request(&self, request: &PlanRequest<'_>) -> Result<()> {
        let states = request.likelihoods.num_states();
        if request.belief.len() != states {
            return Err(Error::mismatch("belief", states, request.belief.len()));
        }
        if request.opponent_belief.len() != states {
            return Err(Error::mismatch(
                "opponent belief",
                states,
                request.opponent_belief.len(),
            ));
        }
        let observations = request.likelihoods.num_observations();
        if request.preferences.len() != observations {
            return Err(Error::mismatch(
                "preference vector",
                observations,
                request.preferences.len(),
            ));
        }
        if self.config.use_transitions
            && let Some(matrix) = request.transitions
        {
            if matrix.num_states() != states {
                return Err(Error::mismatch("transition states", states, matrix.num_states()));
            }
            if matrix.num_actions() != request.actions.len() {
                return Err(Error::mismatch(
                    "transition tables (one per action)",
                    request.actions.len(),
                    matrix.num_actions(),
                ));
            }
        }
        Ok(())
    }

    fn rollout<R: Rng>(
        &self,
        request: &PlanRequest<'_>,
        action: usize,
        transitions: Option<&TransitionMatrix>,
        rng: &mut R,
    ) -> Result<Vec<f64>> {
        let rows = request.likelihoods.rows();
        let eps = self.config.log_epsilon;
        let mut simulated = request.belief.as_slice().to_vec();
        let mut opponent = request.opponent_belief.as_slice().to_vec();
        let mut steps = Vec::with_capacity(self.config.horizon);

        for _ in 0..self.config.horizon {
            if let Some(matrix) = transitions {
                simulated = matrix.predict(&simulated, action)?;
            }

            let predicted = request.likelihoods.marginal(&simulated)?;
            let observation = sample_categorical(rng, &predicted).ok_or_else(|| {
                Error::mismatch("observation marginal", request.likelihoods.num_observations(), 0)
            })?;
            simulated = compute_vfe(&simulated, observation, rows, 1.0, eps)?.1;

            let opponent_action = request.opponent.sample_action(request.actions, &mut *rng);
            if let (Some(matrix), Some(opponent_action)) = (transitions, opponent_action) {
                opponent = matrix.predict(&opponent, opponent_action)?;
            }
            opponent = compute_vfe(&opponent, observation, rows, 1.0, eps)?.1;

            let prefs = request.preferences.as_slice();
            let mut efe = expected_free_energy(&simulated, rows, prefs, eps)?;
            if self.config.opponent_weight > 0.0 {
                efe += self.config.opponent_weight
                    * expected_free_energy(&opponent, rows, prefs, eps)?;
            }
            steps.push(efe);
        }
        Ok(steps)
    }
}
