//! A single active inference agent
//!
//! An [`Agent`] owns its hidden state, fatigue and belief, plus the models it
//! reasons with. Each call to [`Agent::step`] plans an action, lets the
//! environment move the hidden state and emit an observation, filters the
//! belief and returns an immutable [`StepRecord`].

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    Error, Result,
    beliefs::{Belief, BeliefFilter, FilterConfig},
    efe::expected_free_energy,
    observation::{LikelihoodAdjustment, ObservationMatrix, ObservationModel},
    opponents::{OpponentKind, OpponentModel},
    planner::{PlanRequest, Planner, PlannerConfig},
    preferences::Preferences,
    simulation::SharedContext,
    space::{ActionSpace, ObservationSpace, StateSpace},
    transition::{FatigueRule, TransitionMatrix, TransitionModel, TransitionRule},
};

/// Where the base transition tables come from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "rows", rename_all = "snake_case")]
pub enum TransitionTable {
    /// `[action][from][to]`
    PerAction(Vec<Vec<Vec<f64>>>),
    /// `[from][to]`, shared by every action
    PerState(Vec<Vec<f64>>),
    /// Uniform random weights, row-normalised, drawn at construction
    Random,
}

/// Transition part of an [`AgentConfig`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionSpec {
    pub table: TransitionTable,
    /// Normalise the supplied rows instead of requiring distributions
    #[serde(default)]
    pub normalize: bool,
    #[serde(default)]
    pub rule: TransitionRule,
    #[serde(default = "FatigueRule::none")]
    pub fatigue: FatigueRule,
    /// Labels of actions that count as aggressive
    #[serde(default)]
    pub aggressive_actions: Vec<String>,
}

impl TransitionSpec {
    pub fn per_action(tables: Vec<Vec<Vec<f64>>>) -> Self {
        Self::from_table(TransitionTable::PerAction(tables))
    }

    pub fn per_state(rows: Vec<Vec<f64>>) -> Self {
        Self::from_table(TransitionTable::PerState(rows))
    }

    pub fn random() -> Self {
        Self::from_table(TransitionTable::Random)
    }

    fn from_table(table: TransitionTable) -> Self {
        Self {
            table,
            normalize: false,
            rule: TransitionRule::Static,
            fatigue: FatigueRule::none(),
            aggressive_actions: Vec::new(),
        }
    }

    pub fn normalized(mut self) -> Self {
        self.normalize = true;
        self
    }

    pub fn with_rule(mut self, rule: TransitionRule) -> Self {
        self.rule = rule;
        self
    }

    pub fn with_fatigue(mut self, fatigue: FatigueRule, aggressive_actions: Vec<String>) -> Self {
        self.fatigue = fatigue;
        self.aggressive_actions = aggressive_actions;
        self
    }
}

/// Where the base likelihood table comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "rows", rename_all = "snake_case")]
pub enum LikelihoodTable {
    /// `[state][observation]`
    Rows(Vec<Vec<f64>>),
    /// Uniform random weights, row-normalised, drawn at construction
    Random,
}

/// Observation part of an [`AgentConfig`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationSpec {
    pub table: LikelihoodTable,
    #[serde(default)]
    pub normalize: bool,
    /// Progress/context adjustment; `None` keeps the table static
    #[serde(default)]
    pub adjustment: Option<LikelihoodAdjustment>,
}

impl ObservationSpec {
    pub fn rows(rows: Vec<Vec<f64>>) -> Self {
        Self {
            table: LikelihoodTable::Rows(rows),
            normalize: false,
            adjustment: None,
        }
    }

    pub fn random() -> Self {
        Self {
            table: LikelihoodTable::Random,
            normalize: false,
            adjustment: None,
        }
    }

    pub fn normalized(mut self) -> Self {
        self.normalize = true;
        self
    }

    pub fn with_adjustment(mut self, adjustment: LikelihoodAdjustment) -> Self {
        self.adjustment = Some(adjustment);
        self
    }
}

/// Complete description of one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    pub id: String,
    pub states: Vec<String>,
    pub actions: Vec<String>,
    pub observations: Vec<String>,
    pub transitions: TransitionSpec,
    pub likelihoods: ObservationSpec,
    /// One weight per observation; flat when omitted
    #[serde(default)]
    pub preferences: Option<Vec<f64>>,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub planner: PlannerConfig,
    #[serde(default)]
    pub initial_fatigue: f64,
    /// Context label fed to the likelihood adjustment
    #[serde(default = "default_agent_context")]
    pub agent_context: String,
    /// Advance the belief through the chosen action's transition table
    /// before correcting it
    #[serde(default)]
    pub predict_before_correct: bool,
    #[serde(default)]
    pub opponent: OpponentKind,
}

fn default_agent_context() -> String {
    "neutral".to_string()
}

impl AgentConfig {
    pub fn new(
        id: impl Into<String>,
        states: &[&str],
        actions: &[&str],
        observations: &[&str],
        transitions: TransitionSpec,
        likelihoods: ObservationSpec,
    ) -> Self {
        let owned = |labels: &[&str]| labels.iter().map(|s| (*s).to_string()).collect();
        Self {
            id: id.into(),
            states: owned(states),
            actions: owned(actions),
            observations: owned(observations),
            transitions,
            likelihoods,
            preferences: None,
            filter: FilterConfig::default(),
            planner: PlannerConfig::default(),
            initial_fatigue: 0.0,
            agent_context: default_agent_context(),
            predict_before_correct: false,
            opponent: OpponentKind::default(),
        }
    }

    pub fn with_preferences(mut self, preferences: Vec<f64>) -> Self {
        self.preferences = Some(preferences);
        self
    }

    pub fn with_filter(mut self, filter: FilterConfig) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_planner(mut self, planner: PlannerConfig) -> Self {
        self.planner = planner;
        self
    }

    pub fn with_initial_fatigue(mut self, fatigue: f64) -> Self {
        self.initial_fatigue = fatigue;
        self
    }

    pub fn with_agent_context(mut self, context: impl Into<String>) -> Self {
        self.agent_context = context.into();
        self
    }

    pub fn with_prediction(mut self, enabled: bool) -> Self {
        self.predict_before_correct = enabled;
        self
    }

    pub fn with_opponent(mut self, opponent: OpponentKind) -> Self {
        self.opponent = opponent;
        self
    }
}

/// What another agent may see of this one: a completed-step snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpponentView {
    pub belief: Belief,
    /// Label of the most recent action, if the agent has acted
    pub action: Option<String>,
}

/// Immutable outcome of one [`Agent::step`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Hidden state after the transition
    pub state: usize,
    pub state_label: String,
    pub action: usize,
    pub action_label: String,
    pub observation: usize,
    pub observation_label: String,
    /// Posterior belief after the update
    pub belief: Vec<f64>,
    pub belief_entropy: f64,
    pub vfe: f64,
    /// Expected free energy of the posterior under this step's likelihoods
    pub efe: f64,
    /// Cumulative expected free energy of the chosen plan
    pub planned_efe: f64,
    /// Fatigue after the step
    pub fatigue: f64,
    /// Predictive surprise, when the belief was predicted before correction
    pub surprise: Option<f64>,
}

/// Stateful active inference agent
pub struct Agent {
    id: String,
    states: StateSpace,
    actions: ActionSpace,
    observations: ObservationSpace,
    transition: TransitionModel,
    observation: ObservationModel,
    preferences: Preferences,
    filter: BeliefFilter,
    planner: Planner,
    opponent: Box<dyn OpponentModel>,
    agent_context: String,
    predict_before_correct: bool,
    belief: Belief,
    state: usize,
    fatigue: f64,
    last_action: Option<usize>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("fatigue", &self.fatigue)
            .field("belief", &self.belief)
            .finish_non_exhaustive()
    }
}

impl Agent {
    /// Validate the configuration and create the agent with a uniform belief
    /// and a uniformly drawn initial hidden state.
    pub fn new<R: Rng>(config: AgentConfig, rng: &mut R) -> Result<Self> {
        let states = StateSpace::states(&config.states)?;
        let actions = ActionSpace::actions(&config.actions)?;
        let observations = ObservationSpace::observations(&config.observations)?;

        if !(0.0..=1.0).contains(&config.initial_fatigue) {
            return Err(Error::invalid_config(format!(
                "initial fatigue must lie in [0, 1], got {}",
                config.initial_fatigue
            )));
        }

        let spec = config.transitions;
        let matrix = match spec.table {
            TransitionTable::Random => TransitionMatrix::random(&states, &actions, rng),
            TransitionTable::PerState(rows) => {
                let tables = vec![rows; actions.len()];
                build_transitions(&states, &actions, tables, spec.normalize)?
            }
            TransitionTable::PerAction(tables) => {
                build_transitions(&states, &actions, tables, spec.normalize)?
            }
        };
        let transition = TransitionModel::new(
            matrix,
            &actions,
            spec.rule,
            spec.fatigue,
            spec.aggressive_actions,
        )?;

        let spec = config.likelihoods;
        let base = match spec.table {
            LikelihoodTable::Random => ObservationMatrix::random(&states, &observations, rng),
            LikelihoodTable::Rows(rows) if spec.normalize => {
                ObservationMatrix::from_unnormalized(&states, &observations, rows)?
            }
            LikelihoodTable::Rows(rows) => ObservationMatrix::new(&states, &observations, rows)?,
        };
        let observation = match spec.adjustment {
            Some(adjustment) => ObservationModel::dynamic(base, adjustment)?,
            None => ObservationModel::fixed(base),
        };

        let preferences = match config.preferences {
            Some(weights) => Preferences::new(&observations, weights)?,
            None => Preferences::flat(&observations),
        };
        let filter = BeliefFilter::new(config.filter, states.len())?;
        let planner = Planner::new(config.planner)?;

        let state = rng.random_range(0..states.len());
        let belief = Belief::uniform(states.len());
        debug!(agent = %config.id, initial_state = state, "agent created");

        Ok(Self {
            id: config.id,
            states,
            actions,
            observations,
            transition,
            observation,
            preferences,
            filter,
            planner,
            opponent: config.opponent.into_boxed_opponent(),
            agent_context: config.agent_context,
            predict_before_correct: config.predict_before_correct,
            belief,
            state,
            fatigue: config.initial_fatigue,
            last_action: None,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn states(&self) -> &StateSpace {
        &self.states
    }

    pub fn actions(&self) -> &ActionSpace {
        &self.actions
    }

    pub fn observations(&self) -> &ObservationSpace {
        &self.observations
    }

    pub fn belief(&self) -> &Belief {
        &self.belief
    }

    pub fn state(&self) -> usize {
        self.state
    }

    pub fn fatigue(&self) -> f64 {
        self.fatigue
    }

    /// Snapshot other agents may read.
    pub fn view(&self) -> OpponentView {
        OpponentView {
            belief: self.belief.clone(),
            action: self
                .last_action
                .and_then(|a| self.actions.label(a))
                .map(str::to_string),
        }
    }

    /// Observation distribution this agent currently expects under `context`.
    pub fn predicted_observations(&self, context: &SharedContext) -> Result<Vec<f64>> {
        self.observation
            .adjusted_matrix(context.match_progress, &self.agent_context)
            .marginal(self.belief.as_slice())
    }

    /// Run one perception-action cycle.
    ///
    /// `opponent` is the view of the agent this one models; without it (or
    /// when its belief has a different size) the agent's own belief seeds
    /// the opponent track of the planner.
    pub fn step<R: Rng>(
        &mut self,
        opponent: Option<&OpponentView>,
        context: &SharedContext,
        rng: &mut R,
    ) -> Result<StepRecord> {
        let likelihoods = self
            .observation
            .adjusted_matrix(context.match_progress, &self.agent_context);

        let opponent_belief = opponent
            .map(|view| &view.belief)
            .filter(|belief| belief.len() == self.belief.len())
            .unwrap_or(&self.belief);
        let plan = self.planner.plan_multi_step(
            &PlanRequest {
                actions: &self.actions,
                belief: &self.belief,
                opponent_belief,
                likelihoods: &likelihoods,
                preferences: &self.preferences,
                transitions: Some(self.transition.matrix()),
                opponent: self.opponent.as_ref(),
            },
            rng,
        )?;
        let action = plan.action;

        let opponent_action = opponent.and_then(|view| view.action.as_deref());
        let next = self.transition.transition_probabilities(
            self.state,
            action,
            self.fatigue,
            opponent_action,
            context.pressure,
        )?;
        self.state = self.transition.sample_next_state(&next, rng)?;

        let row = likelihoods.row(self.state)?;
        let observation = self.observation.sample_observation(row, rng)?;

        let slice = if self.predict_before_correct {
            Some(self.transition.matrix().slice(action)?)
        } else {
            None
        };
        let update = self
            .filter
            .update(&mut self.belief, observation, &likelihoods, slice)?;
        let efe = expected_free_energy(
            self.belief.as_slice(),
            likelihoods.rows(),
            self.preferences.as_slice(),
            self.planner.config().log_epsilon,
        )?;

        self.fatigue = self
            .transition
            .update_fatigue(self.fatigue, action, context.pressure);
        self.last_action = Some(action);

        let record = StepRecord {
            state: self.state,
            state_label: self.states.checked_label(self.state)?.to_string(),
            action,
            action_label: self.actions.checked_label(action)?.to_string(),
            observation,
            observation_label: self.observations.checked_label(observation)?.to_string(),
            belief: self.belief.as_slice().to_vec(),
            belief_entropy: self.belief.entropy(),
            vfe: update.vfe,
            efe,
            planned_efe: plan.best_efe(),
            fatigue: self.fatigue,
            surprise: update.surprise,
        };
        debug!(
            agent = %self.id,
            step = context.step,
            action = %record.action_label,
            observation = %record.observation_label,
            vfe = record.vfe,
            efe = record.efe,
            "agent stepped"
        );
        Ok(record)
    }
}

fn build_transitions(
    states: &StateSpace,
    actions: &ActionSpace,
    tables: Vec<Vec<Vec<f64>>>,
    normalize: bool,
) -> Result<TransitionMatrix> {
    if normalize {
        TransitionMatrix::from_unnormalized(states, actions, tables)
    } else {
        TransitionMatrix::new(states, actions, tables)
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::probability::is_distribution;

    fn config() -> AgentConfig {
        AgentConfig::new(
            "player",
            &["focused", "tired", "distracted"],
            &["serve", "return", "smash"],
            &["win", "lose"],
            TransitionSpec::per_state(vec![
                vec![0.8, 0.1, 0.1],
                vec![0.4, 0.5, 0.1],
                vec![0.3, 0.3, 0.4],
            ]),
            ObservationSpec::rows(vec![vec![0.8, 0.2], vec![0.5, 0.5], vec![0.3, 0.7]]),
        )
        .with_preferences(vec![0.8, 0.2])
    }

    #[test]
    fn new_agent_starts_uniform() {
        let mut rng = StdRng::seed_from_u64(3);
        let agent = Agent::new(config().with_initial_fatigue(0.1), &mut rng).unwrap();
        assert_eq!(agent.belief().as_slice(), &[1.0 / 3.0; 3]);
        assert!(agent.state() < 3);
        assert_eq!(agent.fatigue(), 0.1);
        assert_eq!(agent.view().action, None);
    }

    #[test]
    fn step_updates_belief_and_records_labels() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut agent = Agent::new(config(), &mut rng).unwrap();
        let record = agent
            .step(None, &SharedContext::default(), &mut rng)
            .unwrap();
        assert!(is_distribution(&record.belief, 1e-9));
        assert_eq!(record.belief, agent.belief().as_slice());
        assert_eq!(
            record.observation_label,
            ["win", "lose"][record.observation]
        );
        assert_eq!(agent.view().action.as_deref(), Some(record.action_label.as_str()));
        assert!(record.vfe.is_finite() && record.efe.is_finite());
        assert!(record.surprise.is_none());
    }

    #[test]
    fn prediction_reports_surprise() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut agent = Agent::new(config().with_prediction(true), &mut rng).unwrap();
        let record = agent
            .step(None, &SharedContext::default(), &mut rng)
            .unwrap();
        assert!(record.surprise.is_some_and(f64::is_finite));
    }

    #[test]
    fn empty_action_space_cannot_step() {
        let mut cfg = config();
        cfg.actions.clear();
        cfg.transitions = TransitionSpec::per_action(Vec::new());
        let mut rng = StdRng::seed_from_u64(2);
        let mut agent = Agent::new(cfg, &mut rng).unwrap();
        let err = agent
            .step(None, &SharedContext::default(), &mut rng)
            .unwrap_err();
        assert!(matches!(err, Error::NoActionsAvailable));
    }

    #[test]
    fn mismatched_tables_fail_at_construction() {
        let mut cfg = config();
        cfg.likelihoods = ObservationSpec::rows(vec![vec![0.8, 0.2], vec![0.5, 0.5]]);
        let mut rng = StdRng::seed_from_u64(2);
        assert!(matches!(
            Agent::new(cfg, &mut rng),
            Err(Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn out_of_range_fatigue_is_rejected() {
        let mut rng = StdRng::seed_from_u64(2);
        assert!(matches!(
            Agent::new(config().with_initial_fatigue(1.5), &mut rng),
            Err(Error::InvalidConfiguration { .. })
        ));
    }
}
