//! Action-conditioned hidden state dynamics.
//!
//! A [`TransitionMatrix`] stores one row-stochastic table per action. The
//! [`TransitionModel`] wraps it with the fatigue/interaction/context adjustment
//! used by the match models and with the fatigue accumulation rule.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    probability::{self, ensure_distribution, marginal, normalize_or_uniform, normalize_rows},
    space::{ActionSpace, StateSpace},
};

/// Pressure level of the current point/step, shared by all agents
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchContext {
    #[default]
    Normal,
    HighPressure,
}

impl MatchContext {
    pub fn is_high_pressure(self) -> bool {
        self == MatchContext::HighPressure
    }
}

/// Per-action transition tables indexed `[action][from][to]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionMatrix {
    states: usize,
    tables: Vec<Vec<Vec<f64>>>,
}

impl TransitionMatrix {
    /// Build from already-normalised tables.
    ///
    /// # Errors
    ///
    /// Fails with [`Error::DimensionMismatch`] when the table shape disagrees
    /// with the spaces and with [`Error::InvalidConfiguration`] when a row is
    /// not a distribution.
    pub fn new(
        states: &StateSpace,
        actions: &ActionSpace,
        tables: Vec<Vec<Vec<f64>>>,
    ) -> Result<Self> {
        check_shape(states, actions, &tables)?;
        for (action, table) in tables.iter().enumerate() {
            for (from, row) in table.iter().enumerate() {
                ensure_distribution(
                    row,
                    &format!("transition row (action {action}, state {from})"),
                )?;
            }
        }
        Ok(Self {
            states: states.len(),
            tables,
        })
    }

    /// Build from non-negative weights, normalising every row.
    pub fn from_unnormalized(
        states: &StateSpace,
        actions: &ActionSpace,
        tables: Vec<Vec<Vec<f64>>>,
    ) -> Result<Self> {
        check_shape(states, actions, &tables)?;
        let tables = tables
            .iter()
            .enumerate()
            .map(|(action, table)| {
                normalize_rows(table).map_err(|err| {
                    Error::invalid_config(format!("transition table for action {action}: {err}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            states: states.len(),
            tables,
        })
    }

    /// One row per current state, shared by every action.
    pub fn action_independent(
        states: &StateSpace,
        actions: &ActionSpace,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self> {
        Self::new(states, actions, vec![rows; actions.len()])
    }

    /// Uniform random weights in `[0, 1)`, row-normalised.
    pub fn random<R: Rng + ?Sized>(
        states: &StateSpace,
        actions: &ActionSpace,
        rng: &mut R,
    ) -> Self {
        let n = states.len();
        let tables = (0..actions.len())
            .map(|_| {
                (0..n)
                    .map(|_| {
                        let weights: Vec<f64> = (0..n).map(|_| rng.random::<f64>()).collect();
                        normalize_or_uniform(&weights, "random transition row")
                    })
                    .collect()
            })
            .collect();
        Self { states: n, tables }
    }

    pub fn num_states(&self) -> usize {
        self.states
    }

    pub fn num_actions(&self) -> usize {
        self.tables.len()
    }

    /// Table for one action, indexed `[from][to]`.
    pub fn slice(&self, action: usize) -> Result<&[Vec<f64>]> {
        self.tables
            .get(action)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::mismatch("action index", self.tables.len(), action))
    }

    /// Distribution over next states from `from` under `action`.
    pub fn row(&self, from: usize, action: usize) -> Result<&[f64]> {
        self.slice(action)?
            .get(from)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::mismatch("state index", self.states, from))
    }

    /// Push a belief one step forward: `b'[to] = Σ_from b[from] T[action][from][to]`.
    pub fn predict(&self, belief: &[f64], action: usize) -> Result<Vec<f64>> {
        if belief.len() != self.states {
            return Err(Error::mismatch("belief", self.states, belief.len()));
        }
        let slice = self.slice(action)?;
        Ok(normalize_or_uniform(
            &marginal(belief, slice),
            "transition prediction",
        ))
    }
}

fn check_shape(
    states: &StateSpace,
    actions: &ActionSpace,
    tables: &[Vec<Vec<f64>>],
) -> Result<()> {
    if tables.len() != actions.len() {
        return Err(Error::mismatch(
            "transition tables (one per action)",
            actions.len(),
            tables.len(),
        ));
    }
    for table in tables {
        if table.len() != states.len() {
            return Err(Error::mismatch("transition table rows", states.len(), table.len()));
        }
        for row in table {
            if row.len() != states.len() {
                return Err(Error::mismatch("transition row", states.len(), row.len()));
            }
        }
    }
    Ok(())
}

/// Opponent/context weights blended in proportion to fatigue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionFactors {
    /// Interaction factor when the opponent played an aggressive action
    pub aggressive_opponent: f64,
    /// Interaction factor otherwise
    pub calm_opponent: f64,
    /// Context factor under [`MatchContext::HighPressure`]
    pub high_pressure: f64,
    /// Context factor under [`MatchContext::Normal`]
    pub normal: f64,
}

impl Default for InteractionFactors {
    fn default() -> Self {
        Self {
            aggressive_opponent: 0.1,
            calm_opponent: 0.05,
            high_pressure: 0.1,
            normal: 0.05,
        }
    }
}

/// How base transition rows are turned into the distribution actually sampled
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TransitionRule {
    /// Use the base row as is
    #[default]
    Static,
    /// `base*(1-f) + interaction*f/|states| + context`, renormalised
    FatigueAdjusted(InteractionFactors),
}

/// Fatigue accumulation per action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FatigueRule {
    pub base_increment: f64,
    pub aggressive_bonus: f64,
    pub high_pressure_bonus: f64,
}

impl Default for FatigueRule {
    fn default() -> Self {
        Self {
            base_increment: 0.01,
            aggressive_bonus: 0.02,
            high_pressure_bonus: 0.01,
        }
    }
}

impl FatigueRule {
    /// Rule under which fatigue never changes.
    pub fn none() -> Self {
        Self {
            base_increment: 0.0,
            aggressive_bonus: 0.0,
            high_pressure_bonus: 0.0,
        }
    }

    fn validate(&self) -> Result<()> {
        let fields = [
            ("base_increment", self.base_increment),
            ("aggressive_bonus", self.aggressive_bonus),
            ("high_pressure_bonus", self.high_pressure_bonus),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::invalid_config(format!(
                    "fatigue {name} must be finite and non-negative, got {value}"
                )));
            }
        }
        Ok(())
    }

    /// Next fatigue level, clamped to `[0, 1]`.
    ///
    /// With non-negative increments the result never decreases.
    pub fn update_fatigue(&self, fatigue: f64, aggressive: bool, context: MatchContext) -> f64 {
        let mut increase = self.base_increment;
        if aggressive {
            increase += self.aggressive_bonus;
        }
        if context.is_high_pressure() {
            increase += self.high_pressure_bonus;
        }
        (fatigue + increase).clamp(0.0, 1.0)
    }
}

/// Transition matrix plus the adjustment and fatigue rules
#[derive(Debug, Clone)]
pub struct TransitionModel {
    matrix: TransitionMatrix,
    rule: TransitionRule,
    fatigue: FatigueRule,
    aggressive_actions: Vec<String>,
    aggressive_mask: Vec<bool>,
}

impl TransitionModel {
    /// `aggressive_actions` must be labels of `actions`.
    pub fn new(
        matrix: TransitionMatrix,
        actions: &ActionSpace,
        rule: TransitionRule,
        fatigue: FatigueRule,
        aggressive_actions: Vec<String>,
    ) -> Result<Self> {
        if matrix.num_actions() != actions.len() {
            return Err(Error::mismatch(
                "transition tables (one per action)",
                actions.len(),
                matrix.num_actions(),
            ));
        }
        fatigue.validate()?;
        if let TransitionRule::FatigueAdjusted(factors) = &rule {
            let values = [
                factors.aggressive_opponent,
                factors.calm_opponent,
                factors.high_pressure,
                factors.normal,
            ];
            if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
                return Err(Error::invalid_config(
                    "interaction factors must be finite and non-negative",
                ));
            }
        }
        let aggressive = actions.indices_of(&aggressive_actions)?;
        let aggressive_mask = (0..actions.len())
            .map(|index| aggressive.contains(&index))
            .collect();
        Ok(Self {
            matrix,
            rule,
            fatigue,
            aggressive_actions,
            aggressive_mask,
        })
    }

    /// Static model with no fatigue dynamics.
    pub fn fixed(matrix: TransitionMatrix, actions: &ActionSpace) -> Result<Self> {
        Self::new(
            matrix,
            actions,
            TransitionRule::Static,
            FatigueRule::none(),
            Vec::new(),
        )
    }

    pub fn matrix(&self) -> &TransitionMatrix {
        &self.matrix
    }

    pub fn is_aggressive(&self, action: usize) -> bool {
        self.aggressive_mask.get(action).copied().unwrap_or(false)
    }

    /// Whether an opponent action label belongs to the aggressive subset.
    pub fn is_aggressive_label(&self, label: &str) -> bool {
        self.aggressive_actions.iter().any(|a| a == label)
    }

    /// Distribution over next states.
    ///
    /// Under [`TransitionRule::FatigueAdjusted`] the base row is blended with
    /// the interaction and context factors in proportion to `fatigue` and
    /// renormalised; a zero-mass result falls back to uniform.
    pub fn transition_probabilities(
        &self,
        from: usize,
        action: usize,
        fatigue: f64,
        opponent_action: Option<&str>,
        context: MatchContext,
    ) -> Result<Vec<f64>> {
        let base = self.matrix.row(from, action)?;
        let TransitionRule::FatigueAdjusted(factors) = &self.rule else {
            return Ok(base.to_vec());
        };

        let fatigue = fatigue.clamp(0.0, 1.0);
        let interaction = match opponent_action {
            Some(label) if self.is_aggressive_label(label) => factors.aggressive_opponent,
            _ => factors.calm_opponent,
        };
        let context_factor = if context.is_high_pressure() {
            factors.high_pressure
        } else {
            factors.normal
        };
        let spread = interaction * fatigue / base.len() as f64;
        let adjusted: Vec<f64> = base
            .iter()
            .map(|p| p * (1.0 - fatigue) + spread + context_factor)
            .collect();
        Ok(normalize_or_uniform(&adjusted, "fatigue-adjusted transition"))
    }

    /// Draw the next hidden state from a transition distribution.
    pub fn sample_next_state<R: Rng + ?Sized>(
        &self,
        distribution: &[f64],
        rng: &mut R,
    ) -> Result<usize> {
        if distribution.len() != self.matrix.num_states() {
            return Err(Error::mismatch(
                "transition distribution",
                self.matrix.num_states(),
                distribution.len(),
            ));
        }
        probability::sample_categorical(rng, distribution)
            .ok_or_else(|| Error::mismatch("transition distribution", self.matrix.num_states(), 0))
    }

    /// Fatigue after taking `action` in `context`.
    pub fn update_fatigue(&self, fatigue: f64, action: usize, context: MatchContext) -> f64 {
        self.fatigue
            .update_fatigue(fatigue, self.is_aggressive(action), context)
    }
}
