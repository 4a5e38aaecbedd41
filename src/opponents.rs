//! Opponent action models used inside planning rollouts
//!
//! Opponent actions are sampled or fixed; they are never optimised against
//! the agent.

use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};

use crate::space::ActionSpace;

/// How a simulated opponent chooses its actions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OpponentKind {
    /// Opponent plays uniformly at random
    #[default]
    Uniform,
    /// Opponent always plays the named action
    Fixed { action: String },
}

/// Trait for opponent behaviour during planning
pub trait OpponentModel: Send {
    /// Returns the kind of opponent
    fn kind(&self) -> OpponentKind;

    /// Index of the opponent's next action, or `None` if it cannot act.
    fn sample_action(&self, actions: &ActionSpace, rng: &mut dyn RngCore) -> Option<usize>;
}

/// Opponent that plays uniformly at random
#[derive(Debug, Clone, Copy)]
pub struct UniformOpponent;

impl OpponentModel for UniformOpponent {
    fn kind(&self) -> OpponentKind {
        OpponentKind::Uniform
    }

    fn sample_action(&self, actions: &ActionSpace, rng: &mut dyn RngCore) -> Option<usize> {
        if actions.is_empty() {
            return None;
        }
        Some(rng.random_range(0..actions.len()))
    }
}

/// Opponent that repeats a single action
#[derive(Debug, Clone)]
pub struct FixedOpponent {
    action: String,
}

impl FixedOpponent {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
        }
    }
}

impl OpponentModel for FixedOpponent {
    fn kind(&self) -> OpponentKind {
        OpponentKind::Fixed {
            action: self.action.clone(),
        }
    }

    fn sample_action(&self, actions: &ActionSpace, _rng: &mut dyn RngCore) -> Option<usize> {
        actions.index_of(&self.action).ok()
    }
}

impl OpponentKind {
    /// Creates a boxed opponent trait object from the kind
    pub fn into_boxed_opponent(self) -> Box<dyn OpponentModel> {
        match self {
            OpponentKind::Uniform => Box::new(UniformOpponent),
            OpponentKind::Fixed { action } => Box::new(FixedOpponent::new(action)),
        }
    }
}
