//! Preferred outcome weights used as the log-ratio baseline of expected free energy.

use serde::{Deserialize, Serialize};

use crate::{Error, Result, space::ObservationSpace};

/// Non-negative weight per observation; need not sum to one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Preferences(Vec<f64>);

impl Preferences {
    pub fn new(observations: &ObservationSpace, weights: Vec<f64>) -> Result<Self> {
        if weights.len() != observations.len() {
            return Err(Error::mismatch(
                "preference vector",
                observations.len(),
                weights.len(),
            ));
        }
        if let Some((index, &value)) = weights
            .iter()
            .enumerate()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(Error::InvalidProbability { index, value });
        }
        Ok(Self(weights))
    }

    /// Equal weight on every observation.
    pub fn flat(observations: &ObservationSpace) -> Self {
        Self(vec![1.0 / observations.len() as f64; observations.len()])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
