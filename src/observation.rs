//! Observation likelihoods `P(o | s)`, static or adjusted by match context.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    probability::{self, ensure_distribution, marginal, normalize_or_uniform, normalize_rows},
    space::{ObservationSpace, StateSpace},
};

/// Likelihood table indexed `[state][observation]`; every row is a distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationMatrix {
    rows: Vec<Vec<f64>>,
}

impl ObservationMatrix {
    pub fn new(
        states: &StateSpace,
        observations: &ObservationSpace,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self> {
        check_shape(states, observations, &rows)?;
        for (state, row) in rows.iter().enumerate() {
            ensure_distribution(row, &format!("likelihood row for state {state}"))?;
        }
        Ok(Self { rows })
    }

    pub fn from_unnormalized(
        states: &StateSpace,
        observations: &ObservationSpace,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self> {
        check_shape(states, observations, &rows)?;
        let rows = normalize_rows(&rows)
            .map_err(|err| Error::invalid_config(format!("likelihood table: {err}")))?;
        Ok(Self { rows })
    }

    /// Uniform random weights in `[0, 1)`, normalised per state.
    pub fn random<R: Rng + ?Sized>(
        states: &StateSpace,
        observations: &ObservationSpace,
        rng: &mut R,
    ) -> Self {
        let rows = (0..states.len())
            .map(|_| {
                let weights: Vec<f64> = (0..observations.len())
                    .map(|_| rng.random::<f64>())
                    .collect();
                normalize_or_uniform(&weights, "random likelihood row")
            })
            .collect();
        Self { rows }
    }

    /// Rows already known to be distributions (produced internally).
    pub(crate) fn from_rows_unchecked(rows: Vec<Vec<f64>>) -> Self {
        Self { rows }
    }

    pub fn num_states(&self) -> usize {
        self.rows.len()
    }

    pub fn num_observations(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row(&self, state: usize) -> Result<&[f64]> {
        self.rows
            .get(state)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::mismatch("state index", self.rows.len(), state))
    }

    /// `P(o | s)` for a fixed `o`, as a vector over states.
    pub fn column(&self, observation: usize) -> Result<Vec<f64>> {
        if observation >= self.num_observations() {
            return Err(Error::mismatch(
                "observation index",
                self.num_observations(),
                observation,
            ));
        }
        Ok(self.rows.iter().map(|row| row[observation]).collect())
    }

    /// Predicted observation distribution `Σ_s belief[s] P(o | s)`, renormalised.
    pub fn marginal(&self, belief: &[f64]) -> Result<Vec<f64>> {
        if belief.len() != self.rows.len() {
            return Err(Error::mismatch("belief", self.rows.len(), belief.len()));
        }
        Ok(normalize_or_uniform(
            &marginal(belief, &self.rows),
            "observation marginal",
        ))
    }

    /// Same matrix with every entry multiplied by `factor`, then left unnormalised.
    ///
    /// Only useful for sensitivity analysis of the free energy terms.
    pub fn scaled(&self, factor: f64) -> Vec<Vec<f64>> {
        self.rows
            .iter()
            .map(|row| row.iter().map(|p| p * factor).collect())
            .collect()
    }
}

fn check_shape(
    states: &StateSpace,
    observations: &ObservationSpace,
    rows: &[Vec<f64>],
) -> Result<()> {
    if rows.len() != states.len() {
        return Err(Error::mismatch("likelihood rows", states.len(), rows.len()));
    }
    for row in rows {
        if row.len() != observations.len() {
            return Err(Error::mismatch(
                "likelihood row",
                observations.len(),
                row.len(),
            ));
        }
    }
    Ok(())
}

/// Progress/context adjustment of the base likelihoods
///
/// Each probability moves toward 0.5 by `progress_gain * match_progress`, then
/// loses a context penalty (larger for the tired context), is clamped at zero
/// and the row is renormalised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LikelihoodAdjustment {
    pub progress_gain: f64,
    pub tired_penalty: f64,
    pub default_penalty: f64,
    /// Agent context label that selects `tired_penalty`
    pub tired_context: String,
}

impl Default for LikelihoodAdjustment {
    fn default() -> Self {
        Self {
            progress_gain: 0.1,
            tired_penalty: 0.1,
            default_penalty: 0.05,
            tired_context: "tired".to_string(),
        }
    }
}

impl LikelihoodAdjustment {
    fn penalty(&self, agent_context: &str) -> f64 {
        if agent_context == self.tired_context {
            self.tired_penalty
        } else {
            self.default_penalty
        }
    }

    fn apply(&self, base: &[f64], match_progress: f64, agent_context: &str) -> Vec<f64> {
        let adjustment = self.progress_gain * match_progress.clamp(0.0, 1.0);
        let penalty = self.penalty(agent_context);
        let adjusted: Vec<f64> = base
            .iter()
            .map(|p| (p + adjustment * (0.5 - p) - penalty).max(0.0))
            .collect();
        normalize_or_uniform(&adjusted, "adjusted likelihoods")
    }
}

/// Base likelihood table plus an optional dynamic adjustment
#[derive(Debug, Clone)]
pub struct ObservationModel {
    base: ObservationMatrix,
    adjustment: Option<LikelihoodAdjustment>,
}

impl ObservationModel {
    pub fn fixed(base: ObservationMatrix) -> Self {
        Self {
            base,
            adjustment: None,
        }
    }

    pub fn dynamic(base: ObservationMatrix, adjustment: LikelihoodAdjustment) -> Result<Self> {
        let values = [
            adjustment.progress_gain,
            adjustment.tired_penalty,
            adjustment.default_penalty,
        ];
        if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(Error::invalid_config(
                "likelihood adjustment parameters must be finite and non-negative",
            ));
        }
        Ok(Self {
            base,
            adjustment: Some(adjustment),
        })
    }

    pub fn base(&self) -> &ObservationMatrix {
        &self.base
    }

    pub fn adjustment(&self) -> Option<&LikelihoodAdjustment> {
        self.adjustment.as_ref()
    }

    /// Static likelihoods for one state.
    pub fn base_likelihoods(&self, state: usize) -> Result<&[f64]> {
        self.base.row(state)
    }

    /// Likelihoods for one state under the given progress and context.
    ///
    /// Pure: repeated calls with the same inputs give the same row and the base
    /// table is never modified. Without an adjustment this is the base row.
    pub fn adjusted_likelihoods(
        &self,
        state: usize,
        match_progress: f64,
        agent_context: &str,
    ) -> Result<Vec<f64>> {
        let base = self.base.row(state)?;
        Ok(match &self.adjustment {
            Some(adjustment) => adjustment.apply(base, match_progress, agent_context),
            None => base.to_vec(),
        })
    }

    /// [`adjusted_likelihoods`](Self::adjusted_likelihoods) for every state.
    pub fn adjusted_matrix(&self, match_progress: f64, agent_context: &str) -> ObservationMatrix {
        match &self.adjustment {
            Some(adjustment) => ObservationMatrix::from_rows_unchecked(
                self.base
                    .rows()
                    .iter()
                    .map(|row| adjustment.apply(row, match_progress, agent_context))
                    .collect(),
            ),
            None => self.base.clone(),
        }
    }

    /// Draw an observation index from a likelihood row.
    pub fn sample_observation<R: Rng + ?Sized>(
        &self,
        likelihoods: &[f64],
        rng: &mut R,
    ) -> Result<usize> {
        let expected = self.base.num_observations();
        if likelihoods.len() != expected {
            return Err(Error::mismatch("likelihood row", expected, likelihoods.len()));
        }
        probability::sample_categorical(rng, likelihoods)
            .ok_or_else(|| Error::mismatch("likelihood row", expected, 0))
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::probability::is_distribution;

    fn match_model() -> ObservationModel {
        let states =
            StateSpace::states(["aggressive", "defensive", "neutral", "tired", "focused"]).unwrap();
        let observations =
            ObservationSpace::observations(["win", "lose", "forced error", "unforced error"])
                .unwrap();
        let base = ObservationMatrix::new(
            &states,
            &observations,
            vec![
                vec![0.6, 0.2, 0.1, 0.1],
                vec![0.4, 0.3, 0.2, 0.1],
                vec![0.5, 0.2, 0.2, 0.1],
                vec![0.3, 0.4, 0.2, 0.1],
                vec![0.7, 0.1, 0.1, 0.1],
            ],
        )
        .unwrap();
        ObservationModel::dynamic(base, LikelihoodAdjustment::default()).unwrap()
    }

    #[test]
    fn column_extracts_observation_likelihoods() {
        let model = match_model();
        assert_eq!(
            model.base().column(0).unwrap(),
            vec![0.6, 0.4, 0.5, 0.3, 0.7]
        );
        assert!(model.base().column(4).is_err());
    }

    #[test]
    fn adjusted_row_matches_formula() {
        let model = match_model();
        let progress = 0.5;
        let row = model.adjusted_likelihoods(0, progress, "neutral").unwrap();
        let k = 0.1 * progress;
        let raw: Vec<f64> = [0.6, 0.2, 0.1, 0.1]
            .iter()
            .map(|p: &f64| (p + k * (0.5 - p) - 0.05).max(0.0))
            .collect();
        let total: f64 = raw.iter().sum();
        for (got, want) in row.iter().zip(raw.iter().map(|r| r / total)) {
            assert!((got - want).abs() < 1e-12);
        }
    }

    #[test]
    fn tired_context_clamps_small_entries_and_renormalises() {
        let model = match_model();
        let row = model.adjusted_likelihoods(4, 0.0, "tired").unwrap();
        assert_eq!(row[1], 0.0);
        assert!(is_distribution(&row, 1e-9));
        assert!((row[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn adjustment_is_idempotent_and_leaves_base_untouched() {
        let model = match_model();
        let first = model.adjusted_matrix(0.8, "tired");
        let second = model.adjusted_matrix(0.8, "tired");
        assert_eq!(first, second);
        assert_eq!(model.base_likelihoods(0).unwrap(), &[0.6, 0.2, 0.1, 0.1]);
    }

    #[test]
    fn adjusted_rows_are_distributions() {
        let model = match_model();
        for progress in [0.0, 0.25, 0.5, 1.0] {
            for context in ["neutral", "tired"] {
                let matrix = model.adjusted_matrix(progress, context);
                for row in matrix.rows() {
                    assert!(is_distribution(row, 1e-9), "{row:?}");
                }
            }
        }
    }

    #[test]
    fn fixed_model_ignores_progress() {
        let model = ObservationModel::fixed(match_model().base().clone());
        assert_eq!(
            model.adjusted_likelihoods(1, 1.0, "tired").unwrap(),
            vec![0.4, 0.3, 0.2, 0.1]
        );
    }

    #[test]
    fn marginal_weights_rows_by_belief() {
        let model = match_model();
        let belief = [0.0, 0.0, 0.0, 0.0, 1.0];
        let predicted = model.base().marginal(&belief).unwrap();
        for (got, want) in predicted.iter().zip([0.7, 0.1, 0.1, 0.1]) {
            assert!((got - want).abs() < 1e-12);
        }
    }

    #[test]
    fn sample_observation_checks_row_width() {
        let model = match_model();
        let mut rng = StdRng::seed_from_u64(1);
        assert!(model.sample_observation(&[0.5, 0.5], &mut rng).is_err());
        let index = model
            .sample_observation(&[0.0, 0.0, 1.0, 0.0], &mut rng)
            .unwrap();
        assert_eq!(index, 2);
    }
}
