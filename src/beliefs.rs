//! Belief state over hidden states and its one-step Bayesian filter.
//!
//! The filter multiplies the current belief by the likelihood of the received
//! observation and renormalises ("correct"). Callers that also want the
//! transition prior applied first use the two-stage
//! [`BeliefFilter::predict_then_correct`]. Every update scores the observation
//! with the variational free energy of the resulting posterior.

use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    observation::ObservationMatrix,
    probability::{self, LOG_EPSILON, ensure_distribution, normalize_or_uniform, stable_log},
};

/// Probability distribution over the hidden states of one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Belief(Vec<f64>);

impl Belief {
    pub fn uniform(states: usize) -> Self {
        Self(probability::uniform(states))
    }

    /// Wrap an existing distribution, rejecting anything that does not sum to one.
    pub fn from_probabilities(probabilities: Vec<f64>) -> Result<Self> {
        ensure_distribution(&probabilities, "belief")?;
        Ok(Self(probabilities))
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

    pub fn entropy(&self) -> f64 {
        probability::shannon_entropy(&self.0)
    }
}

fn likelihood_column(
    likelihoods: &[Vec<f64>],
    observation: usize,
    states: usize,
) -> Result<Vec<f64>> {
    if likelihoods.len() != states {
        return Err(Error::mismatch("likelihood rows", states, likelihoods.len()));
    }
    likelihoods
        .iter()
        .map(|row| {
            row.get(observation)
                .copied()
                .ok_or_else(|| Error::mismatch("observation index", row.len(), observation))
        })
        .collect()
}

fn free_energy(posterior: &[f64], likelihood: &[f64], precision: f64, log_epsilon: f64) -> f64 {
    -precision
        * posterior
            .iter()
            .zip(likelihood)
            .map(|(q, l)| q * stable_log(*l, log_epsilon))
            .sum::<f64>()
}

/// Posterior and variational free energy for one observation.
///
/// `likelihoods` is indexed `[state][observation]`. The posterior is
/// `normalize(likelihood * belief)` (uniform if that has no mass) and
/// `vfe = -precision * Σ posterior[i] * ln(likelihood[i] + log_epsilon)`.
///
/// # Examples
///
/// ```
/// use aif_pomdp::beliefs::compute_vfe;
///
/// let likelihoods = vec![vec![0.8, 0.2], vec![0.5, 0.5], vec![0.3, 0.7]];
/// let (vfe, posterior) = compute_vfe(&[1.0 / 3.0; 3], 0, &likelihoods, 1.0, 1e-8).unwrap();
/// assert!((posterior[0] - 0.5).abs() < 1e-9);
/// assert!(vfe > 0.0);
/// ```
pub fn compute_vfe(
    belief: &[f64],
    observation: usize,
    likelihoods: &[Vec<f64>],
    precision: f64,
    log_epsilon: f64,
) -> Result<(f64, Vec<f64>)> {
    let likelihood = likelihood_column(likelihoods, observation, belief.len())?;
    let unnormalized: Vec<f64> = likelihood.iter().zip(belief).map(|(l, b)| l * b).collect();
    let posterior = normalize_or_uniform(&unnormalized, "belief posterior");
    let vfe = free_energy(&posterior, &likelihood, precision, log_epsilon);
    Ok((vfe, posterior))
}

/// Surprise of an observation under a predicted belief:
/// `-precision * ln(Σ_s predicted[s] P(o | s) + log_epsilon)`.
pub fn predictive_surprise(
    predicted: &[f64],
    observation: usize,
    likelihoods: &[Vec<f64>],
    precision: f64,
    log_epsilon: f64,
) -> Result<f64> {
    let likelihood = likelihood_column(likelihoods, observation, predicted.len())?;
    let evidence: f64 = likelihood.iter().zip(predicted).map(|(l, p)| l * p).sum();
    Ok(-precision * stable_log(evidence, log_epsilon))
}

/// Tunables of the belief filter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Weight on the free energy term, in `(0, ∞)`
    pub precision: f64,
    /// Constant added to every unnormalised posterior entry
    pub curiosity: f64,
    /// Blend weight toward `prior` after each update, in `[0, 1]`
    pub prior_weight: f64,
    /// Fixed prior over states; required when `prior_weight > 0`
    pub prior: Option<Vec<f64>>,
    pub log_epsilon: f64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            precision: 1.0,
            curiosity: 0.0,
            prior_weight: 0.0,
            prior: None,
            log_epsilon: LOG_EPSILON,
        }
    }
}

impl FilterConfig {
    pub fn with_precision(mut self, precision: f64) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_curiosity(mut self, curiosity: f64) -> Self {
        self.curiosity = curiosity;
        self
    }

    pub fn with_prior(mut self, weight: f64, prior: Vec<f64>) -> Self {
        self.prior_weight = weight;
        self.prior = Some(prior);
        self
    }

    pub fn with_log_epsilon(mut self, log_epsilon: f64) -> Self {
        self.log_epsilon = log_epsilon;
        self
    }
}

/// Outcome of one filter step
#[derive(Debug, Clone, PartialEq)]
pub struct FilterUpdate {
    pub posterior: Belief,
    pub vfe: f64,
    /// Predictive surprise, present when a prediction step ran
    pub surprise: Option<f64>,
}

/// One-step approximate Bayesian filter with optional curiosity and prior blending
#[derive(Debug, Clone)]
pub struct BeliefFilter {
    config: FilterConfig,
    states: usize,
}

impl BeliefFilter {
    pub fn new(config: FilterConfig, states: usize) -> Result<Self> {
        if !config.precision.is_finite() || config.precision <= 0.0 {
            return Err(Error::invalid_config(format!(
                "precision must be positive and finite, got {}",
                config.precision
            )));
        }
        if !config.curiosity.is_finite() || config.curiosity < 0.0 {
            return Err(Error::invalid_config(format!(
                "curiosity must be non-negative and finite, got {}",
                config.curiosity
            )));
        }
        if !(0.0..=1.0).contains(&config.prior_weight) {
            return Err(Error::invalid_config(format!(
                "prior weight must lie in [0, 1], got {}",
                config.prior_weight
            )));
        }
        if !config.log_epsilon.is_finite() || config.log_epsilon <= 0.0 {
            return Err(Error::invalid_config("log epsilon must be positive"));
        }
        match &config.prior {
            Some(prior) => {
                if prior.len() != states {
                    return Err(Error::mismatch("belief prior", states, prior.len()));
                }
                ensure_distribution(prior, "belief prior")?;
            }
            None if config.prior_weight > 0.0 => {
                return Err(Error::invalid_config(
                    "prior weight is set but no prior distribution was given",
                ));
            }
            None => {}
        }
        Ok(Self { config, states })
    }

    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    fn check_belief(&self, belief: &Belief) -> Result<()> {
        if belief.len() != self.states {
            return Err(Error::mismatch("belief", self.states, belief.len()));
        }
        Ok(())
    }

    fn correct(
        &self,
        belief: &[f64],
        observation: usize,
        likelihoods: &[Vec<f64>],
    ) -> Result<(f64, Vec<f64>)> {
        let FilterConfig {
            precision,
            curiosity,
            prior_weight,
            log_epsilon,
            ..
        } = self.config;
        if curiosity == 0.0 && prior_weight == 0.0 {
            return compute_vfe(belief, observation, likelihoods, precision, log_epsilon);
        }

        let likelihood = likelihood_column(likelihoods, observation, belief.len())?;
        let unnormalized: Vec<f64> = likelihood
            .iter()
            .zip(belief)
            .map(|(l, b)| l * b + curiosity)
            .collect();
        let mut posterior = normalize_or_uniform(&unnormalized, "curious posterior");
        if let Some(prior) = &self.config.prior
            && prior_weight > 0.0
        {
            let blended: Vec<f64> = posterior
                .iter()
                .zip(prior)
                .map(|(q, p)| q * (1.0 - prior_weight) + prior_weight * p)
                .collect();
            posterior = normalize_or_uniform(&blended, "prior-blended posterior");
        }
        let vfe = free_energy(&posterior, &likelihood, precision, log_epsilon);
        Ok((vfe, posterior))
    }

    /// Correct the belief with the observation likelihood only.
    pub fn correct_only(
        &self,
        belief: &Belief,
        observation: usize,
        likelihoods: &ObservationMatrix,
    ) -> Result<FilterUpdate> {
        self.check_belief(belief)?;
        let (vfe, posterior) = self.correct(belief.as_slice(), observation, likelihoods.rows())?;
        Ok(FilterUpdate {
            posterior: Belief(posterior),
            vfe,
            surprise: None,
        })
    }

    /// Push the belief through one transition slice (`[from][to]`).
    pub fn predict(&self, belief: &Belief, transition_slice: &[Vec<f64>]) -> Result<Belief> {
        self.check_belief(belief)?;
        if transition_slice.len() != self.states {
            return Err(Error::mismatch(
                "transition slice rows",
                self.states,
                transition_slice.len(),
            ));
        }
        if let Some(row) = transition_slice.iter().find(|row| row.len() != self.states) {
            return Err(Error::mismatch("transition slice row", self.states, row.len()));
        }
        let predicted = probability::marginal(belief.as_slice(), transition_slice);
        Ok(Belief(normalize_or_uniform(&predicted, "belief prediction")))
    }

    /// Predict through the transition slice, then correct with the observation.
    pub fn predict_then_correct(
        &self,
        belief: &Belief,
        transition_slice: &[Vec<f64>],
        observation: usize,
        likelihoods: &ObservationMatrix,
    ) -> Result<FilterUpdate> {
        let predicted = self.predict(belief, transition_slice)?;
        let surprise = predictive_surprise(
            predicted.as_slice(),
            observation,
            likelihoods.rows(),
            self.config.precision,
            self.config.log_epsilon,
        )?;
        let (vfe, posterior) =
            self.correct(predicted.as_slice(), observation, likelihoods.rows())?;
        Ok(FilterUpdate {
            posterior: Belief(posterior),
            vfe,
            surprise: Some(surprise),
        })
    }

    /// Replace `belief` with the posterior and return the step's free energy terms.
    pub fn update(
        &self,
        belief: &mut Belief,
        observation: usize,
        likelihoods: &ObservationMatrix,
        transition_slice: Option<&[Vec<f64>]>,
    ) -> Result<FilterUpdate> {
        let update = match transition_slice {
            Some(slice) => self.predict_then_correct(belief, slice, observation, likelihoods)?,
            None => self.correct_only(belief, observation, likelihoods)?,
        };
        *belief = update.posterior.clone();
        Ok(update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::{ObservationSpace, StateSpace};

    fn likelihoods() -> ObservationMatrix {
        let states = StateSpace::states(["focused", "tired", "distracted"]).unwrap();
        let observations = ObservationSpace::observations(["win", "lose"]).unwrap();
        ObservationMatrix::new(
            &states,
            &observations,
            vec![vec![0.8, 0.2], vec![0.5, 0.5], vec![0.3, 0.7]],
        )
        .unwrap()
    }

    #[test]
    fn correct_only_matches_bayes_rule() {
        let filter = BeliefFilter::new(FilterConfig::default(), 3).unwrap();
        let update = filter
            .correct_only(&Belief::uniform(3), 1, &likelihoods())
            .unwrap();
        let expected = [0.2 / 1.4, 0.5 / 1.4, 0.7 / 1.4];
        for (got, want) in update.posterior.as_slice().iter().zip(expected) {
            assert!((got - want).abs() < 1e-9);
        }
        assert!(update.surprise.is_none());
    }

    #[test]
    fn zero_likelihood_everywhere_falls_back_to_uniform() {
        let rows = vec![vec![1.0, 0.0], vec![1.0, 0.0], vec![1.0, 0.0]];
        let (vfe, posterior) = compute_vfe(&[0.2, 0.3, 0.5], 1, &rows, 1.0, 1e-8).unwrap();
        assert_eq!(posterior, vec![1.0 / 3.0; 3]);
        assert!(vfe.is_finite());
        assert!((vfe + 1e-8_f64.ln()).abs() < 1e-6);
    }

    #[test]
    fn observation_out_of_range_is_rejected() {
        let err = compute_vfe(&[0.5, 0.5], 2, &[vec![0.5, 0.5], vec![0.5, 0.5]], 1.0, 1e-8)
            .unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[test]
    fn precision_scales_vfe_linearly() {
        let rows = likelihoods();
        let (base, _) = compute_vfe(&[1.0 / 3.0; 3], 0, rows.rows(), 1.0, 1e-8).unwrap();
        let (sharp, _) = compute_vfe(&[1.0 / 3.0; 3], 0, rows.rows(), 0.5, 1e-8).unwrap();
        assert!((sharp - 0.5 * base).abs() < 1e-12);
    }

    #[test]
    fn curiosity_pulls_posterior_toward_uniform() {
        let plain = BeliefFilter::new(FilterConfig::default(), 3).unwrap();
        let curious = BeliefFilter::new(FilterConfig::default().with_curiosity(0.5), 3).unwrap();
        let belief = Belief::uniform(3);
        let a = plain.correct_only(&belief, 0, &likelihoods()).unwrap();
        let b = curious.correct_only(&belief, 0, &likelihoods()).unwrap();
        assert!(b.posterior.as_slice()[0] < a.posterior.as_slice()[0]);
        assert!(b.posterior.entropy() > a.posterior.entropy());
    }

    #[test]
    fn full_prior_weight_returns_prior() {
        let prior = vec![0.6, 0.2, 0.2];
        let filter =
            BeliefFilter::new(FilterConfig::default().with_prior(1.0, prior.clone()), 3).unwrap();
        let update = filter
            .correct_only(&Belief::uniform(3), 0, &likelihoods())
            .unwrap();
        for (got, want) in update.posterior.as_slice().iter().zip(&prior) {
            assert!((got - want).abs() < 1e-12);
        }
    }

    #[test]
    fn prior_weight_without_prior_is_invalid() {
        let config = FilterConfig {
            prior_weight: 0.3,
            ..FilterConfig::default()
        };
        assert!(matches!(
            BeliefFilter::new(config, 3),
            Err(Error::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn non_positive_precision_is_invalid() {
        assert!(BeliefFilter::new(FilterConfig::default().with_precision(0.0), 3).is_err());
    }

    #[test]
    fn predict_then_correct_uses_transition_prior() {
        let filter = BeliefFilter::new(FilterConfig::default(), 3).unwrap();
        let to_focused = vec![vec![1.0, 0.0, 0.0]; 3];
        let update = filter
            .predict_then_correct(&Belief::uniform(3), &to_focused, 1, &likelihoods())
            .unwrap();
        assert_eq!(update.posterior.as_slice(), &[1.0, 0.0, 0.0]);
        let surprise = update.surprise.unwrap();
        assert!((surprise + (0.2_f64 + 1e-8).ln()).abs() < 1e-12);
    }

    #[test]
    fn update_replaces_belief_in_place() {
        let filter = BeliefFilter::new(FilterConfig::default(), 3).unwrap();
        let mut belief = Belief::uniform(3);
        let update = filter.update(&mut belief, 0, &likelihoods(), None).unwrap();
        assert_eq!(belief, update.posterior);
        // a win favours "focused"
        assert!(belief.as_slice()[0] > belief.as_slice()[1]);
        assert!(belief.as_slice()[0] > belief.as_slice()[2]);
    }

    #[test]
    fn belief_rejects_non_distributions() {
        assert!(Belief::from_probabilities(vec![0.5, 0.6]).is_err());
        assert!(Belief::from_probabilities(vec![0.5, 0.5]).is_ok());
    }
}
