//! Expected free energy of a belief under a likelihood model and preferences.
//!
//! Only the pragmatic (preference mismatch) term is computed:
//!
//! ```text
//! G = Σ_i Σ_j q(s_i) P(o_j | s_i) [ln P(o_j | s_i) - ln C(o_j)]
//! ```
//!
//! where `C` is the preference vector. Lower values are preferred.

use crate::{Error, Result, probability::stable_log};

/// Expected free energy `G` of `belief`.
///
/// # Errors
///
/// [`Error::DimensionMismatch`] when the belief, likelihood rows and
/// preference vector disagree in size.
///
/// # Examples
///
/// ```
/// use aif_pomdp::efe::expected_free_energy;
///
/// // Outcomes that match the preferences exactly cost nothing.
/// let g = expected_free_energy(&[1.0], &[vec![0.8, 0.2]], &[0.8, 0.2], 0.0).unwrap();
/// assert!(g.abs() < 1e-12);
/// ```
pub fn expected_free_energy(
    belief: &[f64],
    likelihoods: &[Vec<f64>],
    preferences: &[f64],
    log_epsilon: f64,
) -> Result<f64> {
    if likelihoods.len() != belief.len() {
        return Err(Error::mismatch("likelihood rows", belief.len(), likelihoods.len()));
    }
    let log_preferences: Vec<f64> = preferences
        .iter()
        .map(|&c| stable_log(c, log_epsilon))
        .collect();

    let mut efe = 0.0;
    for (&q, row) in belief.iter().zip(likelihoods) {
        if row.len() != preferences.len() {
            return Err(Error::mismatch("likelihood row", preferences.len(), row.len()));
        }
        for (&p, &log_c) in row.iter().zip(&log_preferences) {
            efe += q * p * (stable_log(p, log_epsilon) - log_c);
        }
    }
    Ok(efe)
}
