//! Discrete probability helpers shared by every model in the crate.
//!
//! All normalisation routes through [`normalize`] / [`normalize_rows`], which
//! refuse to divide by a total at or below [`DEGENERATE_EPSILON`]. Callers that
//! can recover locally use the `*_or_uniform` variants, which log the failure
//! and substitute a uniform distribution.

use rand::Rng;
use tracing::warn;

use crate::{Error, Result};

/// Totals at or below this value cannot be normalised.
pub const DEGENERATE_EPSILON: f64 = 1e-12;

/// Default additive epsilon for [`stable_log`].
pub const LOG_EPSILON: f64 = 1e-8;

/// Coarser log epsilon used by the tennis match models.
///
/// Both values occur in the models this crate reproduces; they are kept apart
/// so a call site never silently switches from one to the other.
pub const LOG_EPSILON_COARSE: f64 = 1e-5;

/// Tolerance used when checking that a vector is a distribution.
pub const DISTRIBUTION_TOLERANCE: f64 = 1e-6;

/// Uniform distribution over `len` outcomes.
pub fn uniform(len: usize) -> Vec<f64> {
    if len == 0 {
        return Vec::new();
    }
    vec![1.0 / len as f64; len]
}

/// Divide a vector by its sum.
///
/// # Errors
///
/// - [`Error::InvalidProbability`] if an entry is negative
/// - [`Error::DegenerateDistribution`] if the total is non-finite or at most
///   [`DEGENERATE_EPSILON`]; the caller should fall back to [`uniform`]
///
/// # Examples
///
/// ```
/// use aif_pomdp::probability::normalize;
///
/// let normalized = normalize(&[1.0, 2.0, 1.0]).unwrap();
/// assert_eq!(normalized, vec![0.25, 0.5, 0.25]);
/// assert!(normalize(&[0.0, 0.0]).is_err());
/// ```
pub fn normalize(values: &[f64]) -> Result<Vec<f64>> {
    if let Some((index, &value)) = values.iter().enumerate().find(|(_, v)| **v < 0.0) {
        return Err(Error::InvalidProbability { index, value });
    }
    let total: f64 = values.iter().sum();
    if !total.is_finite() || total <= DEGENERATE_EPSILON {
        return Err(Error::DegenerateDistribution { total });
    }
    Ok(values.iter().map(|v| v / total).collect())
}

/// Row-wise [`normalize`].
pub fn normalize_rows(matrix: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
    matrix
        .iter()
        .enumerate()
        .map(|(row, values)| {
            normalize(values).map_err(|err| match err {
                Error::DegenerateDistribution { total } => Error::DegenerateRow { row, total },
                other => other,
            })
        })
        .collect()
}

/// [`normalize`] with the uniform fallback applied and logged.
///
/// `context` names the call site in the log event.
pub fn normalize_or_uniform(values: &[f64], context: &str) -> Vec<f64> {
    match normalize(values) {
        Ok(normalized) => normalized,
        Err(err) => {
            warn!(context, error = %err, "falling back to uniform distribution");
            uniform(values.len())
        }
    }
}

/// Row-wise [`normalize_or_uniform`].
pub fn normalize_rows_or_uniform(matrix: &[Vec<f64>], context: &str) -> Vec<Vec<f64>> {
    matrix
        .iter()
        .map(|row| normalize_or_uniform(row, context))
        .collect()
}

/// `ln(x + epsilon)`, finite for any `x >= 0`.
#[inline]
pub fn stable_log(x: f64, epsilon: f64) -> f64 {
    (x + epsilon).ln()
}

/// Check non-negativity and unit mass within `tolerance`.
pub fn is_distribution(values: &[f64], tolerance: f64) -> bool {
    !values.is_empty()
        && values.iter().all(|v| v.is_finite() && *v >= 0.0)
        && (values.iter().sum::<f64>() - 1.0).abs() <= tolerance
}

/// Fail with [`Error::InvalidConfiguration`] unless `values` is a distribution.
pub(crate) fn ensure_distribution(values: &[f64], what: &str) -> Result<()> {
    if is_distribution(values, DISTRIBUTION_TOLERANCE) {
        Ok(())
    } else {
        Err(Error::invalid_config(format!(
            "{what} must be non-negative and sum to 1 (got {values:?})"
        )))
    }
}

/// Belief-weighted mixture of rows: `Σ_i weights[i] * rows[i]`.
pub fn marginal(weights: &[f64], rows: &[Vec<f64>]) -> Vec<f64> {
    let width = rows.first().map_or(0, Vec::len);
    let mut mixed = vec![0.0; width];
    for (weight, row) in weights.iter().zip(rows) {
        for (acc, value) in mixed.iter_mut().zip(row) {
            *acc += weight * value;
        }
    }
    mixed
}

/// Shannon entropy `H = -Σ p ln p` over the positive entries.
pub fn shannon_entropy(probabilities: &[f64]) -> f64 {
    probabilities
        .iter()
        .filter(|&&p| p > 0.0)
        .map(|&p| -p * p.ln())
        .sum()
}

/// Draw an index from a categorical distribution.
///
/// Uses the cumulative threshold walk over the positive finite weights, which
/// need not be normalised. Falls back to a uniform draw when no weight is
/// positive. Returns `None` only for an empty slice.
pub fn sample_categorical<R>(rng: &mut R, weights: &[f64]) -> Option<usize>
where
    R: Rng + ?Sized,
{
    if weights.is_empty() {
        return None;
    }

    let total: f64 = weights
        .iter()
        .filter(|w| w.is_finite() && **w > 0.0)
        .sum();
    if total <= 0.0 {
        return Some(rng.random_range(0..weights.len()));
    }

    Some(index_at(weights, rng.random::<f64>() * total))
}

/// Index whose cumulative weight first exceeds `threshold`.
///
/// Rounding can leave `threshold` past the last cumulative sum; the last
/// positive finite weight takes it then.
fn index_at(weights: &[f64], mut threshold: f64) -> usize {
    let mut last_usable = 0;
    for (index, &weight) in weights.iter().enumerate() {
        if !(weight.is_finite() && weight > 0.0) {
            continue;
        }
        if threshold < weight {
            return index;
        }
        threshold -= weight;
        last_usable = index;
    }
    last_usable
}
