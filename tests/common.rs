//! Common fixtures for the integration test suite.
//!
//! The three-state tennis model used by most scenarios: a player who is
//! focused, tired or distracted and either wins or loses the point.

#![allow(dead_code)]

use aif_pomdp::{ActionSpace, ObservationMatrix, ObservationSpace, Preferences, StateSpace};

pub const WIN: usize = 0;
pub const LOSE: usize = 1;

pub fn states() -> StateSpace {
    StateSpace::states(["focused", "tired", "distracted"]).unwrap()
}

pub fn actions() -> ActionSpace {
    ActionSpace::actions(["serve", "return", "smash"]).unwrap()
}

pub fn observations() -> ObservationSpace {
    ObservationSpace::observations(["win", "lose"]).unwrap()
}

pub fn likelihoods() -> ObservationMatrix {
    ObservationMatrix::new(
        &states(),
        &observations(),
        vec![vec![0.8, 0.2], vec![0.5, 0.5], vec![0.3, 0.7]],
    )
    .unwrap()
}

pub fn preferences() -> Preferences {
    Preferences::new(&observations(), vec![0.8, 0.2]).unwrap()
}

/// Assert two slices agree element-wise within `tol`.
pub fn assert_close(actual: &[f64], expected: &[f64], tol: f64) {
    assert_eq!(actual.len(), expected.len(), "length mismatch");
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!((a - e).abs() <= tol, "index {i}: {a} vs {e} (tol {tol})");
    }
}
