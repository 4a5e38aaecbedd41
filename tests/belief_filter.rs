//! Belief filter behaviour on the three-state tennis model

mod common;

use aif_pomdp::{Belief, BeliefFilter, FilterConfig, TransitionMatrix, compute_vfe};
use common::{WIN, assert_close, likelihoods};

/// One "win" from a uniform belief reproduces the hand-computed posterior and VFE
#[test]
fn test_scenario_win_from_uniform_belief() {
    let filter = BeliefFilter::new(FilterConfig::default(), 3).unwrap();
    let update = filter
        .correct_only(&Belief::uniform(3), WIN, &likelihoods())
        .unwrap();

    assert_close(update.posterior.as_slice(), &[0.5, 0.3125, 0.1875], 1e-3);
    let expected_vfe = -(0.5 * 0.8_f64.ln() + 0.3125 * 0.5_f64.ln() + 0.1875 * 0.3_f64.ln());
    assert!((update.vfe - expected_vfe).abs() < 1e-3);
}

/// Rescaling the likelihood table leaves the posterior alone but shifts the VFE
#[test]
fn test_rescaled_likelihoods_keep_posterior_change_vfe() {
    let base = likelihoods();
    let belief = [0.2, 0.5, 0.3];
    let factor = 0.5;
    let eps = 1e-8;

    let (vfe, posterior) = compute_vfe(&belief, WIN, base.rows(), 1.0, eps).unwrap();
    let (scaled_vfe, scaled_posterior) =
        compute_vfe(&belief, WIN, &base.scaled(factor), 1.0, eps).unwrap();

    assert_close(&scaled_posterior, &posterior, 1e-12);

    let predicted: f64 = -posterior
        .iter()
        .zip(base.column(WIN).unwrap())
        .map(|(q, l)| q * (factor * l + eps).ln())
        .sum::<f64>();
    assert!((scaled_vfe - predicted).abs() < 1e-9);
    // ln(0.5 l) = ln l - ln 2 for every state, so the VFE rises by ln 2
    assert!((scaled_vfe - vfe - std::f64::consts::LN_2).abs() < 1e-6);
}

#[test]
fn test_predict_then_correct_uses_transition_prior() {
    let states = common::states();
    let actions = common::actions();
    // every action sends the player to "tired"
    let transitions =
        TransitionMatrix::action_independent(&states, &actions, vec![vec![0.0, 1.0, 0.0]; 3])
            .unwrap();
    let filter = BeliefFilter::new(FilterConfig::default(), 3).unwrap();

    let update = filter
        .predict_then_correct(
            &Belief::uniform(3),
            transitions.slice(0).unwrap(),
            WIN,
            &likelihoods(),
        )
        .unwrap();
    assert_close(update.posterior.as_slice(), &[0.0, 1.0, 0.0], 1e-12);
    let surprise = update.surprise.unwrap();
    assert!((surprise + (0.5_f64 + 1e-8).ln()).abs() < 1e-9);
}

#[test]
fn test_update_replaces_belief_in_place() {
    let filter = BeliefFilter::new(FilterConfig::default(), 3).unwrap();
    let mut belief = Belief::uniform(3);
    let first = filter.update(&mut belief, WIN, &likelihoods(), None).unwrap();
    assert_eq!(&belief, &first.posterior);

    let second = filter.update(&mut belief, WIN, &likelihoods(), None).unwrap();
    // two wins in a row push more mass onto "focused"
    assert!(second.posterior.as_slice()[0] > first.posterior.as_slice()[0]);
}

#[test]
fn test_curiosity_flattens_the_posterior() {
    let plain = BeliefFilter::new(FilterConfig::default(), 3).unwrap();
    let curious = BeliefFilter::new(FilterConfig::default().with_curiosity(0.5), 3).unwrap();
    let belief = Belief::uniform(3);

    let a = plain.correct_only(&belief, WIN, &likelihoods()).unwrap();
    let b = curious.correct_only(&belief, WIN, &likelihoods()).unwrap();
    assert!(b.posterior.entropy() > a.posterior.entropy());
}

#[test]
fn test_full_prior_weight_returns_the_prior() {
    let prior = vec![0.6, 0.2, 0.2];
    let filter =
        BeliefFilter::new(FilterConfig::default().with_prior(1.0, prior.clone()), 3).unwrap();
    let update = filter
        .correct_only(&Belief::uniform(3), WIN, &likelihoods())
        .unwrap();
    assert_close(update.posterior.as_slice(), &prior, 1e-12);
}

#[test]
fn test_invalid_filter_configurations_are_rejected() {
    assert!(BeliefFilter::new(FilterConfig::default().with_precision(0.0), 3).is_err());
    assert!(BeliefFilter::new(FilterConfig::default().with_curiosity(-0.1), 3).is_err());
    assert!(
        BeliefFilter::new(FilterConfig::default().with_prior(0.5, vec![0.5, 0.5]), 3).is_err()
    );
    assert!(
        BeliefFilter::new(FilterConfig::default().with_prior(1.5, vec![0.6, 0.2, 0.2]), 3)
            .is_err()
    );
}
