//! Built-in models
//!
//! Each preset returns plain [`AgentConfig`] values so callers can tweak any
//! field before building agents.

use crate::{
    agent::{AgentConfig, ObservationSpec, TransitionSpec},
    beliefs::FilterConfig,
    observation::LikelihoodAdjustment,
    planner::PlannerConfig,
    probability::LOG_EPSILON_COARSE,
    simulation::{Scenario, SharedContext, SimulationConfig},
    transition::{FatigueRule, InteractionFactors, TransitionRule},
};

/// Names accepted by [`by_name`].
pub const PRESET_NAMES: [&str; 3] = ["tennis-basic", "tennis-match", "design-triad"];

/// Scenario for a preset name, or `None` if the name is unknown.
pub fn by_name(name: &str) -> Option<Scenario> {
    match name {
        "tennis-basic" => Some(Scenario {
            simulation: SimulationConfig::default(),
            agents: vec![tennis_basic("player")],
        }),
        "tennis-match" => Some(Scenario {
            simulation: SimulationConfig::default().with_steps(TENNIS_MATCH_POINTS),
            agents: vec![tennis_match("player1"), tennis_match("player2")],
        }),
        "design-triad" => Some(Scenario {
            simulation: SimulationConfig::default(),
            agents: design_triad(),
        }),
        _ => None,
    }
}

/// Points played in a [`tennis_match`] scenario.
pub const TENNIS_MATCH_POINTS: usize = 120;

/// Three-state player: focused, tired or distracted, winning or losing points.
pub fn tennis_basic(id: &str) -> AgentConfig {
    let focused_tired_distracted = |focused: [f64; 3], tired: [f64; 3]| {
        vec![focused.to_vec(), tired.to_vec(), vec![0.3, 0.3, 0.4]]
    };
    AgentConfig::new(
        id,
        &["focused", "tired", "distracted"],
        &["serve", "return", "smash"],
        &["win", "lose"],
        TransitionSpec::per_action(vec![
            focused_tired_distracted([0.8, 0.1, 0.1], [0.4, 0.5, 0.1]),
            focused_tired_distracted([0.7, 0.2, 0.1], [0.3, 0.6, 0.1]),
            focused_tired_distracted([0.6, 0.3, 0.1], [0.2, 0.7, 0.1]),
        ]),
        ObservationSpec::rows(vec![vec![0.8, 0.2], vec![0.5, 0.5], vec![0.3, 0.7]]),
    )
    .with_preferences(vec![0.8, 0.2])
    .with_filter(FilterConfig::default().with_log_epsilon(LOG_EPSILON_COARSE))
    .with_planner(
        PlannerConfig::default()
            .with_transitions(true)
            .with_log_epsilon(LOG_EPSILON_COARSE),
    )
}

/// Five-state match player with fatigue, pressure and progress effects.
pub fn tennis_match(id: &str) -> AgentConfig {
    let aggressive = vec!["smash".to_string(), "serve".to_string()];
    AgentConfig::new(
        id,
        &["aggressive", "defensive", "neutral", "tired", "focused"],
        &["serve", "return", "smash", "drop shot", "lob", "volley"],
        &["win", "lose", "forced error", "unforced error"],
        TransitionSpec::per_state(vec![
            vec![0.5, 0.2, 0.1, 0.1, 0.1],
            vec![0.2, 0.5, 0.2, 0.1, 0.0],
            vec![0.3, 0.3, 0.2, 0.1, 0.1],
            vec![0.1, 0.2, 0.2, 0.4, 0.1],
            vec![0.4, 0.2, 0.2, 0.1, 0.1],
        ])
        .with_rule(TransitionRule::FatigueAdjusted(InteractionFactors::default()))
        .with_fatigue(FatigueRule::default(), aggressive),
        ObservationSpec::rows(vec![
            vec![0.6, 0.2, 0.1, 0.1],
            vec![0.4, 0.3, 0.2, 0.1],
            vec![0.5, 0.2, 0.2, 0.1],
            vec![0.3, 0.4, 0.2, 0.1],
            vec![0.7, 0.1, 0.1, 0.1],
        ])
        .with_adjustment(LikelihoodAdjustment::default()),
    )
    .with_preferences(vec![0.5, 0.2, 0.2, 0.1])
    .with_initial_fatigue(0.1)
    .with_filter(FilterConfig::default().with_log_epsilon(LOG_EPSILON_COARSE))
    .with_planner(
        PlannerConfig::default()
            .with_horizon(3)
            .with_log_epsilon(LOG_EPSILON_COARSE),
    )
}

/// Weight given to each design agent's fixed prior.
pub const DESIGN_PRIOR_WEIGHT: f64 = 0.3;

/// Designer, artifact and user with random models, curiosity and fixed priors.
pub fn design_triad() -> Vec<AgentConfig> {
    vec![
        design_agent(
            "designer",
            &["exploring", "refining", "committed"],
            &["sketch", "test"],
            [0.5, 0.3, 0.2],
        ),
        design_agent(
            "artifact",
            &["draft", "prototype", "release"],
            &["revise", "hold"],
            [0.4, 0.4, 0.2],
        ),
        design_agent(
            "user",
            &["engaged", "neutral", "frustrated"],
            &["explore", "use"],
            [0.6, 0.2, 0.2],
        ),
    ]
}

/// Positions of the design agents in [`design_triad`] order.
pub const DESIGNER: usize = 0;
pub const ARTIFACT: usize = 1;
pub const USER: usize = 2;

/// Pairwise aggregates of the design triad's shared observables
#[derive(Debug, Clone, PartialEq)]
pub struct DesignAggregates {
    /// Mean of the designer's and the user's predicted observations
    pub engagement: Vec<f64>,
    /// Mean of the artifact's and the designer's predicted observations
    pub task_success: Vec<f64>,
}

impl DesignAggregates {
    /// `None` until a step has completed or when the context does not hold a
    /// design triad.
    pub fn from_context(context: &SharedContext) -> Option<Self> {
        if context.observables.len() != 3 {
            return None;
        }
        Some(Self {
            engagement: context.mean_of(&[DESIGNER, USER])?,
            task_success: context.mean_of(&[ARTIFACT, DESIGNER])?,
        })
    }
}

fn design_agent(id: &str, states: &[&str], actions: &[&str], prior: [f64; 3]) -> AgentConfig {
    AgentConfig::new(
        id,
        states,
        actions,
        &["positive", "neutral", "negative"],
        TransitionSpec::random(),
        ObservationSpec::random(),
    )
    .with_preferences(vec![0.6, 0.3, 0.1])
    .with_filter(
        FilterConfig::default()
            .with_curiosity(0.1)
            .with_prior(DESIGN_PRIOR_WEIGHT, prior.to_vec()),
    )
    .with_planner(PlannerConfig::default().with_horizon(2).with_transitions(true))
    .with_prediction(true)
}

/// Single design-tool user driven by the three tunable parameters.
///
/// `prediction` becomes the weight of a prior favouring the engaged state.
pub fn user_agent(precision: f64, curiosity: f64, prediction: f64) -> AgentConfig {
    AgentConfig::new(
        "user",
        &["engaged", "neutral", "frustrated"],
        &["explore", "use"],
        &["positive", "neutral", "negative"],
        TransitionSpec::per_action(vec![
            vec![
                vec![0.6, 0.3, 0.1],
                vec![0.4, 0.4, 0.2],
                vec![0.3, 0.3, 0.4],
            ],
            vec![
                vec![0.7, 0.2, 0.1],
                vec![0.3, 0.5, 0.2],
                vec![0.2, 0.4, 0.4],
            ],
        ]),
        ObservationSpec::rows(vec![
            vec![0.7, 0.2, 0.1],
            vec![0.3, 0.5, 0.2],
            vec![0.1, 0.3, 0.6],
        ]),
    )
    .with_preferences(vec![0.6, 0.3, 0.1])
    .with_filter(
        FilterConfig::default()
            .with_precision(precision)
            .with_curiosity(curiosity)
            .with_prior(prediction, vec![0.6, 0.2, 0.2]),
    )
    .with_planner(PlannerConfig::default().with_horizon(2).with_transitions(true))
    .with_prediction(true)
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::agent::Agent;

    #[test]
    fn every_preset_builds() {
        let mut rng = StdRng::seed_from_u64(17);
        for name in PRESET_NAMES {
            let scenario = by_name(name).unwrap();
            for config in scenario.agents {
                Agent::new(config, &mut rng).unwrap();
            }
        }
        Agent::new(user_agent(0.8, 0.2, 0.5), &mut rng).unwrap();
    }

    #[test]
    fn design_aggregates_pair_the_right_agents() {
        let context = SharedContext {
            observables: vec![
                vec![0.6, 0.3, 0.1],
                vec![0.2, 0.2, 0.6],
                vec![0.4, 0.5, 0.1],
            ],
            ..SharedContext::default()
        };
        let aggregates = DesignAggregates::from_context(&context).unwrap();
        let expected_engagement = [0.5, 0.4, 0.1];
        let expected_success = [0.4, 0.25, 0.35];
        for (got, want) in aggregates.engagement.iter().zip(expected_engagement) {
            assert!((got - want).abs() < 1e-12);
        }
        for (got, want) in aggregates.task_success.iter().zip(expected_success) {
            assert!((got - want).abs() < 1e-12);
        }
        assert_eq!(DesignAggregates::from_context(&SharedContext::default()), None);
    }

    #[test]
    fn unknown_preset_is_none() {
        assert!(by_name("chess").is_none());
    }
}
