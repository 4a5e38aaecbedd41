//! End-to-end simulation runs, trace shape and export

use std::sync::{Arc, Mutex};

use aif_pomdp::{
    Error, OpponentPairing, Result, Scenario, SharedContext, Simulation, SimulationConfig,
    SimulationTrace, TraceRecord,
    design::simulate_user,
    ports::Observer,
    presets::{self, DesignAggregates, tennis_basic, tennis_match},
};
use tempfile::tempdir;

/// Records the order observers are notified in
struct OrderObserver {
    events: Arc<Mutex<Vec<String>>>,
}

impl Observer for OrderObserver {
    fn on_simulation_start(&mut self, total_steps: usize, agent_ids: &[String]) -> Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(format!("start {total_steps} {}", agent_ids.join(",")));
        Ok(())
    }

    fn on_agent_step(&mut self, record: &TraceRecord) -> Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(format!("{}:{}", record.step_index, record.agent_id));
        Ok(())
    }

    fn on_step_end(&mut self, step: usize, context: &SharedContext) -> Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(format!("end {step} {}", context.observables.len()));
        Ok(())
    }

    fn on_simulation_end(&mut self, trace: &SimulationTrace) -> Result<()> {
        self.events
            .lock()
            .unwrap()
            .push(format!("done {}", trace.len()));
        Ok(())
    }
}

fn match_simulation(steps: usize, seed: u64) -> Simulation {
    let config = SimulationConfig::default().with_steps(steps).with_seed(seed);
    Simulation::new(config, vec![tennis_match("player1"), tennis_match("player2")]).unwrap()
}

#[test]
fn test_trace_has_one_record_per_agent_per_step() {
    let trace = match_simulation(30, 11).run().unwrap();
    assert_eq!(trace.len(), 60);
    for id in ["player1", "player2"] {
        assert_eq!(trace.vfe_series(id).len(), 30);
        for step in trace.for_agent(id) {
            assert_eq!(step.belief.len(), 5);
            assert!((step.belief.iter().sum::<f64>() - 1.0).abs() < 1e-6);
            assert!(step.vfe.is_finite());
            assert!(step.efe.is_finite());
            assert!((0.0..=1.0).contains(&step.fatigue));
        }
    }
}

#[test]
fn test_agents_step_in_configured_order() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let mut simulation = match_simulation(2, 3).with_observer(Box::new(OrderObserver {
        events: Arc::clone(&events),
    }));
    simulation.run().unwrap();

    let events = events.lock().unwrap();
    assert_eq!(
        *events,
        vec![
            "start 2 player1,player2",
            "0:player1",
            "0:player2",
            "end 0 2",
            "1:player1",
            "1:player2",
            "end 1 2",
            "done 4",
        ]
    );
}

#[test]
fn test_fatigue_accumulates_over_a_match() {
    let trace = match_simulation(50, 5).run().unwrap();
    let fatigue: Vec<f64> = trace.for_agent("player1").map(|s| s.fatigue).collect();
    assert!(fatigue.windows(2).all(|w| w[1] >= w[0]));
    // every point costs at least the base increment
    assert!(fatigue[0] >= 0.11 - 1e-12);
}

#[test]
fn test_same_seed_reproduces_the_trace() {
    let a = match_simulation(20, 99).run().unwrap();
    let b = match_simulation(20, 99).run().unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_shared_engagement_after_run() {
    let mut simulation = Simulation::new(
        SimulationConfig::default().with_steps(5).with_seed(1),
        presets::design_triad(),
    )
    .unwrap();
    simulation.run().unwrap();
    let engagement = simulation.context().engagement().unwrap();
    assert_eq!(engagement.len(), 3);
    assert!((engagement.iter().sum::<f64>() - 1.0).abs() < 1e-9);

    let aggregates = DesignAggregates::from_context(simulation.context()).unwrap();
    assert_eq!(
        Some(aggregates.engagement),
        simulation.context().mean_of(&[presets::DESIGNER, presets::USER])
    );
    assert!((aggregates.task_success.iter().sum::<f64>() - 1.0).abs() < 1e-9);
}

#[test]
fn test_duplicate_agent_ids_are_rejected() {
    let err = Simulation::new(
        SimulationConfig::default(),
        vec![tennis_basic("p"), tennis_basic("p")],
    )
    .unwrap_err();
    assert!(matches!(err, Error::InvalidConfiguration { .. }));
    assert!(err.to_string().contains("duplicate agent id 'p'"));
    assert!(Simulation::new(SimulationConfig::default(), Vec::new()).is_err());
}

#[test]
fn test_simulate_user_returns_trace_and_summary() {
    let run = simulate_user(0.8, 0.2, 0.5, 100, Some(21)).unwrap();
    assert_eq!(run.trace.len(), 100);
    let last = run.trace.last_for("user").unwrap();
    assert_eq!(run.summary.final_vfe, last.vfe);
    assert_eq!(run.summary.final_efe, last.efe);
    let text = run.summary.to_string();
    assert!(text.starts_with("Precision: 0.80\nCuriosity: 0.20\nPrediction: 0.50\n"));
    assert!(simulate_user(1.5, 0.2, 0.5, 10, None).is_err());
}

#[test]
fn test_trace_exports_round_trip() {
    let trace = match_simulation(10, 8).run().unwrap();
    let dir = tempdir().unwrap();

    let json = dir.path().join("trace.json");
    trace.write_json(&json).unwrap();
    let loaded = SimulationTrace::read_json(&json).unwrap();
    assert_eq!(loaded.len(), trace.len());
    for (a, b) in loaded.records().iter().zip(trace.records()) {
        assert_eq!(a.agent_id, b.agent_id);
        assert_eq!(a.step.action_label, b.step.action_label);
        assert!((a.step.vfe - b.step.vfe).abs() < 1e-12);
    }

    let csv = dir.path().join("trace.csv");
    trace.write_csv(&csv).unwrap();
    let text = std::fs::read_to_string(&csv).unwrap();
    let mut lines = text.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("step_index,agent_id,state,state_label"));
    assert_eq!(lines.count(), 20);
}

#[test]
fn test_scenario_file_round_trip() {
    let scenario = Scenario {
        simulation: SimulationConfig::default()
            .with_steps(12)
            .with_seed(4)
            .with_pairing(OpponentPairing::Isolated),
        agents: vec![tennis_basic("a"), tennis_match("b")],
    };
    let dir = tempdir().unwrap();
    let path = dir.path().join("scenario.json");
    scenario.save(&path).unwrap();
    let loaded = Scenario::load(&path).unwrap();
    assert_eq!(loaded, scenario);

    let trace = Simulation::from_scenario(loaded).unwrap().run().unwrap();
    assert_eq!(trace.len(), 24);
}
