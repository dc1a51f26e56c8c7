//! End-to-end behaviour of the consensus engine through the public API.

use consensim::prelude::*;
use proptest::prelude::*;

fn line_example() -> Network {
    let mut network = Network::new();
    for (id, state) in [(0, 10.0), (1, 0.0), (2, 20.0), (3, 30.0)] {
        network.add_agent(id, state).unwrap();
    }
    network.add_edge(0, 1).unwrap();
    network.add_edge(1, 2).unwrap();
    network.add_edge(2, 3).unwrap();
    network
}

/// Random connected graph: a spanning path plus extra edges.
fn connected_network(states: &[f64], extra: &[(usize, usize)]) -> Network {
    let mut network = Network::new();
    for (id, state) in states.iter().enumerate() {
        network.add_agent(id as AgentId, *state).unwrap();
    }
    for id in 1..states.len() as AgentId {
        network.add_edge(id - 1, id).unwrap();
    }
    for &(a, b) in extra {
        let (a, b) = (a % states.len(), b % states.len());
        if a != b {
            network.add_edge(a as AgentId, b as AgentId).unwrap();
        }
    }
    network
}

#[test]
fn worked_example_end_to_end() {
    let mut network = line_example();
    let mut last_delta = f64::INFINITY;
    let rounds = ConsensusSimulation::new(&mut network, 0.5)
        .unwrap()
        .run_with(1000, 1e-4, |report| last_delta = report.max_delta)
        .unwrap();

    assert!(rounds < 1000);
    assert!(last_delta <= 1e-4);

    let values: Vec<f64> = network.get_all_values().into_values().collect();
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    assert!(max - min < 1e-2, "values still apart: {:?}", values);

    // end nodes have degree 1, so the limit is the degree-weighted mean
    let weighted = (10.0 + 2.0 * 0.0 + 2.0 * 20.0 + 30.0) / 6.0;
    assert!((values[0] - weighted).abs() < 1e-2);
}

#[test]
fn validation_rejections() {
    let mut network = Network::new();
    assert!(matches!(
        network.add_agent(0, f64::NAN),
        Err(ConsensusError::InvalidArgument(_))
    ));
    assert_eq!(network.add_edge(5, 6), Err(ConsensusError::UnknownAgent(5)));

    let mut network = line_example();
    assert!(ConsensusSimulation::new(&mut network, 1.5).is_err());

    let mut sim = ConsensusSimulation::new(&mut network, 0.5).unwrap();
    assert!(matches!(sim.run(0, 1e-3), Err(ConsensusError::InvalidArgument(_))));
}

#[test]
fn failed_edge_leaves_neighbors_unchanged() {
    let mut network = line_example();
    let before: Vec<_> = network.agents().map(|a| a.neighbors().clone()).collect();

    assert!(network.add_edge(1, 42).is_err());
    assert!(network.add_edge(2, 2).is_err());

    let after: Vec<_> = network.agents().map(|a| a.neighbors().clone()).collect();
    assert_eq!(before, after);
}

#[test]
fn disconnected_components_settle_separately() {
    let mut network = Network::new();
    for (id, state) in [(0, 0.0), (1, 10.0), (2, 100.0), (3, 200.0)] {
        network.add_agent(id, state).unwrap();
    }
    network.add_edge(0, 1).unwrap();
    network.add_edge(2, 3).unwrap();

    ConsensusSimulation::new(&mut network, 0.5)
        .unwrap()
        .run(1000, 1e-9)
        .unwrap();

    let values = network.get_all_values();
    assert!((values[&0] - 5.0).abs() < 1e-6);
    assert!((values[&1] - 5.0).abs() < 1e-6);
    assert!((values[&2] - 150.0).abs() < 1e-6);
    assert!((values[&3] - 150.0).abs() < 1e-6);
}

#[test]
fn second_run_continues_from_committed_state() {
    let mut network = line_example();
    let mut sim = ConsensusSimulation::new(&mut network, 0.5).unwrap();
    assert_eq!(sim.run(3, 0.0), Ok(3));
    assert_eq!(sim.run(2, 0.0), Ok(2));
    assert_eq!(sim.current_round(), 5);
}

#[test]
fn experiment_from_config() {
    let config = SimConfig {
        name: "star".to_string(),
        topology: Topology::Star,
        num_agents: 9,
        initial_states: InitialStates::Uniform { low: -5.0, high: 5.0 },
        ..SimConfig::default()
    };
    let mut experiment = Experiment::new(config).with_progress(false);
    let outcome = experiment.run().unwrap();

    assert!(outcome.converged);
    assert_eq!(outcome.final_values.len(), 9);
    assert_eq!(experiment.metrics.len(), outcome.rounds);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn spread_never_increases(
        states in prop::collection::vec(-1000.0..1000.0f64, 2..12),
        extra in prop::collection::vec((0..12usize, 0..12usize), 0..10),
        step_size in 0.05..=1.0f64,
    ) {
        let mut network = connected_network(&states, &extra);
        let mut previous = network.spread();
        let mut sim = ConsensusSimulation::new(&mut network, step_size).unwrap();

        for _ in 0..50 {
            let report = sim.step();
            prop_assert!(
                report.spread <= previous + 1e-9 * previous.max(1.0),
                "spread grew from {} to {}", previous, report.spread
            );
            previous = report.spread;
        }
    }

    #[test]
    fn huge_states_stay_finite(
        states in prop::collection::vec(prop::num::f64::NORMAL, 2..10),
        extra in prop::collection::vec((0..10usize, 0..10usize), 0..8),
        step_size in 0.05..=1.0f64,
    ) {
        let mut network = connected_network(&states, &extra);
        let mut sim = ConsensusSimulation::new(&mut network, step_size).unwrap();
        let mut previous = f64::INFINITY;

        for _ in 0..30 {
            let report = sim.step();
            prop_assert!(sim.network().agents().all(|a| a.state().is_finite()));
            prop_assert!(report.mean.is_finite());
            prop_assert!(report.spread <= previous);
            previous = report.spread;
        }
    }

    #[test]
    fn connected_graphs_converge_or_hit_the_cap(
        states in prop::collection::vec(-100.0..100.0f64, 1..10),
        extra in prop::collection::vec((0..10usize, 0..10usize), 0..8),
        step_size in 0.1..0.9f64,
        epsilon in 1e-6..1e-2f64,
    ) {
        let mut network = connected_network(&states, &extra);
        let mut last_delta = None;
        let rounds = ConsensusSimulation::new(&mut network, step_size)
            .unwrap()
            .run_with(2000, epsilon, |report| last_delta = Some(report.max_delta))
            .unwrap();

        prop_assert!(rounds >= 1 && rounds <= 2000);
        let last_delta = last_delta.unwrap();
        prop_assert!(last_delta <= epsilon || rounds == 2000);
    }

    #[test]
    fn isolated_agents_never_move(
        state in -1e6..1e6f64,
        rounds in 1..100usize,
        step_size in 0.01..=1.0f64,
    ) {
        let mut network = line_example();
        network.add_agent(99, state).unwrap();
        let _ = ConsensusSimulation::new(&mut network, step_size)
            .unwrap()
            .run(rounds, 0.0)
            .unwrap();
        prop_assert_eq!(network.get_value(99), Ok(state));
    }

    #[test]
    fn singleton_converges_in_exactly_one_round(
        state in -1e6..1e6f64,
        epsilon in 0.0..1.0f64,
    ) {
        let mut network = Network::new();
        network.add_agent(0, state).unwrap();
        let rounds = ConsensusSimulation::new(&mut network, 0.5)
            .unwrap()
            .run(1000, epsilon)
            .unwrap();
        prop_assert_eq!(rounds, 1);
    }

    #[test]
    fn parallel_and_sequential_agree(
        states in prop::collection::vec(-50.0..50.0f64, 1..16),
        extra in prop::collection::vec((0..16usize, 0..16usize), 0..20),
    ) {
        let mut sequential = connected_network(&states, &extra);
        let mut parallel = sequential.clone();

        let a = ConsensusSimulation::new(&mut sequential, 0.5).unwrap().run(200, 1e-8).unwrap();
        let b = ConsensusSimulation::new(&mut parallel, 0.5)
            .unwrap()
            .with_parallel(true)
            .run(200, 1e-8)
            .unwrap();

        prop_assert_eq!(a, b);
        prop_assert_eq!(sequential.get_all_values(), parallel.get_all_values());
    }
}
