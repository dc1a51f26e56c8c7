use super::Network;
use crate::agent::AgentId;
use crate::error::{ConsensusError, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal, Uniform};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Topology {
    Line,
    Ring,
    Star,
    Complete,
    Random { edge_probability: f64 },
    Isolated,
}

impl Topology {
    pub fn names() -> &'static [&'static str] {
        &["line", "ring", "star", "complete", "random", "isolated"]
    }

    /// `edge_probability` is only read for `random`.
    pub fn parse(name: &str, edge_probability: f64) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "line" | "path" => Ok(Self::Line),
            "ring" | "cycle" => Ok(Self::Ring),
            "star" => Ok(Self::Star),
            "complete" | "full" => Ok(Self::Complete),
            "random" | "erdos-renyi" => Ok(Self::Random { edge_probability }),
            "isolated" | "empty" => Ok(Self::Isolated),
            other => Err(ConsensusError::InvalidArgument(format!(
                "unknown topology: {}",
                other
            ))),
        }
    }

    fn edges(&self, n: AgentId, rng: &mut StdRng) -> Result<Vec<(AgentId, AgentId)>> {
        let edges = match self {
            Self::Line => (1..n).map(|i| (i - 1, i)).collect(),
            Self::Ring => {
                let mut edges: Vec<_> = (1..n).map(|i| (i - 1, i)).collect();
                if n > 2 {
                    edges.push((n - 1, 0));
                }
                edges
            }
            Self::Star => (1..n).map(|i| (0, i)).collect(),
            Self::Complete => (0..n)
                .flat_map(|a| (a + 1..n).map(move |b| (a, b)))
                .collect(),
            Self::Random { edge_probability } => {
                let p = *edge_probability;
                if !(0.0..=1.0).contains(&p) {
                    return Err(ConsensusError::InvalidArgument(format!(
                        "edge probability must be in [0, 1], got {}",
                        p
                    )));
                }
                let mut edges = Vec::new();
                for a in 0..n {
                    for b in a + 1..n {
                        if rng.gen_bool(p) {
                            edges.push((a, b));
                        }
                    }
                }
                edges
            }
            Self::Isolated => Vec::new(),
        };
        Ok(edges)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum InitialStates {
    /// Agent `i` starts at `start + i * step`.
    Linear { start: f64, step: f64 },
    Uniform { low: f64, high: f64 },
    Normal { mean: f64, std_dev: f64 },
    Explicit { values: Vec<f64> },
}

impl Default for InitialStates {
    fn default() -> Self {
        Self::Linear { start: 0.0, step: 10.0 }
    }
}

impl InitialStates {
    fn sample(&self, n: usize, rng: &mut StdRng) -> Result<Vec<f64>> {
        match self {
            Self::Linear { start, step } => {
                Ok((0..n).map(|i| start + i as f64 * step).collect())
            }
            Self::Uniform { low, high } => {
                if !low.is_finite() || !high.is_finite() || low > high {
                    return Err(ConsensusError::InvalidArgument(format!(
                        "uniform bounds must be finite with low <= high, got [{}, {}]",
                        low, high
                    )));
                }
                // Uniform::new_inclusive panics once its scale overflows
                if !(high - low).is_finite() || high - low > f64::MAX / 2.0 {
                    return Err(ConsensusError::InvalidArgument(format!(
                        "uniform range [{}, {}] is too wide to sample",
                        low, high
                    )));
                }
                let dist = Uniform::new_inclusive(*low, *high);
                Ok((0..n).map(|_| dist.sample(rng)).collect())
            }
            Self::Normal { mean, std_dev } => {
                if !mean.is_finite() || !std_dev.is_finite() {
                    return Err(ConsensusError::InvalidArgument(
                        "normal parameters must be finite".to_string(),
                    ));
                }
                let dist = Normal::new(*mean, *std_dev)
                    .map_err(|e| ConsensusError::InvalidArgument(e.to_string()))?;
                Ok((0..n).map(|_| dist.sample(rng)).collect())
            }
            Self::Explicit { values } => {
                if values.len() != n {
                    return Err(ConsensusError::InvalidArgument(format!(
                        "expected {} explicit initial values, got {}",
                        n,
                        values.len()
                    )));
                }
                Ok(values.clone())
            }
        }
    }
}

/// Builds `num_agents` agents with ids `0..num_agents`. The same seed always
/// yields the same states and edges.
pub fn build_network(
    topology: &Topology,
    initial: &InitialStates,
    num_agents: u32,
    seed: u64,
) -> Result<Network> {
    let mut rng = StdRng::seed_from_u64(seed);
    let states = initial.sample(num_agents as usize, &mut rng)?;
    let edges = topology.edges(num_agents, &mut rng)?;

    let mut network = Network::new();
    for (id, state) in (0..num_agents).zip(states) {
        network.add_agent(id, state)?;
    }
    for (a, b) in edges {
        network.add_edge(a, b)?;
    }
    Ok(network)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(topology: Topology, n: u32) -> Network {
        build_network(&topology, &InitialStates::default(), n, 7).unwrap()
    }

    #[test]
    fn edge_counts_per_topology() {
        assert_eq!(build(Topology::Line, 5).edge_count(), 4);
        assert_eq!(build(Topology::Ring, 5).edge_count(), 5);
        assert_eq!(build(Topology::Ring, 2).edge_count(), 1);
        assert_eq!(build(Topology::Star, 5).edge_count(), 4);
        assert_eq!(build(Topology::Complete, 5).edge_count(), 10);
        assert_eq!(build(Topology::Isolated, 5).edge_count(), 0);
    }

    #[test]
    fn single_agent_ring_has_no_self_loop() {
        let network = build(Topology::Ring, 1);
        assert_eq!(network.len(), 1);
        assert_eq!(network.edge_count(), 0);
    }

    #[test]
    fn linear_states() {
        let network = build(Topology::Line, 4);
        let values: Vec<f64> = network.get_all_values().into_values().collect();
        assert_eq!(values, vec![0.0, 10.0, 20.0, 30.0]);
    }

    #[test]
    fn random_is_deterministic_per_seed() {
        let topology = Topology::Random { edge_probability: 0.4 };
        let initial = InitialStates::Normal { mean: 0.0, std_dev: 5.0 };
        let a = build_network(&topology, &initial, 20, 99).unwrap();
        let b = build_network(&topology, &initial, 20, 99).unwrap();

        assert_eq!(a.get_all_values(), b.get_all_values());
        for agent in a.agents() {
            assert_eq!(Some(agent.neighbors()), b.neighbors_of(agent.id()).ok());
        }
    }

    #[test]
    fn random_rejects_bad_probability() {
        let result = build_network(
            &Topology::Random { edge_probability: 1.5 },
            &InitialStates::default(),
            4,
            0,
        );
        assert!(matches!(result, Err(ConsensusError::InvalidArgument(_))));
    }

    #[test]
    fn uniform_states_stay_in_bounds() {
        let initial = InitialStates::Uniform { low: -1.0, high: 1.0 };
        let network = build_network(&Topology::Complete, &initial, 50, 3).unwrap();
        assert!(network.agents().all(|a| (-1.0..=1.0).contains(&a.state())));
    }

    #[test]
    fn uniform_rejects_overflowing_range() {
        for (low, high) in [(-1e308, 1e308), (0.0, f64::MAX), (2.0, 1.0), (0.0, f64::INFINITY)] {
            let initial = InitialStates::Uniform { low, high };
            assert!(
                matches!(
                    build_network(&Topology::Line, &initial, 4, 0),
                    Err(ConsensusError::InvalidArgument(_))
                ),
                "[{}, {}] accepted",
                low,
                high
            );
        }

        let initial = InitialStates::Uniform { low: -1e300, high: 1e300 };
        let network = build_network(&Topology::Line, &initial, 4, 0).unwrap();
        assert!(network.agents().all(|a| a.state().is_finite()));
    }

    #[test]
    fn explicit_length_must_match() {
        let initial = InitialStates::Explicit { values: vec![1.0, 2.0] };
        assert!(build_network(&Topology::Line, &initial, 3, 0).is_err());
    }

    #[test]
    fn parse_names() {
        for name in Topology::names() {
            assert!(Topology::parse(name, 0.5).is_ok());
        }
        assert_eq!(Topology::parse("RING", 0.0), Ok(Topology::Ring));
        assert!(Topology::parse("hypercube", 0.0).is_err());
    }

    #[test]
    fn serde_tags_are_kebab_case() {
        let json = serde_json::to_string(&Topology::Random { edge_probability: 0.25 }).unwrap();
        assert_eq!(json, r#"{"kind":"random","edge_probability":0.25}"#);
        let back: Topology = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Topology::Random { edge_probability: 0.25 });
    }
}
