pub mod topology;

pub use topology::{InitialStates, Topology, build_network};

use crate::agent::{Agent, AgentId};
use crate::error::{ConsensusError, Result};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Undirected, unweighted agent graph. Owns every [`Agent`] and keeps the
/// adjacency symmetric: if `a` lists `b`, `b` lists `a`.
///
/// Agents are stored by ascending id, so every iteration (and therefore every
/// simulation run) visits them in the same order.
#[derive(Debug, Clone, Default)]
pub struct Network {
    agents: BTreeMap<AgentId, Agent>,
}

impl Network {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_agent(&mut self, id: AgentId, initial_state: f64) -> Result<()> {
        if self.agents.contains_key(&id) {
            return Err(ConsensusError::DuplicateAgent(id));
        }
        let agent = Agent::new(id, initial_state)?;
        self.agents.insert(id, agent);
        Ok(())
    }

    /// Links `id_a` and `id_b` both ways. Every check runs before either
    /// neighbor set is touched, so a failed call changes nothing.
    pub fn add_edge(&mut self, id_a: AgentId, id_b: AgentId) -> Result<()> {
        for id in [id_a, id_b] {
            if !self.agents.contains_key(&id) {
                return Err(ConsensusError::UnknownAgent(id));
            }
        }
        if id_a == id_b {
            return Err(ConsensusError::SelfLoop(id_a));
        }

        self.agent_mut(id_a)?.add_neighbor(id_b)?;
        self.agent_mut(id_b)?.add_neighbor(id_a)?;
        Ok(())
    }

    pub fn get_value(&self, id: AgentId) -> Result<f64> {
        self.agents
            .get(&id)
            .map(Agent::state)
            .ok_or(ConsensusError::UnknownAgent(id))
    }

    pub fn get_all_values(&self) -> BTreeMap<AgentId, f64> {
        self.agents
            .iter()
            .map(|(id, agent)| (*id, agent.state()))
            .collect()
    }

    pub fn neighbors_of(&self, id: AgentId) -> Result<&BTreeSet<AgentId>> {
        self.agents
            .get(&id)
            .map(Agent::neighbors)
            .ok_or(ConsensusError::UnknownAgent(id))
    }

    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.agents.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.agents.values().map(Agent::degree).sum::<usize>() / 2
    }

    /// Max minus min over all states, 0 for an empty network. Saturates to
    /// infinity when the range itself is wider than `f64::MAX`.
    pub fn spread(&self) -> f64 {
        let mut states = self.agents.values().map(Agent::state);
        let Some(first) = states.next() else {
            return 0.0;
        };
        let (min, max) = states.fold((first, first), |(lo, hi), s| (lo.min(s), hi.max(s)));
        max - min
    }

    pub fn mean(&self) -> Option<f64> {
        bounded_mean(self.agents.values().map(Agent::state))
    }

    /// Components in ascending order of their smallest id; ids inside each
    /// component are ascending too.
    pub fn connected_components(&self) -> Vec<Vec<AgentId>> {
        let mut seen: BTreeSet<AgentId> = BTreeSet::new();
        let mut components = Vec::new();

        for &start in self.agents.keys() {
            if !seen.insert(start) {
                continue;
            }

            let mut component = vec![start];
            let mut queue = VecDeque::from([start]);
            while let Some(id) = queue.pop_front() {
                for &next in self.agents[&id].neighbors() {
                    if seen.insert(next) {
                        component.push(next);
                        queue.push_back(next);
                    }
                }
            }

            component.sort_unstable();
            components.push(component);
        }

        components
    }

    pub fn is_connected(&self) -> bool {
        self.connected_components().len() <= 1
    }

    fn agent_mut(&mut self, id: AgentId) -> Result<&mut Agent> {
        self.agents
            .get_mut(&id)
            .ok_or(ConsensusError::UnknownAgent(id))
    }

    /// Writes one round's values back. `states` is in ascending id order.
    pub(crate) fn commit_states(&mut self, states: &[f64]) {
        debug_assert_eq!(states.len(), self.agents.len());
        for (agent, &state) in self.agents.values_mut().zip(states) {
            agent.set_state(state);
        }
    }
}

/// Arithmetic mean that stays finite for finite inputs: every term is scaled
/// down before summing, and the result is clamped to the inputs' range.
pub(crate) fn bounded_mean<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = f64>,
    I::IntoIter: Clone,
{
    let values = values.into_iter();
    let n = values.clone().count();
    if n == 0 {
        return None;
    }
    let (lo, hi) = values
        .clone()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| (lo.min(x), hi.max(x)));
    let sum: f64 = values.map(|x| x / n as f64).sum();
    Some(sum.clamp(lo, hi))
}
