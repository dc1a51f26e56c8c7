use crate::error::{ConsensusError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub type AgentId = u32;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    id: AgentId,
    state: f64,
    neighbors: BTreeSet<AgentId>,
}

impl Agent {
    pub fn new(id: AgentId, initial_state: f64) -> Result<Self> {
        if !initial_state.is_finite() {
            return Err(ConsensusError::InvalidArgument(format!(
                "initial state of agent {} must be finite, got {}",
                id, initial_state
            )));
        }

        Ok(Self {
            id,
            state: initial_state,
            neighbors: BTreeSet::new(),
        })
    }

    /// Re-adding a known neighbor is a no-op.
    pub fn add_neighbor(&mut self, id: AgentId) -> Result<()> {
        if id == self.id {
            return Err(ConsensusError::SelfLoop(id));
        }
        self.neighbors.insert(id);
        Ok(())
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn state(&self) -> f64 {
        self.state
    }

    pub fn neighbors(&self) -> &BTreeSet<AgentId> {
        &self.neighbors
    }

    pub fn degree(&self) -> usize {
        self.neighbors.len()
    }

    pub fn is_isolated(&self) -> bool {
        self.neighbors.is_empty()
    }

    // Only the simulation commit writes here
    pub(crate) fn set_state(&mut self, state: f64) {
        self.state = state;
    }
}
