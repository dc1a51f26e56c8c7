use crate::error::{ConsensusError, Result};
use crate::network::{InitialStates, Topology};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub name: String,
    pub topology: Topology,
    pub num_agents: u32,
    pub initial_states: InitialStates,
    pub step_size: f64,
    pub max_rounds: usize,
    pub epsilon: f64,
    pub parallel: bool,
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            name: "default_sim".to_string(),
            topology: Topology::Ring,
            num_agents: 16,
            initial_states: InitialStates::default(),
            step_size: 0.5,
            max_rounds: 1000,
            epsilon: 1e-4,
            parallel: false,
            seed: 42,
        }
    }
}

impl SimConfig {
    /// Loads a JSON config; missing fields fall back to the defaults.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_topology(mut self, topology: Topology) -> Self {
        self.topology = topology;
        self
    }

    pub fn with_step_size(mut self, step_size: f64) -> Self {
        self.step_size = step_size;
        self
    }

    pub fn with_rounds(mut self, max_rounds: usize, epsilon: f64) -> Self {
        self.max_rounds = max_rounds;
        self.epsilon = epsilon;
        self
    }

    /// Catches bad run parameters before any network gets built.
    pub fn validate(&self) -> Result<()> {
        if !(self.step_size > 0.0 && self.step_size <= 1.0) {
            return Err(ConsensusError::InvalidArgument(format!(
                "step_size must be in (0, 1], got {}",
                self.step_size
            )));
        }
        if self.max_rounds == 0 {
            return Err(ConsensusError::InvalidArgument(
                "max_rounds must be positive".to_string(),
            ));
        }
        if !self.epsilon.is_finite() || self.epsilon < 0.0 {
            return Err(ConsensusError::InvalidArgument(format!(
                "epsilon must be finite and non-negative, got {}",
                self.epsilon
            )));
        }
        Ok(())
    }
}
