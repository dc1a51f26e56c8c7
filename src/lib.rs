pub mod agent;
pub mod error;
pub mod network;
pub mod metrics;
pub mod simulation;

pub use agent::{Agent, AgentId};
pub use error::{ConsensusError, Result};
pub use network::Network;
pub use simulation::{ConsensusSimulation, Experiment, RoundReport, SimConfig};
pub use metrics::MetricsCollector;

pub mod prelude {
    pub use crate::agent::{Agent, AgentId};
    pub use crate::error::ConsensusError;
    pub use crate::network::{InitialStates, Network, Topology};
    pub use crate::simulation::{ConsensusSimulation, Experiment, RoundReport, SimConfig};
    pub use crate::metrics::RoundSnapshot;
}
