use crate::agent::AgentId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConsensusError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Agent {0} already exists")]
    DuplicateAgent(AgentId),

    #[error("Agent {0} not found in the network")]
    UnknownAgent(AgentId),

    #[error("Agent {0} cannot be its own neighbor")]
    SelfLoop(AgentId),
}

pub type Result<T> = std::result::Result<T, ConsensusError>;
