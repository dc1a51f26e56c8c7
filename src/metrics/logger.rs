use super::RoundSnapshot;
use crate::agent::AgentId;
use anyhow::Result;
use csv::Writer;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

#[derive(Serialize)]
struct FinalState {
    agent_id: AgentId,
    state: f64,
}

/// CSV sink for one export file. Use one logger per file: either the round
/// history or the final agent states, since the header comes from the first
/// row written.
pub struct MetricsLogger {
    writer: Writer<File>,
    rows: usize,
}

impl MetricsLogger {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let writer = Writer::from_path(path)?;
        Ok(Self { writer, rows: 0 })
    }

    pub fn write_rounds(&mut self, snapshots: &[RoundSnapshot]) -> Result<()> {
        for snapshot in snapshots {
            self.writer.serialize(snapshot)?;
        }
        self.rows += snapshots.len();
        Ok(())
    }

    pub fn write_final_states(&mut self, values: &BTreeMap<AgentId, f64>) -> Result<()> {
        for (&agent_id, &state) in values {
            self.writer.serialize(FinalState { agent_id, state })?;
        }
        self.rows += values.len();
        Ok(())
    }

    /// Flushes and returns the number of data rows written.
    pub fn finish(mut self) -> Result<usize> {
        self.writer.flush()?;
        Ok(self.rows)
    }
}
