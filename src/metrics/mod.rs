pub mod logger;
pub mod analyzer;

use crate::simulation::RoundReport;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use parking_lot::RwLock;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundSnapshot {
    pub round: usize,
    pub max_delta: f64,
    pub spread: f64,
    pub mean: f64,
}

impl From<&RoundReport> for RoundSnapshot {
    fn from(report: &RoundReport) -> Self {
        Self {
            round: report.round,
            max_delta: report.max_delta,
            spread: report.spread,
            mean: report.mean,
        }
    }
}

/// Cheap to clone, every clone records into the same history.
#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    inner: Arc<RwLock<Vec<RoundSnapshot>>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, report: &RoundReport) {
        let mut snapshots = self.inner.write();

        if let Some(last) = snapshots.last() {
            // Synchronous averaging never widens the spread, so this means a bug
            if report.spread > last.spread + 1e-9 * last.spread.abs().max(1.0) {
                warn!(
                    "Spread grew from {:.6} to {:.6} in round {}",
                    last.spread, report.spread, report.round
                );
            }
        }

        snapshots.push(RoundSnapshot::from(report));
    }

    pub fn snapshots(&self) -> Vec<RoundSnapshot> {
        self.inner.read().clone()
    }

    pub fn last(&self) -> Option<RoundSnapshot> {
        self.inner.read().last().cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }
}
