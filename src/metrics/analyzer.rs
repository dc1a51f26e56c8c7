use super::RoundSnapshot;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceReport {
    pub name: String,
    pub rounds: usize,
    pub converged: bool,
    pub initial_spread: f64,
    pub final_spread: f64,
    pub final_mean: f64,
    /// Geometric mean of `spread[r] / spread[r-1]`, i.e. the average factor
    /// the disagreement shrinks by per round.
    pub mean_contraction: Option<f64>,
}

/// A run converged when its last round moved no agent by more than `epsilon`.
/// A run with no rounds (empty network) stopped immediately and counts as
/// converged.
pub fn converged(last: Option<&RoundSnapshot>, epsilon: f64) -> bool {
    last.is_none_or(|s| s.max_delta <= epsilon)
}

pub fn analyze(
    snapshots: &[RoundSnapshot],
    name: &str,
    epsilon: f64,
    initial_spread: f64,
) -> ConvergenceReport {
    let last = snapshots.last();

    ConvergenceReport {
        name: name.to_string(),
        rounds: snapshots.len(),
        converged: converged(last, epsilon),
        initial_spread,
        final_spread: last.map_or(initial_spread, |s| s.spread),
        final_mean: last.map_or(0.0, |s| s.mean),
        mean_contraction: mean_contraction(initial_spread, snapshots),
    }
}

fn mean_contraction(initial_spread: f64, snapshots: &[RoundSnapshot]) -> Option<f64> {
    let last = snapshots.last()?;
    // Ratio is undefined once there is no disagreement to shrink
    if initial_spread <= 0.0 || last.spread <= 0.0 {
        return None;
    }
    let log_ratio = (last.spread / initial_spread).ln();
    Some((log_ratio / snapshots.len() as f64).exp())
}

pub fn export_json(report: &ConvergenceReport, path: impl AsRef<Path>) -> Result<()> {
    std::fs::write(path, serde_json::to_string_pretty(report)?)?;
    Ok(())
}
