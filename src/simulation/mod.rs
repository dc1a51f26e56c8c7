pub mod config;
pub mod experiment;

pub use config::SimConfig;
pub use experiment::{Experiment, ExperimentOutcome};

use crate::error::{ConsensusError, Result};
use crate::network::{Network, bounded_mean};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// What one committed round did to the network.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoundReport {
    pub round: usize,
    /// Largest `|x_i' - x_i|` over all agents this round.
    pub max_delta: f64,
    /// Max minus min state after the commit.
    pub spread: f64,
    pub mean: f64,
}

/// Synchronous average-consensus over a borrowed [`Network`].
///
/// Every round reads one pre-round snapshot (`current`), writes all new values
/// into a second buffer (`next`), then swaps the buffers and commits them to
/// the network. No agent ever sees a value produced in the same round, so the
/// order agents are visited in cannot change the result.
pub struct ConsensusSimulation<'a> {
    network: &'a mut Network,
    step_size: f64,
    current_round: usize,
    parallel: bool,
    // position -> neighbor positions, positions follow ascending agent id
    adjacency: Vec<Vec<usize>>,
    current: Vec<f64>,
    next: Vec<f64>,
}

impl<'a> ConsensusSimulation<'a> {
    pub fn new(network: &'a mut Network, step_size: f64) -> Result<Self> {
        if !(step_size > 0.0 && step_size <= 1.0) {
            return Err(ConsensusError::InvalidArgument(format!(
                "step_size must be in (0, 1], got {}",
                step_size
            )));
        }

        let positions: HashMap<_, _> = network
            .agents()
            .enumerate()
            .map(|(pos, agent)| (agent.id(), pos))
            .collect();
        let adjacency: Vec<Vec<usize>> = network
            .agents()
            .map(|agent| agent.neighbors().iter().map(|id| positions[id]).collect())
            .collect();
        let current: Vec<f64> = network.agents().map(|agent| agent.state()).collect();
        let next = vec![0.0; current.len()];

        Ok(Self {
            network,
            step_size,
            current_round: 0,
            parallel: false,
            adjacency,
            current,
            next,
        })
    }

    /// Spread the per-agent computation of each round over the rayon pool.
    /// Results are identical to the sequential path.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn step_size(&self) -> f64 {
        self.step_size
    }

    pub fn current_round(&self) -> usize {
        self.current_round
    }

    pub fn network(&self) -> &Network {
        &*self.network
    }

    /// Runs until a round moves no agent by more than `epsilon`, or until
    /// `max_rounds` rounds have executed. Returns the rounds executed by this
    /// call, including the converging one.
    pub fn run(&mut self, max_rounds: usize, epsilon: f64) -> Result<usize> {
        self.run_with(max_rounds, epsilon, |_| {})
    }

    /// Same as [`run`](Self::run), calling `observer` after each commit.
    pub fn run_with<F>(&mut self, max_rounds: usize, epsilon: f64, mut observer: F) -> Result<usize>
    where
        F: FnMut(&RoundReport),
    {
        if max_rounds == 0 {
            return Err(ConsensusError::InvalidArgument(
                "max_rounds must be positive".to_string(),
            ));
        }
        if !epsilon.is_finite() || epsilon < 0.0 {
            return Err(ConsensusError::InvalidArgument(format!(
                "epsilon must be finite and non-negative, got {}",
                epsilon
            )));
        }

        if self.current.is_empty() {
            debug!("Empty network, nothing to simulate");
            return Ok(0);
        }

        info!(
            "Running consensus: {} agents, step_size {}, epsilon {:e}, max {} rounds",
            self.current.len(),
            self.step_size,
            epsilon,
            max_rounds
        );

        let mut executed = 0;
        while executed < max_rounds {
            let report = self.step();
            executed += 1;
            observer(&report);

            if report.max_delta <= epsilon {
                info!(
                    "Converged after {} rounds (max delta {:e})",
                    executed, report.max_delta
                );
                return Ok(executed);
            }
        }

        warn!(
            "Stopped at max_rounds = {} without converging (spread {:.6})",
            max_rounds,
            self.network.spread()
        );
        Ok(executed)
    }

    /// Executes exactly one synchronous round and commits it.
    pub fn step(&mut self) -> RoundReport {
        self.compute_next();

        let max_delta = self
            .current
            .iter()
            .zip(&self.next)
            .map(|(old, new)| (new - old).abs())
            .fold(0.0, f64::max);

        std::mem::swap(&mut self.current, &mut self.next);
        self.network.commit_states(&self.current);
        self.current_round += 1;

        let report = RoundReport {
            round: self.current_round,
            max_delta,
            spread: self.network.spread(),
            mean: self.network.mean().unwrap_or(0.0),
        };
        debug!(
            "Round {}: max delta {:e}, spread {:.6}",
            report.round, report.max_delta, report.spread
        );
        report
    }

    // Reads only `current`; `next` is fully written before anyone looks at it.
    fn compute_next(&mut self) {
        let snapshot = &self.current;
        let adjacency = &self.adjacency;
        let step_size = self.step_size;
        let update = |pos: usize| next_state(snapshot[pos], &adjacency[pos], snapshot, step_size);

        if self.parallel {
            // for_each returns only once every worker is done
            self.next
                .par_iter_mut()
                .enumerate()
                .for_each(|(pos, slot)| *slot = update(pos));
        } else {
            for (pos, slot) in self.next.iter_mut().enumerate() {
                *slot = update(pos);
            }
        }
    }
}

// Same as `own + step_size * (avg - own)`, written as a convex combination
// so finite states can never overflow.
fn next_state(own: f64, neighbors: &[usize], snapshot: &[f64], step_size: f64) -> f64 {
    let Some(local_avg) = bounded_mean(neighbors.iter().map(|&j| snapshot[j])) else {
        return own;
    };
    let next = (1.0 - step_size) * own + step_size * local_avg;
    next.clamp(own.min(local_avg), own.max(local_avg))
}
