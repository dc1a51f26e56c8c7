use super::{ConsensusSimulation, SimConfig};
use crate::agent::AgentId;
use crate::metrics::logger::MetricsLogger;
use crate::metrics::{MetricsCollector, analyzer};
use crate::network::build_network;
use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentOutcome {
    pub rounds: usize,
    pub converged: bool,
    pub components: usize,
    pub initial_spread: f64,
    pub final_values: BTreeMap<AgentId, f64>,
}

/// One configured run: builds the network, simulates it and keeps the
/// per-round metrics around for export.
pub struct Experiment {
    config: SimConfig,
    show_progress: bool,
    outcome: Option<ExperimentOutcome>,
    pub metrics: MetricsCollector,
}

impl Experiment {
    pub fn new(config: SimConfig) -> Self {
        Self {
            config,
            show_progress: true,
            outcome: None,
            metrics: MetricsCollector::new(),
        }
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn outcome(&self) -> Option<&ExperimentOutcome> {
        self.outcome.as_ref()
    }

    pub fn run(&mut self) -> Result<ExperimentOutcome> {
        self.config.validate()?;

        info!("Starting experiment: {}", self.config.name);
        info!("Topology: {:?}, agents: {}", self.config.topology, self.config.num_agents);

        let mut network = build_network(
            &self.config.topology,
            &self.config.initial_states,
            self.config.num_agents,
            self.config.seed,
        )?;

        let components = network.connected_components().len();
        if components > 1 {
            warn!(
                "Network has {} components, each converges to its own value",
                components
            );
        }
        let initial_spread = network.spread();
        self.metrics = MetricsCollector::new();

        let pb = if self.show_progress {
            ProgressBar::new(self.config.max_rounds as u64)
        } else {
            ProgressBar::hidden()
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} rounds {msg}")?
                .progress_chars("█▓░"),
        );

        let metrics = self.metrics.clone();
        let rounds = ConsensusSimulation::new(&mut network, self.config.step_size)?
            .with_parallel(self.config.parallel)
            .run_with(self.config.max_rounds, self.config.epsilon, |report| {
                metrics.record(report);
                pb.inc(1);
                pb.set_message(format!(
                    "Spread: {:.6} | Delta: {:.2e}",
                    report.spread, report.max_delta
                ));
            })?;

        let converged = analyzer::converged(self.metrics.last().as_ref(), self.config.epsilon);
        pb.finish_with_message(if converged { "Converged" } else { "Round limit reached" });

        let outcome = ExperimentOutcome {
            rounds,
            converged,
            components,
            initial_spread,
            final_values: network.get_all_values(),
        };
        self.outcome = Some(outcome.clone());
        Ok(outcome)
    }

    /// Writes the round history (CSV), the convergence analysis (JSON) and the
    /// final values (CSV) into `dir`. Returns the written paths.
    pub fn save_results(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let outcome = self
            .outcome
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Experiment {} has not been run", self.config.name))?;

        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let stem = format!("{}_{}", self.config.name, timestamp);

        let snapshots = self.metrics.snapshots();

        let csv_path = dir.join(format!("{}.csv", stem));
        let mut logger = MetricsLogger::create(&csv_path)?;
        logger.write_rounds(&snapshots)?;
        let rows = logger.finish()?;
        info!("{} rounds saved to: {}", rows, csv_path.display());

        let report = analyzer::analyze(
            &snapshots,
            &self.config.name,
            self.config.epsilon,
            outcome.initial_spread,
        );
        let analysis_path = dir.join(format!("{}_analysis.json", stem));
        analyzer::export_json(&report, &analysis_path)?;
        info!("Analysis saved to: {}", analysis_path.display());

        let final_path = dir.join(format!("{}_final.csv", stem));
        let mut logger = MetricsLogger::create(&final_path)?;
        logger.write_final_states(&outcome.final_values)?;
        logger.finish()?;
        info!("Final values saved to: {}", final_path.display());

        info!("Rounds: {} (converged: {})", report.rounds, report.converged);
        info!("Final spread: {:.6}", report.final_spread);
        if let Some(rate) = report.mean_contraction {
            info!("Mean contraction per round: {:.4}", rate);
        }

        Ok(vec![csv_path, analysis_path, final_path])
    }
}
