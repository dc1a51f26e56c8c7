// Copyright 2025 Servus Altissimi (Pseudonym)

// Permission is hereby granted, free of charge, to any person obtaining a copy of this software and associated documentation files (the "Software"), to deal in the Software without restriction, including without limitation the rights to use, copy, modify, merge, publish, distribute, sublicense, and/or sell copies of the Software, and to permit persons to whom the Software is furnished to do so, subject to the following conditions:
// The above copyright notice and this permission notice shall be included in all copies or substantial portions of the Software.
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY, FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE SOFTWARE.

use consensim::prelude::*;
use consensim::metrics::analyzer;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::{Level, info};

// Above this many agents `run` prints a summary instead of every value
const MAX_PRINTED_AGENTS: usize = 64;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// The four-agent line network: 0:10, 1:0, 2:20, 3:30
    Example {
        #[arg(long, default_value_t = 0.5)]
        step_size: f64,
        #[arg(long, default_value_t = 1000)]
        max_rounds: usize,
        #[arg(long, default_value_t = 1e-4)]
        epsilon: f64,
    },

    Run {
        #[arg(short, long, default_value = "ring")]
        topology: String,
        #[arg(short = 'n', long, default_value_t = 16)]
        agents: u32,
        #[arg(short, long, default_value = "linear")]
        initial: String,
        #[arg(long, default_value_t = 0.0)]
        low: f64,
        #[arg(long, default_value_t = 100.0)]
        high: f64,
        #[arg(short, long, default_value_t = 0.5)]
        step_size: f64,
        #[arg(short = 'r', long, default_value_t = 1000)]
        max_rounds: usize,
        #[arg(short, long, default_value_t = 1e-4)]
        epsilon: f64,
        #[arg(long, default_value_t = 0.3)]
        edge_probability: f64,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(short, long)]
        parallel: bool,
        /// JSON SimConfig, replaces all of the flags above
        #[arg(short, long)]
        config: Option<String>,
        /// Directory for CSV/JSON results
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Same network, one run per step size
    Sweep {
        #[arg(long, default_value = "0.1,0.25,0.5,0.75,1.0")]
        step_sizes: String,
        #[arg(short, long, default_value = "ring")]
        topology: String,
        #[arg(short = 'n', long, default_value_t = 32)]
        agents: u32,
        #[arg(short = 'r', long, default_value_t = 10_000)]
        max_rounds: usize,
        #[arg(short, long, default_value_t = 1e-6)]
        epsilon: f64,
        #[arg(long, default_value_t = 0.3)]
        edge_probability: f64,
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },

    List,
}

fn main() -> Result<()> {
    let program_start = Instant::now();

    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .init();

    let command = cli.command.unwrap_or(Commands::Example {
        step_size: 0.5,
        max_rounds: 1000,
        epsilon: 1e-4,
    });

    match command {
        Commands::Example { step_size, max_rounds, epsilon } => {
            run_example(step_size, max_rounds, epsilon)?;
        }

        Commands::Run {
            topology,
            agents,
            initial,
            low,
            high,
            step_size,
            max_rounds,
            epsilon,
            edge_probability,
            seed,
            parallel,
            config,
            output,
        } => {
            let config = match config {
                Some(path) => SimConfig::from_file(&path)?,
                None => SimConfig {
                    name: format!("{}_{}", topology, agents),
                    topology: Topology::parse(&topology, edge_probability)?,
                    num_agents: agents,
                    initial_states: parse_initial_states(&initial, low, high, agents)?,
                    step_size,
                    max_rounds,
                    epsilon,
                    parallel,
                    seed,
                },
            };
            run_single(config, output.as_deref())?;
        }

        Commands::Sweep {
            step_sizes,
            topology,
            agents,
            max_rounds,
            epsilon,
            edge_probability,
            seed,
        } => {
            let base = SimConfig {
                topology: Topology::parse(&topology, edge_probability)?,
                num_agents: agents,
                seed,
                ..SimConfig::default()
            }
            .with_rounds(max_rounds, epsilon);
            sweep_step_sizes(&step_sizes, base)?;
        }

        Commands::List => {
            println!("\nAvailable Topologies");

            for name in Topology::names() {
                println!("  - {}", name);
            }

            println!("\nUsage: cargo run -- run --topology <name>");
            println!("Example: cargo run -- run --topology random --edge-probability 0.2\n");
        }
    }

    info!("Total runtime: {:.2}s", program_start.elapsed().as_secs_f64());

    Ok(())
}

fn run_example(step_size: f64, max_rounds: usize, epsilon: f64) -> Result<()> {
    let mut network = Network::new();
    network.add_agent(0, 10.0)?;
    network.add_agent(1, 0.0)?;
    network.add_agent(2, 20.0)?;
    network.add_agent(3, 30.0)?;

    network.add_edge(0, 1)?;
    network.add_edge(1, 2)?;
    network.add_edge(2, 3)?;

    println!("Initial values:");
    print_values(&network.get_all_values());

    let rounds = ConsensusSimulation::new(&mut network, step_size)?.run(max_rounds, epsilon)?;

    println!("Simulation completed in {} rounds.", rounds);
    println!("Final values:");
    print_values(&network.get_all_values());

    Ok(())
}

fn run_single(config: SimConfig, output: Option<&str>) -> Result<()> {
    info!("consensim: Single Run");

    let mut experiment = Experiment::new(config);
    let outcome = experiment.run()?;

    println!("Simulation completed in {} rounds.", outcome.rounds);
    if !outcome.converged {
        println!("Round limit reached before convergence.");
    }

    if outcome.final_values.len() <= MAX_PRINTED_AGENTS {
        println!("Final values:");
        print_values(&outcome.final_values);
    } else if let Some(last) = experiment.metrics.last() {
        println!(
            "{} agents, final spread {:.6}, mean {:.6}",
            outcome.final_values.len(),
            last.spread,
            last.mean
        );
    }

    if let Some(dir) = output {
        experiment.save_results(dir)?;
    }

    Ok(())
}

fn sweep_step_sizes(step_sizes: &str, base: SimConfig) -> Result<()> {
    let step_sizes = step_sizes
        .split(',')
        .map(|s| s.trim().parse::<f64>())
        .collect::<std::result::Result<Vec<_>, _>>()?;

    info!("consensim: Step size sweep");
    info!("Topology: {:?}, agents: {}", base.topology, base.num_agents);

    let mut reports = Vec::new();
    for step_size in step_sizes {
        let config = SimConfig {
            name: format!("step_{}", step_size),
            ..base.clone()
        }
        .with_step_size(step_size);

        let mut experiment = Experiment::new(config).with_progress(false);
        let outcome = experiment.run()?;

        reports.push(analyzer::analyze(
            &experiment.metrics.snapshots(),
            &experiment.config().name,
            base.epsilon,
            outcome.initial_spread,
        ));
    }

    comparison_table(&reports);
    Ok(())
}

fn parse_initial_states(name: &str, low: f64, high: f64, agents: u32) -> Result<InitialStates> {
    match name.to_lowercase().as_str() {
        "linear" => {
            let step = if agents > 1 { (high - low) / (agents - 1) as f64 } else { 0.0 };
            Ok(InitialStates::Linear { start: low, step })
        }
        "uniform" => Ok(InitialStates::Uniform { low, high }),
        "normal" => Ok(InitialStates::Normal {
            mean: (low + high) / 2.0,
            std_dev: (high - low).abs() / 6.0,
        }),
        _ => anyhow::bail!("Unknown initial states: {}. Use: linear, uniform or normal", name),
    }
}

fn print_values(values: &BTreeMap<AgentId, f64>) {
    for (id, value) in values {
        println!("  {} -> {:.6}", id, value);
    }
}

fn comparison_table(reports: &[analyzer::ConvergenceReport]) {
    println!("\n╔════════════════╦══════════╦═══════════╦═══════════════╦═══════════════╗");
    println!("║ Run            ║ Rounds   ║ Converged ║ Final spread  ║ Contraction   ║");
    println!("╠════════════════╬══════════╬═══════════╬═══════════════╬═══════════════╣");

    for report in reports {
        let contraction = report
            .mean_contraction
            .map_or_else(|| "-".to_string(), |c| format!("{:.4}", c));
        println!(
            "║ {:<14} ║ {:>8} ║ {:>9} ║ {:>13.3e} ║ {:>13} ║",
            report.name,
            report.rounds,
            if report.converged { "yes" } else { "no" },
            report.final_spread,
            contraction,
        );
    }

    println!("╚════════════════╩══════════╩═══════════╩═══════════════╩═══════════════╝\n");

    if let Some(fastest) = reports
        .iter()
        .filter(|r| r.converged)
        .min_by_key(|r| r.rounds)
    {
        println!("Fastest: {} ({} rounds)", fastest.name, fastest.rounds);
    }

    println!();
}
