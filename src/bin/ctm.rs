//! Command-line entry points for the CTM pipeline: run a sweep, query a
//! saved distribution, or inspect a single machine code.

use clap::{Parser, Subcommand};
use ctm_estimator::aggregate::DistributionFile;
use ctm_estimator::checkpoint::CheckpointStore;
use ctm_estimator::core::Machine;
use ctm_estimator::deciders;
use ctm_estimator::enumeration::EnumerationMode;
use ctm_estimator::estimator::ComplexityEstimator;
use ctm_estimator::{Driver, Result, SimulationConfig};
use serde_json::json;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ctm")]
#[command(about = "Estimate Kolmogorov complexity of short binary strings by the Coding Theorem Method")]
#[command(version)]
struct Cli {
    /// Log filter, e.g. "info" or "ctm_estimator=debug"
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enumerate and simulate a machine class, writing its distribution
    Run {
        /// Number of active states (n)
        #[arg(long)]
        n_states: usize,

        /// Per-machine step budget
        #[arg(long)]
        max_steps: u64,

        /// Walk the symmetry-reduced enumeration and complete the counts
        #[arg(long)]
        reduced: bool,

        /// Blank tape symbol (0 or 1)
        #[arg(long, default_value_t = 0)]
        blank_symbol: u8,

        /// Machines per worker batch
        #[arg(long, default_value_t = 10_000)]
        batch_size: u64,

        /// Machines between periodic checkpoints (0 disables)
        #[arg(long, default_value_t = 100_000)]
        checkpoint_interval: u64,

        /// Checkpoint file to write and resume from
        #[arg(long)]
        checkpoint_file: Option<PathBuf>,

        /// Truncate the enumeration to this many machines
        #[arg(long)]
        limit: Option<u64>,

        /// Save integer counts instead of probabilities
        #[arg(long)]
        save_raw_counts: bool,

        /// Worker count; 0 uses all cores
        #[arg(long, default_value_t = 1)]
        workers: usize,

        /// Disable the escapee decider
        #[arg(long)]
        no_escapee_decider: bool,

        /// Disable the period-2 cycle decider
        #[arg(long)]
        no_cycle_decider: bool,

        /// Path of the distribution file
        #[arg(long, default_value = "distribution.json")]
        output: PathBuf,
    },
    /// Query K̂(s) from a saved distribution
    Estimate {
        /// Distribution file produced by `ctm run`
        file: PathBuf,

        /// Strings to score; with none given, print the top-ranked strings
        strings: Vec<String>,

        /// How many top strings to print when no strings are given
        #[arg(long, default_value_t = 20)]
        top: usize,
    },
    /// Decode a machine code and print its table
    Show {
        /// Number of active states (n)
        #[arg(long)]
        n_states: usize,

        /// The machine code to decode
        code: u64,

        /// Also simulate on a blank tape under this step budget
        #[arg(long)]
        steps: Option<u64>,

        /// Blank tape symbol for the simulation
        #[arg(long, default_value_t = 0)]
        blank_symbol: u8,

        /// Emit JSON instead of plain text
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    if let Err(e) = dispatch(cli.command) {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn dispatch(command: Commands) -> Result<()> {
    match command {
        Commands::Run {
            n_states,
            max_steps,
            reduced,
            blank_symbol,
            batch_size,
            checkpoint_interval,
            checkpoint_file,
            limit,
            save_raw_counts,
            workers,
            no_escapee_decider,
            no_cycle_decider,
            output,
        } => {
            let mut config = SimulationConfig::new(n_states, max_steps);
            config.enumeration = if reduced {
                EnumerationMode::Reduced
            } else {
                EnumerationMode::Raw
            };
            config.blank_symbol = blank_symbol;
            config.batch_size = batch_size;
            config.checkpoint_interval = checkpoint_interval;
            config.num_machines_to_run = limit;
            config.save_raw_counts = save_raw_counts;
            config.num_processes = workers;
            config.escapee_decider = !no_escapee_decider;
            config.cycle_decider = !no_cycle_decider;

            let mut driver = Driver::new(config.clone())?;
            if let Some(path) = checkpoint_file {
                driver = driver.with_checkpoint(CheckpointStore::new(path));
            }
            let report = driver.run()?;
            if report.interrupted {
                info!("interrupted before completion; no distribution written");
                return Ok(());
            }
            let file = DistributionFile::build(&report.aggregate, &config)?;
            serde_json::to_writer_pretty(BufWriter::new(File::create(&output)?), &file)?;
            info!(path = %output.display(), "distribution written");
            Ok(())
        }
        Commands::Estimate { file, strings, top } => {
            let estimator = ComplexityEstimator::from_file(&file)?;
            if strings.is_empty() {
                for (s, k) in estimator.ranked().into_iter().take(top) {
                    println!("{s}\t{k:.6}");
                }
            } else {
                for s in strings {
                    println!("{s}\t{:.6}", estimator.estimate(&s));
                }
            }
            Ok(())
        }
        Commands::Show {
            n_states,
            code,
            steps,
            blank_symbol,
            json: as_json,
        } => {
            let machine = Machine::decode(code, n_states)?;
            let outcome = steps.map(|budget| {
                let mut config = SimulationConfig::new(n_states, budget);
                config.blank_symbol = blank_symbol;
                let mut chain = deciders::standard_chain(&config);
                deciders::run_with_chain(&machine, &config, &mut chain)
            });
            if as_json {
                let doc = json!({
                    "code": code,
                    "machine": machine,
                    "outcome": outcome.map(|o| format!("{o:?}")),
                });
                println!("{}", serde_json::to_string_pretty(&doc)?);
            } else {
                println!("{machine}");
                if let Some(outcome) = outcome {
                    println!("{outcome:?}");
                }
            }
            Ok(())
        }
    }
}
