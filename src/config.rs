//! Run configuration and validation.

use crate::core::{Symbol, MAX_TM_STATES};
use crate::enumeration::EnumerationMode;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::thread;

/// Everything that determines a run. The distribution is a pure function of
/// `(n_states, max_runtime_steps, enumeration, blank_symbol, deciders)`;
/// the remaining knobs only affect execution shape and cadence.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub n_states: usize,
    /// Per-machine step budget. Always caller-supplied; there is no
    /// hard-coded default in the library.
    pub max_runtime_steps: u64,
    pub enumeration: EnumerationMode,
    pub blank_symbol: Symbol,
    pub batch_size: u64,
    /// Machines between periodic checkpoints; 0 disables periodic writes.
    pub checkpoint_interval: u64,
    /// Truncate the enumeration to this many machines.
    pub num_machines_to_run: Option<u64>,
    pub save_raw_counts: bool,
    /// 0 uses all available cores; 1 is sequential.
    pub num_processes: usize,
    pub escapee_decider: bool,
    pub cycle_decider: bool,
}

impl SimulationConfig {
    pub fn new(n_states: usize, max_runtime_steps: u64) -> SimulationConfig {
        SimulationConfig {
            n_states,
            max_runtime_steps,
            enumeration: EnumerationMode::Raw,
            blank_symbol: 0,
            batch_size: 10_000,
            checkpoint_interval: 100_000,
            num_machines_to_run: None,
            save_raw_counts: false,
            num_processes: 1,
            escapee_decider: true,
            cycle_decider: true,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_states == 0 || self.n_states > MAX_TM_STATES {
            return Err(Error::InvalidStateCount { n: self.n_states });
        }
        if self.max_runtime_steps == 0 {
            return Err(Error::InvalidStepBudget);
        }
        if self.blank_symbol > 1 {
            return Err(Error::InvalidBlankSymbol(self.blank_symbol));
        }
        if self.batch_size == 0 {
            return Err(Error::InvalidBatchSize);
        }
        if self.num_machines_to_run == Some(0) {
            return Err(Error::InvalidMachineLimit);
        }
        Ok(())
    }

    /// The worker count after resolving `0 = all available cores`.
    pub fn worker_count(&self) -> usize {
        match self.num_processes {
            0 => thread::available_parallelism().map_or(1, |p| p.get()),
            w => w,
        }
    }
}
