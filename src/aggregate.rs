//! Accumulation of run outcomes, the symmetry-completion arithmetic, and
//! the final output-frequency distribution `D(n,2)`.

use crate::config::SimulationConfig;
use crate::core::{code_base, NonHaltReason, RunOutcome};
use crate::enumeration::EnumerationMode;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// The bitwise complement of a binary string (`0 <-> 1`).
pub fn complement(s: &str) -> String {
    s.chars()
        .map(|c| if c == '0' { '1' } else { '0' })
        .collect()
}

/// Non-halting totals, one bucket per verdict reason.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct NonHaltCounts {
    pub timeout: u64,
    pub escapee: u64,
    pub cycle_two: u64,
    pub no_halt_transition: u64,
}

impl NonHaltCounts {
    pub fn bucket(&mut self, reason: NonHaltReason) -> &mut u64 {
        match reason {
            NonHaltReason::Timeout => &mut self.timeout,
            NonHaltReason::Escapee => &mut self.escapee,
            NonHaltReason::CycleTwo => &mut self.cycle_two,
            NonHaltReason::NoHaltTransition => &mut self.no_halt_transition,
        }
    }

    pub fn total(&self) -> u64 {
        self.timeout + self.escapee + self.cycle_two + self.no_halt_transition
    }

    fn merge(&mut self, other: &NonHaltCounts) {
        self.timeout += other.timeout;
        self.escapee += other.escapee;
        self.cycle_two += other.cycle_two;
        self.no_halt_transition += other.no_halt_transition;
    }

    fn double(&mut self) {
        self.timeout *= 2;
        self.escapee *= 2;
        self.cycle_two *= 2;
        self.no_halt_transition *= 2;
    }
}

/// Accumulated outcomes of a set of runs. Merging is associative and
/// commutative with `default()` as the identity, so worker-local tables can
/// be combined in any order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputFrequency {
    pub counts: HashMap<String, u64>,
    pub non_halting: NonHaltCounts,
    /// Machines accounted for, including the completion's additive orbits.
    pub machines: u64,
    pub completion_applied: bool,
}

impl OutputFrequency {
    pub fn record(&mut self, outcome: &RunOutcome) {
        self.machines += 1;
        match outcome {
            RunOutcome::Halted { output } => {
                *self.counts.entry(output.clone()).or_default() += 1;
            }
            RunOutcome::NonHalting(reason) => *self.non_halting.bucket(*reason) += 1,
        }
    }

    pub fn merge(&mut self, other: OutputFrequency) {
        for (s, c) in other.counts {
            *self.counts.entry(s).or_default() += c;
        }
        self.non_halting.merge(&other.non_halting);
        self.machines += other.machines;
    }

    pub fn halting_total(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Lift counts from a reduced enumeration to the full dual-blank space.
    ///
    /// The reduced enumeration fixed the `(state 1, blank)` entry to move
    /// right into a fresh state. Three orbits are restored: the mirrored
    /// machines (reversed outputs), the machines whose initial transition is
    /// trivial, and the dual-blank convention (complemented outputs). The
    /// trivial contributions are closed-form in `n`: each of the two
    /// immediate halts writes one cell, and each of the four state-1
    /// re-entries escapes monotonically, times the `base^(2n-1)` completions
    /// of the free table entries.
    pub fn apply_completion(&mut self, n: usize) -> Result<()> {
        if self.completion_applied {
            return Err(Error::CompletionAlreadyApplied);
        }
        let subspace = code_base(n).pow(2 * n as u32 - 1);

        let snapshot: Vec<(String, u64)> =
            self.counts.iter().map(|(s, c)| (s.clone(), *c)).collect();
        for (s, c) in snapshot {
            *self.counts.entry(s.chars().rev().collect()).or_default() += c;
        }
        self.non_halting.double();
        self.machines *= 2;

        *self.counts.entry("0".into()).or_default() += subspace;
        *self.counts.entry("1".into()).or_default() += subspace;
        self.non_halting.escapee += 4 * subspace;
        self.machines += 6 * subspace;

        let snapshot: Vec<(String, u64)> =
            self.counts.iter().map(|(s, c)| (s.clone(), *c)).collect();
        for (s, c) in snapshot {
            *self.counts.entry(complement(&s)).or_default() += c;
        }
        self.non_halting.double();
        self.machines *= 2;

        self.completion_applied = true;
        Ok(())
    }

    /// `D(s) = count(s) / halting_total`, over halting outputs only.
    pub fn distribution(&self) -> Result<BTreeMap<String, f64>> {
        let halting = self.halting_total();
        if halting == 0 {
            return Err(Error::EmptyDistribution);
        }
        Ok(self
            .counts
            .iter()
            .map(|(s, c)| (s.clone(), *c as f64 / halting as f64))
            .collect())
    }
}

/// The JSON document written once at the end of a run.
#[derive(Debug, Serialize, Deserialize)]
pub struct DistributionFile {
    pub n: usize,
    pub m: usize,
    pub max_runtime_steps: u64,
    pub blank_symbol: u8,
    pub enumeration: EnumerationMode,
    pub completion_applied: bool,
    pub halting_total: u64,
    pub non_halting: NonHaltCounts,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distribution: Option<BTreeMap<String, f64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_counts: Option<BTreeMap<String, u64>>,
}

impl DistributionFile {
    pub fn build(aggregate: &OutputFrequency, config: &SimulationConfig) -> Result<DistributionFile> {
        let (distribution, raw_counts) = if config.save_raw_counts {
            let counts = aggregate
                .counts
                .iter()
                .map(|(s, c)| (s.clone(), *c))
                .collect();
            (None, Some(counts))
        } else {
            (Some(aggregate.distribution()?), None)
        };
        Ok(DistributionFile {
            n: config.n_states,
            m: crate::core::SYMBOLS,
            max_runtime_steps: config.max_runtime_steps,
            blank_symbol: config.blank_symbol,
            enumeration: config.enumeration,
            completion_applied: aggregate.completion_applied,
            halting_total: aggregate.halting_total(),
            non_halting: aggregate.non_halting,
            distribution,
            raw_counts,
        })
    }
}
