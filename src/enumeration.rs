//! The raw and symmetry-reduced machine enumerations.
//!
//! Both are addressable by index (`code_at`), not just streamable: batches
//! are identified by `[start, end)` index ranges, so two workers can walk
//! disjoint slices without any coordination and a checkpoint can name its
//! resume point with a single integer.

use crate::core::{class_size, code_base, MachineCode, Symbol, SYMBOLS};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Which machine set a run walks.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnumerationMode {
    /// Every code in `[0, base^(2n))`.
    Raw,
    /// Only machines whose `(state 1, blank)` entry moves right into a state
    /// in `2..=n`. The orbits dropped here (mirrored machines, dual-blank
    /// machines, trivial initial transitions) are restored arithmetically by
    /// the aggregator's completion step.
    Reduced,
}

impl Display for EnumerationMode {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            EnumerationMode::Raw => write!(f, "raw"),
            EnumerationMode::Reduced => write!(f, "reduced"),
        }
    }
}

/// An enumeration of the `(n, 2)` class: a bijection from `0..size()` onto
/// machine codes. Stateless and `Copy`; the same `(mode, n, blank)` always
/// produces the same sequence.
#[derive(Clone, Copy, Debug)]
pub struct Enumeration {
    mode: EnumerationMode,
    n: usize,
    base: MachineCode,
    /// Combinations of the `2n - 1` unconstrained digits.
    subspace: MachineCode,
    /// Place value of the constrained `(state 1, blank)` digit.
    weight: MachineCode,
}

impl Enumeration {
    pub fn new(mode: EnumerationMode, n: usize, blank: Symbol) -> Enumeration {
        let base = code_base(n);
        let digits = (SYMBOLS * n) as u32;
        // The (1, blank) cell is digit `blank` in big-endian order.
        let weight = base.pow(digits - 1 - blank as u32);
        Enumeration {
            mode,
            n,
            base,
            subspace: base.pow(digits - 1),
            weight,
        }
    }

    pub fn mode(&self) -> EnumerationMode {
        self.mode
    }

    /// How many machines the enumeration yields.
    pub fn size(&self) -> u64 {
        match self.mode {
            EnumerationMode::Raw => class_size(self.n),
            EnumerationMode::Reduced => 2 * (self.n as u64 - 1) * self.subspace,
        }
    }

    /// The machine code at a global enumeration index (`index < size()`).
    pub fn code_at(&self, index: u64) -> MachineCode {
        match self.mode {
            EnumerationMode::Raw => index,
            EnumerationMode::Reduced => {
                let digit = self.initial_digit(index / self.subspace);
                let tail = index % self.subspace;
                // Splice the constrained digit into the free-digit tail at
                // its place value.
                let high = tail / self.weight;
                let low = tail % self.weight;
                (high * self.base + digit) * self.weight + low
            }
        }
    }

    /// The `j`-th allowed `(state 1, blank)` digit: move right into state
    /// `2 + j/2`, writing `j % 2`. Ascending in `j`.
    fn initial_digit(&self, j: u64) -> MachineCode {
        let next = 2 + j / 2;
        let write = j % 2;
        SYMBOLS as MachineCode + (next - 1) * 4 + write * 2 + 1
    }
}
