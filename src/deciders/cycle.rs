//! Detects period-2 configuration cycles.

use super::RuntimeDecider;
use crate::core::{NonHaltReason, Simulation, State, Symbol};
use std::collections::hash_map::DefaultHasher;
use std::collections::VecDeque;
use std::hash::{Hash, Hasher};

/// One captured configuration: control state, head position, and the
/// visited tape window. The hash is compared first; full equality confirms,
/// so a collision cannot produce a false verdict.
struct Snapshot {
    hash: u64,
    state: State,
    head: i64,
    window_lo: i64,
    window: Vec<Symbol>,
}

impl Snapshot {
    fn capture(sim: &Simulation) -> Snapshot {
        let (lo, hi) = sim.visited();
        let window = sim.tape().window(lo, hi);
        let mut hasher = DefaultHasher::new();
        (sim.state(), sim.head(), lo, &window).hash(&mut hasher);
        Snapshot {
            hash: hasher.finish(),
            state: sim.state(),
            head: sim.head(),
            window_lo: lo,
            window,
        }
    }

    fn same_configuration(&self, other: &Snapshot) -> bool {
        self.hash == other.hash
            && self.state == other.state
            && self.head == other.head
            && self.window_lo == other.window_lo
            && self.window == other.window
    }
}

/// Keeps the last three configurations and fires when the first and third
/// are identical: the machine repeats every two steps and never halts.
pub struct CycleTwoDecider {
    history: VecDeque<Snapshot>,
}

impl CycleTwoDecider {
    pub fn new() -> CycleTwoDecider {
        CycleTwoDecider {
            history: VecDeque::with_capacity(3),
        }
    }
}

impl Default for CycleTwoDecider {
    fn default() -> Self {
        CycleTwoDecider::new()
    }
}

impl RuntimeDecider for CycleTwoDecider {
    fn name(&self) -> &'static str {
        "cycle_two"
    }

    fn reset(&mut self) {
        self.history.clear();
    }

    fn observe(&mut self, sim: &Simulation) -> Option<NonHaltReason> {
        if self.history.len() == 3 {
            self.history.pop_front();
        }
        self.history.push_back(Snapshot::capture(sim));
        if self.history.len() == 3 && self.history[0].same_configuration(&self.history[2]) {
            Some(NonHaltReason::CycleTwo)
        } else {
            None
        }
    }
}
