//! Detects machines running monotonically into fresh blank tape.

use super::RuntimeDecider;
use crate::core::{NonHaltReason, Simulation};

/// Fires once the head has taken more than `n` consecutive steps onto
/// previously unoccupied blank cells: over such a stretch the control state
/// must repeat while everything ahead of the head is blank, so the machine
/// keeps escaping forever.
pub struct EscapeeDecider {
    /// Head positions observed so far are exactly `lo..=hi`; the head moves
    /// one cell at a time, so occupancy is contiguous.
    lo: i64,
    hi: i64,
    fresh_run: u64,
    limit: u64,
}

impl EscapeeDecider {
    pub fn new(n_states: usize) -> EscapeeDecider {
        EscapeeDecider {
            lo: 0,
            hi: 0,
            fresh_run: 0,
            limit: n_states as u64,
        }
    }
}

impl RuntimeDecider for EscapeeDecider {
    fn name(&self) -> &'static str {
        "escapee"
    }

    fn reset(&mut self) {
        self.lo = 0;
        self.hi = 0;
        self.fresh_run = 0;
    }

    fn observe(&mut self, sim: &Simulation) -> Option<NonHaltReason> {
        let p = sim.head();
        let fresh = p < self.lo || p > self.hi;
        if fresh && sim.tape().read(p) == sim.tape().blank() {
            self.fresh_run += 1;
            self.lo = self.lo.min(p);
            self.hi = self.hi.max(p);
        } else {
            self.fresh_run = 0;
        }
        (self.fresh_run > self.limit).then_some(NonHaltReason::Escapee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Machine, RunOutcome, Simulation};
    use std::str::FromStr;

    fn run(machine: &Machine, max_steps: u64) -> (RunOutcome, u64) {
        let mut decider = EscapeeDecider::new(machine.states());
        let mut fired_at = 0;
        let outcome = Simulation::new(machine, 0).run(max_steps, |sim| {
            fired_at = sim.steps();
            decider.observe(sim)
        });
        (outcome, fired_at)
    }

    #[test]
    fn test_right_runner_is_caught() {
        // State 1 on blank moves right and stays in state 1: escapes after
        // n+1 = 2 fresh cells.
        let machine = Machine::from_str("0RA0NH").unwrap();
        let (outcome, fired_at) = run(&machine, 100);
        assert_eq!(outcome, RunOutcome::NonHalting(NonHaltReason::Escapee));
        assert_eq!(fired_at, 2);
    }

    #[test]
    fn test_revisits_reset_the_run() {
        // Ping-pong between two cells: never more than one fresh cell in a
        // row, so the escapee decider stays quiet.
        let machine = Machine::from_str("0RB0NH_0LA0NH").unwrap();
        let (outcome, _) = run(&machine, 50);
        assert_eq!(outcome, RunOutcome::NonHalting(NonHaltReason::Timeout));
    }

    #[test]
    fn test_halting_machine_unaffected() {
        let machine = Machine::from_str("1RB1NH_0NH1NH").unwrap();
        let (outcome, _) = run(&machine, 100);
        assert_eq!(outcome, RunOutcome::Halted { output: "10".into() });
    }
}
