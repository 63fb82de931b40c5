//! Non-halting deciders: a static pre-run check on the table, and runtime
//! deciders consulted after every simulator step. A verdict asserts the
//! machine can never halt; soundness is mandatory (a false positive would
//! bias the output distribution), completeness is not.

mod cycle;
mod escapee;

pub use cycle::CycleTwoDecider;
pub use escapee::EscapeeDecider;

use crate::config::SimulationConfig;
use crate::core::{Machine, NonHaltReason, Simulation};

/// A decider that watches a run. One instance is reused across machines;
/// `reset` is called before each run.
pub trait RuntimeDecider {
    fn name(&self) -> &'static str;
    fn reset(&mut self);
    /// Observe the configuration reached by the latest step.
    fn observe(&mut self, sim: &Simulation) -> Option<NonHaltReason>;
}

/// Static check: a table with no halt entry can never reach the halt state.
/// (Tables are total, so halting by undefined transition is impossible.)
pub fn reject_before_run(machine: &Machine) -> Option<NonHaltReason> {
    if machine.entries().any(|t| t.is_halt()) {
        None
    } else {
        Some(NonHaltReason::NoHaltTransition)
    }
}

/// The decider chain for a run, honoring the config toggles.
pub fn standard_chain(config: &SimulationConfig) -> Vec<Box<dyn RuntimeDecider>> {
    let mut chain: Vec<Box<dyn RuntimeDecider>> = Vec::new();
    if config.escapee_decider {
        chain.push(Box::new(EscapeeDecider::new(config.n_states)));
    }
    if config.cycle_decider {
        chain.push(Box::new(CycleTwoDecider::new()));
    }
    chain
}

/// Reset every decider and consult them in order after each step.
pub fn run_with_chain(
    machine: &Machine,
    config: &SimulationConfig,
    chain: &mut [Box<dyn RuntimeDecider>],
) -> crate::core::RunOutcome {
    use crate::core::RunOutcome;
    if let Some(reason) = reject_before_run(machine) {
        return RunOutcome::NonHalting(reason);
    }
    for decider in chain.iter_mut() {
        decider.reset();
    }
    Simulation::new(machine, config.blank_symbol).run(config.max_runtime_steps, |sim| {
        chain.iter_mut().find_map(|d| d.observe(sim))
    })
}
