//! Step-bounded execution of one machine on an initially blank tape.

use super::{Machine, State, Symbol, Tape, HALT_STATE};

/// Why a run was judged non-halting.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum NonHaltReason {
    /// Step budget exhausted with no verdict either way.
    Timeout,
    /// The head ran monotonically into fresh blank tape.
    Escapee,
    /// The configuration recurred with period 2.
    CycleTwo,
    /// No table entry reaches the halt state (static pre-run verdict).
    NoHaltTransition,
}

/// The result of one bounded run.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RunOutcome {
    /// The machine reached the halt state; `output` is the visited range of
    /// the tape, read left to right.
    Halted { output: String },
    NonHalting(NonHaltReason),
}

/// A machine mid-run: the live configuration that runtime deciders observe
/// after every step.
pub struct Simulation<'a> {
    machine: &'a Machine,
    tape: Tape,
    head: i64,
    state: State,
    steps: u64,
    min_visited: i64,
    max_visited: i64,
}

impl<'a> Simulation<'a> {
    pub fn new(machine: &'a Machine, blank: Symbol) -> Simulation<'a> {
        Simulation {
            machine,
            tape: Tape::new(blank),
            head: 0,
            state: 1,
            steps: 0,
            min_visited: 0,
            max_visited: 0,
        }
    }

    pub fn machine(&self) -> &Machine {
        self.machine
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    pub fn head(&self) -> i64 {
        self.head
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Inclusive bounds of the head positions visited so far.
    pub fn visited(&self) -> (i64, i64) {
        (self.min_visited, self.max_visited)
    }

    /// Run until the machine halts, `observe` returns a verdict, or the step
    /// budget is exhausted. `observe` is consulted after every step; pass
    /// `|_| None` for an unfiltered run.
    pub fn run<F>(mut self, max_steps: u64, mut observe: F) -> RunOutcome
    where
        F: FnMut(&Simulation) -> Option<NonHaltReason>,
    {
        while self.steps < max_steps {
            let t = self.machine.trans(self.state, self.tape.read(self.head));
            self.tape.write(self.head, t.write);
            self.state = t.next;
            self.head += t.mv.delta();
            self.min_visited = self.min_visited.min(self.head);
            self.max_visited = self.max_visited.max(self.head);
            self.steps += 1;
            if self.state == HALT_STATE {
                return RunOutcome::Halted {
                    output: self.tape.render(self.min_visited, self.max_visited),
                };
            }
            if let Some(reason) = observe(&self) {
                return RunOutcome::NonHalting(reason);
            }
        }
        RunOutcome::NonHalting(NonHaltReason::Timeout)
    }
}
