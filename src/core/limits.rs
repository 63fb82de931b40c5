//! Define the hard, compile-time limits on the machine classes we enumerate.

/// A TM tape symbol.
pub type Symbol = u8;
/// A number indexing a TM state. 0 is the halt state; active states are `1..=n`.
pub type State = u8;
/// An integer addressing one machine within its class (§ codec).
pub type MachineCode = u64;

/// The size of a Turing machine's tape alphabet.
pub const SYMBOLS: usize = 2;
/// The distinguished sink state; entering it terminates the machine.
pub const HALT_STATE: State = 0;
/// The largest supported number of active states: `(4n+2)^(2n)` must fit in
/// a `MachineCode` for every supported `n`.
pub const MAX_TM_STATES: usize = 6;
