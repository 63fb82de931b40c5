//! Transition tables for the `(n, 2)` classes and the mixed-radix codec that
//! places every table in bijection with `[0, (4n+2)^(2n))`.
//!
//! The digit for the `(state, symbol)` cell occupies position
//! `2*(state-1) + symbol`, big-endian. Digit values `0` and `1` halt writing
//! that symbol; a value `d >= 2` decodes as `e = d - 2` with
//! `next = 1 + e/4`, `write = (e/2) % 2`, and a left move iff `e` is even.

use super::{MachineCode, State, Symbol, HALT_STATE, MAX_TM_STATES, SYMBOLS};
use crate::error::{Error, Result};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use thiserror::Error;

/// The digit base of the codec for an `n`-state class.
pub fn code_base(n: usize) -> MachineCode {
    (4 * n + 2) as MachineCode
}

/// The number of machines in the raw `n`-state class: `base^(2n)`.
pub fn class_size(n: usize) -> MachineCode {
    code_base(n).pow(2 * n as u32)
}

/// Head movement. Halt transitions carry `None`; active transitions move.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub enum Move {
    Left,
    #[default]
    None,
    Right,
}

impl Move {
    /// Head displacement.
    pub fn delta(self) -> i64 {
        match self {
            Move::Left => -1,
            Move::None => 0,
            Move::Right => 1,
        }
    }
}

/// One table entry: successor state, written symbol, head movement.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
pub struct Trans {
    pub next: State,
    pub write: Symbol,
    pub mv: Move,
}

impl Trans {
    pub fn is_halt(self) -> bool {
        self.next == HALT_STATE
    }

    fn from_digit(d: MachineCode) -> Trans {
        if d < SYMBOLS as MachineCode {
            Trans {
                next: HALT_STATE,
                write: d as Symbol,
                mv: Move::None,
            }
        } else {
            let e = d - SYMBOLS as MachineCode;
            Trans {
                next: (1 + e / 4) as State,
                write: ((e / 2) % 2) as Symbol,
                mv: if e % 2 == 0 { Move::Left } else { Move::Right },
            }
        }
    }

    fn to_digit(self) -> MachineCode {
        if self.is_halt() {
            self.write as MachineCode
        } else {
            let mv = matches!(self.mv, Move::Right) as MachineCode;
            SYMBOLS as MachineCode + (self.next as MachineCode - 1) * 4 + self.write as MachineCode * 2 + mv
        }
    }
}

#[derive(Error, Debug)]
#[error("machine text is three chars per transition (write, L/R/N, next letter or H), two transitions per state, states joined by '_'")]
pub struct BadMachineText;

/// A total transition table for an `n`-state binary machine. Fits in tens of
/// bytes and is trivially copyable; one lives only as long as one run.
#[derive(Clone, Copy, SerializeDisplay, DeserializeFromStr, Debug, Eq, PartialEq)]
pub struct Machine {
    n: u8,
    table: [[Trans; SYMBOLS]; MAX_TM_STATES],
}

impl Machine {
    /// The number of active states.
    pub fn states(&self) -> usize {
        self.n as usize
    }

    /// The transition taken in `state` (`1..=n`) reading `sym`.
    pub fn trans(&self, state: State, sym: Symbol) -> Trans {
        self.table[state as usize - 1][sym as usize]
    }

    /// The `2n` live entries, in codec digit order.
    pub fn entries(&self) -> impl Iterator<Item = Trans> + '_ {
        self.table[..self.states()].iter().flatten().copied()
    }

    /// Decode a machine code into its table. Rejects codes at or beyond
    /// `base^(2n)`.
    pub fn decode(code: MachineCode, n: usize) -> Result<Machine> {
        if n == 0 || n > MAX_TM_STATES {
            return Err(Error::InvalidStateCount { n });
        }
        let max = class_size(n);
        if code >= max {
            return Err(Error::CodeOutOfRange { code, max });
        }
        let base = code_base(n);
        let mut machine = Machine {
            n: n as u8,
            table: Default::default(),
        };
        let mut rest = code;
        for cell in (0..SYMBOLS * n).rev() {
            machine.table[cell / SYMBOLS][cell % SYMBOLS] = Trans::from_digit(rest % base);
            rest /= base;
        }
        Ok(machine)
    }

    /// The inverse of [`Machine::decode`].
    pub fn encode(&self) -> MachineCode {
        let base = code_base(self.states());
        self.entries().fold(0, |code, t| code * base + t.to_digit())
    }
}

impl Display for Machine {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        for (i, pair) in self.table[..self.states()].iter().enumerate() {
            if i > 0 {
                write!(f, "_")?;
            }
            for t in pair {
                let mv = match t.mv {
                    Move::Left => 'L',
                    Move::None => 'N',
                    Move::Right => 'R',
                };
                let next = if t.is_halt() {
                    'H'
                } else {
                    (b'A' + t.next - 1) as char
                };
                write!(f, "{}{}{}", t.write, mv, next)?;
            }
        }
        Ok(())
    }
}

impl FromStr for Machine {
    type Err = BadMachineText;

    fn from_str(text: &str) -> std::result::Result<Self, Self::Err> {
        let parts: Vec<&str> = text.split('_').collect();
        let n = parts.len();
        if n == 0 || n > MAX_TM_STATES {
            return Err(BadMachineText);
        }
        let mut machine = Machine {
            n: n as u8,
            table: Default::default(),
        };
        for (state, part) in parts.iter().enumerate() {
            let chars: Vec<char> = part.chars().collect();
            if chars.len() != 3 * SYMBOLS {
                return Err(BadMachineText);
            }
            for sym in 0..SYMBOLS {
                let write = match chars[3 * sym] {
                    '0' => 0 as Symbol,
                    '1' => 1 as Symbol,
                    _ => return Err(BadMachineText),
                };
                let mv = match chars[3 * sym + 1] {
                    'L' => Move::Left,
                    'N' => Move::None,
                    'R' => Move::Right,
                    _ => return Err(BadMachineText),
                };
                let next = match chars[3 * sym + 2] {
                    'H' => HALT_STATE,
                    c @ 'A'..='F' => c as State - b'A' as State + 1,
                    _ => return Err(BadMachineText),
                };
                // Halt entries do not move; active entries must.
                if (next == HALT_STATE) != matches!(mv, Move::None) || next as usize > n {
                    return Err(BadMachineText);
                }
                machine.table[state][sym] = Trans { next, write, mv };
            }
        }
        Ok(machine)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digit_layout() {
        // Digits 0 and 1 halt writing that symbol, with no motion.
        assert_eq!(
            Trans::from_digit(0),
            Trans { next: HALT_STATE, write: 0, mv: Move::None }
        );
        assert_eq!(
            Trans::from_digit(1),
            Trans { next: HALT_STATE, write: 1, mv: Move::None }
        );
        // Digit 2 is the first active entry: state 1, write 0, move left.
        assert_eq!(
            Trans::from_digit(2),
            Trans { next: 1, write: 0, mv: Move::Left }
        );
        // Highest digit of the n=2 class (base 10): state 2, write 1, right.
        assert_eq!(
            Trans::from_digit(9),
            Trans { next: 2, write: 1, mv: Move::Right }
        );
        for d in 0..code_base(3) {
            assert_eq!(Trans::from_digit(d).to_digit(), d);
        }
    }

    #[test]
    fn test_round_trip_exhaustive_n1() {
        for code in 0..class_size(1) {
            let machine = Machine::decode(code, 1).unwrap();
            assert_eq!(machine.encode(), code);
        }
    }

    #[test]
    fn test_round_trip_strided() {
        for n in 2..=5 {
            let max = class_size(n);
            let stride = (max / 9973).max(1);
            for code in (0..max).step_by(stride as usize).chain([max - 1]) {
                let machine = Machine::decode(code, n).unwrap();
                assert_eq!(machine.encode(), code, "n={n} code={code}");
            }
        }
    }

    #[test]
    fn test_decode_out_of_range() {
        assert!(matches!(
            Machine::decode(class_size(2), 2),
            Err(Error::CodeOutOfRange { .. })
        ));
        assert!(matches!(
            Machine::decode(0, 7),
            Err(Error::InvalidStateCount { n: 7 })
        ));
    }

    #[test]
    fn test_write_one_and_halt() {
        // Digits (1, 0): state 1 on blank halts writing 1.
        let machine = Machine::decode(6, 1).unwrap();
        assert_eq!(
            machine.trans(1, 0),
            Trans { next: HALT_STATE, write: 1, mv: Move::None }
        );
        assert_eq!(machine.to_string(), "1NH0NH");
    }

    #[test]
    fn test_text_notation() {
        let machine = Machine::from_str("1RB0NH_1LA1NH").unwrap();
        assert_eq!(machine.states(), 2);
        assert_eq!(
            machine.trans(1, 0),
            Trans { next: 2, write: 1, mv: Move::Right }
        );
        assert_eq!(machine.to_string(), "1RB0NH_1LA1NH");
        assert_eq!(
            Machine::decode(machine.encode(), 2).unwrap(),
            machine
        );

        assert!(Machine::from_str("1RB").is_err());
        assert!(Machine::from_str("2RB0NH").is_err());
        // A halt entry that moves, and a move entry into a state beyond n.
        assert!(Machine::from_str("1RH0NH").is_err());
        assert!(Machine::from_str("1RC0NH_0NH0NH").is_err());
    }
}
