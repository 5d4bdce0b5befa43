//! Bit-field codec for 32-bit Lua 4.0 instruction words.
//!
//! Layout, low bits first:
//! - `[0, 6)`   opcode
//! - `[6, 32)`  `U` (unsigned) or `S` (signed, excess-K)
//! - `[6, 15)`  `B`, and `[15, 32)` `A`, for two-operand instructions
//!
//! Extraction is plain unsigned arithmetic on the word; the signed bias is
//! applied in `i64` so no intermediate can overflow.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::opcode::{ArgShape, Opcode};

pub const SIZE_INSTRUCTION: u32 = 32;
pub const SIZE_OP: u32 = 6;
pub const SIZE_B: u32 = 9;
pub const SIZE_U: u32 = SIZE_INSTRUCTION - SIZE_OP;
pub const POS_U: u32 = SIZE_OP;
pub const POS_B: u32 = SIZE_OP;
pub const POS_A: u32 = SIZE_OP + SIZE_B;
pub const SIZE_A: u32 = SIZE_INSTRUCTION - POS_A;

pub const MAXARG_U: u32 = (1 << SIZE_U) - 1;
pub const MAXARG_S: u32 = MAXARG_U >> 1;
pub const MAXARG_A: u32 = (1 << SIZE_A) - 1;
pub const MAXARG_B: u32 = (1 << SIZE_B) - 1;

const OP_MASK: u32 = (1 << SIZE_OP) - 1;

/// An opcode field holding a value outside the opcode table.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("unknown opcode {opcode} in word 0x{word:08X}")]
pub struct UnknownOpcode {
    pub opcode: u8,
    pub word: u32,
}

#[inline]
pub fn raw_opcode(word: u32) -> u8 {
    (word & OP_MASK) as u8
}

#[inline]
pub fn opcode_of(word: u32) -> Result<Opcode, UnknownOpcode> {
    let raw = raw_opcode(word);
    Opcode::from_u8(raw).ok_or(UnknownOpcode { opcode: raw, word })
}

#[inline]
pub fn unsigned_field(word: u32) -> u32 {
    word >> POS_U
}

#[inline]
pub fn signed_field(word: u32) -> i32 {
    // range is [-MAXARG_S, MAXARG_S + 1], always representable in i32
    (unsigned_field(word) as i64 - MAXARG_S as i64) as i32
}

#[inline]
pub fn field_a(word: u32) -> u32 {
    word >> POS_A
}

#[inline]
pub fn field_b(word: u32) -> u32 {
    (word >> POS_B) & MAXARG_B
}

#[inline]
pub fn is_jump(op: Opcode) -> bool {
    op.is_jump()
}

#[inline]
pub fn encode(op: Opcode) -> u32 {
    op.id() as u32
}

#[inline]
pub fn encode_u(op: Opcode, u: u32) -> u32 {
    debug_assert!(u <= MAXARG_U, "U operand {} out of range", u);
    encode(op) | ((u & MAXARG_U) << POS_U)
}

#[inline]
pub fn encode_s(op: Opcode, s: i32) -> u32 {
    let biased = s as i64 + MAXARG_S as i64;
    debug_assert!(
        (0..=MAXARG_U as i64).contains(&biased),
        "S operand {} out of range",
        s
    );
    encode_u(op, (biased as u32) & MAXARG_U)
}

#[inline]
pub fn encode_ab(op: Opcode, a: u32, b: u32) -> u32 {
    debug_assert!(a <= MAXARG_A, "A operand {} out of range", a);
    debug_assert!(b <= MAXARG_B, "B operand {} out of range", b);
    encode(op) | ((a & MAXARG_A) << POS_A) | ((b & MAXARG_B) << POS_B)
}

/// Operands of a word, read according to its opcode's shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operands {
    None,
    U(u32),
    S(i32),
    AB { a: u32, b: u32 },
}

/// A raw instruction word as stored in a chunk.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Instruction(pub u32);

impl Instruction {
    #[inline]
    pub fn word(self) -> u32 {
        self.0
    }

    #[inline]
    pub fn opcode(self) -> Result<Opcode, UnknownOpcode> {
        opcode_of(self.0)
    }

    #[inline]
    pub fn u(self) -> u32 {
        unsigned_field(self.0)
    }

    #[inline]
    pub fn s(self) -> i32 {
        signed_field(self.0)
    }

    #[inline]
    pub fn a(self) -> u32 {
        field_a(self.0)
    }

    #[inline]
    pub fn b(self) -> u32 {
        field_b(self.0)
    }

    pub fn operands(self) -> Result<Operands, UnknownOpcode> {
        Ok(self.operands_as(self.opcode()?))
    }

    /// Operand fields read with the shape of an already decoded `op`.
    pub fn operands_as(self, op: Opcode) -> Operands {
        match op.shape() {
            ArgShape::None => Operands::None,
            ArgShape::U => Operands::U(self.u()),
            ArgShape::S => Operands::S(self.s()),
            ArgShape::AB => Operands::AB {
                a: self.a(),
                b: self.b(),
            },
        }
    }

    /// Destination of a jump or loop instruction at `pc`.
    ///
    /// Offsets are relative to the instruction that follows the jump.
    pub fn jump_target(self, pc: usize) -> Option<i64> {
        let op = self.opcode().ok()?;
        if op.is_jump() || op.is_for_loop() {
            Some(pc as i64 + 1 + self.s() as i64)
        } else {
            None
        }
    }
}

impl From<u32> for Instruction {
    fn from(word: u32) -> Self {
        Instruction(word)
    }
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.opcode() {
            Ok(op) => write!(f, "Instruction(0x{:08X} {})", self.0, op),
            Err(_) => write!(f, "Instruction(0x{:08X} ?)", self.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use strum::IntoEnumIterator;

    #[test]
    fn layout_constants() {
        assert_eq!(SIZE_U, 26);
        assert_eq!(SIZE_A, 17);
        assert_eq!(POS_A, 15);
        assert_eq!(MAXARG_U, 0x03FF_FFFF);
        assert_eq!(MAXARG_S, 0x01FF_FFFF);
        assert_eq!(MAXARG_A, 0x1_FFFF);
        assert_eq!(MAXARG_B, 0x1FF);
    }

    #[test]
    fn opcode_field_is_low_six_bits() {
        for op in Opcode::iter() {
            let word = encode_u(op, MAXARG_U);
            assert_eq!(opcode_of(word), Ok(op));
        }
        let bad = 0xFFFF_FFC0 | 49;
        assert_eq!(
            opcode_of(bad),
            Err(UnknownOpcode {
                opcode: 49,
                word: bad
            })
        );
        assert!(opcode_of(63).is_err());
    }

    #[test]
    fn unsigned_field_roundtrip() {
        let mut rng = StdRng::seed_from_u64(0x4c75_6134);
        let edges = [0, 1, MAXARG_S, MAXARG_S + 1, MAXARG_U - 1, MAXARG_U];
        let samples = edges
            .into_iter()
            .chain((0..10_000).map(|_| rng.gen_range(0..=MAXARG_U)));
        for u in samples {
            let word = encode_u(Opcode::PushString, u);
            assert_eq!(unsigned_field(word), u);
            assert_eq!(raw_opcode(word), Opcode::PushString.id());
        }
    }

    #[test]
    fn signed_field_roundtrip() {
        let lo = -(MAXARG_S as i32);
        let hi = (MAXARG_U - MAXARG_S) as i32;
        let mut rng = StdRng::seed_from_u64(7);
        let edges = [lo, lo + 1, -1, 0, 1, hi - 1, hi];
        let samples = edges
            .into_iter()
            .chain((0..10_000).map(|_| rng.gen_range(lo..=hi)));
        for s in samples {
            let word = encode_s(Opcode::Jmp, s);
            assert_eq!(signed_field(word), s);
        }
    }

    #[test]
    fn signed_field_extremes() {
        assert_eq!(signed_field(encode(Opcode::PushInt)), -(MAXARG_S as i32));
        assert_eq!(signed_field(u32::MAX), (MAXARG_U - MAXARG_S) as i32);
        assert_eq!(signed_field(MAXARG_S << POS_U), 0);
    }

    #[test]
    fn ab_fields_roundtrip() {
        let mut rng = StdRng::seed_from_u64(42);
        let edges = [(0, 0), (MAXARG_A, 0), (0, MAXARG_B), (MAXARG_A, MAXARG_B), (1, 1)];
        let samples = edges.into_iter().chain(
            (0..10_000).map(|_| (rng.gen_range(0..=MAXARG_A), rng.gen_range(0..=MAXARG_B))),
        );
        for (a, b) in samples {
            let word = encode_ab(Opcode::Call, a, b);
            assert_eq!((field_a(word), field_b(word)), (a, b));
            assert_eq!(opcode_of(word), Ok(Opcode::Call));
        }
    }

    #[test]
    fn operands_follow_shape() {
        assert_eq!(Instruction(encode(Opcode::End)).operands(), Ok(Operands::None));
        assert_eq!(
            Instruction(encode_u(Opcode::GetLocal, 3)).operands(),
            Ok(Operands::U(3))
        );
        assert_eq!(
            Instruction(encode_s(Opcode::PushInt, -5)).operands(),
            Ok(Operands::S(-5))
        );
        assert_eq!(
            Instruction(encode_ab(Opcode::Closure, 2, 1)).operands(),
            Ok(Operands::AB { a: 2, b: 1 })
        );
        assert!(Instruction(50).operands().is_err());
        assert_eq!(
            Instruction(encode_u(Opcode::GetLocal, 3)).operands_as(Opcode::GetLocal),
            Operands::U(3)
        );
    }

    #[test]
    fn jump_targets_are_relative_to_next_instruction() {
        assert_eq!(Instruction(encode_s(Opcode::Jmp, 3)).jump_target(10), Some(14));
        assert_eq!(Instruction(encode_s(Opcode::JmpF, -4)).jump_target(10), Some(7));
        assert_eq!(Instruction(encode_s(Opcode::ForLoop, -2)).jump_target(5), Some(4));
        assert_eq!(Instruction(encode_s(Opcode::PushInt, 3)).jump_target(10), None);
        assert!(is_jump(Opcode::JmpOnF));
        assert!(!is_jump(Opcode::ForLoop));
    }
}
