//! The Lua 4.0 opcode table.
//!
//! Every instruction word carries one of these in its low 6 bits. The rest of
//! the word is read according to the opcode's [`ArgShape`].

use num_derive::FromPrimitive;
use strum::{Display, EnumCount, EnumIter, IntoStaticStr};

/// How the 26 bits above the opcode are laid out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArgShape {
    /// No operand.
    None,
    /// One unsigned operand `U` spanning all 26 bits.
    U,
    /// One signed operand `S` (excess-K over the same 26 bits).
    S,
    /// Unsigned `A` in the top 17 bits, unsigned `B` in the 9 bits below it.
    AB,
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    FromPrimitive,
    Display,
    IntoStaticStr,
    EnumIter,
    EnumCount,
)]
#[strum(serialize_all = "UPPERCASE")]
#[repr(u8)]
pub enum Opcode {
    End = 0,
    Return = 1,

    Call = 2,
    TailCall = 3,

    PushNil = 4,
    Pop = 5,

    PushInt = 6,
    PushString = 7,
    PushNum = 8,
    PushNegNum = 9,

    PushUpvalue = 10,

    GetLocal = 11,
    GetGlobal = 12,

    GetTable = 13,
    GetDotted = 14,
    GetIndexed = 15,
    PushSelf = 16,

    CreateTable = 17,

    SetLocal = 18,
    SetGlobal = 19,
    SetTable = 20,

    SetList = 21,
    SetMap = 22,

    Add = 23,
    AddI = 24,
    Sub = 25,
    Mult = 26,
    Div = 27,
    Pow = 28,
    Concat = 29,
    Minus = 30,
    Not = 31,

    JmpNe = 32,
    JmpEq = 33,
    JmpLt = 34,
    JmpLe = 35,
    JmpGt = 36,
    JmpGe = 37,

    JmpT = 38,
    JmpF = 39,
    JmpOnT = 40,
    JmpOnF = 41,
    Jmp = 42,

    PushNilJmp = 43,

    ForPrep = 44,
    ForLoop = 45,

    LForPrep = 46,
    LForLoop = 47,

    Closure = 48,
}

/// Number of defined opcodes; raw values `NUM_OPCODES..64` are invalid.
pub const NUM_OPCODES: usize = Opcode::COUNT;

impl Opcode {
    #[inline]
    pub fn from_u8(raw: u8) -> Option<Self> {
        <Self as num_traits::FromPrimitive>::from_u8(raw)
    }

    #[inline]
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Upper-case Lua mnemonic, e.g. `PUSHNEGNUM`.
    #[inline]
    pub fn mnemonic(self) -> &'static str {
        self.into()
    }

    pub fn shape(self) -> ArgShape {
        use Opcode::*;
        match self {
            End | GetTable | Add | Sub | Mult | Div | Pow | Minus | Not | PushNilJmp => {
                ArgShape::None
            }

            Return | PushNil | Pop | PushString | PushNum | PushNegNum | PushUpvalue
            | GetLocal | GetGlobal | GetDotted | GetIndexed | PushSelf | CreateTable
            | SetLocal | SetGlobal | SetMap | Concat => ArgShape::U,

            PushInt | AddI | JmpNe | JmpEq | JmpLt | JmpLe | JmpGt | JmpGe | JmpT | JmpF
            | JmpOnT | JmpOnF | Jmp | ForPrep | ForLoop | LForPrep | LForLoop => ArgShape::S,

            Call | TailCall | SetTable | SetList | Closure => ArgShape::AB,
        }
    }

    /// Conditional and unconditional jumps, `JMPNE..=JMP`.
    #[inline]
    pub fn is_jump(self) -> bool {
        (Opcode::JmpNe..=Opcode::Jmp).contains(&self)
    }

    /// Numeric and generic `for` loop instructions; their `S` is a jump offset too.
    #[inline]
    pub fn is_for_loop(self) -> bool {
        (Opcode::ForPrep..=Opcode::LForLoop).contains(&self)
    }
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        Opcode::from_u8(raw).ok_or(raw)
    }
}
