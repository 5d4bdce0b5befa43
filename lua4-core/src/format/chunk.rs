use serde::{Deserialize, Serialize};

use crate::format::header::{FileHeader, SelfCheck};
use crate::instruction::Instruction;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalVar {
    pub name: String,
    /// First instruction where the variable is live.
    pub start_pc: i32,
    /// First instruction where it is dead again.
    pub end_pc: i32,
}

/// Constant pools of one chunk. Instructions index into exactly one of these,
/// chosen by opcode.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constants {
    pub strings: Vec<String>,
    pub numbers: Vec<f64>,
    /// Nested function prototypes, in definition order.
    pub functions: Vec<Chunk>,
}

/// One compiled function body, the top-level script included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub source: String,
    pub line_number: i32,
    pub num_params: i32,
    pub is_vararg: bool,
    pub max_stack_size: i32,
    pub local_vars: Vec<LocalVar>,
    /// Opaque per-instruction line mapping.
    pub line_info: Vec<i32>,
    pub constants: Constants,
    pub instructions: Vec<Instruction>,
}

impl Chunk {
    pub fn local_name(&self, idx: u32) -> Option<&str> {
        self.local_vars.get(idx as usize).map(|v| v.name.as_str())
    }

    pub fn string(&self, idx: u32) -> Option<&str> {
        self.constants.strings.get(idx as usize).map(String::as_str)
    }

    pub fn number(&self, idx: u32) -> Option<f64> {
        self.constants.numbers.get(idx as usize).copied()
    }

    pub fn function(&self, idx: u32) -> Option<&Chunk> {
        self.constants.functions.get(idx as usize)
    }

    /// This chunk plus every nested function below it.
    pub fn chunk_count(&self) -> usize {
        1 + self
            .constants
            .functions
            .iter()
            .map(Chunk::chunk_count)
            .sum::<usize>()
    }
}

/// A whole precompiled file: header, self-check record and the main chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LuaFile {
    pub header: FileHeader,
    pub self_check: SelfCheck,
    pub main: Chunk,
}
