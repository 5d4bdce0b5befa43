use serde::Serialize;

use crate::error::{ChunkError, Result};
use crate::format::{Chunk, FileHeader, LocalVar, LuaFile, SelfCheck};
use crate::instruction::Operands;

/// The parsed tree as YAML, with every instruction decoded into a mnemonic
/// and its operands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct YamlListing;

#[derive(Debug, Serialize)]
struct Disassembly<'a> {
    header: &'a FileHeader,
    self_check: &'a SelfCheck,
    main: Function<'a>,
}

#[derive(Debug, Serialize)]
struct Function<'a> {
    source: &'a str,
    line_number: i32,
    num_params: i32,
    is_vararg: bool,
    max_stack_size: i32,
    local_vars: &'a [LocalVar],
    line_info: &'a [i32],
    strings: &'a [String],
    numbers: &'a [f64],
    insts: Vec<Inst>,
    functions: Vec<Function<'a>>,
}

#[derive(Debug, Serialize)]
struct Inst {
    pc: usize,
    word: String,
    mnemonic: &'static str,
    operands: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<i64>,
}

impl<'a> Function<'a> {
    fn build(chunk: &'a Chunk, path: &str) -> Result<Self> {
        let mut insts = Vec::with_capacity(chunk.instructions.len());
        for (pc, inst) in chunk.instructions.iter().enumerate() {
            let unknown = |e: crate::instruction::UnknownOpcode| ChunkError::UnknownOpcode {
                chunk: path.to_string(),
                pc,
                opcode: e.opcode,
                word: e.word,
            };
            let op = inst.opcode().map_err(unknown)?;
            let operands = match inst.operands().map_err(unknown)? {
                Operands::None => Vec::new(),
                Operands::U(u) => vec![u.to_string()],
                Operands::S(s) => vec![s.to_string()],
                Operands::AB { a, b } => vec![a.to_string(), b.to_string()],
            };
            insts.push(Inst {
                pc,
                word: format!("0x{:08X}", inst.word()),
                mnemonic: op.mnemonic(),
                operands,
                target: inst.jump_target(pc),
            });
        }

        let functions = chunk
            .constants
            .functions
            .iter()
            .enumerate()
            .map(|(i, f)| Function::build(f, &format!("{}.functions[{}]", path, i)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            source: &chunk.source,
            line_number: chunk.line_number,
            num_params: chunk.num_params,
            is_vararg: chunk.is_vararg,
            max_stack_size: chunk.max_stack_size,
            local_vars: &chunk.local_vars,
            line_info: &chunk.line_info,
            strings: &chunk.constants.strings,
            numbers: &chunk.constants.numbers,
            insts,
            functions,
        })
    }
}

impl super::ListingFormatter for YamlListing {
    fn render(&self, file: &LuaFile) -> Result<String> {
        let disassembly = Disassembly {
            header: &file.header,
            self_check: &file.self_check,
            main: Function::build(&file.main, "main")?,
        };
        Ok(serde_yaml::to_string(&disassembly)?)
    }
}
