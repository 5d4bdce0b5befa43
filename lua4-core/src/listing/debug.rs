use std::fmt::{self, Write as _};

use crate::error::{ChunkError, Result};
use crate::format::{Chunk, LuaFile};
use crate::instruction::{Instruction, Operands};
use crate::opcode::Opcode;

/// Plain-text disassembly, one commented block per chunk.
///
/// Nested functions follow their parent's instruction listing, indented one
/// level deeper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebugListing {
    indent_width: usize,
}

impl Default for DebugListing {
    fn default() -> Self {
        Self {
            indent_width: Self::DEFAULT_INDENT,
        }
    }
}

impl DebugListing {
    pub const DEFAULT_INDENT: usize = 4;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_indent(indent_width: usize) -> Self {
        Self { indent_width }
    }

    /// Render one chunk and everything nested in it, starting at `depth`.
    pub fn format_chunk(&self, chunk: &Chunk, depth: usize) -> Result<String> {
        let mut out = String::new();
        self.write_chunk(&mut out, chunk, depth, "main")?;
        Ok(out)
    }

    fn write_chunk(&self, out: &mut String, chunk: &Chunk, depth: usize, path: &str) -> Result<()> {
        let mut w = Lines {
            out,
            indent: " ".repeat(depth * self.indent_width),
        };

        w.line(format_args!("-- @source {}:{}", escape_string(&chunk.source), chunk.line_number))?;
        w.line(format_args!(
            "-- #params={} var_arg={} max_stack_size={}",
            chunk.num_params, chunk.is_vararg, chunk.max_stack_size
        ))?;

        w.line(format_args!("-- Local Vars ({}) --", chunk.local_vars.len()))?;
        for (i, lv) in chunk.local_vars.iter().enumerate() {
            w.line(format_args!(
                " [{}] => {} ({}-{})",
                i,
                escape_string(&lv.name),
                lv.start_pc,
                lv.end_pc
            ))?;
        }

        w.line(format_args!("-- Line Info ({}) --", chunk.line_info.len()))?;
        for (i, l) in chunk.line_info.iter().enumerate() {
            w.line(format_args!(" [{}] => 0x{:08X}", i, *l as u32))?;
        }

        let strings = &chunk.constants.strings;
        w.line(format_args!("-- String Constants ({}) --", strings.len()))?;
        for (i, s) in strings.iter().enumerate() {
            w.line(format_args!(" [{}] => \"{}\"", i, escape_string(s)))?;
        }

        let numbers = &chunk.constants.numbers;
        w.line(format_args!("-- Number Constants ({}) --", numbers.len()))?;
        for (i, n) in numbers.iter().enumerate() {
            w.line(format_args!(" [{}] => {:?}", i, n))?;
        }

        w.line(format_args!("-- Instructions ({}) --", chunk.instructions.len()))?;
        for (pc, &inst) in chunk.instructions.iter().enumerate() {
            let text = describe_instruction(chunk, pc, inst, path)?;
            w.line(format_args!(" [{}] {}", pc, text))?;
        }

        let functions = &chunk.constants.functions;
        w.line(format_args!("-- Function Constants ({}) --", functions.len()))?;
        let out = w.out;
        for (i, f) in functions.iter().enumerate() {
            let nested = format!("{}.functions[{}]", path, i);
            self.write_chunk(out, f, depth + 1, &nested)?;
            out.push('\n');
        }
        Ok(())
    }
}

impl super::ListingFormatter for DebugListing {
    fn render(&self, file: &LuaFile) -> Result<String> {
        let mut out = String::new();
        let h = &file.header;
        writeln!(
            out,
            "-- header: marker=0x{:02X} magic={:?} version=0x{:02X} little_endian={}",
            h.marker,
            String::from_utf8_lossy(&h.magic),
            h.version,
            h.little_endian
        )?;
        let c = &file.self_check;
        writeln!(
            out,
            "-- self-check: int={} size_t={} instruction={} ({}/{}/{}) number={} test_number={}",
            c.size_int,
            c.size_size_t,
            c.size_instruction,
            c.test_size_instruction,
            c.test_size_op,
            c.test_size_b,
            c.size_number,
            c.test_number
        )?;
        self.write_chunk(&mut out, &file.main, 0, "main")?;
        Ok(out)
    }
}

struct Lines<'a> {
    out: &'a mut String,
    indent: String,
}

impl Lines<'_> {
    fn line(&mut self, args: fmt::Arguments<'_>) -> fmt::Result {
        self.out.push_str(&self.indent);
        self.out.write_fmt(args)?;
        self.out.push('\n');
        Ok(())
    }
}

/// Text for `inst`, found at `pc` of `chunk`.
///
/// Constant and local operands are resolved to what they name; `path` only
/// labels errors.
pub fn describe_instruction(chunk: &Chunk, pc: usize, inst: Instruction, path: &str) -> Result<String> {
    let op = inst.opcode().map_err(|e| ChunkError::UnknownOpcode {
        chunk: path.to_string(),
        pc,
        opcode: e.opcode,
        word: e.word,
    })?;

    let out_of_range = |table: &'static str, index: u32, len: usize| ChunkError::OperandIndexOutOfRange {
        chunk: path.to_string(),
        pc,
        opcode: op,
        table,
        index,
        len,
    };
    let string = |idx: u32| {
        chunk
            .string(idx)
            .ok_or_else(|| out_of_range("strings", idx, chunk.constants.strings.len()))
    };
    let local = |idx: u32| {
        chunk
            .local_name(idx)
            .ok_or_else(|| out_of_range("local_vars", idx, chunk.local_vars.len()))
    };

    let text = match op {
        Opcode::End => "-- end --".to_string(),
        Opcode::Return => "return".to_string(),
        Opcode::PushInt => inst.s().to_string(),
        Opcode::PushString => format!("\"{}\"", escape_string(string(inst.u())?)),
        Opcode::PushNum | Opcode::PushNegNum => {
            let idx = inst.u();
            let n = chunk
                .number(idx)
                .ok_or_else(|| out_of_range("numbers", idx, chunk.constants.numbers.len()))?;
            let n = if op == Opcode::PushNegNum { -n } else { n };
            format!("{:?}", n)
        }
        Opcode::GetLocal => format!("LOCAL[{}]", escape_string(local(inst.u())?)),
        Opcode::SetLocal => format!("LOCAL[{}]=", escape_string(local(inst.u())?)),
        Opcode::GetGlobal => format!("GLOBAL[{}]", escape_string(string(inst.u())?)),
        Opcode::SetGlobal => format!("GLOBAL[{}]=", escape_string(string(inst.u())?)),
        Opcode::Closure => {
            let idx = inst.a();
            if chunk.function(idx).is_none() {
                return Err(out_of_range("functions", idx, chunk.constants.functions.len()));
            }
            generic(inst, op, pc)?
        }
        _ => generic(inst, op, pc)?,
    };
    Ok(text)
}

fn generic(inst: Instruction, op: Opcode, pc: usize) -> Result<String> {
    let mut s = format!("-- 0x{:08X} => [{:02}] {:16}", inst.word(), op.id(), op.mnemonic());
    match inst.operands_as(op) {
        Operands::AB { a, b } => write!(s, "A: {} B: {}", a, b)?,
        Operands::U(u) => write!(s, "U: {}", u)?,
        Operands::S(v) => {
            write!(s, "S: {}", v)?;
            if let Some(target) = inst.jump_target(pc) {
                write!(s, " -> [{}]", target)?;
            }
        }
        Operands::None => {}
    }
    s.truncate(s.trim_end().len());
    Ok(s)
}

fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\{:03}", c as u32)),
            c => out.push(c),
        }
    }
    out
}
