use serde::{Deserialize, Serialize};

use crate::error::{ChunkError, Result};
use crate::format::chunk::{Chunk, Constants, LocalVar, LuaFile};
use crate::format::header::{FileHeader, SelfCheck};
use crate::format::reader::{ByteReader, Endian};
use crate::format::text::TextEncoding;
use crate::instruction::Instruction;

// smallest encoded sizes, used to bound array reservations
const MIN_STRING_LEN: usize = 4 + 1;
const MIN_LOCAL_VAR_LEN: usize = MIN_STRING_LEN + 4 + 4;

/// What to do when the self-check record disagrees with this reader's layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelfCheckPolicy {
    /// Refuse the file.
    #[default]
    Strict,
    /// Log a warning and decode anyway.
    Lenient,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Deepest function nesting accepted; the main chunk is depth 0.
    pub max_depth: usize,
    /// Largest input accepted, in bytes.
    pub max_input_len: usize,
    pub self_check: SelfCheckPolicy,
    pub encoding: TextEncoding,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            max_depth: 1000,
            max_input_len: 64 << 20,
            self_check: SelfCheckPolicy::Strict,
            encoding: TextEncoding::Utf8,
        }
    }
}

/// Recursive-descent decoder for a whole chunk file.
pub struct ChunkParser<'a> {
    reader: ByteReader<'a>,
    options: ParseOptions,
}

impl<'a> ChunkParser<'a> {
    pub fn new(bytes: &'a [u8], options: ParseOptions) -> Result<Self> {
        if bytes.len() > options.max_input_len {
            return Err(ChunkError::InputTooLarge {
                len: bytes.len(),
                limit: options.max_input_len,
            });
        }
        // the header is bytes only; the real order is known once it is read
        let reader = ByteReader::new(bytes, Endian::Little).with_encoding(options.encoding);
        Ok(Self { reader, options })
    }

    pub fn parse(mut self) -> Result<LuaFile> {
        let header = FileHeader::read(&mut self.reader)?;
        self.reader.set_endian(header.endian());

        let self_check = SelfCheck::read(&mut self.reader)?;
        if let Err(e) = self_check.validate() {
            match self.options.self_check {
                SelfCheckPolicy::Strict => return Err(e),
                SelfCheckPolicy::Lenient => log::warn!("{}, decoding anyway", e),
            }
        }

        let main = self.parse_chunk(0).map_err(|e| e.within("main"))?;

        if self.reader.remaining() > 0 {
            log::warn!(
                "ignoring {} trailing bytes at offset 0x{:X}",
                self.reader.remaining(),
                self.reader.position()
            );
        }

        Ok(LuaFile {
            header,
            self_check,
            main,
        })
    }

    fn parse_chunk(&mut self, depth: usize) -> Result<Chunk> {
        if depth > self.options.max_depth {
            return Err(ChunkError::TooDeeplyNested {
                path: String::new(),
                limit: self.options.max_depth,
            });
        }

        let r = &mut self.reader;
        let source = r.read_string("source")?;
        let line_number = r.read_i32("line_number")?;
        let num_params = r.read_i32("num_params")?;
        let is_vararg = r.read_u8("is_vararg")? != 0;
        let max_stack_size = r.read_i32("max_stack_size")?;

        let local_vars = r.read_array("local_vars", MIN_LOCAL_VAR_LEN, |r| {
            Ok(LocalVar {
                name: r.read_string("name")?,
                start_pc: r.read_i32("start_pc")?,
                end_pc: r.read_i32("end_pc")?,
            })
        })?;
        let line_info = r.read_array("line_info", 4, |r| r.read_i32("line"))?;

        let strings = r.read_array("strings", MIN_STRING_LEN, |r| r.read_string("string"))?;
        let numbers = r.read_array("numbers", 8, |r| r.read_f64("number"))?;
        let functions = self.array("functions", |p| p.parse_chunk(depth + 1))?;

        let instructions = self
            .reader
            .read_array("instructions", 4, |r| r.read_u32("instruction").map(Instruction))?;

        log::debug!(
            "chunk {}:{} depth={} locals={} strings={} numbers={} functions={} instructions={}",
            source,
            line_number,
            depth,
            local_vars.len(),
            strings.len(),
            numbers.len(),
            functions.len(),
            instructions.len()
        );

        Ok(Chunk {
            source,
            line_number,
            num_params,
            is_vararg,
            max_stack_size,
            local_vars,
            line_info,
            constants: Constants {
                strings,
                numbers,
                functions,
            },
            instructions,
        })
    }

    /// Like [`ByteReader::read_array`], for elements that need the parser itself.
    ///
    /// Nothing is reserved up front: a nested chunk is far larger in memory
    /// than its smallest encoding.
    fn array<T>(
        &mut self,
        field: &str,
        mut element: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        let count = self.reader.read_count(field)?;
        let mut items = Vec::new();
        for i in 0..count {
            let item = element(self).map_err(|e| e.within(&format!("[{}]", i)).within(field))?;
            items.push(item);
        }
        Ok(items)
    }
}
