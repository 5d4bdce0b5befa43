#![allow(dead_code)]

//! Assembles chunk files in memory so tests do not depend on a Lua compiler.

use lua4_core::format::TEST_NUMBER;

#[derive(Debug, Clone, Default)]
pub struct FixtureChunk {
    pub source: String,
    pub line_number: i32,
    pub num_params: i32,
    pub is_vararg: bool,
    pub max_stack_size: i32,
    pub local_vars: Vec<(String, i32, i32)>,
    pub line_info: Vec<i32>,
    pub strings: Vec<String>,
    pub numbers: Vec<f64>,
    pub functions: Vec<FixtureChunk>,
    pub instructions: Vec<u32>,
}

impl FixtureChunk {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.to_string(),
            ..Default::default()
        }
    }

    pub fn local(mut self, name: &str, start_pc: i32, end_pc: i32) -> Self {
        self.local_vars.push((name.to_string(), start_pc, end_pc));
        self
    }

    pub fn string(mut self, s: &str) -> Self {
        self.strings.push(s.to_string());
        self
    }

    pub fn number(mut self, n: f64) -> Self {
        self.numbers.push(n);
        self
    }

    pub fn function(mut self, f: FixtureChunk) -> Self {
        self.functions.push(f);
        self
    }

    pub fn code(mut self, words: &[u32]) -> Self {
        self.instructions.extend_from_slice(words);
        self
    }
}

pub struct FixtureWriter {
    pub buf: Vec<u8>,
    little_endian: bool,
}

impl FixtureWriter {
    pub fn new(little_endian: bool) -> Self {
        Self {
            buf: Vec::new(),
            little_endian,
        }
    }

    pub fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub fn i32(&mut self, v: i32) -> &mut Self {
        if self.little_endian {
            self.buf.extend_from_slice(&v.to_le_bytes());
        } else {
            self.buf.extend_from_slice(&v.to_be_bytes());
        }
        self
    }

    pub fn u32(&mut self, v: u32) -> &mut Self {
        self.i32(v as i32)
    }

    pub fn f64(&mut self, v: f64) -> &mut Self {
        if self.little_endian {
            self.buf.extend_from_slice(&v.to_le_bytes());
        } else {
            self.buf.extend_from_slice(&v.to_be_bytes());
        }
        self
    }

    pub fn string(&mut self, s: &str) -> &mut Self {
        self.i32(s.len() as i32 + 1);
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
        self
    }

    pub fn header(&mut self) -> &mut Self {
        self.buf.extend_from_slice(&[0x1B, b'L', b'u', b'a', 0x40]);
        let flag = self.little_endian as u8;
        self.u8(flag)
    }

    pub fn self_check(&mut self) -> &mut Self {
        for size in [4, 4, 4, 32, 6, 9, 8] {
            self.u8(size);
        }
        self.f64(TEST_NUMBER)
    }

    pub fn chunk(&mut self, c: &FixtureChunk) -> &mut Self {
        self.string(&c.source)
            .i32(c.line_number)
            .i32(c.num_params)
            .u8(c.is_vararg as u8)
            .i32(c.max_stack_size);

        self.i32(c.local_vars.len() as i32);
        for (name, start, end) in &c.local_vars {
            self.string(name).i32(*start).i32(*end);
        }
        self.i32(c.line_info.len() as i32);
        for l in &c.line_info {
            self.i32(*l);
        }
        self.i32(c.strings.len() as i32);
        for s in &c.strings {
            self.string(s);
        }
        self.i32(c.numbers.len() as i32);
        for n in &c.numbers {
            self.f64(*n);
        }
        self.i32(c.functions.len() as i32);
        for f in &c.functions {
            self.chunk(f);
        }
        self.i32(c.instructions.len() as i32);
        for w in &c.instructions {
            self.u32(*w);
        }
        self
    }
}

/// A complete file: header, self-check and `main`.
pub fn file_bytes(main: &FixtureChunk, little_endian: bool) -> Vec<u8> {
    let mut w = FixtureWriter::new(little_endian);
    w.header().self_check().chunk(main);
    w.buf
}

/// Bytes of the header and self-check record alone.
pub const PREAMBLE_LEN: usize = 6 + 7 + 8;
