//! Precompiled chunk file parsing.
//!
//! Layout, in file order (multi-byte values use the order the header declares):
//! - header: `0x1B`, `"Lua"`, u8 version, u8 little-endian flag
//! - self-check: seven u8 sizes, f64 sample number
//! - main chunk:
//!     - string source, i32 line_number, i32 num_params, u8 is_vararg,
//!       i32 max_stack_size
//!     - array of (string name, i32 start_pc, i32 end_pc) local variables
//!     - array of i32 line info
//!     - array of string, array of f64, array of chunk (recursive)
//!     - array of u32 instructions
//!
//! Strings are an i32 length that includes a trailing NUL, then the bytes.
//! Arrays are an i32 count, then the elements.

mod chunk;
mod header;
mod parser;
mod reader;
mod text;

pub use chunk::{Chunk, Constants, LocalVar, LuaFile};
pub use header::{FileHeader, SelfCheck, LUA_MAGIC, LUA_SIGNATURE_MARKER, LUA_VERSION, TEST_NUMBER};
pub use parser::{ChunkParser, ParseOptions, SelfCheckPolicy};
pub use reader::{ByteReader, Endian};
pub use text::TextEncoding;

use crate::error::Result;

/// Parse a chunk file with default options.
pub fn parse_lua_file(bytes: &[u8]) -> Result<LuaFile> {
    parse_lua_file_with(bytes, &ParseOptions::default())
}

pub fn parse_lua_file_with(bytes: &[u8], options: &ParseOptions) -> Result<LuaFile> {
    ChunkParser::new(bytes, options.clone())?.parse()
}
