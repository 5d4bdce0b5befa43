//! This crate implements the core of lua4dis
//!
//! It parses precompiled Lua 4.0 chunk files into an owned tree, decodes the
//! packed 32-bit instruction words and renders the tree as a listing.

#![allow(clippy::uninlined_format_args)]

pub mod error;
pub mod format;
pub mod instruction;
pub mod listing;
pub mod opcode;

pub use error::{ChunkError, Result};
pub use format::{
    parse_lua_file, parse_lua_file_with, Chunk, Constants, FileHeader, LocalVar, LuaFile,
    ParseOptions, SelfCheck, SelfCheckPolicy, TextEncoding,
};
pub use instruction::{Instruction, Operands};
pub use listing::{DebugListing, ListingFormatter, ListingMode, YamlListing};
pub use opcode::{ArgShape, Opcode};
