use serde::{Deserialize, Serialize};

use crate::error::{ChunkError, Result};
use crate::format::reader::{ByteReader, Endian};
use crate::instruction::{SIZE_B, SIZE_INSTRUCTION, SIZE_OP};

/// `ESC` marker at the start of every precompiled chunk.
pub const LUA_SIGNATURE_MARKER: u8 = 0x1B;
pub const LUA_MAGIC: &[u8; 3] = b"Lua";
/// Version byte written by the Lua 4.0 dumper.
pub const LUA_VERSION: u8 = 0x40;
/// Sample number the dumper writes so loaders can detect a foreign float format.
pub const TEST_NUMBER: f64 = 3.14159265358979323846E8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHeader {
    pub marker: u8,
    pub magic: [u8; 3],
    pub version: u8,
    pub little_endian: bool,
}

impl FileHeader {
    /// Byte order declared for everything after the header.
    pub fn endian(&self) -> Endian {
        if self.little_endian {
            Endian::Little
        } else {
            Endian::Big
        }
    }

    pub(crate) fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        let marker = reader.read_u8("marker")?;
        if marker != LUA_SIGNATURE_MARKER {
            return Err(ChunkError::InvalidHeader {
                what: "marker",
                found: format!("0x{:02X}", marker),
                expected: format!("0x{:02X}", LUA_SIGNATURE_MARKER),
            });
        }

        let raw = reader.read_bytes(3, "magic")?;
        if raw != LUA_MAGIC {
            return Err(ChunkError::InvalidHeader {
                what: "magic",
                found: format!("{:02X?}", raw),
                expected: "\"Lua\"".to_string(),
            });
        }
        let magic = [raw[0], raw[1], raw[2]];

        let version = reader.read_u8("version")?;
        if version != LUA_VERSION {
            log::warn!(
                "chunk version 0x{:02X} differs from 0x{:02X}, decoding anyway",
                version,
                LUA_VERSION
            );
        }

        let little_endian = match reader.read_u8("little_endian")? {
            0 => false,
            1 => true,
            other => {
                return Err(ChunkError::InvalidHeader {
                    what: "endianness flag",
                    found: other.to_string(),
                    expected: "0 or 1".to_string(),
                })
            }
        };

        Ok(Self {
            marker,
            magic,
            version,
            little_endian,
        })
    }
}

/// Primitive sizes recorded by the producing compiler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfCheck {
    pub size_int: u8,
    pub size_size_t: u8,
    pub size_instruction: u8,
    pub test_size_instruction: u8,
    pub test_size_op: u8,
    pub test_size_b: u8,
    pub size_number: u8,
    pub test_number: f64,
}

impl SelfCheck {
    /// The record this reader's layout assumes: 32-bit ints and lengths,
    /// 32-bit instructions with 6-bit opcodes and 9-bit `B`, double numbers.
    pub fn expected() -> Self {
        Self {
            size_int: 4,
            size_size_t: 4,
            size_instruction: 4,
            test_size_instruction: SIZE_INSTRUCTION as u8,
            test_size_op: SIZE_OP as u8,
            test_size_b: SIZE_B as u8,
            size_number: 8,
            test_number: TEST_NUMBER,
        }
    }

    pub(crate) fn read(reader: &mut ByteReader<'_>) -> Result<Self> {
        Ok(Self {
            size_int: reader.read_u8("size_int")?,
            size_size_t: reader.read_u8("size_size_t")?,
            size_instruction: reader.read_u8("size_instruction")?,
            test_size_instruction: reader.read_u8("test_size_instruction")?,
            test_size_op: reader.read_u8("test_size_op")?,
            test_size_b: reader.read_u8("test_size_b")?,
            size_number: reader.read_u8("size_number")?,
            test_number: reader.read_f64("test_number")?,
        })
    }

    /// Compare against [`SelfCheck::expected`], reporting the first mismatch.
    ///
    /// The sample number is compared after truncation to an integer, the way
    /// the reference loader does it.
    pub fn validate(&self) -> Result<()> {
        let expected = Self::expected();
        let sizes = [
            ("size_int", self.size_int, expected.size_int),
            ("size_size_t", self.size_size_t, expected.size_size_t),
            ("size_instruction", self.size_instruction, expected.size_instruction),
            (
                "test_size_instruction",
                self.test_size_instruction,
                expected.test_size_instruction,
            ),
            ("test_size_op", self.test_size_op, expected.test_size_op),
            ("test_size_b", self.test_size_b, expected.test_size_b),
            ("size_number", self.size_number, expected.size_number),
        ];
        for (what, found, want) in sizes {
            if found != want {
                return Err(ChunkError::SelfCheckMismatch {
                    what,
                    found: found.to_string(),
                    expected: want.to_string(),
                });
            }
        }

        if !self.test_number.is_finite() || self.test_number as i64 != TEST_NUMBER as i64 {
            return Err(ChunkError::SelfCheckMismatch {
                what: "test_number",
                found: self.test_number.to_string(),
                expected: TEST_NUMBER.to_string(),
            });
        }
        Ok(())
    }
}
