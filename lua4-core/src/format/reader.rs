use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::error::{ChunkError, Result};
use crate::format::text::TextEncoding;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endian {
    #[default]
    Little,
    Big,
}

/// Forward-only cursor over a chunk file buffer.
///
/// Every read names the field it is decoding so a short buffer reports which
/// value was cut off, and where.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    endian: Endian,
    encoding: TextEncoding,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8], endian: Endian) -> Self {
        Self {
            bytes,
            pos: 0,
            endian,
            encoding: TextEncoding::default(),
        }
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    #[inline]
    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    fn take(&mut self, n: usize, field: &str) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(ChunkError::Truncated {
                field: field.to_string(),
                offset: self.pos,
                needed: n,
                available: self.remaining(),
            });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn read_bytes(&mut self, n: usize, field: &str) -> Result<&'a [u8]> {
        self.take(n, field)
    }

    pub fn read_u8(&mut self, field: &str) -> Result<u8> {
        Ok(self.take(1, field)?[0])
    }

    pub fn read_i32(&mut self, field: &str) -> Result<i32> {
        let buf = self.take(4, field)?;
        Ok(match self.endian {
            Endian::Little => LittleEndian::read_i32(buf),
            Endian::Big => BigEndian::read_i32(buf),
        })
    }

    pub fn read_u32(&mut self, field: &str) -> Result<u32> {
        let buf = self.take(4, field)?;
        Ok(match self.endian {
            Endian::Little => LittleEndian::read_u32(buf),
            Endian::Big => BigEndian::read_u32(buf),
        })
    }

    pub fn read_f64(&mut self, field: &str) -> Result<f64> {
        let buf = self.take(8, field)?;
        Ok(match self.endian {
            Endian::Little => LittleEndian::read_f64(buf),
            Endian::Big => BigEndian::read_f64(buf),
        })
    }

    /// Read a length-prefixed, NUL-terminated string.
    ///
    /// The length counts the terminator. Trailing NULs of the payload are
    /// dropped; embedded ones are kept.
    pub fn read_string(&mut self, field: &str) -> Result<String> {
        let offset = self.pos;
        let len = self.read_i32(field)?;
        if len < 0 {
            return Err(ChunkError::MalformedLength {
                field: field.to_string(),
                offset,
                length: len,
            });
        }
        if len == 0 {
            return Err(ChunkError::MalformedString {
                field: field.to_string(),
                offset,
                reason: "zero length leaves no room for the terminator",
            });
        }

        let raw = self.take(len as usize, field)?;
        let (payload, terminator) = raw.split_at(raw.len() - 1);
        if terminator[0] != 0 {
            return Err(ChunkError::MalformedString {
                field: field.to_string(),
                offset: self.pos - 1,
                reason: "missing NUL terminator",
            });
        }

        let end = payload.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
        Ok(self.encoding.decode(&payload[..end]).into_owned())
    }

    /// Read an array element count.
    pub fn read_count(&mut self, field: &str) -> Result<usize> {
        let offset = self.pos;
        let count = self.read_i32(field)?;
        if count < 0 {
            return Err(ChunkError::MalformedLength {
                field: field.to_string(),
                offset,
                length: count,
            });
        }
        Ok(count as usize)
    }

    /// Read a count-prefixed array, calling `element` once per entry.
    ///
    /// `min_len` is the smallest encoded size of one element; it bounds the
    /// up-front reservation so a hostile count cannot outgrow the input.
    /// Errors from an element are qualified as `field[i]`.
    pub fn read_array<T>(
        &mut self,
        field: &str,
        min_len: usize,
        mut element: impl FnMut(&mut Self) -> Result<T>,
    ) -> Result<Vec<T>> {
        let count = self.read_count(field)?;
        let mut items = Vec::with_capacity(count.min(self.remaining() / min_len.max(1)));
        for i in 0..count {
            let item = element(self).map_err(|e| e.within(&format!("[{}]", i)).within(field))?;
            items.push(item);
        }
        Ok(items)
    }
}
