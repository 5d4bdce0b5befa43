use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use encoding_rs::{Encoding as RsEncoding, GB18030, SHIFT_JIS, UTF_8, WINDOWS_1252};
use serde::{Deserialize, Serialize};

/// Encoding used to turn Lua byte strings into text.
///
/// Lua strings are raw bytes; scripts shipped with older games are often
/// Shift-JIS or GBK rather than UTF-8.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextEncoding {
    #[default]
    Utf8,
    Sjis,
    /// Decoded as GB18030, which is a superset.
    Gbk,
    /// Decoded as windows-1252, as browsers do for the latin1 label.
    Latin1,
}

impl TextEncoding {
    #[inline]
    pub fn as_encoding_rs(self) -> &'static RsEncoding {
        match self {
            TextEncoding::Utf8 => UTF_8,
            TextEncoding::Sjis => SHIFT_JIS,
            TextEncoding::Gbk => GB18030,
            TextEncoding::Latin1 => WINDOWS_1252,
        }
    }

    /// Decode `bytes` as-is; a leading byte order mark is text, not a hint.
    pub fn decode<'a>(self, bytes: &'a [u8]) -> Cow<'a, str> {
        if self == TextEncoding::Utf8 {
            if let Ok(s) = std::str::from_utf8(bytes) {
                return Cow::Borrowed(s);
            }
        }
        let (text, had_errors) = self.as_encoding_rs().decode_without_bom_handling(bytes);
        if had_errors {
            log::warn!("{} decode error in {:02X?}", self, bytes);
        }
        text
    }
}

impl FromStr for TextEncoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(TextEncoding::Utf8),
            "sjis" | "shift_jis" | "shift-jis" => Ok(TextEncoding::Sjis),
            "gbk" | "gb18030" => Ok(TextEncoding::Gbk),
            "latin1" | "cp1252" => Ok(TextEncoding::Latin1),
            other => Err(format!("unknown text encoding `{}`", other)),
        }
    }
}

impl fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TextEncoding::Utf8 => "utf8",
            TextEncoding::Sjis => "sjis",
            TextEncoding::Gbk => "gbk",
            TextEncoding::Latin1 => "latin1",
        };
        f.write_str(name)
    }
}
