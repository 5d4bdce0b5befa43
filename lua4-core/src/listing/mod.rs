//! Renderers for a parsed [`LuaFile`].
//!
//! Each output style implements [`ListingFormatter`]; [`ListingMode`] names
//! the available styles so callers can pick one at runtime. Renderers only
//! read the tree and produce a complete string, so a failure never leaves a
//! half-written listing behind.

mod debug;
mod yaml;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::format::LuaFile;

pub use debug::{describe_instruction, DebugListing};
pub use yaml::YamlListing;

pub trait ListingFormatter {
    fn render(&self, file: &LuaFile) -> Result<String>;
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum ListingMode {
    /// Commented, indexed text dump of every chunk.
    #[default]
    Debug,
    /// The parsed tree with decoded instructions, as YAML.
    Yaml,
}

impl ListingMode {
    pub fn formatter(self, indent_width: usize) -> Box<dyn ListingFormatter> {
        match self {
            ListingMode::Debug => Box::new(DebugListing::with_indent(indent_width)),
            ListingMode::Yaml => Box::new(YamlListing),
        }
    }
}

impl FromStr for ListingMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(ListingMode::Debug),
            "yaml" => Ok(ListingMode::Yaml),
            other => Err(format!("unknown listing mode `{}`", other)),
        }
    }
}

impl fmt::Display for ListingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ListingMode::Debug => "debug",
            ListingMode::Yaml => "yaml",
        })
    }
}
