use std::path::Path;

use anyhow::{Context, Result};
use log::LevelFilter;
use serde::{Deserialize, Serialize};

use lua4_core::{DebugListing, ListingMode, ParseOptions, SelfCheckPolicy, TextEncoding};

/// Logger configuration used by lua4dis.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct LoggerConfig {
    pub level_filter: LevelFilter,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            level_filter: LevelFilter::Warn,
        }
    }
}

impl LoggerConfig {
    /// The configured level, raised one step per `verbosity`.
    pub fn raised(&self, verbosity: u8) -> LevelFilter {
        const LEVELS: [LevelFilter; 6] = [
            LevelFilter::Off,
            LevelFilter::Error,
            LevelFilter::Warn,
            LevelFilter::Info,
            LevelFilter::Debug,
            LevelFilter::Trace,
        ];
        let current = LEVELS
            .iter()
            .position(|l| *l == self.level_filter)
            .unwrap_or(2);
        LEVELS[(current + verbosity as usize).min(LEVELS.len() - 1)]
    }
}

/// Everything a `disasm` run needs. Loaded from TOML, then overridden by flags.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct DisasmConfig {
    pub logger: LoggerConfig,
    pub mode: ListingMode,
    pub indent_width: usize,
    pub parse: ParseOptions,
}

impl Default for DisasmConfig {
    fn default() -> Self {
        Self {
            logger: LoggerConfig::default(),
            mode: ListingMode::Debug,
            indent_width: DebugListing::DEFAULT_INDENT,
            parse: ParseOptions::default(),
        }
    }
}

impl DisasmConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("invalid config {}", path.display()))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }
}

/// `DisasmConfigBuilder` is a convenience builder to adjust a `DisasmConfig` from code.
#[derive(Debug, Default)]
pub struct DisasmConfigBuilder {
    config: DisasmConfig,
}

impl DisasmConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already loaded configuration
    pub fn from_config(config: DisasmConfig) -> Self {
        Self { config }
    }

    pub fn with_mode(mut self, mode: ListingMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn with_indent_width(mut self, indent_width: usize) -> Self {
        self.config.indent_width = indent_width;
        self
    }

    pub fn with_encoding(mut self, encoding: TextEncoding) -> Self {
        self.config.parse.encoding = encoding;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.config.parse.max_depth = max_depth;
        self
    }

    pub fn with_self_check(mut self, policy: SelfCheckPolicy) -> Self {
        self.config.parse.self_check = policy;
        self
    }

    /// Retrieves the configuration built
    pub fn get(self) -> DisasmConfig {
        self.config
    }
}
