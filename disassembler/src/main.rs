mod config;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser as ClapParser, Subcommand};
use log::LevelFilter;

use config::{DisasmConfig, DisasmConfigBuilder};
use lua4_core::{parse_lua_file_with, ChunkError, ListingMode, SelfCheckPolicy, TextEncoding};

/// Disassembler for precompiled Lua 4.0 chunks
#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// More log output, repeatable
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a listing of a chunk file
    Disasm(DisasmArgs),
}

#[derive(Args, Debug)]
struct DisasmArgs {
    /// Precompiled chunk to read
    source: PathBuf,

    /// Where the listing goes
    dest: PathBuf,

    /// Listing style: debug or yaml
    #[arg(short, long)]
    mode: Option<ListingMode>,

    /// Encoding of string constants: utf8, sjis, gbk or latin1
    #[arg(short, long)]
    encoding: Option<TextEncoding>,

    #[arg(long)]
    max_depth: Option<usize>,

    #[arg(long)]
    indent: Option<usize>,

    /// Decode files whose self-check record does not match
    #[arg(long)]
    lenient_self_check: bool,
}

/// File config first, then whatever the flags set.
fn resolve_config(config_path: Option<&Path>, args: &DisasmArgs) -> Result<DisasmConfig> {
    let mut builder = match config_path {
        Some(path) => DisasmConfigBuilder::from_config(DisasmConfig::load(path)?),
        None => DisasmConfigBuilder::new(),
    };
    if let Some(mode) = args.mode {
        builder = builder.with_mode(mode);
    }
    if let Some(encoding) = args.encoding {
        builder = builder.with_encoding(encoding);
    }
    if let Some(depth) = args.max_depth {
        builder = builder.with_max_depth(depth);
    }
    if let Some(indent) = args.indent {
        builder = builder.with_indent_width(indent);
    }
    if args.lenient_self_check {
        builder = builder.with_self_check(SelfCheckPolicy::Lenient);
    }
    Ok(builder.get())
}

fn init_logger(level: LevelFilter) {
    // RUST_LOG, when set, wins over the configured level
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn disassemble(source: &Path, dest: &Path, config: &DisasmConfig) -> Result<()> {
    let len = fs::metadata(source)
        .with_context(|| format!("failed to stat {}", source.display()))?
        .len();
    let limit = config.parse.max_input_len;
    if len > limit as u64 {
        let len = usize::try_from(len).unwrap_or(usize::MAX);
        return Err(ChunkError::InputTooLarge { len, limit })
            .with_context(|| format!("refusing to read {}", source.display()));
    }
    let bytes = fs::read(source).with_context(|| format!("failed to read {}", source.display()))?;
    let file = parse_lua_file_with(&bytes, &config.parse)
        .with_context(|| format!("failed to parse {}", source.display()))?;
    log::info!(
        "{}: {} chunks, version 0x{:02X}",
        source.display(),
        file.main.chunk_count(),
        file.header.version
    );

    // render fully before touching the destination
    let listing = config
        .mode
        .formatter(config.indent_width)
        .render(&file)
        .with_context(|| format!("failed to render {} listing", config.mode))?;
    fs::write(dest, listing).with_context(|| format!("failed to write {}", dest.display()))?;
    log::info!("wrote {}", dest.display());
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match &cli.command {
        Command::Disasm(args) => {
            let config = resolve_config(cli.config.as_deref(), args)?;
            init_logger(config.logger.raised(cli.verbose));
            log::debug!("{:?}", config);
            disassemble(&args.source, &args.dest, &config)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // header, self-check, then a "=t" main chunk holding a single END
    const MINIMAL_CHUNK: &str = concat!(
        "1b4c75614001",
        "0404042006090812e65ba1b0b9b241",
        "030000003d7400",
        "00000000",
        "00000000",
        "00",
        "00000000",
        "00000000000000000000000000000000",
        "00000000",
        "01000000",
        "00000000",
    );

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lua4dis-{}-{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn args(argv: &[&str]) -> Cli {
        Cli::try_parse_from(argv.iter().copied()).unwrap()
    }

    fn disasm_args(cli: &Cli) -> &DisasmArgs {
        match &cli.command {
            Command::Disasm(args) => args,
        }
    }

    #[test]
    fn cli_flags_override_config_file() {
        let dir = scratch_dir("config");
        let config_path = dir.join("lua4dis.toml");
        fs::write(&config_path, "mode = \"yaml\"\nindent_width = 8\n[parse]\nmax_depth = 10\n").unwrap();

        let cli = args(&[
            "lua4dis",
            "--config",
            config_path.to_str().unwrap(),
            "disasm",
            "in.luac",
            "out.txt",
            "--max-depth",
            "3",
            "--lenient-self-check",
        ]);
        let config = resolve_config(cli.config.as_deref(), disasm_args(&cli)).unwrap();
        assert_eq!(config.mode, ListingMode::Yaml);
        assert_eq!(config.indent_width, 8);
        assert_eq!(config.parse.max_depth, 3);
        assert_eq!(config.parse.self_check, SelfCheckPolicy::Lenient);

        let cli = args(&["lua4dis", "disasm", "in.luac", "out.txt", "-m", "debug", "-e", "sjis"]);
        let config = resolve_config(None, disasm_args(&cli)).unwrap();
        assert_eq!(config.mode, ListingMode::Debug);
        assert_eq!(config.parse.encoding, TextEncoding::Sjis);
    }

    #[test]
    fn verbosity_flags_count() {
        let cli = args(&["lua4dis", "-vv", "disasm", "a", "b"]);
        assert_eq!(cli.verbose, 2);
        assert!(Cli::try_parse_from(["lua4dis", "disasm", "a", "b", "--mode", "html"]).is_err());
    }

    #[test]
    fn writes_a_listing() {
        let dir = scratch_dir("listing");
        let source = dir.join("minimal.luac");
        let dest = dir.join("minimal.txt");
        fs::write(&source, hex::decode(MINIMAL_CHUNK).unwrap()).unwrap();

        disassemble(&source, &dest, &DisasmConfig::default()).unwrap();
        let text = fs::read_to_string(&dest).unwrap();
        assert!(text.contains("-- @source =t:0\n"));
        assert!(text.contains(" [0] -- end --\n"));
    }

    #[test]
    fn failed_parse_leaves_no_output() {
        let dir = scratch_dir("broken");
        let source = dir.join("broken.luac");
        let dest = dir.join("broken.txt");
        let _ = fs::remove_file(&dest);
        let bytes = hex::decode(MINIMAL_CHUNK).unwrap();
        fs::write(&source, &bytes[..bytes.len() - 2]).unwrap();

        let err = disassemble(&source, &dest, &DisasmConfig::default()).unwrap_err();
        assert!(format!("{:#}", err).contains("main.instructions[0].instruction"));
        assert!(!dest.exists());
    }

    #[test]
    fn oversized_input_is_not_read() {
        let dir = scratch_dir("oversized");
        let source = dir.join("minimal.luac");
        let dest = dir.join("minimal.txt");
        let _ = fs::remove_file(&dest);
        let bytes = hex::decode(MINIMAL_CHUNK).unwrap();
        fs::write(&source, &bytes).unwrap();

        let mut config = DisasmConfig::default();
        config.parse.max_input_len = bytes.len() - 1;
        let err = disassemble(&source, &dest, &config).unwrap_err();
        match err.downcast_ref::<ChunkError>() {
            Some(ChunkError::InputTooLarge { len, limit }) => {
                assert_eq!((*len, *limit), (bytes.len(), bytes.len() - 1));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(!dest.exists());

        config.parse.max_input_len = bytes.len();
        disassemble(&source, &dest, &config).unwrap();
        assert!(dest.exists());
    }
}
