use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::Path;
use tracing_subscriber::EnvFilter;

use isa32::disassemble;
use isa32_disasm::{decode_records, load_raw_bin, render_range};

#[derive(Parser, Debug)]
#[command(author, version, about = "isa32 disassembler CLI", long_about=None)]
struct Cli {
    /// Skip N bytes at start of file before loading
    #[arg(long, default_value_t = 0usize)]
    skip: usize,
    /// Limit bytes loaded (default: to EOF after --skip)
    #[arg(long)]
    len: Option<usize>,
    /// Input binary path
    #[arg(value_name = "BINFILE")]
    input: String,
    /// Subcommand
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode the whole stream back to assembly text
    Text {
        /// Lower-case mnemonics
        #[arg(long)]
        lower: bool,
        /// Write output to file instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<String>,
    },
    /// Addressed listing of a range [start, end) in bytes
    Listing {
        /// Start address (hex or dec)
        start: String,
        /// End address (hex or dec, exclusive); defaults to end of stream
        end: Option<String>,
        /// Show instruction bytes
        #[arg(long)]
        show_bytes: bool,
        /// Lower-case mnemonics
        #[arg(long)]
        lower: bool,
        /// Write output to file instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<String>,
    },
    /// Decoded words as JSON records
    Json {
        /// Write output to file instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<String>,
    },
}

fn parse_u32(s: &str) -> Result<u32> {
    let s = s.trim();
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Ok(u32::from_str_radix(hex, 16)?)
    } else {
        Ok(s.parse::<u32>()?)
    }
}

fn emit(out: Option<String>, text: &str) -> Result<()> {
    match out {
        Some(path) => std::fs::write(&path, text).with_context(|| format!("writing {path}")),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let img = load_raw_bin(Path::new(&cli.input), cli.skip, cli.len)
        .with_context(|| format!("loading {}", cli.input))?;
    tracing::debug!(words = img.word_count(), "loaded {}", img.name);

    match cli.cmd {
        Command::Text { lower, out } => {
            let text = disassemble(&img.bytes, lower)?;
            emit(out, &text)?;
        }
        Command::Listing { start, end, show_bytes, lower, out } => {
            let start = parse_u32(&start)?;
            let end = match end {
                Some(e) => parse_u32(&e)?,
                None => img.len() as u32,
            };
            anyhow::ensure!(end >= start, "end must be >= start");
            emit(out, &render_range(&img, start, end, show_bytes, lower))?;
        }
        Command::Json { out } => {
            let records = decode_records(&img)?;
            let mut json = serde_json::to_string_pretty(&records)?;
            json.push('\n');
            emit(out, &json)?;
        }
    }

    Ok(())
}
