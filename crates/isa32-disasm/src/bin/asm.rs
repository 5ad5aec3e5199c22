use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use isa32::encoder::{collect_labels, encode_with};
use isa32::lexer::{pretty, tokenize};

#[derive(Parser, Debug)]
#[command(author, version, about = "isa32 assembler")]
struct Opts {
    /// Input assembly file
    #[arg(short, long)]
    input: PathBuf,
    /// Output binary file (big-endian words)
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Print the token stream, one instruction per line
    #[arg(long)]
    tokens: bool,
    /// With --tokens, print only token values
    #[arg(long, requires = "tokens")]
    values_only: bool,
    /// Export labels to JSON (Vec<{ addr, name }>)
    #[arg(long, value_name = "FILE")]
    labels_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let opts = Opts::parse();
    let text = fs::read_to_string(&opts.input)
        .with_context(|| format!("reading {}", opts.input.display()))?;
    let tokens = tokenize(&text).with_context(|| format!("{}", opts.input.display()))?;

    if opts.tokens {
        print!("{}", pretty(&tokens, opts.values_only));
    }

    let labels = collect_labels(&tokens).with_context(|| format!("{}", opts.input.display()))?;
    for kv in labels.entries() {
        tracing::debug!(addr = kv.addr, "label {}", kv.name);
    }
    if let Some(path) = &opts.labels_out {
        fs::write(path, serde_json::to_string_pretty(&labels.entries())?)
            .with_context(|| format!("writing {}", path.display()))?;
    }

    let bin = encode_with(&tokens, &labels).with_context(|| format!("{}", opts.input.display()))?;
    match &opts.output {
        Some(path) => {
            fs::write(path, &bin).with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(words = bin.len() / 4, "wrote {}", path.display());
        }
        None => anyhow::ensure!(opts.tokens, "nothing to do: pass --output or --tokens"),
    }
    Ok(())
}
