use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use isa32::{assemble, CpuConfig, Halt, Machine, TraceFlags};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Run an isa32 instruction stream on the simulator"
)]
struct Opts {
    /// Stop after this many instructions
    #[arg(short = 'n', long)]
    max_steps: Option<u64>,
    /// Data memory size in bytes
    #[arg(long)]
    mem_size: Option<usize>,
    /// Load simulator settings from a JSON file (flags override it)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Treat the input as assembly source and assemble it first
    #[arg(long)]
    source: bool,
    /// Log every executed instruction
    #[arg(long)]
    trace_instructions: bool,
    /// Log the register file after every instruction
    #[arg(long)]
    trace_registers: bool,
    /// Log data memory after every instruction
    #[arg(long)]
    trace_memory: bool,
    /// Final state output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    #[arg(value_name = "BINFILE")]
    input: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn load_config(opts: &Opts) -> Result<CpuConfig> {
    let mut cfg = match &opts.config {
        Some(path) => {
            let txt = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&txt).with_context(|| format!("parsing {}", path.display()))?
        }
        None => CpuConfig::default(),
    };
    if opts.max_steps.is_some() {
        cfg.max_steps = opts.max_steps;
    }
    if let Some(size) = opts.mem_size {
        cfg.memory_size = size;
    }
    if opts.trace_instructions {
        cfg.trace |= TraceFlags::INSTRUCTIONS;
    }
    if opts.trace_registers {
        cfg.trace |= TraceFlags::REGISTERS;
    }
    if opts.trace_memory {
        cfg.trace |= TraceFlags::MEMORY;
    }
    Ok(cfg)
}

fn main() -> Result<()> {
    let opts = Opts::parse();
    let cfg = load_config(&opts)?;

    // trace flags switch on their own log target
    let mut filter = EnvFilter::from_default_env();
    if !cfg.trace.is_empty() {
        filter = filter.add_directive("isa32::trace=info".parse()?);
    }
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let program = if opts.source {
        let text = std::fs::read_to_string(&opts.input)
            .with_context(|| format!("reading {}", opts.input.display()))?;
        assemble(&text).with_context(|| format!("assembling {}", opts.input.display()))?
    } else {
        std::fs::read(&opts.input).with_context(|| format!("reading {}", opts.input.display()))?
    };
    anyhow::ensure!(
        program.len() % 4 == 0,
        "{}: length {} is not a multiple of 4",
        opts.input.display(),
        program.len()
    );

    let mut machine = Machine::new(program, cfg);
    let outcome = machine.run().context("TRAP")?;

    let snap = machine.snapshot();
    match opts.format {
        OutputFormat::Json => {
            #[derive(serde::Serialize)]
            struct Report<'a> {
                outcome: isa32::RunOutcome,
                state: &'a isa32::Snapshot,
            }
            println!("{}", serde_json::to_string_pretty(&Report { outcome, state: &snap })?);
        }
        OutputFormat::Text => {
            let why = match outcome.halt {
                Halt::EndOfProgram => "end of program",
                Halt::StepLimit => "step limit",
            };
            println!("halted after {} steps ({why}), pc = {:#06x}", outcome.steps, snap.pc);
            for (i, chunk) in snap.registers.chunks(8).enumerate() {
                let row: Vec<String> = chunk
                    .iter()
                    .enumerate()
                    .map(|(j, v)| format!("r{:<2} = {v:#010x}", i * 8 + j))
                    .collect();
                println!("{}", row.join("  "));
            }
            println!("memory:");
            for (i, row) in snap.memory.chunks(16).enumerate() {
                let bytes: Vec<String> = row.iter().map(|b| format!("{b:02x}")).collect();
                println!("  {:#06x}: {}", i * 16, bytes.join(" "));
            }
        }
    }

    Ok(())
}
