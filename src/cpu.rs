use anyhow::Error;
use crate::decoder::Decoder;
use crate::error::DecodeFault;
use crate::exec::Executor;
use crate::memory::{Bus, DEFAULT_MEMORY_SIZE};
use crate::opcode::{register_name, Opcode, Shape, REGISTER_COUNT};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use tracing::{info, trace};

bitflags! {
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TraceFlags: u8 {
const INSTRUCTIONS = 1 << 0; // decoded instruction per step
const REGISTERS = 1 << 1; // register file after each step
const MEMORY = 1 << 2; // memory contents after each step
}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CpuConfig {
    /// Stop quietly after this many instructions.
    pub max_steps: Option<u64>,
    pub memory_size: usize,
    pub trace: TraceFlags,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            max_steps: None,
            memory_size: DEFAULT_MEMORY_SIZE,
            trace: TraceFlags::empty(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cpu {
    pub pc: u32,                     // byte offset into the program
    pub gpr: [u32; REGISTER_COUNT], // r0 stays zero
    pub steps: u64,
    pub cfg: CpuConfig,
}

#[derive(thiserror::Error, Debug)]
pub enum Trap {
    #[error("Invalid instruction at {pc:#010x}: {fault}")]
    InvalidInstruction {
        pc: u32,
        #[source]
        fault: DecodeFault,
    },
    #[error("Unaligned program counter {pc:#010x}")]
    Unaligned { pc: u32 },
    #[error("Partial instruction word at {pc:#010x} (program is {len} bytes)")]
    Truncated { pc: u32, len: usize },
    #[error("Bus error at {addr:#010x}: {source}")]
    Bus { addr: u32, #[source] source: Error },
    #[error("Division by zero in {op} at {pc:#010x}")]
    DivisionByZero { pc: u32, op: Opcode },
    #[error("{op} is not implemented for {shape} instructions")]
    Unimplemented { op: Opcode, shape: Shape },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Halt {
    /// PC ran past the last word.
    EndOfProgram,
    /// `max_steps` reached.
    StepLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunOutcome {
    pub steps: u64,
    pub halt: Halt,
}

impl Cpu {
    pub fn new(cfg: CpuConfig) -> Self {
        Self {
            pc: 0,
            gpr: [0; REGISTER_COUNT],
            steps: 0,
            cfg,
        }
    }

    pub fn reset(&mut self, reset_pc: u32) {
        self.pc = reset_pc;
        self.gpr = [0; REGISTER_COUNT];
        self.steps = 0;
    }

    pub fn reg(&self, r: u8) -> u32 {
        self.gpr[r as usize]
    }

    /// Writes to r0 are dropped.
    pub fn write_reg(&mut self, r: u8, val: u32) {
        if r != 0 {
            self.gpr[r as usize] = val;
        }
    }

    fn fetch(&self, program: &[u8]) -> Result<u32, Trap> {
        let pc = self.pc;
        if pc % 4 != 0 {
            return Err(Trap::Unaligned { pc });
        }
        let start = pc as usize;
        let b = program
            .get(start..start + 4)
            .ok_or(Trap::Truncated { pc, len: program.len() })?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Executes one word. A taken branch hands back `target - 4`; the PC then
    /// moves on by 4 either way.
    pub fn step<B: Bus, D: Decoder, X: Executor>(
        &mut self,
        program: &[u8],
        bus: &mut B,
        dec: &D,
        exec: &X,
    ) -> Result<(), Trap> {
        let pc = self.pc;
        let raw32 = self.fetch(program)?;
        let d = dec
            .decode(raw32)
            .map_err(|fault| Trap::InvalidInstruction { pc, fault })?;
        if self.cfg.trace.contains(TraceFlags::INSTRUCTIONS) {
            info!(target: "isa32::trace", "{pc:#06x}: {d}");
        }
        trace!(pc, raw = raw32, "step");

        let next = exec.exec(self, bus, pc, d)?;
        self.pc = next.unwrap_or(pc).wrapping_add(4);
        self.steps += 1;

        if self.cfg.trace.contains(TraceFlags::REGISTERS) {
            info!(target: "isa32::trace", "{}", self.dump_registers());
        }
        if self.cfg.trace.contains(TraceFlags::MEMORY) {
            if let Some(mem) = bus.contents() {
                info!(target: "isa32::trace", "memory {:02x?}", mem);
            }
        }
        Ok(())
    }

    /// Steps until the PC leaves the program or the step limit is hit.
    pub fn run<B: Bus, D: Decoder, X: Executor>(
        &mut self,
        program: &[u8],
        bus: &mut B,
        dec: &D,
        exec: &X,
    ) -> Result<RunOutcome, Trap> {
        let start = self.steps;
        loop {
            let steps = self.steps - start;
            if self.pc as usize >= program.len() {
                return Ok(RunOutcome { steps, halt: Halt::EndOfProgram });
            }
            if self.cfg.max_steps.is_some_and(|max| steps >= max) {
                return Ok(RunOutcome { steps, halt: Halt::StepLimit });
            }
            self.step(program, bus, dec, exec)?;
        }
    }

    pub fn dump_registers(&self) -> String {
        self.gpr
            .iter()
            .enumerate()
            .map(|(i, v)| format!("{}={v}", register_name(i as u32).unwrap_or("?")))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Register file, memory and program for one simulation run.
pub struct Machine<B: Bus = crate::memory::LinearMemory> {
    pub cpu: Cpu,
    pub bus: B,
    program: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub pc: u32,
    pub steps: u64,
    pub registers: [u32; REGISTER_COUNT],
    pub memory: Vec<u8>,
}

impl Machine {
    pub fn new(program: Vec<u8>, cfg: CpuConfig) -> Self {
        Self {
            cpu: Cpu::new(cfg),
            bus: crate::memory::LinearMemory::new(cfg.memory_size),
            program,
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            pc: self.cpu.pc,
            steps: self.cpu.steps,
            registers: self.cpu.gpr,
            memory: self.bus.mem.clone(),
        }
    }
}

impl<B: Bus> Machine<B> {
    pub fn with_bus(program: Vec<u8>, cfg: CpuConfig, bus: B) -> Self {
        Self { cpu: Cpu::new(cfg), bus, program }
    }

    pub fn program(&self) -> &[u8] {
        &self.program
    }

    pub fn run(&mut self) -> Result<RunOutcome, Trap> {
        let dec = crate::decoder::WordDecoder::new();
        let exec = crate::exec::IntExecutor;
        self.cpu.run(&self.program, &mut self.bus, &dec, &exec)
    }
}

pub fn simulate(program: &[u8], cfg: CpuConfig) -> Result<(RunOutcome, Snapshot), Trap> {
    let mut m = Machine::new(program.to_vec(), cfg);
    let outcome = m.run()?;
    Ok((outcome, m.snapshot()))
}
