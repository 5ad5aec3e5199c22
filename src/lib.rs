pub mod cpu;
pub mod decoder;
pub mod disasm;
pub mod encoder;
pub mod error;
pub mod exec;
pub mod lexer;
pub mod memory;
pub mod opcode;

pub use cpu::{simulate, Cpu, CpuConfig, Halt, Machine, RunOutcome, Snapshot, TraceFlags, Trap};
pub use decoder::{Decoded, Decoder, WordDecoder};
pub use disasm::disassemble;
pub use encoder::{assemble, collect_labels, encode, LabelTable};
pub use error::{AsmError, DecodeFault, LexError, Pos, SyntaxError};
pub use lexer::{tokenize, Token, TokenKind};
pub use memory::{Bus, LinearMemory};
pub use opcode::{classify, Opcode, Shape};
