use std::fmt;

use serde::{Deserialize, Serialize};

use crate::opcode::{Opcode, Shape};

/// 1-based source position: line number and word index within the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pos {
    pub line: u32,
    pub word: u32,
}

impl Pos {
    pub fn new(line: u32, word: u32) -> Self {
        Self { line, word }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, word {}", self.line, self.word)
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    #[error("{pos}: number `{text}` does not fit in 32 bits")]
    NumberTooLarge { pos: Pos, text: String },
    #[error("{pos}: malformed hex literal `{text}`")]
    MalformedHex { pos: Pos, text: String },
    #[error("{pos}: `:` without a label name")]
    StrayColon { pos: Pos },
}

/// Reverse-lookup miss while splitting an instruction word.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeFault {
    #[error("unknown opcode byte {0:#04x}")]
    UnknownOpcode(u8),
    #[error("unknown register index {0}")]
    UnknownRegister(u32),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    #[error("{pos}: unknown opcode `{name}`")]
    UnknownMnemonic { pos: Pos, name: String },
    #[error("{pos}: {op} ({shape}) expects {expected} operands, found {found}")]
    MissingOperand {
        pos: Pos,
        op: Opcode,
        shape: Shape,
        expected: usize,
        found: usize,
    },
    #[error("{pos}: expected {expected}, found `{found}`")]
    UnexpectedToken {
        pos: Pos,
        expected: &'static str,
        found: String,
    },
    #[error("{pos}: register `{name}` is out of range r0-r31")]
    RegisterOutOfRange { pos: Pos, name: String },
    #[error("{pos}: unresolved label `{name}`")]
    UnresolvedLabel { pos: Pos, name: String },
    #[error("{pos}: label `{name}` already declared at {first}")]
    DuplicateLabel { pos: Pos, name: String, first: Pos },
    #[error("{pos}: value {value} does not fit a {bits}-bit field")]
    ImmediateOutOfRange { pos: Pos, value: i64, bits: u32 },
    #[error("byte offset {offset}: {fault}")]
    Decode {
        offset: usize,
        #[source]
        fault: DecodeFault,
    },
    #[error("instruction stream length {len} is not a multiple of 4")]
    TruncatedStream { len: usize },
}

/// Failure of a whole text-to-binary assembly.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum AsmError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Syntax(#[from] SyntaxError),
}
