use serde::{Deserialize, Serialize};

use crate::error::{DecodeFault, SyntaxError};
use crate::opcode::{Opcode, Shape, REGISTER_COUNT};

/// Operand fields of one word, split by shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operands {
    Dss { rd: u8, rs1: u8, rs2: u8 },
    Dsi { rd: u8, rs: u8, imm: u8 },
    Ds { rd: u8, rs: u8 },
    Di { rd: u8, imm: u16 },
    I { imm: u32 },
}

impl Operands {
    pub fn shape(&self) -> Shape {
        match self {
            Operands::Dss { .. } => Shape::Dss,
            Operands::Dsi { .. } => Shape::Dsi,
            Operands::Ds { .. } => Shape::Ds,
            Operands::Di { .. } => Shape::Di,
            Operands::I { .. } => Shape::I,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decoded {
    pub op: Opcode,
    pub operands: Operands,
    /// The whole word, kept for listings.
    pub raw: u32,
}

pub trait Decoder {
    fn decode(&self, raw32: u32) -> Result<Decoded, DecodeFault>;
}

/// Splits big-endian words as `[op:8][f1:8][f2:8][f3:8]`, `[op:8][f1:8][f2:16]`
/// or `[op:8][f1:24]`. Multi-byte fields are taken from the whole word.
#[derive(Debug, Default, Clone, Copy)]
pub struct WordDecoder;

impl WordDecoder {
    pub fn new() -> Self {
        Self
    }
}

fn reg(value: u32) -> Result<u8, DecodeFault> {
    if (value as usize) < REGISTER_COUNT {
        Ok(value as u8)
    } else {
        Err(DecodeFault::UnknownRegister(value))
    }
}

impl Decoder for WordDecoder {
    fn decode(&self, raw32: u32) -> Result<Decoded, DecodeFault> {
        let byte = (raw32 >> 24) as u8;
        let op = Opcode::from_byte(byte).ok_or(DecodeFault::UnknownOpcode(byte))?;
        let f1 = (raw32 >> 16) & 0xFF;
        let f2 = (raw32 >> 8) & 0xFF;
        let f3 = raw32 & 0xFF;

        let operands = match op.shape() {
            Shape::Dss => Operands::Dss { rd: reg(f1)?, rs1: reg(f2)?, rs2: reg(f3)? },
            Shape::Dsi => Operands::Dsi { rd: reg(f1)?, rs: reg(f2)?, imm: f3 as u8 },
            Shape::Ds => Operands::Ds { rd: reg(f1)?, rs: reg(raw32 & 0xFFFF)? },
            Shape::Di => Operands::Di { rd: reg(f1)?, imm: (raw32 & 0xFFFF) as u16 },
            Shape::I => Operands::I { imm: raw32 & 0x00FF_FFFF },
        };
        Ok(Decoded { op, operands, raw: raw32 })
    }
}

/// Decodes a whole instruction stream. Errors carry the byte offset of the
/// offending word.
pub fn decode_stream<D: Decoder>(dec: &D, bytes: &[u8]) -> Result<Vec<Decoded>, SyntaxError> {
    if bytes.len() % 4 != 0 {
        return Err(SyntaxError::TruncatedStream { len: bytes.len() });
    }
    bytes
        .chunks_exact(4)
        .enumerate()
        .map(|(i, chunk)| {
            let raw = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            dec.decode(raw)
                .map_err(|fault| SyntaxError::Decode { offset: i * 4, fault })
        })
        .collect()
}
