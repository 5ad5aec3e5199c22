//! Two-pass assembler back end: label collection, then word emission.

use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::error::{AsmError, Pos, SyntaxError};
use crate::lexer::{tokenize, Token, TokenKind};
use crate::opcode::{looks_like_register, Opcode, Shape};

/// Label name to byte offset in the instruction stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelTable {
    offsets: HashMap<String, u32>,
    declared_at: HashMap<String, Pos>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelKV {
    pub addr: u32,
    pub name: String,
}

impl LabelTable {
    pub fn get(&self, name: &str) -> Option<u32> {
        self.offsets.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// Entries sorted by offset, then name.
    pub fn entries(&self) -> Vec<LabelKV> {
        let mut v: Vec<LabelKV> = self
            .offsets
            .iter()
            .map(|(name, &addr)| LabelKV { addr, name: name.clone() })
            .collect();
        v.sort_by(|a, b| a.addr.cmp(&b.addr).then_with(|| a.name.cmp(&b.name)));
        v
    }
}

/// First pass. Every opcode advances the offset by 4, labels take no space.
pub fn collect_labels(tokens: &[Token]) -> Result<LabelTable, SyntaxError> {
    let mut table = LabelTable::default();
    let mut offset = 0u32;
    for tok in tokens {
        match &tok.kind {
            TokenKind::Opcode(_) => offset = offset.wrapping_add(4),
            TokenKind::Label(name) => {
                if let Some(&first) = table.declared_at.get(name) {
                    return Err(SyntaxError::DuplicateLabel {
                        pos: tok.pos,
                        name: name.clone(),
                        first,
                    });
                }
                table.offsets.insert(name.clone(), offset);
                table.declared_at.insert(name.clone(), tok.pos);
            }
            _ => {}
        }
    }
    Ok(table)
}

/// Encodes a token stream into big-endian instruction words.
pub fn encode(tokens: &[Token]) -> Result<Vec<u8>, SyntaxError> {
    let labels = collect_labels(tokens)?;
    debug!(labels = labels.len(), "label pass done");
    encode_with(tokens, &labels)
}

/// Second pass against an already collected label table.
pub fn encode_with(tokens: &[Token], labels: &LabelTable) -> Result<Vec<u8>, SyntaxError> {
    let mut out = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        let tok = &tokens[i];
        i += 1;
        match &tok.kind {
            TokenKind::Label(_) => {}
            TokenKind::Eof => break,
            TokenKind::Opcode(op) => {
                let shape = op.shape();
                let needed = shape.operand_count();
                let operands = take_operands(&tokens[i..], needed);
                if operands.len() < needed {
                    return Err(SyntaxError::MissingOperand {
                        pos: tok.pos,
                        op: *op,
                        shape,
                        expected: needed,
                        found: operands.len(),
                    });
                }
                i += needed;
                let word = pack(*op, operands, labels)?;
                out.extend_from_slice(&word.to_be_bytes());
            }
            TokenKind::Identifier(name) if !looks_like_register(name) => {
                return Err(SyntaxError::UnknownMnemonic { pos: tok.pos, name: name.clone() });
            }
            other => {
                return Err(SyntaxError::UnexpectedToken {
                    pos: tok.pos,
                    expected: "opcode or label",
                    found: other.to_string(),
                });
            }
        }
    }
    debug!(words = out.len() / 4, "emission pass done");
    Ok(out)
}

/// Lex and encode in one go.
pub fn assemble(src: &str) -> Result<Vec<u8>, AsmError> {
    let tokens = tokenize(src)?;
    Ok(encode(&tokens)?)
}

/// Leading operand-like tokens, at most `n`.
fn take_operands(rest: &[Token], n: usize) -> &[Token] {
    let count = rest
        .iter()
        .take(n)
        .take_while(|t| {
            !matches!(t.kind, TokenKind::Opcode(_) | TokenKind::Label(_) | TokenKind::Eof)
        })
        .count();
    &rest[..count]
}

fn pack(op: Opcode, operands: &[Token], labels: &LabelTable) -> Result<u32, SyntaxError> {
    let opb = u32::from(op.byte()) << 24;
    let (w1, w2, w3) = op.shape().field_widths();
    let word = match op.shape() {
        Shape::Dss => {
            let rd = register(&operands[0])?;
            let rs1 = register(&operands[1])?;
            let rs2 = register(&operands[2])?;
            opb | (rd << 16) | (rs1 << 8) | rs2
        }
        Shape::Dsi => {
            let rd = register(&operands[0])?;
            let rs = register(&operands[1])?;
            let imm = immediate(&operands[2], w3, labels)?;
            opb | (rd << 16) | (rs << 8) | imm
        }
        Shape::Ds => {
            let rd = register(&operands[0])?;
            let rs = register(&operands[1])?;
            opb | (rd << 16) | (rs & mask(w2))
        }
        Shape::Di => {
            let rd = register(&operands[0])?;
            let imm = immediate(&operands[1], w2, labels)?;
            opb | (rd << 16) | imm
        }
        Shape::I => opb | immediate(&operands[0], w1, labels)?,
    };
    Ok(word)
}

fn mask(bits: u32) -> u32 {
    if bits >= 32 {
        u32::MAX
    } else {
        (1u32 << bits) - 1
    }
}

fn register(tok: &Token) -> Result<u32, SyntaxError> {
    match &tok.kind {
        TokenKind::Register(r) => Ok(u32::from(*r) & mask(8)),
        TokenKind::Identifier(name) if looks_like_register(name) => {
            Err(SyntaxError::RegisterOutOfRange { pos: tok.pos, name: name.clone() })
        }
        other => Err(SyntaxError::UnexpectedToken {
            pos: tok.pos,
            expected: "register",
            found: other.to_string(),
        }),
    }
}

fn immediate(tok: &Token, bits: u32, labels: &LabelTable) -> Result<u32, SyntaxError> {
    let out_of_range = |value: i64| SyntaxError::ImmediateOutOfRange { pos: tok.pos, value, bits };
    match &tok.kind {
        TokenKind::Numeric(n) | TokenKind::Hex(n) => {
            if *n > mask(bits) {
                return Err(out_of_range(i64::from(*n)));
            }
            Ok(*n)
        }
        TokenKind::Signed(v) => {
            let min = -(1i64 << (bits - 1));
            if *v < min {
                return Err(out_of_range(*v));
            }
            // two's complement folded into the field
            Ok((*v as u32) & mask(bits))
        }
        TokenKind::Identifier(name) => {
            let addr = labels
                .get(name)
                .ok_or_else(|| SyntaxError::UnresolvedLabel { pos: tok.pos, name: name.clone() })?;
            if addr > mask(bits) {
                return Err(out_of_range(i64::from(addr)));
            }
            Ok(addr)
        }
        other => Err(SyntaxError::UnexpectedToken {
            pos: tok.pos,
            expected: "immediate or label",
            found: other.to_string(),
        }),
    }
}
